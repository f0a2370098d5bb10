//! Coalescing dispatcher — the rate-limiting primitive behind every pane.
//!
//! Classic trailing-edge debounce with an overflow valve: updates buffer
//! until either the quiet period elapses or the buffer reaches its ceiling,
//! whichever comes first. The ceiling guarantees an upper bound on staleness
//! regardless of edit rate.
//!
//! Buffer and timer are owned by a single spawned task fed over a channel,
//! so `push` can never re-enter the flush callback.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

/// Handle for pushing updates into a coalescing buffer.
///
/// Created by [`Coalescer::new`]; cheap to clone. Dropping every handle
/// stops the dispatcher task and discards any pending buffer.
#[derive(Debug, Clone)]
pub struct Coalescer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Coalescer<T> {
    /// Spawns a dispatcher that flushes at most `max_buffer` items at a time.
    ///
    /// `on_flush` receives the buffered items in push order; deciding what to
    /// act on (for persistence, only the most recent matters) is the
    /// callback's business. A flush with an empty buffer is never delivered.
    pub fn new<F, Fut>(delay: Duration, max_buffer: usize, mut on_flush: F) -> Self
    where
        F: FnMut(Vec<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        assert!(max_buffer > 0, "coalescer needs a nonzero buffer ceiling");

        // Unbounded: pushes come from the synchronous edit path and must
        // never block it. The ceiling bounds each flush, not the channel.
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        tokio::spawn(async move {
            let mut buffer: Vec<T> = Vec::new();
            let mut deadline: Option<Instant> = None;

            loop {
                let timer = async {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                };

                tokio::select! {
                    item = rx.recv() => match item {
                        Some(item) => {
                            buffer.push(item);
                            if buffer.len() >= max_buffer {
                                // Overflow valve: flush now, drop the timer.
                                deadline = None;
                                flush(&mut buffer, &mut on_flush).await;
                            } else {
                                // Trailing edge: every push restarts the timer.
                                deadline = Some(Instant::now() + delay);
                            }
                        }
                        None => break,
                    },
                    () = timer => {
                        deadline = None;
                        flush(&mut buffer, &mut on_flush).await;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Appends an update to the buffer.
    ///
    /// A push after the dispatcher task has stopped is dropped silently; the
    /// page session is over at that point.
    pub fn push(&self, item: T) {
        if self.tx.send(item).is_err() {
            tracing::trace!("coalescer task gone, dropping update");
        }
    }
}

async fn flush<T, F, Fut>(buffer: &mut Vec<T>, on_flush: &mut F)
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = ()>,
{
    // Guards against a timer firing after an overflow flush already
    // cleared the buffer.
    if buffer.is_empty() {
        return;
    }
    on_flush(std::mem::take(buffer)).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;

    fn collecting(
        delay: Duration,
        max_buffer: usize,
    ) -> (Coalescer<String>, Arc<Mutex<Vec<Vec<String>>>>) {
        let flushes: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = flushes.clone();
        let coalescer = Coalescer::new(delay, max_buffer, move |items: Vec<String>| {
            sink.lock().unwrap().push(items);
            async {}
        });
        (coalescer, flushes)
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_period_produces_single_flush_with_last_snapshot() {
        let (coalescer, flushes) = collecting(Duration::from_millis(1000), 1000);

        for text in ["a", "ab", "abc"] {
            coalescer.push(text.to_string());
        }

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let flushes = flushes.lock().unwrap();
        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0], vec!["a", "ab", "abc"]);
        assert_eq!(flushes[0].last().unwrap(), "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn every_push_restarts_the_timer() {
        let (coalescer, flushes) = collecting(Duration::from_millis(1000), 1000);

        coalescer.push("a".to_string());
        tokio::time::sleep(Duration::from_millis(600)).await;
        coalescer.push("ab".to_string());
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert!(flushes.lock().unwrap().is_empty(), "timer was restarted");

        tokio::time::sleep(Duration::from_millis(500)).await;
        let flushes = flushes.lock().unwrap();
        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0], vec!["a", "ab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_flushes_without_waiting() {
        let (coalescer, flushes) = collecting(Duration::from_millis(1000), 3);

        for text in ["a", "b", "c"] {
            coalescer.push(text.to_string());
        }
        // Well below the quiet period: only the overflow path can flush here.
        tokio::time::sleep(Duration::from_millis(1)).await;

        {
            let flushes = flushes.lock().unwrap();
            assert_eq!(flushes.len(), 1);
            assert_eq!(flushes[0].len(), 3);
        }

        // The overflow flush cleared the timer: advancing time must not
        // deliver a second, empty flush.
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(flushes.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn buffer_never_exceeds_ceiling() {
        let (coalescer, flushes) = collecting(Duration::from_millis(1000), 4);

        for i in 0..10 {
            coalescer.push(format!("snapshot-{i}"));
        }
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let flushes = flushes.lock().unwrap();
        assert!(!flushes.is_empty());
        for flush in flushes.iter() {
            assert!(flush.len() <= 4, "flush of {} items exceeds ceiling", flush.len());
        }
        let total: usize = flushes.iter().map(Vec::len).sum();
        assert_eq!(total, 10, "no update may be lost");
    }

    #[tokio::test(start_paused = true)]
    async fn ordering_is_preserved_across_flushes() {
        let (coalescer, flushes) = collecting(Duration::from_millis(100), 2);

        for i in 0..6 {
            coalescer.push(format!("{i}"));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let flat: Vec<String> = flushes.lock().unwrap().iter().flatten().cloned().collect();
        assert_eq!(flat, vec!["0", "1", "2", "3", "4", "5"]);
    }
}
