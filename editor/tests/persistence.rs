//! End-to-end persistence pipeline tests: keystroke snapshots in, coalesced
//! HTTP writes out.

use std::sync::Arc;
use std::time::Duration;

use inkpad_editor::{PaneController, PersistClient};
use inkpad_types::{DebounceProfile, Pane};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn short_profile() -> DebounceProfile {
    DebounceProfile {
        delay: Duration::from_millis(50),
        max_buffer: 100,
    }
}

async fn pen_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn burst_of_edits_becomes_one_write_with_final_text() {
    let server = pen_server().await;
    let client =
        PersistClient::new(Url::parse(&format!("{}/pens/7", server.uri())).unwrap()).unwrap();
    let controller =
        PaneController::with_profile(Pane::Script, "", short_profile(), Arc::new(client));

    controller.notify_change("a");
    controller.notify_change("ab");
    controller.notify_change("abc");

    tokio::time::sleep(Duration::from_millis(400)).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/pens/7/js");
    assert_eq!(requests[0].body, b"abc");
}

#[tokio::test]
async fn identical_flushes_produce_exactly_one_write() {
    let server = pen_server().await;
    let client =
        PersistClient::new(Url::parse(&format!("{}/pens/7", server.uri())).unwrap()).unwrap();
    let controller =
        PaneController::with_profile(Pane::Style, "", short_profile(), Arc::new(client));

    controller.notify_change("body { margin: 0 }");
    tokio::time::sleep(Duration::from_millis(200)).await;

    controller.notify_change("body { margin: 0 }");
    tokio::time::sleep(Duration::from_millis(200)).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "second identical flush must be suppressed");
}

#[tokio::test]
async fn panes_write_to_their_own_endpoints() {
    let server = pen_server().await;
    let base = Url::parse(&format!("{}/pens/7", server.uri())).unwrap();

    for (pane, text) in [
        (Pane::Head, "<title>t</title>"),
        (Pane::Body, "<p>b</p>"),
        (Pane::Style, "p { }"),
        (Pane::Script, "console.log(1)"),
    ] {
        let client = Arc::new(PersistClient::new(base.clone()).unwrap());
        let controller = PaneController::with_profile(pane, "", short_profile(), client);
        controller.notify_change(text);
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    let requests = server.received_requests().await.unwrap();
    let mut paths: Vec<String> = requests.iter().map(|r| r.url.path().to_string()).collect();
    paths.sort();
    assert_eq!(
        paths,
        vec!["/pens/7/body", "/pens/7/css", "/pens/7/head", "/pens/7/js"]
    );
}

#[tokio::test]
async fn write_failure_does_not_stop_later_writes() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/pens/7/js"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client =
        PersistClient::new(Url::parse(&format!("{}/pens/7", server.uri())).unwrap()).unwrap();
    let controller =
        PaneController::with_profile(Pane::Script, "", short_profile(), Arc::new(client));

    controller.notify_change("let x = 1");
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.notify_change("let x = 2");
    tokio::time::sleep(Duration::from_millis(200)).await;

    // No retry, but the next differing edit writes again.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}
