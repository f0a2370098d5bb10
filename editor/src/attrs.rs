//! Attribute indexer — id/class extraction for cross-pane autocomplete.
//!
//! A textual scan, not a parse: it only feeds suggestion lists, never
//! correctness-critical state. The trait seam exists so a real parse-tree
//! walk can replace the regex without touching callers.

use std::collections::BTreeSet;

use regex::Regex;

/// Extracts identifier-bearing attribute values from markup.
pub trait AttributeScanner: Send + Sync {
    /// Collects every token of every `key="value"` occurrence in `text`.
    ///
    /// Values may contain space-separated tokens; each token is added
    /// individually. Pure function over the snapshot — recomputed on
    /// demand, never incrementally maintained.
    fn scan(&self, text: &str, key: &str) -> BTreeSet<String>;
}

/// Regex-backed scanner matching `key="value"` occurrences.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexScanner;

impl AttributeScanner for RegexScanner {
    fn scan(&self, text: &str, key: &str) -> BTreeSet<String> {
        let pattern = format!(r#"{}="(?<value>.*?)""#, regex::escape(key));
        let Ok(regex) = Regex::new(&pattern) else {
            tracing::debug!(key, "attribute pattern failed to compile");
            return BTreeSet::new();
        };

        let mut tokens = BTreeSet::new();
        for capture in regex.captures_iter(text) {
            let value = &capture["value"];
            for token in value.split(' ').filter(|t| !t.is_empty()) {
                tokens.insert(token.to_string());
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str, key: &str) -> BTreeSet<String> {
        RegexScanner.scan(text, key)
    }

    fn set(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn multi_token_values_are_split() {
        let found = scan(r#"<div id="foo bar"></div><span id="baz"></span>"#, "id");
        assert_eq!(found, set(&["foo", "bar", "baz"]));
    }

    #[test]
    fn class_scan_is_independent_of_id_scan() {
        let text = r#"<div id="a" class="b c"></div>"#;
        assert_eq!(scan(text, "id"), set(&["a"]));
        assert_eq!(scan(text, "class"), set(&["b", "c"]));
    }

    #[test]
    fn duplicates_collapse() {
        let found = scan(r#"<p class="note"></p><p class="note"></p>"#, "class");
        assert_eq!(found, set(&["note"]));
    }

    #[test]
    fn empty_values_yield_nothing() {
        assert!(scan(r#"<div id=""></div>"#, "id").is_empty());
        assert!(scan("<div></div>", "id").is_empty());
    }

    #[test]
    fn scan_spans_multiple_lines() {
        let text = "<div id=\"first\">\n  <div id=\"second\">\n</div>";
        assert_eq!(scan(text, "id"), set(&["first", "second"]));
    }

    #[test]
    fn scan_is_textual_not_structural() {
        // A plain text scan also sees data-id="x". Acceptable for
        // autocomplete suggestions; the trait seam exists for callers
        // that ever need a real parse.
        let found = scan(r#"<div data-id="x" id="y"></div>"#, "id");
        assert!(found.contains("y"));
        assert!(found.contains("x"));
    }
}
