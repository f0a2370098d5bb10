//! Session configuration.
//!
//! The raw form is plain serde data as the host page delivers it; parsing
//! it into [`SessionConfig`] validates the URLs once, so everything past
//! construction works with typed values.

use std::collections::BTreeMap;
use std::time::Duration;

use inkpad_types::{DebounceProfile, Pane};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Default declaration registry.
const DEFAULT_REGISTRY: &str = "https://cdn.jsdelivr.net";

/// Invalid session configuration.
#[derive(Debug, Error)]
pub enum SessionConfigError {
    /// The configuration isn't valid JSON.
    #[error("malformed session config: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A URL field didn't parse.
    #[error("invalid {field} URL {value:?}: {source}")]
    BadUrl {
        /// Which field.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Parse failure.
        source: url::ParseError,
    },
    /// A URL parsed but cannot carry appended path segments.
    #[error("{field} URL cannot be a base: {url}")]
    OpaqueUrl {
        /// Which field.
        field: &'static str,
        /// Offending URL.
        url: Url,
    },
    /// A debounce override with a zero buffer can never flush by count.
    #[error("debounce override for {pane} has a zero max_buffer")]
    ZeroBuffer {
        /// Offending pane.
        pane: Pane,
    },
}

#[derive(Debug, Deserialize)]
struct RawSessionConfig {
    persist_base: String,
    #[serde(default)]
    registry_base: Option<String>,
    #[serde(default)]
    entry_path: Option<String>,
    #[serde(default)]
    base_libs: Vec<String>,
    #[serde(default)]
    debounce_overrides: BTreeMap<Pane, RawProfile>,
    #[serde(default)]
    initial: InitialTexts,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    delay_ms: u64,
    max_buffer: usize,
}

/// Server-provided initial text of each pane.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitialTexts {
    /// Head markup.
    #[serde(default)]
    pub head: String,
    /// Body markup.
    #[serde(default)]
    pub body: String,
    /// Stylesheet.
    #[serde(default)]
    pub style: String,
    /// Script.
    #[serde(default)]
    pub script: String,
}

impl InitialTexts {
    /// Initial text for one pane.
    #[must_use]
    pub fn for_pane(&self, pane: Pane) -> &str {
        match pane {
            Pane::Head => &self.head,
            Pane::Body => &self.body,
            Pane::Style => &self.style,
            Pane::Script => &self.script,
        }
    }
}

/// Validated session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Document base URL; pane segments are appended for writes.
    pub persist_base: Url,
    /// Declaration registry base URL.
    pub registry_base: Url,
    /// Path of the primary script file inside the worker.
    pub entry_path: String,
    /// Registry paths of base libraries fetched at worker initialize.
    pub base_libs: Vec<String>,
    /// Per-pane coalescing overrides; defaults apply elsewhere.
    pub debounce_overrides: BTreeMap<Pane, DebounceProfile>,
    /// Server-provided initial pane texts.
    pub initial: InitialTexts,
}

impl SessionConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, SessionConfigError> {
        let raw: RawSessionConfig = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// A config with defaults for everything but the persistence base.
    pub fn for_document(persist_base: Url) -> Result<Self, SessionConfigError> {
        validate_base("persist_base", &persist_base)?;
        Ok(Self {
            persist_base,
            registry_base: Url::parse(DEFAULT_REGISTRY).expect("default registry URL"),
            entry_path: inkpad_lang::worker::DEFAULT_ENTRY_PATH.to_string(),
            base_libs: Vec::new(),
            debounce_overrides: BTreeMap::new(),
            initial: InitialTexts::default(),
        })
    }

    fn from_raw(raw: RawSessionConfig) -> Result<Self, SessionConfigError> {
        let persist_base = parse_base("persist_base", &raw.persist_base)?;
        let registry_base = match raw.registry_base {
            Some(value) => parse_base("registry_base", &value)?,
            None => Url::parse(DEFAULT_REGISTRY).expect("default registry URL"),
        };

        let mut debounce_overrides = BTreeMap::new();
        for (pane, profile) in raw.debounce_overrides {
            if profile.max_buffer == 0 {
                return Err(SessionConfigError::ZeroBuffer { pane });
            }
            debounce_overrides.insert(
                pane,
                DebounceProfile {
                    delay: Duration::from_millis(profile.delay_ms),
                    max_buffer: profile.max_buffer,
                },
            );
        }

        Ok(Self {
            persist_base,
            registry_base,
            entry_path: raw
                .entry_path
                .unwrap_or_else(|| inkpad_lang::worker::DEFAULT_ENTRY_PATH.to_string()),
            base_libs: raw.base_libs,
            debounce_overrides,
            initial: raw.initial,
        })
    }

    /// Effective coalescing profile for `pane`.
    #[must_use]
    pub fn profile(&self, pane: Pane) -> DebounceProfile {
        self.debounce_overrides
            .get(&pane)
            .copied()
            .unwrap_or_else(|| pane.debounce_profile())
    }
}

fn parse_base(field: &'static str, value: &str) -> Result<Url, SessionConfigError> {
    let url = Url::parse(value).map_err(|source| SessionConfigError::BadUrl {
        field,
        value: value.to_string(),
        source,
    })?;
    validate_base(field, &url)?;
    Ok(url)
}

fn validate_base(field: &'static str, url: &Url) -> Result<(), SessionConfigError> {
    if url.cannot_be_a_base() {
        return Err(SessionConfigError::OpaqueUrl {
            field,
            url: url.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config =
            SessionConfig::from_json(r#"{ "persist_base": "http://localhost:4000/pens/7" }"#)
                .unwrap();
        assert_eq!(config.registry_base.as_str(), "https://cdn.jsdelivr.net/");
        assert_eq!(config.entry_path, "script.js");
        assert!(config.base_libs.is_empty());
        assert_eq!(config.profile(Pane::Script), Pane::Script.debounce_profile());
    }

    #[test]
    fn overrides_replace_pane_defaults() {
        let config = SessionConfig::from_json(
            r#"{
                "persist_base": "http://localhost:4000/pens/7",
                "debounce_overrides": { "script": { "delay_ms": 50, "max_buffer": 2 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.profile(Pane::Script).delay, Duration::from_millis(50));
        assert_eq!(config.profile(Pane::Script).max_buffer, 2);
        assert_eq!(config.profile(Pane::Body), Pane::Body.debounce_profile());
    }

    #[test]
    fn initial_texts_are_carried() {
        let config = SessionConfig::from_json(
            r#"{
                "persist_base": "http://localhost:4000/pens/7",
                "initial": { "body": "<p>hi</p>", "script": "const x = 1" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.initial.for_pane(Pane::Body), "<p>hi</p>");
        assert_eq!(config.initial.for_pane(Pane::Script), "const x = 1");
        assert_eq!(config.initial.for_pane(Pane::Head), "");
    }

    #[test]
    fn bad_urls_are_rejected() {
        assert!(matches!(
            SessionConfig::from_json(r#"{ "persist_base": "not a url" }"#),
            Err(SessionConfigError::BadUrl { field: "persist_base", .. })
        ));
        assert!(matches!(
            SessionConfig::from_json(
                r#"{ "persist_base": "http://x/", "registry_base": "mailto:a@b.c" }"#
            ),
            Err(SessionConfigError::OpaqueUrl { field: "registry_base", .. })
        ));
    }

    #[test]
    fn zero_buffer_override_is_rejected() {
        let result = SessionConfig::from_json(
            r#"{
                "persist_base": "http://x/",
                "debounce_overrides": { "body": { "delay_ms": 10, "max_buffer": 0 } }
            }"#,
        );
        assert!(matches!(
            result,
            Err(SessionConfigError::ZeroBuffer { pane: Pane::Body })
        ));
    }
}
