//! Declaration-registry client.
//!
//! Fetches type-declaration files and package manifests by conventional
//! path naming from a public CDN. Read-only, no auth; the base URL is
//! configurable so tests point it at a local mock.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

const DEFAULT_REGISTRY: &str = "https://cdn.jsdelivr.net";
const FETCH_TIMEOUT_SECS: u64 = 10;

/// Registry fetch failure for a single resource.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Transport-level failure.
    #[error("registry fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The registry answered, but not with the resource.
    #[error("registry returned {status} for {url}")]
    Status {
        /// Requested URL.
        url: Url,
        /// Response status.
        status: reqwest::StatusCode,
    },
    /// A manifest that isn't valid JSON.
    #[error("malformed package manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    /// The configured base URL cannot carry registry paths.
    #[error("registry base URL cannot be a base: {0}")]
    BadBase(Url),
}

/// The subset of a package manifest the acquisition walk reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    /// Declared package name.
    pub name: Option<String>,
    /// Declaration entry point (`types` field).
    pub types: Option<String>,
    /// Older alias for `types`.
    pub typings: Option<String>,
    /// Declared dependencies; `@types/*` entries drive the transitive walk.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Relative path of the declaration entry point.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        self.types
            .as_deref()
            .or(self.typings.as_deref())
            .map(|p| p.trim_start_matches("./"))
            .filter(|p| !p.is_empty())
            .unwrap_or("index.d.ts")
    }
}

/// HTTP client for a declaration registry.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    http: reqwest::Client,
    base: Url,
}

impl TypeRegistry {
    /// Client against an explicit base URL.
    pub fn new(base: Url) -> Result<Self, RegistryError> {
        if base.cannot_be_a_base() {
            return Err(RegistryError::BadBase(base));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, base })
    }

    /// Client against the public default registry.
    pub fn public() -> Result<Self, RegistryError> {
        let base = Url::parse(DEFAULT_REGISTRY).expect("default registry URL");
        Self::new(base)
    }

    fn npm_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("npm");
            segments.extend(path.split('/'));
        }
        url
    }

    async fn get_text(&self, path: &str) -> Result<String, RegistryError> {
        let url = self.npm_url(path);
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status { url, status });
        }
        Ok(response.text().await?)
    }

    /// Fetches `@types/<pkg>/package.json`, returning both the raw text
    /// (for insertion into the virtual file system) and the parsed form.
    pub async fn types_manifest(
        &self,
        types_pkg: &str,
    ) -> Result<(String, PackageManifest), RegistryError> {
        let raw = self
            .get_text(&format!("@types/{types_pkg}/package.json"))
            .await?;
        let manifest: PackageManifest = serde_json::from_str(&raw)?;
        Ok((raw, manifest))
    }

    /// Fetches a file from `@types/<pkg>/` by relative path.
    pub async fn types_file(&self, types_pkg: &str, rel: &str) -> Result<String, RegistryError> {
        self.get_text(&format!("@types/{types_pkg}/{rel}")).await
    }

    /// Fetches an arbitrary registry path (base library declarations).
    pub async fn raw_file(&self, path: &str) -> Result<String, RegistryError> {
        self.get_text(path).await
    }
}
