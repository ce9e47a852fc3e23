//! Artifact resolution
//!
//! Model artifacts live in a remote registry under
//! `https://huggingface.co/<model>/resolve/main/<path>`. The runtime never
//! performs network I/O itself; it hands canonical URLs to a caller-supplied
//! [`Fetch`] capability and gets back a local resource handle.

use crate::{Error, Result};

const REGISTRY_BASE: &str = "https://huggingface.co";

/// Canonical registry URL for a file inside a model repository
pub fn registry_url(model: &str, filepath: &str) -> String {
    format!("{REGISTRY_BASE}/{model}/resolve/main/{filepath}")
}

/// Capability resolving a remote URL to a local resource handle.
///
/// Implementations may download and cache, or pass the URL through to an
/// engine that streams remote artifacts itself. Any closure
/// `Fn(&str) -> Result<String>` works as a fetcher.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String>;
}

impl<F> Fetch for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn fetch(&self, url: &str) -> Result<String> {
        self(url)
    }
}

/// Identity fetcher: returns the URL unchanged, for engines that accept
/// remote URIs directly
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughFetcher;

impl Fetch for PassthroughFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        Ok(url.to_owned())
    }
}

/// Downloads registry artifacts into the local HuggingFace Hub cache and
/// returns their filesystem paths
pub struct HubFetcher {
    api: hf_hub::api::sync::Api,
}

impl HubFetcher {
    pub fn new() -> Result<Self> {
        let api = hf_hub::api::sync::Api::new().map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { api })
    }
}

impl Fetch for HubFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let (model, filepath) = parse_registry_url(url)
            .ok_or_else(|| Error::Fetch(format!("unrecognized registry url: {url}")))?;
        let repo = self.api.model(model.to_owned());
        let path = repo
            .get(filepath)
            .map_err(|e| Error::Fetch(e.to_string()))?;
        path.into_os_string()
            .into_string()
            .map_err(|p| Error::Fetch(format!("non-utf8 cache path: {p:?}")))
    }
}

/// Split a canonical registry URL back into `(model, filepath)`
fn parse_registry_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix(REGISTRY_BASE)?.strip_prefix('/')?;
    rest.split_once("/resolve/main/")
}
