//! Package-name to CTAN location resolution.
//!
//! ## Overview
//!
//! The registry indexes packages by their CTAN name, which is not always the
//! name a document loads (`\usepackage{tikz}` is shipped by `pgf`). Resolution
//! therefore runs in three steps:
//!
//! 1. Translate the name through the bootstrap [`AliasTable`].
//! 2. Look the canonical name up in the registry and read its install path
//!    and content path.
//! 3. If the record says the package is contained in another one, look the
//!    parent up and fetch its archive instead.
//!
//! A failed lookup never aborts: the [`Resolution`] simply carries no paths
//! and the fallback chain guesses from the bare name.

use crate::config::ProxyConfig;
use crate::fetch::Fetcher;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Bootstrap alias table.
pub mod aliases;

pub use aliases::AliasTable;

/// What the registry knows about one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageMetadata {
    pub name: String,
    /// Path of a ready-made TDS archive below the mirror's `install` tree.
    pub install_path: Option<String>,
    /// Path of the package's directory on the mirror.
    pub ctan_path: Option<String>,
    /// Parent distribution package, when this one is bundled.
    pub contained_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryRecord {
    install: Option<String>,
    ctan: Option<CtanLocation>,
    #[serde(rename = "containedIn", alias = "contained_in")]
    contained_in: Option<String>,
    errors: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CtanLocation {
    path: Option<String>,
}

impl RegistryRecord {
    fn into_metadata(self, name: &str) -> Option<PackageMetadata> {
        if self.errors.is_some() || self.error.is_some() {
            return None;
        }
        let metadata = PackageMetadata {
            name: name.to_string(),
            install_path: non_empty(self.install),
            ctan_path: non_empty(self.ctan.and_then(|c| c.path)),
            contained_in: non_empty(self.contained_in),
        };
        let usable = metadata.install_path.is_some()
            || metadata.ctan_path.is_some()
            || metadata.contained_in.is_some();
        usable.then_some(metadata)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Where the fallback chain should look for a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The (normalized) name the client asked for.
    pub request_name: String,
    /// The package whose archive is fetched.
    pub parent_name: String,
    pub install_path: Option<String>,
    pub ctan_path: Option<String>,
    /// Whether the registry answered at all.
    pub from_registry: bool,
}

impl Resolution {
    /// Resolution used when the registry could not help.
    pub fn unresolved(name: &str) -> Self {
        Self {
            request_name: name.to_string(),
            parent_name: name.to_string(),
            install_path: None,
            ctan_path: None,
            from_registry: false,
        }
    }
}

/// Registry client applying aliases and parent redirection.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    config: Arc<ProxyConfig>,
    fetcher: Arc<dyn Fetcher>,
}

impl MetadataResolver {
    pub fn new(config: Arc<ProxyConfig>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Queries the registry for exactly `name`; `None` on any failure.
    pub async fn lookup(&self, name: &str) -> Option<PackageMetadata> {
        let url = self.config.registry_url(name);
        let response = match self.fetcher.fetch(&url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Registry lookup for {} failed: {:#}", name, e);
                return None;
            }
        };
        if !response.is_success() {
            warn!("Registry lookup for {} returned HTTP {}", name, response.status);
            return None;
        }
        match serde_json::from_slice::<RegistryRecord>(&response.body) {
            Ok(record) => {
                let metadata = record.into_metadata(name);
                if metadata.is_none() {
                    warn!("Registry has no usable record for {}", name);
                }
                metadata
            }
            Err(e) => {
                warn!("Registry payload for {} is not valid JSON: {}", name, e);
                None
            }
        }
    }

    /// Canonical name (after aliasing) and its registry record.
    pub async fn metadata(&self, name: &str) -> (String, Option<PackageMetadata>) {
        let canonical = self.config.aliases.resolve(name).to_string();
        if canonical != name {
            debug!("Alias {} -> {}", name, canonical);
        }
        let metadata = self.lookup(&canonical).await;
        (canonical, metadata)
    }

    /// Resolves `name` to the archive locations the fallback chain should try.
    pub async fn resolve(&self, name: &str) -> Resolution {
        let (canonical, metadata) = self.metadata(name).await;
        let Some(metadata) = metadata else {
            return Resolution::unresolved(name);
        };

        if let Some(parent) = metadata
            .contained_in
            .as_deref()
            .filter(|parent| *parent != canonical)
        {
            match self.lookup(parent).await {
                Some(parent_meta)
                    if parent_meta.install_path.is_some() || parent_meta.ctan_path.is_some() =>
                {
                    info!("{} is contained in {}, fetching the parent", canonical, parent);
                    return Resolution {
                        request_name: name.to_string(),
                        parent_name: parent.to_string(),
                        install_path: parent_meta.install_path,
                        ctan_path: parent_meta.ctan_path,
                        from_registry: true,
                    };
                }
                _ => warn!("Parent {} of {} did not resolve, using own paths", parent, canonical),
            }
        }

        Resolution {
            request_name: name.to_string(),
            parent_name: canonical,
            install_path: metadata.install_path,
            ctan_path: metadata.ctan_path,
            from_registry: true,
        }
    }
}
