//! Process-wide configuration.
//!
//! [`ProxyConfig`] is constructed once at startup and shared behind an `Arc`.
//! Nothing mutates it afterwards; the alias table and cache version live here
//! rather than in globals.

use crate::resolver::AliasTable;
use std::time::Duration;

/// Epoch segment of processed-cache keys (`ctan-cache/<version>/<name>.json`).
///
/// Bumping it orphans every previously cached layout.
pub const CACHE_VERSION: &str = "v7";

/// [`texcache_package::rules_fingerprint`] at the time [`CACHE_VERSION`] was cut.
///
/// When the classifier rules change, bump the version and update this pin.
pub const CACHE_VERSION_RULES_FINGERPRINT: &str =
    "581669d615dbdd286a01950f2b5d2ef2c10f64173d6bc05dd0fb19ea029d68fa";

pub const DEFAULT_REGISTRY_BASE: &str = "https://ctan.org/json/2.0/pkg/";
pub const DEFAULT_MIRROR_BASE: &str = "https://mirrors.ctan.org";
pub const DEFAULT_TEXLIVE_BASE: &str =
    "https://ftp.math.utah.edu/pub/tex/historic/systems/texlive/2023/tlnet-final/archive/";
pub const DEFAULT_USER_AGENT: &str = concat!("texcache/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_EDGE_MAX_BYTES: usize = 256 * 1024 * 1024;

pub const PROCESSED_PREFIX: &str = "ctan-cache";
pub const RAW_ARCHIVE_PREFIX: &str = "texlive-cache";

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Registry endpoint; the package name is appended.
    pub registry_base: String,
    /// CTAN mirror root serving `install/...` and content paths.
    pub mirror_base: String,
    /// Pinned TeX Live archive directory for the raw passthrough.
    pub texlive_base: String,
    pub cache_version: String,
    pub user_agent: String,
    pub aliases: AliasTable,
    /// Hostname of the binary-object service, if deployed on its own host.
    pub binary_host: Option<String>,
    /// Hostname of the processed-package service, if deployed on its own host.
    pub package_host: Option<String>,
    /// Freshness of JSON payloads.
    pub json_max_age: Duration,
    /// Freshness of binary payloads; invalidation relies on the version parameter.
    pub binary_max_age: Duration,
    /// Byte budget of the in-process edge cache.
    pub edge_max_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            registry_base: DEFAULT_REGISTRY_BASE.to_string(),
            mirror_base: DEFAULT_MIRROR_BASE.to_string(),
            texlive_base: DEFAULT_TEXLIVE_BASE.to_string(),
            cache_version: CACHE_VERSION.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            aliases: AliasTable::bootstrap(),
            binary_host: None,
            package_host: None,
            json_max_age: Duration::from_secs(300),
            binary_max_age: Duration::from_secs(365 * 24 * 60 * 60),
            edge_max_bytes: DEFAULT_EDGE_MAX_BYTES,
        }
    }
}

impl ProxyConfig {
    /// Defaults overlaid with `TEXCACHE_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(v) = var("TEXCACHE_REGISTRY_BASE") {
            config.registry_base = v;
        }
        if let Some(v) = var("TEXCACHE_MIRROR_BASE") {
            config.mirror_base = v;
        }
        if let Some(v) = var("TEXCACHE_TEXLIVE_BASE") {
            config.texlive_base = v;
        }
        if let Some(v) = var("TEXCACHE_CACHE_VERSION") {
            config.cache_version = v;
        }
        if let Some(v) = var("TEXCACHE_EDGE_MAX_BYTES").and_then(|v| v.parse().ok()) {
            config.edge_max_bytes = v;
        }
        config.binary_host = var("TEXCACHE_BINARY_HOST");
        config.package_host = var("TEXCACHE_PACKAGE_HOST");
        config
    }

    pub fn with_cache_version(mut self, version: impl Into<String>) -> Self {
        self.cache_version = version.into();
        self
    }

    /// Object-store key of a processed package.
    pub fn processed_key(&self, name: &str) -> String {
        format!("{}/{}/{}.json", PROCESSED_PREFIX, self.cache_version, name)
    }

    /// Object-store key of a raw TeX Live archive.
    pub fn raw_archive_key(&self, name: &str) -> String {
        format!("{}/{}.tar.xz", RAW_ARCHIVE_PREFIX, name)
    }

    pub fn registry_url(&self, name: &str) -> String {
        format!("{}{}", self.registry_base, name)
    }

    pub fn texlive_url(&self, name: &str) -> String {
        format!("{}{}.tar.xz", self.texlive_base, name)
    }

    /// `mirror_base` joined with an absolute mirror path.
    pub fn mirror_url(&self, path: &str) -> String {
        let base = self.mirror_base.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Warns when the built-in cache version is served with classifier rules it was not cut for.
    pub fn rules_drift(&self) -> Option<String> {
        if self.cache_version != CACHE_VERSION {
            return None;
        }
        let current = texcache_package::rules_fingerprint();
        (current != CACHE_VERSION_RULES_FINGERPRINT).then(|| {
            format!(
                "classifier rules fingerprint {} does not match the one pinned for cache version {}",
                current, CACHE_VERSION
            )
        })
    }
}
