//! The two cache planes.
//!
//! - **Object store** ([`ObjectStore`]): durable, explicitly keyed. Holds
//!   processed packages under `ctan-cache/<version>/<name>.json`, raw archives
//!   under `texlive-cache/<name>.tar.xz` and the binary bundles the engine
//!   loads.
//! - **Edge cache** ([`EdgeCache`]): short-lived, keyed by request URL plus a
//!   version parameter, written back off the response path through
//!   [`BackgroundTasks`].
//!
//! Neither plane is locked across requests. Two concurrent misses for the
//! same key both resolve and both write; the later write wins, which is
//! harmless because the payload is derived deterministically.

use crate::config::ProxyConfig;
use std::time::Duration;

pub mod edge;
pub mod store;
pub mod tasks;

pub use edge::{EdgeCache, EdgeRecord};
pub use store::{FsObjectStore, MemoryObjectStore, ObjectStore};
pub use tasks::BackgroundTasks;

/// Whether a payload came from a cache plane or was produced fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Freshness class of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadClass {
    /// Manifests and metadata; short-lived so registry changes show up quickly.
    Json,
    /// Archives and engine assets; effectively immutable.
    Binary,
}

impl PayloadClass {
    pub fn max_age(&self, config: &ProxyConfig) -> Duration {
        match self {
            PayloadClass::Json => config.json_max_age,
            PayloadClass::Binary => config.binary_max_age,
        }
    }

    pub fn cache_control(&self, config: &ProxyConfig) -> String {
        match self {
            PayloadClass::Json => format!("public, max-age={}", config.json_max_age.as_secs()),
            PayloadClass::Binary => format!(
                "public, max-age={}, immutable",
                config.binary_max_age.as_secs()
            ),
        }
    }
}
