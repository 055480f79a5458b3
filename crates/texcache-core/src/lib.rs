//! # texcache Core
//!
//! Resolution and caching services behind the texcache package proxy.
//!
//! ## Overview
//!
//! Given an arbitrary LaTeX package name, the proxy resolves the CTAN package
//! that ships it, downloads an archive through an ordered fallback chain,
//! decodes it into an installable file set and caches the result. A second,
//! simpler pipeline passes raw TeX Live archives through unchanged.
//!
//! ## Modules
//!
//! - [`config`] - Immutable [`ProxyConfig`] built once at startup
//! - [`request`] - Package-name validation ([`PackageRequest`])
//! - [`resolver`] - Registry lookups, bootstrap aliases and parent-package redirection
//! - [`fetch`] - The [`Fetcher`] abstraction over upstream HTTP
//! - [`chain`] - The archive fallback chain
//! - [`cache`] - Object store, edge cache and detached background writes
//! - [`pipeline`] - The [`PackageProxy`] facade tying everything together
//! - [`passthrough`] - Raw TeX Live archives, cached but never decoded
//! - [`objects`] - Stored binary objects and their compressed siblings
//!
//! ## Architecture
//!
//! ```text
//! PackageProxy ──► ObjectStore (hit? done)
//!      │
//!      ├──► MetadataResolver ──► Fetcher (registry)
//!      ├──► FallbackChain    ──► Fetcher (mirror)
//!      ├──► ArchiveDecoder   (texcache-package)
//!      └──► ObjectStore (write)
//! ```
//!
//! All upstream access goes through `Arc<dyn Fetcher>` and all persistence
//! through `Arc<dyn ObjectStore>`, so every pipeline runs against in-memory
//! doubles in tests.

pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod fetch;
pub mod objects;
pub mod passthrough;
pub mod pipeline;
pub mod request;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use cache::{BackgroundTasks, CacheStatus, EdgeCache, EdgeRecord, ObjectStore, PayloadClass};
pub use chain::{FallbackChain, FallbackStage};
pub use config::ProxyConfig;
pub use error::{ProxyError, ProxyResult};
pub use fetch::{Fetcher, HttpFetcher, UpstreamResponse};
pub use objects::BinaryObject;
pub use passthrough::{RawArchive, RAW_ARCHIVE_CONTENT_TYPE};
pub use pipeline::{PackageProxy, ProcessedPackage, RegistryInfo};
pub use request::PackageRequest;
pub use resolver::{AliasTable, MetadataResolver, PackageMetadata, Resolution};
