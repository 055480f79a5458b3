//! The processed-package pipeline.
//!
//! [`PackageProxy`] is the facade the HTTP layer and the CLI talk to. For a
//! processed request it runs:
//!
//! ```text
//! validate ─► object store ──hit──► payload (X-Cache: HIT)
//!                  │ miss
//!                  ▼
//!            MetadataResolver ─► FallbackChain ─► ArchiveDecoder ─► object store write
//! ```
//!
//! Validation happens before any I/O, so malformed names never cost a
//! network round trip.

use crate::cache::{CacheStatus, ObjectStore};
use crate::chain::{FallbackChain, FallbackStage};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::fetch::Fetcher;
use crate::objects::{self, BinaryObject};
use crate::request::PackageRequest;
use crate::resolver::MetadataResolver;
use anyhow::anyhow;
use bytes::Bytes;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use texcache_package::ArchiveDecoder;

/// Result of a processed-package request.
#[derive(Debug, Clone)]
pub struct ProcessedPackage {
    /// Serialized `ExtractedFileSet`.
    pub payload: Bytes,
    pub cache: CacheStatus,
    /// The fallback stage that produced the archive; `None` on a cache hit.
    pub stage: Option<FallbackStage>,
}

/// Registry view returned by the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryInfo {
    pub name: String,
    pub contained_in: Option<String>,
    pub ctan_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PackageProxy {
    config: Arc<ProxyConfig>,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ObjectStore>,
    decoder: Arc<ArchiveDecoder>,
}

impl PackageProxy {
    pub fn new(
        config: Arc<ProxyConfig>,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self::with_decoder(config, fetcher, store, ArchiveDecoder::new())
    }

    /// Uses a decoder with custom classification or scanning strategies.
    pub fn with_decoder(
        config: Arc<ProxyConfig>,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ObjectStore>,
        decoder: ArchiveDecoder,
    ) -> Self {
        Self {
            config,
            fetcher,
            store,
            decoder: Arc::new(decoder),
        }
    }

    pub fn config(&self) -> &Arc<ProxyConfig> {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub(crate) fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn resolver(&self) -> MetadataResolver {
        MetadataResolver::new(self.config.clone(), self.fetcher.clone())
    }

    pub fn chain(&self) -> FallbackChain {
        FallbackChain::new(self.config.clone(), self.fetcher.clone())
    }

    /// Reads a cache entry, treating store failures as misses.
    pub(crate) async fn cached(&self, key: &str) -> Option<Bytes> {
        match self.store.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Object store read of {} failed: {:#}", key, e);
                None
            }
        }
    }

    /// Writes a cache entry; failure only costs a future miss.
    pub(crate) async fn remember(&self, key: &str, value: Bytes) {
        if let Err(e) = self.store.put(key, value).await {
            warn!("Object store write of {} failed: {:#}", key, e);
        }
    }

    /// Resolves, fetches and decodes a package, read-through the object store.
    pub async fn processed(&self, raw_name: &str) -> ProxyResult<ProcessedPackage> {
        let request = PackageRequest::parse(raw_name)?;
        if request.requested_name != request.normalized_name {
            debug!(
                "[{}] requested as '{}'",
                request.normalized_name, request.requested_name
            );
        }
        let name = request.normalized_name;
        let key = self.config.processed_key(&name);

        if let Some(payload) = self.cached(&key).await {
            info!("[{}] object store hit ({})", name, key);
            return Ok(ProcessedPackage {
                payload,
                cache: CacheStatus::Hit,
                stage: None,
            });
        }

        let resolution = self.resolver().resolve(&name).await;
        let hit = self.chain().run(&resolution).await.ok_or_else(|| {
            ProxyError::NotFound(format!("Package '{}' not found on CTAN", name))
        })?;

        let decoder = self.decoder.clone();
        let parent = resolution.parent_name.clone();
        let archive = hit.bytes.clone();
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&archive, &parent))
            .await
            .map_err(|e| anyhow!("decoder task failed: {}", e))??;

        let Some(mut files) = decoded else {
            return Err(ProxyError::NotFound(format!(
                "Package '{}' has no installable files",
                name
            )));
        };
        files.name = name.clone();
        files.dependencies.remove(&name);

        let payload = Bytes::from(files.to_json_bytes()?);
        self.remember(&key, payload.clone()).await;
        info!(
            "[{}] resolved via {} from {} ({} files, {} dependencies)",
            name,
            hit.stage,
            hit.url,
            files.total_files,
            files.dependencies.len()
        );

        Ok(ProcessedPackage {
            payload,
            cache: CacheStatus::Miss,
            stage: Some(hit.stage),
        })
    }

    /// Registry metadata for a package, after alias translation.
    pub async fn registry_info(&self, raw_name: &str) -> ProxyResult<RegistryInfo> {
        let request = PackageRequest::parse(raw_name)?;
        let (_, metadata) = self.resolver().metadata(&request.normalized_name).await;
        let metadata = metadata.ok_or_else(|| {
            ProxyError::NotFound(format!(
                "Package '{}' not found in registry",
                request.normalized_name
            ))
        })?;
        Ok(RegistryInfo {
            name: metadata.name,
            contained_in: metadata.contained_in,
            ctan_path: metadata.ctan_path,
        })
    }

    /// A stored binary object, see [`objects::load_binary`].
    pub async fn binary_object(&self, key: &str) -> ProxyResult<Option<BinaryObject>> {
        objects::load_binary(self.store.as_ref(), key).await
    }

    pub async fn xzwasm(&self) -> ProxyResult<Option<BinaryObject>> {
        objects::load_xzwasm(self.store.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryObjectStore;
    use crate::testing::{build_zip, StubFetcher};
    use texcache_package::{ExtractedFileSet, FileEncoding};

    const REGISTRY: &str = "https://ctan.org/json/2.0/pkg/";
    const MIRROR: &str = "https://mirrors.ctan.org";

    fn bar_fetcher() -> StubFetcher {
        let tds = build_zip(&[
            (
                "tex/latex/bar/bar.sty",
                br"\RequirePackage[options]{amsmath,graphicx}\RequirePackage{bar}".as_slice(),
            ),
            ("fonts/type1/public/bar/bar.pfb", [0x80u8, 0x01, 0xff].as_slice()),
            ("doc/latex/bar/bar.pdf", b"%PDF".as_slice()),
        ]);
        StubFetcher::new()
            .respond(
                &format!("{}bar", REGISTRY),
                200,
                r#"{"ctan":{"path":"/macros/latex/contrib/bar"},"install":"/macros/latex/contrib/bar.tds.zip"}"#,
            )
            .respond(
                &format!("{}/install/macros/latex/contrib/bar.tds.zip", MIRROR),
                200,
                tds,
            )
    }

    fn proxy(fetcher: Arc<StubFetcher>, store: Arc<MemoryObjectStore>, version: &str) -> PackageProxy {
        PackageProxy::new(
            Arc::new(ProxyConfig::default().with_cache_version(version)),
            fetcher,
            store,
        )
    }

    #[tokio::test]
    async fn test_processed_miss_then_hit() {
        let fetcher = Arc::new(bar_fetcher());
        let store = Arc::new(MemoryObjectStore::new());
        let proxy = proxy(fetcher.clone(), store.clone(), "v1");

        let first = proxy.processed("bar").await.unwrap();
        assert_eq!(first.cache, CacheStatus::Miss);
        assert_eq!(first.stage, Some(FallbackStage::TdsInstall));
        let upstream_calls = fetcher.requests().len();

        let second = proxy.processed("bar").await.unwrap();
        assert_eq!(second.cache, CacheStatus::Hit);
        assert_eq!(second.stage, None);
        assert_eq!(second.payload, first.payload);
        assert_eq!(fetcher.requests().len(), upstream_calls);
        assert_eq!(store.keys(), vec!["ctan-cache/v1/bar.json".to_string()]);
    }

    #[tokio::test]
    async fn test_processed_payload_contents() {
        let proxy = proxy(Arc::new(bar_fetcher()), Arc::new(MemoryObjectStore::new()), "v1");
        let result = proxy.processed("Bar").await.unwrap();
        let files = ExtractedFileSet::from_json_bytes(&result.payload).unwrap();

        assert_eq!(files.name, "bar");
        assert_eq!(files.total_files, 2);
        assert_eq!(
            files.files["texlive-dist/tex/latex/bar/bar.sty"].encoding,
            FileEncoding::Text
        );
        assert_eq!(
            files.files["texlive-dist/fonts/type1/public/bar/bar.pfb"].decode().unwrap(),
            vec![0x80, 0x01, 0xff]
        );
        let deps: Vec<&str> = files.dependencies.iter().map(String::as_str).collect();
        assert_eq!(deps, vec!["amsmath", "graphicx"]);
    }

    #[tokio::test]
    async fn test_version_bump_misses_once() {
        let fetcher = Arc::new(bar_fetcher());
        let store = Arc::new(MemoryObjectStore::new());

        proxy(fetcher.clone(), store.clone(), "v1").processed("bar").await.unwrap();
        let bumped = proxy(fetcher.clone(), store.clone(), "v2");
        assert_eq!(bumped.processed("bar").await.unwrap().cache, CacheStatus::Miss);
        assert_eq!(bumped.processed("bar").await.unwrap().cache, CacheStatus::Hit);

        // The old entry is orphaned, not deleted.
        assert_eq!(
            store.keys(),
            vec!["ctan-cache/v1/bar.json".to_string(), "ctan-cache/v2/bar.json".to_string()]
        );
    }

    #[tokio::test]
    async fn test_invalid_name_never_touches_network() {
        let fetcher = Arc::new(bar_fetcher());
        let proxy = proxy(fetcher.clone(), Arc::new(MemoryObjectStore::new()), "v1");

        for bad in ["x", "bad.name", "a/b"] {
            assert!(matches!(proxy.processed(bad).await, Err(ProxyError::Validation(_))));
            assert!(matches!(proxy.registry_info(bad).await, Err(ProxyError::Validation(_))));
        }
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_docs_only_archive_is_not_found() {
        let docs = build_zip(&[
            ("doc/manual.pdf", b"%PDF".as_slice()),
            ("source/bar.dtx", b"%".as_slice()),
        ]);
        let fetcher = Arc::new(
            StubFetcher::new().respond(&format!("{}/macros/latex/contrib/bar.zip", MIRROR), 200, docs),
        );
        let store = Arc::new(MemoryObjectStore::new());
        let proxy = proxy(fetcher, store.clone(), "v1");

        assert!(matches!(proxy.processed("bar").await, Err(ProxyError::NotFound(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_not_found() {
        let proxy = proxy(Arc::new(StubFetcher::new()), Arc::new(MemoryObjectStore::new()), "v1");
        assert!(matches!(proxy.processed("nosuch").await, Err(ProxyError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_internal() {
        let fetcher = Arc::new(StubFetcher::new().respond(
            &format!("{}/macros/latex/contrib/bar.zip", MIRROR),
            200,
            "garbage",
        ));
        let proxy = proxy(fetcher, Arc::new(MemoryObjectStore::new()), "v1");
        assert!(matches!(proxy.processed("bar").await, Err(ProxyError::Internal(_))));
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests() {
        let fetcher = Arc::new(bar_fetcher());
        let store = Arc::new(MemoryObjectStore::new());
        let proxy = proxy(fetcher, store.clone(), "v1");

        let (a, b) = tokio::join!(proxy.processed("bar"), proxy.processed("bar"));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.payload, b.payload);

        let stored = store.get("ctan-cache/v1/bar.json").await.unwrap().unwrap();
        assert!(ExtractedFileSet::from_json_bytes(&stored).is_ok());
    }

    #[tokio::test]
    async fn test_registry_info() {
        let fetcher = Arc::new(StubFetcher::new().respond(
            &format!("{}pgf", REGISTRY),
            200,
            r#"{"ctan":{"path":"/graphics/pgf/base"}}"#,
        ));
        let proxy = proxy(fetcher, Arc::new(MemoryObjectStore::new()), "v1");

        let info = proxy.registry_info("tikz").await.unwrap();
        assert_eq!(info.name, "pgf");
        assert_eq!(info.ctan_path.as_deref(), Some("/graphics/pgf/base"));
        assert!(matches!(proxy.registry_info("nosuch").await, Err(ProxyError::NotFound(_))));
    }
}
