//! Raw TeX Live archive passthrough.
//!
//! Same name validation and object-store plane as the processed pipeline, but
//! the archive is stored and returned byte for byte. There is no fallback: an
//! upstream miss is a 404 and any other upstream failure is a 502.

use crate::cache::CacheStatus;
use crate::error::{ProxyError, ProxyResult};
use crate::pipeline::PackageProxy;
use crate::request::PackageRequest;
use bytes::Bytes;
use log::{info, warn};

pub const RAW_ARCHIVE_CONTENT_TYPE: &str = "application/x-xz";

#[derive(Debug, Clone)]
pub struct RawArchive {
    pub bytes: Bytes,
    pub cache: CacheStatus,
}

impl PackageProxy {
    /// `<texlive_base><name>.tar.xz`, read-through `texlive-cache/<name>.tar.xz`.
    pub async fn raw_archive(&self, raw_name: &str) -> ProxyResult<RawArchive> {
        let request = PackageRequest::parse(raw_name)?;
        let name = request.normalized_name;
        let key = self.config().raw_archive_key(&name);

        if let Some(bytes) = self.cached(&key).await {
            info!("[{}] raw archive hit ({} bytes)", name, bytes.len());
            return Ok(RawArchive {
                bytes,
                cache: CacheStatus::Hit,
            });
        }

        let url = self.config().texlive_url(&name);
        let response = self.fetcher().fetch(&url).await.map_err(|e| {
            warn!("[{}] raw archive fetch failed: {:#}", name, e);
            ProxyError::Upstream(format!("Failed to fetch archive for '{}'", name))
        })?;

        match response.status {
            status if (200..300).contains(&status) => {}
            404 => {
                return Err(ProxyError::NotFound(format!(
                    "Archive for '{}' not found",
                    name
                )))
            }
            status => {
                warn!("[{}] raw archive upstream returned HTTP {}", name, status);
                return Err(ProxyError::Upstream(format!(
                    "Upstream returned HTTP {} for '{}'",
                    status, name
                )));
            }
        }

        self.remember(&key, response.body.clone()).await;
        info!("[{}] raw archive fetched ({} bytes)", name, response.body.len());
        Ok(RawArchive {
            bytes: response.body,
            cache: CacheStatus::Miss,
        })
    }
}
