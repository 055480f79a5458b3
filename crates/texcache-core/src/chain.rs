//! The archive fallback chain.
//!
//! [`plan`] turns a [`Resolution`] into the ordered list of archive URLs to try;
//! [`FallbackChain::run`] walks it sequentially and stops at the first source
//! that answers with a success status. Upstream failures are logged and
//! swallowed; only exhaustion is reported, as `None`.

use crate::config::ProxyConfig;
use crate::fetch::Fetcher;
use crate::resolver::Resolution;
use bytes::Bytes;
use log::{info, warn};
use std::sync::Arc;

/// Content path assumed for packages the registry could not place.
pub const GUESSED_CONTENT_ROOT: &str = "/macros/latex/contrib";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackStage {
    /// TDS archive named by the registry's install path.
    TdsInstall,
    /// `<content path>.tds.zip` when no install path is known.
    TdsContent,
    /// `<content path>.tds.zip` after the install path failed.
    TdsAlternate,
    /// Plain `<content path>.zip`.
    SourceZip,
}

impl FallbackStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackStage::TdsInstall => "tds-install",
            FallbackStage::TdsContent => "tds-content",
            FallbackStage::TdsAlternate => "tds-alternate",
            FallbackStage::SourceZip => "source-zip",
        }
    }
}

impl std::fmt::Display for FallbackStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub stage: FallbackStage,
    pub url: String,
}

/// The ordered attempts for `resolution`.
pub fn plan(resolution: &Resolution, config: &ProxyConfig) -> Vec<Attempt> {
    let mut attempts = Vec::with_capacity(3);
    let content_path = resolution.ctan_path.as_deref().map(|p| p.trim_end_matches('/'));

    match (resolution.install_path.as_deref(), content_path) {
        (Some(install), content) => {
            attempts.push(Attempt {
                stage: FallbackStage::TdsInstall,
                url: config.mirror_url(&format!("/install{}", with_leading_slash(install))),
            });
            if let Some(content) = content {
                attempts.push(Attempt {
                    stage: FallbackStage::TdsAlternate,
                    url: config.mirror_url(&format!("{}.tds.zip", content)),
                });
            }
        }
        (None, Some(content)) => attempts.push(Attempt {
            stage: FallbackStage::TdsContent,
            url: config.mirror_url(&format!("{}.tds.zip", content)),
        }),
        (None, None) => {}
    }

    match content_path {
        Some(content) => attempts.push(Attempt {
            stage: FallbackStage::SourceZip,
            url: config.mirror_url(&format!("{}.zip", content)),
        }),
        None if resolution.install_path.is_none() => attempts.push(Attempt {
            stage: FallbackStage::SourceZip,
            url: config.mirror_url(&format!(
                "{}/{}.zip",
                GUESSED_CONTENT_ROOT, resolution.parent_name
            )),
        }),
        None => {}
    }

    attempts
}

fn with_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// An archive one of the stages produced.
#[derive(Debug, Clone)]
pub struct ArchiveHit {
    pub stage: FallbackStage,
    pub url: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct FallbackChain {
    config: Arc<ProxyConfig>,
    fetcher: Arc<dyn Fetcher>,
}

impl FallbackChain {
    pub fn new(config: Arc<ProxyConfig>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Tries every planned source in order; `None` once all have failed.
    pub async fn run(&self, resolution: &Resolution) -> Option<ArchiveHit> {
        for attempt in plan(resolution, &self.config) {
            info!(
                "[{}] {} trying {}",
                resolution.request_name, attempt.stage, attempt.url
            );
            match self.fetcher.fetch(&attempt.url).await {
                Ok(response) if response.is_success() => {
                    info!(
                        "[{}] {} succeeded ({} bytes)",
                        resolution.request_name,
                        attempt.stage,
                        response.body.len()
                    );
                    return Some(ArchiveHit {
                        stage: attempt.stage,
                        url: attempt.url,
                        bytes: response.body,
                    });
                }
                Ok(response) => warn!(
                    "[{}] {} returned HTTP {}",
                    resolution.request_name, attempt.stage, response.status
                ),
                Err(e) => warn!(
                    "[{}] {} failed: {:#}",
                    resolution.request_name, attempt.stage, e
                ),
            }
        }
        warn!("[{}] all archive sources exhausted", resolution.request_name);
        None
    }
}
