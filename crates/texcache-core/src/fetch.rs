//! Upstream HTTP access.
//!
//! Every network read (registry lookups, mirror archives, TeX Live archives)
//! goes through the [`Fetcher`] trait so pipelines can be exercised without a
//! network. [`HttpFetcher`] is the production implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;

/// Status and body of an upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a plain GET against an upstream URL.
///
/// Non-success statuses are returned as responses; only transport failures
/// are errors. Callers decide what either means.
#[async_trait]
pub trait Fetcher: std::fmt::Debug + Send + Sync {
    async fn fetch(&self, url: &str) -> Result<UpstreamResponse>;
}

/// [`Fetcher`] backed by `reqwest`, sending a fixed `User-Agent` and following redirects.
///
/// No timeout is configured beyond the transport defaults.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<UpstreamResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(UpstreamResponse { status, body })
    }
}
