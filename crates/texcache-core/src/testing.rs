//! In-memory doubles shared by the unit tests.

use crate::fetch::{Fetcher, UpstreamResponse};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::Mutex;

/// Canned upstream: registered URLs answer as configured, failing URLs error,
/// everything else is a 404. Every requested URL is recorded.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<String, (u16, Bytes)>,
    failing: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, status: u16, body: impl Into<Bytes>) -> Self {
        self.responses.insert(url.to_string(), (status, body.into()));
        self
    }

    pub fn fail(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<UpstreamResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(anyhow!("connection reset: {}", url));
        }
        let (status, body) = self
            .responses
            .get(url)
            .cloned()
            .unwrap_or((404, Bytes::from_static(b"not found")));
        Ok(UpstreamResponse { status, body })
    }
}

pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
