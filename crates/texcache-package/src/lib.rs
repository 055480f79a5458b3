//! # texcache-package
//!
//! Turns a raw CTAN archive into the flat, installable file set served to the
//! in-browser TeX engine.
//!
//! ## Overview
//!
//! A CTAN package arrives as a ZIP in one of two shapes: a TDS-structured
//! archive (`*.tds.zip`) whose paths already follow the TeX Directory Structure,
//! or a plain source ZIP laid out however the author liked. Both are decoded by
//! [`ArchiveDecoder`], which:
//!
//! - drops documentation and source-only trees (`doc/`, `source/`),
//! - places every TeX source and font file under `texlive-dist/` using a
//!   [`PathClassifier`],
//! - scans TeX sources for `\RequirePackage`/`\usepackage` edges using a
//!   [`DependencyScanner`].
//!
//! The result is an [`ExtractedFileSet`], which is what the proxy caches and
//! returns as JSON.
//!
//! ## Example
//!
//! ```
//! use texcache_package::scanner::{DependencyScanner, MacroDependencyScanner};
//!
//! let deps = MacroDependencyScanner.scan(r"\RequirePackage[x]{amsmath,graphicx}", "mypkg");
//! assert!(deps.contains("amsmath"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub mod archive;
pub mod classify;
pub mod scanner;

pub use archive::ArchiveDecoder;
pub use classify::{rules_fingerprint, PathClassifier, Placement, TdsClassifier};
pub use scanner::{DependencyScanner, MacroDependencyScanner};

/// How a file's content is carried inside the JSON payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEncoding {
    Text,
    Base64,
}

/// A single installable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFile {
    pub content: String,
    pub encoding: FileEncoding,
}

impl ExtractedFile {
    pub fn text(content: String) -> Self {
        Self {
            content,
            encoding: FileEncoding::Text,
        }
    }

    pub fn base64(bytes: &[u8]) -> Self {
        use base64::Engine;
        Self {
            content: base64::engine::general_purpose::STANDARD.encode(bytes),
            encoding: FileEncoding::Base64,
        }
    }

    /// Returns the raw bytes this entry stands for.
    pub fn decode(&self) -> anyhow::Result<Vec<u8>> {
        use base64::Engine;
        match self.encoding {
            FileEncoding::Text => Ok(self.content.as_bytes().to_vec()),
            FileEncoding::Base64 => Ok(base64::engine::general_purpose::STANDARD.decode(&self.content)?),
        }
    }
}

/// The decoded, reclassified contents of one package archive.
///
/// Paths are keyed in a `BTreeMap` and dependencies in a `BTreeSet` so two
/// decodes of the same archive serialize to identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFileSet {
    pub name: String,
    pub files: BTreeMap<String, ExtractedFile>,
    pub total_files: usize,
    pub dependencies: BTreeSet<String>,
}

impl ExtractedFileSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
            total_files: 0,
            dependencies: BTreeSet::new(),
        }
    }

    /// Adds a file unless the target path is already taken. Returns whether it was inserted.
    pub fn insert(&mut self, path: String, file: ExtractedFile) -> bool {
        if self.files.contains_key(&path) {
            log::debug!("Duplicate target {}, keeping first entry", path);
            return false;
        }
        self.files.insert(path, file);
        self.total_files = self.files.len();
        true
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn to_json_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_and_counts() {
        let mut set = ExtractedFileSet::new("bar");
        assert!(set.insert("a.sty".into(), ExtractedFile::text("one".into())));
        assert!(!set.insert("a.sty".into(), ExtractedFile::text("two".into())));
        assert_eq!(set.total_files, 1);
        assert_eq!(set.files["a.sty"].content, "one");
    }

    #[test]
    fn test_json_shape() {
        let mut set = ExtractedFileSet::new("bar");
        set.insert("x/bar.pfb".into(), ExtractedFile::base64(&[0, 1, 2]));
        set.dependencies.insert("amsmath".into());

        let value: serde_json::Value = serde_json::from_slice(&set.to_json_bytes().unwrap()).unwrap();
        assert_eq!(value["totalFiles"], 1);
        assert_eq!(value["files"]["x/bar.pfb"]["encoding"], "base64");
        assert_eq!(value["dependencies"][0], "amsmath");

        let back = ExtractedFileSet::from_json_bytes(&set.to_json_bytes().unwrap()).unwrap();
        assert_eq!(back.files["x/bar.pfb"].decode().unwrap(), vec![0, 1, 2]);
    }
}
