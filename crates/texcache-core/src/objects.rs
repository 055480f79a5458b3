//! Verbatim serving of stored binary objects (engine WASM, bundle data, static assets).

use crate::cache::store::validate_key;
use crate::cache::ObjectStore;
use crate::error::{ProxyError, ProxyResult};
use bytes::Bytes;

/// Static asset behind `/xzwasm.js`, stored gzip-compressed.
pub const XZWASM_KEY: &str = "static/xzwasm.js.gz";

/// How a stored object must be presented to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryObject {
    pub key: String,
    pub bytes: Bytes,
    pub content_type: &'static str,
    /// Set when intermediaries and browsers may decode transparently.
    pub content_encoding: Option<&'static str>,
    /// Set when the body is compressed but the client must decode it itself.
    pub client_compression: Option<&'static str>,
}

pub fn content_type_for(key: &str) -> &'static str {
    let ext = key.rsplit('.').next().unwrap_or_default();
    match ext {
        "wasm" => "application/wasm",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xz" => "application/x-xz",
        "gz" => "application/gzip",
        "zip" => "application/zip",
        "txt" | "fmt_list" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Looks `key` up, preferring a `.gz` sibling for WASM and bundle-data keys.
pub async fn load_binary(store: &dyn ObjectStore, key: &str) -> ProxyResult<Option<BinaryObject>> {
    validate_key(key).map_err(|_| ProxyError::Validation("Invalid object key".into()))?;

    if key.ends_with(".wasm") || key.ends_with(".data") {
        let compressed_key = format!("{}.gz", key);
        if let Some(bytes) = store.get(&compressed_key).await? {
            let wasm = key.ends_with(".wasm");
            return Ok(Some(BinaryObject {
                key: compressed_key,
                bytes,
                content_type: if wasm { "application/wasm" } else { "application/octet-stream" },
                content_encoding: wasm.then_some("gzip"),
                client_compression: (!wasm).then_some("gzip"),
            }));
        }
    }

    Ok(store.get(key).await?.map(|bytes| BinaryObject {
        key: key.to_string(),
        bytes,
        content_type: content_type_for(key),
        content_encoding: None,
        client_compression: None,
    }))
}

/// The pre-compressed `xzwasm.js` helper.
pub async fn load_xzwasm(store: &dyn ObjectStore) -> ProxyResult<Option<BinaryObject>> {
    Ok(store.get(XZWASM_KEY).await?.map(|bytes| BinaryObject {
        key: XZWASM_KEY.to_string(),
        bytes,
        content_type: "application/javascript",
        content_encoding: Some("gzip"),
        client_compression: None,
    }))
}
