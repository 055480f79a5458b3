//! Route handlers.
//!
//! Each handler turns a core call into an [`EdgeRecord`] plus the freshness
//! class that decides how long the edge cache may keep it. Conversion to an
//! HTTP response happens in one place, [`record_response`].

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::json;
use texcache_core::{
    BinaryObject, CacheStatus, EdgeRecord, PackageProxy, PayloadClass, ProxyConfig, ProxyError,
    ProxyResult, RAW_ARCHIVE_CONTENT_TYPE,
};

use crate::routes::Service;

pub const X_CACHE: &str = "x-cache";
pub const X_EDGE_CACHE: &str = "x-edge-cache";
pub const X_FALLBACK_STAGE: &str = "x-fallback-stage";
pub const X_CONTENT_COMPRESSION: &str = "x-content-compression";

const JSON_CONTENT_TYPE: &str = "application/json";

/// A successful, edge-cacheable response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub record: EdgeRecord,
    pub class: PayloadClass,
}

impl Reply {
    fn new(class: PayloadClass, content_type: &str, body: Bytes, config: &ProxyConfig) -> Self {
        let headers = vec![
            (header::CONTENT_TYPE.as_str().to_string(), content_type.to_string()),
            (header::CONTENT_LENGTH.as_str().to_string(), body.len().to_string()),
            (header::CACHE_CONTROL.as_str().to_string(), class.cache_control(config)),
        ];
        Self {
            record: EdgeRecord {
                status: StatusCode::OK.as_u16(),
                headers,
                body,
            },
            class,
        }
    }

    fn header(mut self, name: &str, value: &str) -> Self {
        self.record.headers.push((name.to_string(), value.to_string()));
        self
    }
}

pub fn record_response(record: EdgeRecord, edge: CacheStatus) -> Response {
    let mut builder = Response::builder().status(record.status);
    for (name, value) in &record.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .header(X_EDGE_CACHE, edge.as_str())
        .body(Body::from(record.body))
        .unwrap_or_else(|e| {
            log::error!("Failed to assemble response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

pub async fn processed(proxy: &PackageProxy, name: &str) -> ProxyResult<Reply> {
    let result = proxy.processed(name).await?;
    let stage = result.stage.map(|s| s.as_str()).unwrap_or("cache");
    Ok(
        Reply::new(PayloadClass::Json, JSON_CONTENT_TYPE, result.payload, proxy.config())
            .header(X_CACHE, result.cache.as_str())
            .header(X_FALLBACK_STAGE, stage),
    )
}

pub async fn raw_archive(proxy: &PackageProxy, name: &str) -> ProxyResult<Reply> {
    let archive = proxy.raw_archive(name).await?;
    Ok(
        Reply::new(PayloadClass::Binary, RAW_ARCHIVE_CONTENT_TYPE, archive.bytes, proxy.config())
            .header(X_CACHE, archive.cache.as_str()),
    )
}

pub async fn registry(proxy: &PackageProxy, name: &str) -> ProxyResult<Reply> {
    let info = proxy.registry_info(name).await?;
    let body = serde_json::to_vec(&info).map_err(anyhow::Error::from)?;
    Ok(Reply::new(
        PayloadClass::Json,
        JSON_CONTENT_TYPE,
        Bytes::from(body),
        proxy.config(),
    ))
}

pub async fn binary(proxy: &PackageProxy, key: &str) -> ProxyResult<Reply> {
    let object = proxy
        .binary_object(key)
        .await?
        .ok_or_else(|| ProxyError::NotFound(format!("Object '{}' not found", key)))?;
    if object.key != key {
        log::debug!("Serving {} from {}", key, object.key);
    }
    Ok(binary_reply(object, proxy.config()))
}

pub async fn xzwasm(proxy: &PackageProxy) -> ProxyResult<Reply> {
    let object = proxy
        .xzwasm()
        .await?
        .ok_or_else(|| ProxyError::NotFound("xzwasm.js not found".into()))?;
    Ok(binary_reply(object, proxy.config()))
}

fn binary_reply(object: BinaryObject, config: &ProxyConfig) -> Reply {
    let mut reply = Reply::new(PayloadClass::Binary, object.content_type, object.bytes, config);
    if let Some(encoding) = object.content_encoding {
        reply = reply.header(header::CONTENT_ENCODING.as_str(), encoding);
    }
    if let Some(compression) = object.client_compression {
        reply = reply.header(X_CONTENT_COMPRESSION, compression);
    }
    reply
}

pub fn health(service: Service, config: &ProxyConfig) -> Response {
    let body = match service {
        Service::Binaries => json!({
            "status": "ok",
            "service": "packages-binaries",
        }),
        Service::Proxy => json!({
            "status": "ok",
            "service": "texcache",
            "cacheVersion": config.cache_version,
            "rulesFingerprint": texcache_package::rules_fingerprint(),
            "endpoints": [
                "/api/fetch/<name>",
                "/fetch/<name>",
                "/api/texlive/<name>",
                "/api/ctan-pkg/<name>",
                "/bundles/<key>",
                "/wasm/<key>",
                "/xzwasm.js",
            ],
        }),
    };
    Json(body).into_response()
}
