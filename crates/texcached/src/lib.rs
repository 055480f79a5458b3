//! # texcached
//!
//! HTTP front end of the texcache proxy. A single fallback handler classifies
//! every request by host, then by path ([`routes::Route`]), consults the edge
//! cache and delegates to the core [`PackageProxy`].
//!
//! Successful payloads are written back to the edge cache on a detached task;
//! the response never waits for that write.

pub mod error;
pub mod handlers;
pub mod routes;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use texcache_core::{BackgroundTasks, CacheStatus, EdgeCache, PackageProxy};

use crate::error::ApiError;
use crate::handlers::{X_CACHE, X_CONTENT_COMPRESSION, X_EDGE_CACHE, X_FALLBACK_STAGE};
use crate::routes::Route;

/// Shared per-process state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub proxy: PackageProxy,
    pub edge: Arc<EdgeCache>,
    pub tasks: Arc<BackgroundTasks>,
}

impl AppState {
    pub fn new(proxy: PackageProxy) -> Self {
        let config = proxy.config();
        let edge = Arc::new(EdgeCache::new(
            config.cache_version.clone(),
            config.edge_max_bytes,
        ));
        Self {
            proxy,
            edge,
            tasks: Arc::new(BackgroundTasks::new()),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(from_fn(cors))
        .with_state(state)
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.host())
        .map(str::to_string);
    let config = state.proxy.config();
    let route = Route::classify(&method, host.as_deref(), uri.path(), config);
    log::debug!("{} {} -> {:?}", method, uri, route);

    let proxy = &state.proxy;
    let result = match route {
        Route::Preflight => return StatusCode::OK.into_response(),
        Route::Health(service) => return handlers::health(service, config),
        Route::MethodNotAllowed => return ApiError::MethodNotAllowed.into_response(),
        Route::NotFound => return ApiError::NoRoute.into_response(),
        route => {
            let url = format!(
                "http://{}{}",
                host.as_deref().unwrap_or("localhost"),
                uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
            );
            let key = state.edge.key_for(&url);
            if let Some(record) = state.edge.get(&key) {
                log::debug!("Edge hit for {}", key);
                return handlers::record_response(record, CacheStatus::Hit);
            }

            let reply = match route {
                Route::Processed(name) => handlers::processed(proxy, &name).await,
                Route::RawArchive(name) => handlers::raw_archive(proxy, &name).await,
                Route::Registry(name) => handlers::registry(proxy, &name).await,
                Route::Binary(key) => handlers::binary(proxy, &key).await,
                Route::XzWasm => handlers::xzwasm(proxy).await,
                _ => return ApiError::NoRoute.into_response(),
            };
            reply.map(|reply| {
                let ttl = reply.class.max_age(config);
                state
                    .edge
                    .put_detached(&state.tasks, key, reply.record.clone(), ttl);
                reply.record
            })
        }
    };

    match result {
        Ok(record) => handlers::record_response(record, CacheStatus::Miss),
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// Permissive cross-origin headers on every response; preflights end here.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if *request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    let exposed = [
        header::CONTENT_LENGTH.as_str(),
        header::CONTENT_ENCODING.as_str(),
        X_CACHE,
        X_EDGE_CACHE,
        X_FALLBACK_STAGE,
        X_CONTENT_COMPRESSION,
    ]
    .join(", ");
    if let Ok(value) = HeaderValue::from_str(&exposed) {
        headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, value);
    }
    response
}
