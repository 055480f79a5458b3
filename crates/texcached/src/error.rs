//! JSON error envelope.
//!
//! Every failure leaves the daemon as `{"error": "<message>"}`. Internal
//! details are logged server-side and replaced by a fixed message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use texcache_core::ProxyError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response-side wrapper around [`ProxyError`].
#[derive(Debug)]
pub enum ApiError {
    Proxy(ProxyError),
    /// No route matched.
    NoRoute,
    MethodNotAllowed,
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        Self::Proxy(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Proxy(ProxyError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Proxy(ProxyError::NotFound(_)) | Self::NoRoute => StatusCode::NOT_FOUND,
            Self::Proxy(ProxyError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            Self::Proxy(ProxyError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Proxy(ProxyError::Internal(_)) => "Internal server error".to_string(),
            Self::Proxy(other) => other.to_string(),
            Self::NoRoute => "Not found".to_string(),
            Self::MethodNotAllowed => "Method not allowed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Proxy(err @ ProxyError::Internal(_)) => log::error!("{}", err),
            Self::Proxy(err @ ProxyError::Upstream(_)) => log::warn!("{}", err),
            _ => {}
        }
        let body = ErrorBody {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
