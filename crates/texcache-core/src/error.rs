use thiserror::Error;

/// Failures that can reach a client.
///
/// Upstream failures inside the fallback chain never show up here; they are
/// logged and the next source is tried.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Malformed package name or object key.
    #[error("{0}")]
    Validation(String),

    /// Every source was exhausted, or the archive held nothing installable.
    #[error("{0}")]
    NotFound(String),

    /// Upstream failure with no further fallback.
    #[error("{0}")]
    Upstream(String),

    /// Anything unanticipated, e.g. a corrupt archive.
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

pub type ProxyResult<T> = Result<T, ProxyError>;
