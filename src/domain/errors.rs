//! Error taxonomy for the retrieval pipeline and the generation gateway.
//!
//! The gateway resolves every backend failure into [`GatewayError`] before
//! deciding between retry (fallback hop) and propagation. Status codes in
//! {429, 500, 502, 503, 504} and transport-level connect/timeout failures are
//! retryable; everything else is fatal and propagates unchanged.

use thiserror::Error;

/// Errors surfaced by the generation gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Requested provider is absent from the preset table and no custom
    /// endpoint was given. Always fatal, never triggers fallback.
    #[error("unknown provider '{requested}'; available: {}", available.join(", "))]
    UnknownProvider {
        /// The provider name that failed to resolve.
        requested: String,
        /// Valid preset names.
        available: Vec<String>,
    },

    /// Credential rejected by the backend (HTTP 401/403). Fatal.
    #[error("authentication rejected by backend: {0}")]
    Authentication(String),

    /// Malformed request (HTTP 400). Fatal.
    #[error("backend rejected request: {0}")]
    InvalidRequest(String),

    /// Bad model or endpoint (HTTP 404). Fatal.
    #[error("backend resource not found: {0}")]
    NotFound(String),

    /// HTTP 429. Retryable, triggers a fallback hop.
    #[error("backend rate limited the request")]
    RateLimited,

    /// Upstream HTTP status outside the mapped set. Retryable only for
    /// {500, 502, 503, 504}.
    #[error("backend returned HTTP {status}: {body}")]
    Upstream {
        /// Raw status code.
        status: u16,
        /// Response body, best effort.
        body: String,
    },

    /// Timeout or refused connection. Retryable.
    #[error("backend unreachable: {0}")]
    Connectivity(String),

    /// Any other transport-level failure (mid-body drop, TLS, builder).
    /// Fatal: only timeouts and refused connections trigger fallback.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Backend replied 2xx but the body did not match the expected wire
    /// shape. Fatal.
    #[error("backend response malformed: {0}")]
    InvalidResponse(String),

    /// Entire fallback chain exhausted, including the terminal profile.
    #[error("all generation backends unavailable")]
    ServiceDegraded,
}

impl GatewayError {
    /// Whether this failure should advance the fallback chain.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::Connectivity(_) => true,
            Self::Upstream { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Classify a non-2xx HTTP status together with its body.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => Self::InvalidRequest(body),
            401 | 403 => Self::Authentication(body),
            404 => Self::NotFound(body),
            429 => Self::RateLimited,
            _ => Self::Upstream { status, body },
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Connectivity(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the retrieval pipeline.
///
/// Embedding and vector-search failures are not caught locally; they
/// propagate to the boundary layer, which owns user-facing translation.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding provider failed (non-2xx or transport failure).
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// Vector store failed (non-2xx or transport failure).
    #[error("vector store request failed: {0}")]
    VectorStore(String),

    /// Generation failed after retrieval completed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Convenience alias for gateway results.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Convenience alias for retrieval results.
pub type RetrievalResult<T> = Result<T, RetrievalError>;
