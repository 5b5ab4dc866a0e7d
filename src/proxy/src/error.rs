//! Proxy error taxonomy
//!
//! Errors map onto user-visible statuses without leaking internal state:
//! configuration and extraction failures are internal errors, authorization
//! denial is an expected outcome, collaborator failures propagate with an
//! appropriate status.

use http::StatusCode;
use sentra_core::CoreError;
use thiserror::Error;

/// Failure of an external collaborator (authority, resource/relation
/// services, identity resolution).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other collaborator failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised inside the middleware and hook pipeline.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed middleware/hook configuration, detected at decode time
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A configured attribute could not be extracted
    #[error("attribute extraction failed: {0}")]
    Extraction(String),

    /// The caller is not permitted to invoke this route
    #[error("unauthorized")]
    Unauthorized,

    /// A referenced resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Collaborator failure
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// Rule model failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Anything else that should never surface details to the caller
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Status written onto the response when this error escapes the chain.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) | Self::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Config(_)
            | Self::Extraction(_)
            | Self::Service(_)
            | Self::Core(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ProxyError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ProxyError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ProxyError::Service(ServiceError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ProxyError::Config("bad".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::Extraction("missing".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
