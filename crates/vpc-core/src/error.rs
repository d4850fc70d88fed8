//! Error types for VPC operations.
//!
//! This module provides the single error type shared by the pager and the HTTP
//! client, including HTTP status code mapping and the pagination taxonomy.

use thiserror::Error;

/// Main error type for VPC operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// VPC service is unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Timeout waiting for service: {0}")]
    Timeout(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials were rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Failed to parse a response body
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid resource identifier
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    /// `next_page` was called after the pager reached its final page
    #[error("Pagination exhausted for `{operation}`")]
    PaginationExhausted {
        /// List operation the pager walks
        operation: String,
    },

    /// The underlying list call failed; pager state is unchanged
    #[error("Operation `{operation}` failed: {cause}")]
    OperationFailed {
        /// List operation the pager walks
        operation: String,
        /// Error reported by the invoker or by page decoding
        #[source]
        cause: Box<Error>,
    },

    /// A continuation marker was present but could not be parsed
    #[error("Malformed continuation marker for `{operation}`: {detail}")]
    MalformedContinuationMarker {
        /// List operation the pager walks
        operation: String,
        /// What was wrong with the marker
        detail: String,
    },
}

/// Specialized result type for VPC operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidId(_) => "INVALID_ID",
            Self::PaginationExhausted { .. } => "PAGINATION_EXHAUSTED",
            Self::OperationFailed { .. } => "OPERATION_FAILED",
            Self::MalformedContinuationMarker { .. } => "MALFORMED_CONTINUATION_MARKER",
        }
    }

    /// Returns true if a transport may retry the request that produced this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::ServiceUnavailable(_) | Self::HttpError(_)
        )
    }

    /// Wrap an invoker or decoding failure for the given list operation.
    #[must_use]
    pub fn operation_failed(operation: impl Into<String>, cause: Self) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: Box::new(cause),
        }
    }

    /// Returns the wrapped cause of an [`Error::OperationFailed`].
    #[must_use]
    pub fn cause(&self) -> Option<&Self> {
        match self {
            Self::OperationFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::ServiceUnavailable("test".to_string()).error_code(),
            "SERVICE_UNAVAILABLE"
        );
        assert_eq!(Error::Timeout("test".to_string()).error_code(), "TIMEOUT");
        assert_eq!(
            Error::Unauthorized("test".to_string()).error_code(),
            "UNAUTHORIZED"
        );
        assert_eq!(
            Error::ParseError("test".to_string()).error_code(),
            "PARSE_ERROR"
        );
        assert_eq!(Error::InvalidId("x".to_string()).error_code(), "INVALID_ID");
        assert_eq!(
            Error::PaginationExhausted {
                operation: "list_vpcs".to_string()
            }
            .error_code(),
            "PAGINATION_EXHAUSTED"
        );
        assert_eq!(
            Error::operation_failed("list_vpcs", Error::Timeout("slow".to_string())).error_code(),
            "OPERATION_FAILED"
        );
        assert_eq!(
            Error::MalformedContinuationMarker {
                operation: "list_vpcs".to_string(),
                detail: "no start".to_string()
            }
            .error_code(),
            "MALFORMED_CONTINUATION_MARKER"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::ServiceUnavailable("vpc".to_string());
        assert_eq!(err.to_string(), "Service unavailable: vpc");

        let err = Error::operation_failed("list_subnets", Error::NotFound("gone".to_string()));
        assert_eq!(
            err.to_string(),
            "Operation `list_subnets` failed: Not found: gone"
        );

        let err = Error::PaginationExhausted {
            operation: "list_vpcs".to_string(),
        };
        assert_eq!(err.to_string(), "Pagination exhausted for `list_vpcs`");
    }

    #[test]
    fn test_operation_failed_keeps_source() {
        let inner = Error::HttpError("connection reset".to_string());
        let err = Error::operation_failed("list_instances", inner.clone());

        assert_eq!(err.cause(), Some(&inner));
        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), inner.to_string());
        assert!(Error::NotFound("x".to_string()).cause().is_none());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Timeout("t".to_string()).is_retryable());
        assert!(Error::ServiceUnavailable("t".to_string()).is_retryable());
        assert!(Error::HttpError("t".to_string()).is_retryable());

        assert!(!Error::NotFound("t".to_string()).is_retryable());
        assert!(!Error::Unauthorized("t".to_string()).is_retryable());
        assert!(!Error::operation_failed("op", Error::Timeout("t".to_string())).is_retryable());
    }

    #[test]
    fn test_from_url_parse_error() {
        let err = url::Url::parse("not a url").unwrap_err();
        let vpc_err: Error = err.into();
        assert!(matches!(vpc_err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let vpc_err: Error = err.into();
        assert!(matches!(vpc_err, Error::ParseError(_)));
    }

    #[test]
    fn test_error_partial_eq() {
        let err1 = Error::NotFound("test".to_string());
        let err2 = Error::NotFound("test".to_string());
        let err3 = Error::NotFound("other".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
        assert_eq!(err1.clone(), err1);
    }
}
