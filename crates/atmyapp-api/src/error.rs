//! Error types for the AtMyApp API client.

use std::fmt;

/// Errors reported by the AtMyApp service or the transport underneath it.
///
/// Every failure shape the service produces (plain strings, `{message}`
/// objects, bare status codes) is normalized into one of these kinds before it
/// reaches the collections layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// HTTP-level error with status code.
    Http { status: u16, message: String },
    /// Authentication failure.
    Auth { message: String },
    /// Rate limit exceeded.
    RateLimit { retry_after: Option<u64> },
    /// Resource not found.
    NotFound { resource: String, id: String },
    /// Network/connection error.
    Network { message: String },
    /// The request did not settle within the allotted time.
    Timeout { after_ms: u64 },
    /// The service answered with `success: false`.
    Service { message: String },
    /// The response body could not be decoded.
    Malformed { message: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http { status, message } => write!(f, "HTTP error {}: {}", status, message),
            ApiError::Auth { message } => write!(f, "Auth error: {}", message),
            ApiError::RateLimit { retry_after } => match retry_after {
                Some(secs) => write!(f, "Rate limited, retry after {} seconds", secs),
                None => write!(f, "Rate limited"),
            },
            ApiError::NotFound { resource, id } => {
                write!(f, "{} not found: {}", resource, id)
            }
            ApiError::Network { message } => write!(f, "Network error: {}", message),
            ApiError::Timeout { after_ms } => {
                write!(f, "Request timed out after {}ms", after_ms)
            }
            ApiError::Service { message } => write!(f, "{}", message),
            ApiError::Malformed { message } => write!(f, "Malformed response: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Returns true if this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimit { .. } | ApiError::Network { .. } | ApiError::Timeout { .. }
        )
    }

    /// Returns the appropriate CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ApiError::Network { .. } | ApiError::Timeout { .. } => 3,
            ApiError::RateLimit { .. } => 4,
            _ => 2,
        }
    }
}

/// Errors raised while compiling a collection query.
///
/// These are fatal and surface before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// An `and` node appeared somewhere below an `or` node.
    #[error("AND inside OR is not supported by the server query syntax")]
    AndInsideOr,

    /// A `not` node appeared anywhere in the filter.
    #[error("NOT is not supported by the server query syntax")]
    NotUnsupported,

    /// Both `range` and `limit`/`offset` were supplied.
    #[error("Provide either range or limit/offset, not both")]
    RangeWithLimitOffset,
}

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Normalized service or transport failure.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Error raised by the HTTP client itself.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The query could not be compiled.
    #[error("{0}")]
    Query(#[from] QueryError),

    /// A collections request reported failure; carries the service message.
    #[error("{0}")]
    Request(String),

    /// The configured base URL cannot carry a request path.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Normalizes this error into an [`ApiError`] kind, if it originated from
    /// the transport.
    pub fn as_api_error(&self) -> Option<ApiError> {
        match self {
            Error::Api(e) => Some(e.clone()),
            Error::Http(e) if e.is_timeout() => Some(ApiError::Timeout { after_ms: 0 }),
            Error::Http(e) => match e.status() {
                Some(status) => Some(ApiError::Http {
                    status: status.as_u16(),
                    message: e.to_string(),
                }),
                None => Some(ApiError::Network {
                    message: e.to_string(),
                }),
            },
            Error::Json(e) => Some(ApiError::Malformed {
                message: e.to_string(),
            }),
            Error::Query(_) | Error::Request(_) | Error::InvalidUrl(_) => None,
        }
    }

    /// Returns the appropriate CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Query(_) | Error::InvalidUrl(_) => 1,
            Error::Request(_) => 2,
            _ => self.as_api_error().map_or(2, |e| e.exit_code()),
        }
    }
}

/// Result type for AtMyApp API operations.
pub type Result<T> = std::result::Result<T, Error>;
