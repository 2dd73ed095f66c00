use std::time::Duration;

use satscope_core::DecodeError;

/// Failures a caller of the data pipeline can observe.
///
/// Cache failures are absent on purpose: the cache absorbs them.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("network error fetching {path}: {reason}")]
    Network { path: String, reason: String },

    #[error("request for {path} timed out after {after:?}")]
    Timeout { path: String, after: Duration },

    #[error("HTTP {status} fetching {path}")]
    Http { path: String, status: u16 },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: DecodeError,
    },

    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn decode(path: &str, source: DecodeError) -> Self {
        ApiError::Decode {
            path: path.to_string(),
            source,
        }
    }

    /// HTTP status, when the failure is an HTTP error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 400/404, the statuses upstream uses for an unknown id.
    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(400) | Some(404))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
