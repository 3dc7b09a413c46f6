use thiserror::Error;

/// Classified failures from the upstream financial-data API.
///
/// Terminal variants (bad credential, missing resource) surface immediately;
/// the transient variants are only returned after the fetch client has
/// exhausted its bounded retries.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("daily quota exceeded: {used}/{limit} requests used")]
    DailyQuotaExceeded { used: u32, limit: u32 },

    #[error("rate limited by upstream after {attempts} attempts: {message}")]
    RateLimitExceeded { attempts: u32, message: String },

    #[error("upstream unavailable (HTTP {status}) after {attempts} attempts: {message}")]
    UpstreamUnavailable {
        status: u16,
        attempts: u32,
        message: String,
    },

    #[error("invalid API credential (HTTP 401): {message}")]
    InvalidCredential { message: String },

    #[error("permission denied (HTTP 403): {message}")]
    PermissionDenied { message: String },

    #[error("resource not found (HTTP 404): {message}")]
    ResourceNotFound { message: String },

    #[error("upstream internal error (HTTP 500): {message}")]
    UpstreamInternalError { message: String },

    #[error("network error after {attempts} attempts: {message}")]
    NetworkError { attempts: u32, message: String },

    #[error("unexpected HTTP status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("failed to parse upstream response: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether the underlying condition is transient, i.e. a fresh call could
    /// succeed without anything else changing. Daily quota is not retryable
    /// within the same day; credential and not-found failures never are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimitExceeded { .. }
                | FetchError::UpstreamUnavailable { .. }
                | FetchError::UpstreamInternalError { .. }
                | FetchError::NetworkError { .. }
        )
    }

    /// HTTP status that triggered this failure, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::RateLimitExceeded { .. } => Some(429),
            FetchError::UpstreamUnavailable { status, .. } => Some(*status),
            FetchError::InvalidCredential { .. } => Some(401),
            FetchError::PermissionDenied { .. } => Some(403),
            FetchError::ResourceNotFound { .. } => Some(404),
            FetchError::UpstreamInternalError { .. } => Some(500),
            FetchError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
