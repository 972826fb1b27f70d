use ripple_types::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No response at all. Propagated to the caller unchanged; never
    /// retried, never dispatched to the fatal hook.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response with a classified error envelope.
    #[error("Server error {status} [{code}]: {message}")]
    Server {
        status: u16,
        code: ErrorCode,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 2xx response whose envelope was malformed or carried
    /// `success: false`.
    #[error("API error: {0}")]
    Api(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            ApiError::Server { code, .. } => Some(code),
            _ => None,
        }
    }

    /// A 401 whose error code permits a transparent session refresh.
    pub fn is_refreshable_auth(&self) -> bool {
        matches!(
            self,
            ApiError::Server { status: 401, code, .. } if code.is_refreshable()
        )
    }

    /// Whether this error should be forwarded to the registered fatal
    /// hook (app-wide reaction) rather than handled inline.
    pub fn is_auto_handleable(&self) -> bool {
        match self {
            ApiError::Server { status, code, .. } => *status == 401 || code.is_auto_handleable(),
            _ => false,
        }
    }
}
