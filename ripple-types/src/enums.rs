use serde::{Deserialize, Serialize};

/// Error codes returned in the backend's error envelope.
///
/// The set is open; anything unrecognized is carried verbatim in
/// `Other` so policy checks and logging keep the original code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    TokenExpired,
    AuthRequired,
    InvalidToken,
    AccountBanned,
    AccountSuspended,
    NotFound,
    ValidationError,
    DuplicateAction,
    RateLimited,
    Other(String),
}

impl ErrorCode {
    pub fn parse(s: &str) -> Self {
        match s {
            "TOKEN_EXPIRED" => ErrorCode::TokenExpired,
            "AUTH_REQUIRED" => ErrorCode::AuthRequired,
            "INVALID_TOKEN" => ErrorCode::InvalidToken,
            "ACCOUNT_BANNED" => ErrorCode::AccountBanned,
            "ACCOUNT_SUSPENDED" => ErrorCode::AccountSuspended,
            "NOT_FOUND" => ErrorCode::NotFound,
            "VALIDATION_ERROR" => ErrorCode::ValidationError,
            "DUPLICATE_ACTION" => ErrorCode::DuplicateAction,
            "RATE_LIMITED" => ErrorCode::RateLimited,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::AccountBanned => "ACCOUNT_BANNED",
            ErrorCode::AccountSuspended => "ACCOUNT_SUSPENDED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::DuplicateAction => "DUPLICATE_ACTION",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Other(code) => code,
        }
    }

    /// Whether a 401 carrying this code should trigger a session
    /// refresh and a single retry of the original request.
    pub fn is_refreshable(&self) -> bool {
        matches!(self, ErrorCode::TokenExpired | ErrorCode::AuthRequired)
    }

    /// Whether the error requires an app-wide reaction (forced logout,
    /// redirect) rather than inline handling by the calling code.
    pub fn is_auto_handleable(&self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidToken | ErrorCode::AccountBanned | ErrorCode::AccountSuspended
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Mention,
    Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refreshable_codes() {
        assert!(ErrorCode::parse("TOKEN_EXPIRED").is_refreshable());
        assert!(ErrorCode::parse("AUTH_REQUIRED").is_refreshable());
        assert!(!ErrorCode::parse("ACCOUNT_BANNED").is_refreshable());
        assert!(!ErrorCode::parse("SOMETHING_NEW").is_refreshable());
    }

    #[test]
    fn test_auto_handleable_codes() {
        assert!(ErrorCode::parse("ACCOUNT_BANNED").is_auto_handleable());
        assert!(ErrorCode::parse("INVALID_TOKEN").is_auto_handleable());
        assert!(!ErrorCode::parse("VALIDATION_ERROR").is_auto_handleable());
        assert!(!ErrorCode::parse("DUPLICATE_ACTION").is_auto_handleable());
    }

    #[test]
    fn test_unknown_code_round_trips() {
        let code = ErrorCode::parse("SOME_FUTURE_CODE");
        assert_eq!(code.as_str(), "SOME_FUTURE_CODE");
    }
}
