use thiserror::Error;

/// Error type for session token operations.
///
/// Validation failures all collapse into `InvalidToken`; the underlying
/// reason is only logged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Signing secret must not be empty")]
    EmptySecret,

    #[error("Token lifetime must be positive and at most {max_hours} hours")]
    InvalidLifetime { max_hours: i64 },

    #[error("Token subject must be a positive user id, got {0}")]
    InvalidSubject(i64),

    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Invalid token")]
    InvalidToken,
}
