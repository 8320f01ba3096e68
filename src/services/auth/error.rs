/*
 * Responsibility
 * - Error taxonomy of the authentication core
 * - Startup-time (Configuration) vs per-request (everything else) errors
 */
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Missing or unusable key material. Fatal: abort startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Identity record lacks a required field (login failure).
    #[error("invalid identity: missing {0}")]
    InvalidIdentity(&'static str),

    #[error("malformed token")]
    MalformedToken,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("invalid token issuer")]
    InvalidIssuer,

    #[error("invalid token audience")]
    InvalidAudience,

    #[error("token expired")]
    ExpiredToken,

    #[error("invalid session")]
    InvalidSession,

    #[error("session expired")]
    ExpiredSession,
}

impl AuthError {
    /// Stable short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidIdentity(_) => "invalid_identity",
            Self::MalformedToken => "malformed_token",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::ExpiredToken => "expired_token",
            Self::InvalidSession => "invalid_session",
            Self::ExpiredSession => "expired_session",
        }
    }
}
