/*
 * Responsibility
 * - Immutable option objects handed to each auth component at construction
 * - Built once from Config (see factory.rs); never global
 */
use chrono::Duration;

use super::keys::{EncryptionKey, SigningKey};

#[derive(Debug, Clone)]
pub struct TokenOptions {
    pub issuer: String,
    pub audience: String,
    pub signing_key: SigningKey,
    pub lifetime: Duration,
    pub clock_skew: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub encryption_key: EncryptionKey,
    pub sliding_window: Duration,
    pub absolute_lifetime: Duration,
    pub cookie_name: String,
    pub cookie_path: String,
    pub login_path: String,
    pub secure: bool,
}

impl SessionOptions {
    /// Defaults of the reference deployment (15s sliding window, 14 days absolute).
    pub fn with_key(encryption_key: EncryptionKey) -> Self {
        Self {
            encryption_key,
            sliding_window: Duration::seconds(15),
            absolute_lifetime: Duration::days(14),
            cookie_name: "auth_session".to_string(),
            cookie_path: "/".to_string(),
            login_path: "/login".to_string(),
            secure: true,
        }
    }
}
