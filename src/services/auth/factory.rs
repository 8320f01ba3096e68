//! Factory: build the auth components from application `Config`.
//!
//! Any failure here is a startup-time configuration error.
use std::sync::Arc;

use chrono::Duration;

use crate::config::Config;
use crate::services::identity::IdentityStore;

use super::error::{AuthError, AuthResult};
use super::keys::{EncryptionKey, SigningKey};
use super::login::LoginService;
use super::options::{SessionOptions, TokenOptions};
use super::router::AuthenticationRouter;
use super::session_issuer::SessionIssuer;
use super::session_validator::SessionValidator;
use super::token_issuer::TokenIssuer;
use super::token_validator::TokenValidator;

pub fn token_options(config: &Config) -> AuthResult<TokenOptions> {
    Ok(TokenOptions {
        issuer: config.auth_issuer.clone(),
        audience: config.auth_audience.clone(),
        signing_key: SigningKey::new(config.auth_signing_key.as_bytes())?,
        lifetime: duration("AUTH_TOKEN_LIFETIME_SECONDS", config.token_lifetime_seconds)?,
        clock_skew: duration("AUTH_CLOCK_SKEW_SECONDS", config.clock_skew_seconds)?,
    })
}

pub fn session_options(config: &Config) -> AuthResult<SessionOptions> {
    Ok(SessionOptions {
        encryption_key: EncryptionKey::parse(&config.session_encryption_key)?,
        sliding_window: duration(
            "SESSION_SLIDING_WINDOW_SECONDS",
            config.session_sliding_window_seconds,
        )?,
        absolute_lifetime: duration(
            "SESSION_ABSOLUTE_LIFETIME_SECONDS",
            config.session_absolute_lifetime_seconds,
        )?,
        cookie_name: config.session_cookie_name.clone(),
        cookie_path: "/".to_string(),
        login_path: config.login_path.clone(),
        secure: config.session_cookie_secure,
    })
}

fn duration(key: &str, seconds: u64) -> AuthResult<Duration> {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| AuthError::Configuration(format!("{key} is out of range")))
}

pub fn build_auth_services(
    config: &Config,
    identities: Arc<dyn IdentityStore>,
) -> AuthResult<(Arc<LoginService>, Arc<AuthenticationRouter>)> {
    let tokens = token_options(config)?;
    let sessions = session_options(config)?;

    let login = LoginService::new(
        identities,
        TokenIssuer::new(&tokens)?,
        SessionIssuer::new(&sessions)?,
    );
    let router = AuthenticationRouter::new(
        TokenValidator::new(&tokens)?,
        SessionValidator::new(&sessions)?,
        sessions.login_path.clone(),
    );

    Ok((Arc::new(login), Arc::new(router)))
}
