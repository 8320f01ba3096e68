/*
 * Responsibility
 * - Login request/response DTOs (API: JSON, interactive: form + ReturnUrl query)
 */
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.trim().is_empty() {
            return Err("username is required");
        }
        if self.password.is_empty() {
            return Err("password is required");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReturnUrlQuery {
    #[serde(rename = "ReturnUrl")]
    pub return_url: Option<String>,
}

impl ReturnUrlQuery {
    /// Local redirect target, or `/`. Absolute and protocol-relative URLs are refused.
    pub fn local_target(&self) -> &str {
        match self.return_url.as_deref() {
            Some(url) if is_local(url) => url,
            _ => "/",
        }
    }
}

fn is_local(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}
