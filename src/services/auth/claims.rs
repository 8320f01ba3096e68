/*
 * Responsibility
 * - Claim type (ordered, duplicates allowed)
 * - ClaimsBuilder: verified identity -> canonical claim sequence
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{AuthError, AuthResult};
use crate::services::identity::Identity;

/// Well-known claim types.
pub mod claim_types {
    pub const TOKEN_ID: &str = "jti";
    pub const SUBJECT: &str = "sub";
    pub const EMAIL: &str = "email";
    pub const NAME: &str = "name";
    pub const ROLE: &str = "role";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsBuilder;

impl ClaimsBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build claims in canonical order: jti, sub, email, name, roles, then `extra`.
    pub fn build(&self, identity: &Identity, extra: &[Claim]) -> AuthResult<Vec<Claim>> {
        let id = required(&identity.id, "id")?;
        let username = required(&identity.username, "username")?;
        let email = required(&identity.email, "email")?;

        let mut claims = Vec::with_capacity(4 + identity.roles.len() + extra.len());
        claims.push(Claim::new(claim_types::TOKEN_ID, new_token_id()));
        claims.push(Claim::new(claim_types::SUBJECT, id));
        claims.push(Claim::new(claim_types::EMAIL, email));
        claims.push(Claim::new(claim_types::NAME, username));
        claims.extend(
            identity
                .roles
                .iter()
                .map(|role| Claim::new(claim_types::ROLE, role.as_str())),
        );
        claims.extend(extra.iter().cloned());

        Ok(claims)
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> AuthResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidIdentity(field));
    }
    Ok(trimmed)
}

// 32 lowercase hex chars.
fn new_token_id() -> String {
    Uuid::new_v4().simple().to_string()
}
