/*
 * Responsibility
 * - IdentityStore: the user-lookup / credential-verification capability the auth core consumes
 * - Identity: the verified-identity record handed to ClaimsBuilder
 *
 * Notes
 * - Real deployments back this with their user database; `memory` is a development store
 */
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

pub use memory::InMemoryIdentityStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("identity not found")]
    NotFound,

    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, IdentityError>;

    async fn lookup_by_id(&self, id: &str) -> Result<Identity, IdentityError>;
}
