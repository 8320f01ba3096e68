//! In-process identity store for development and tests.
//!
//! Passwords are kept as argon2 PHC strings. Production deployments plug in
//! their own `IdentityStore`.

use std::collections::HashMap;
use std::sync::RwLock;

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use rand::RngCore;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Identity, IdentityError, IdentityStore};

struct Entry {
    identity: Identity,
    password_hash: String,
}

pub struct InMemoryIdentityStore {
    // keyed by lowercase username
    users: RwLock<HashMap<String, Entry>>,
    // verified against when the username is unknown, so both paths cost one argon2 run
    dummy_hash: Option<String>,
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            dummy_hash: hash_password("not-a-real-password").ok(),
        }
    }
}

impl std::fmt::Debug for InMemoryIdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.users.read().map(|u| u.len()).unwrap_or(0);
        f.debug_struct("InMemoryIdentityStore")
            .field("users", &count)
            .finish()
    }
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a user and return its identity.
    pub fn insert(
        &self,
        username: &str,
        email: &str,
        password: &str,
        roles: &[&str],
    ) -> Result<Identity, IdentityError> {
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };

        let password_hash = hash_password(password)?;

        let mut users = self
            .users
            .write()
            .map_err(|_| IdentityError::Unavailable("user table lock poisoned".to_string()))?;
        users.insert(
            identity.username.to_ascii_lowercase(),
            Entry {
                identity: identity.clone(),
                password_hash,
            },
        );

        debug!(user_id = %identity.id, username = %identity.username, "identity added");
        Ok(identity)
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, IdentityError> {
        let users = self
            .users
            .read()
            .map_err(|_| IdentityError::Unavailable("user table lock poisoned".to_string()))?;

        let Some(entry) = users.get(&username.trim().to_ascii_lowercase()) else {
            if let Some(dummy) = &self.dummy_hash {
                verify_password(dummy, password);
            }
            debug!("unknown username");
            return Err(IdentityError::InvalidCredentials);
        };

        if !verify_password(&entry.password_hash, password) {
            warn!(user_id = %entry.identity.id, "password mismatch");
            return Err(IdentityError::InvalidCredentials);
        }

        Ok(entry.identity.clone())
    }

    async fn lookup_by_id(&self, id: &str) -> Result<Identity, IdentityError> {
        let users = self
            .users
            .read()
            .map_err(|_| IdentityError::Unavailable("user table lock poisoned".to_string()))?;

        users
            .values()
            .find(|e| e.identity.id == id)
            .map(|e| e.identity.clone())
            .ok_or(IdentityError::NotFound)
    }
}

fn hash_password(password: &str) -> Result<String, IdentityError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| IdentityError::Unavailable(format!("salt encoding failed: {e}")))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| IdentityError::Unavailable(format!("password hashing failed: {e}")))?;
    Ok(phc.to_string())
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
