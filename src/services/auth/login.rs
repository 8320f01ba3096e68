use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::AppError;
use crate::services::identity::{IdentityError, IdentityStore};

use super::claims::{Claim, ClaimsBuilder};
use super::session_issuer::{SessionCookie, SessionIssuer};
use super::token_issuer::{IssuedToken, TokenIssuer};

/// Orchestrates the two login flows:
/// credentials -> IdentityStore -> ClaimsBuilder -> TokenIssuer | SessionIssuer.
#[derive(Clone)]
pub struct LoginService {
    identities: Arc<dyn IdentityStore>,
    claims: ClaimsBuilder,
    tokens: TokenIssuer,
    sessions: SessionIssuer,
}

impl std::fmt::Debug for LoginService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginService")
            .field("tokens", &self.tokens)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl LoginService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        tokens: TokenIssuer,
        sessions: SessionIssuer,
    ) -> Self {
        Self {
            identities,
            claims: ClaimsBuilder::new(),
            tokens,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// API login: verify credentials and issue a bearer token.
    pub async fn login_with_token(
        &self,
        username: &str,
        password: &str,
        extra: &[Claim],
    ) -> Result<IssuedToken, AppError> {
        let claims = self.verified_claims(username, password, extra).await?;
        let issued = self.tokens.issue(&claims).map_err(|e| {
            error!(error = %e, "token issuance failed");
            AppError::Internal
        })?;
        info!(username = %username, "api login succeeded");
        Ok(issued)
    }

    /// Interactive login: verify credentials and start a cookie session.
    pub async fn login_with_session(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionCookie, AppError> {
        let claims = self.verified_claims(username, password, &[]).await?;
        let cookie = self.sessions.issue(&claims).map_err(|e| {
            error!(error = %e, "session issuance failed");
            AppError::Internal
        })?;
        info!(username = %username, "interactive login succeeded");
        Ok(cookie)
    }

    async fn verified_claims(
        &self,
        username: &str,
        password: &str,
        extra: &[Claim],
    ) -> Result<Vec<Claim>, AppError> {
        let identity = self
            .identities
            .verify_credentials(username, password)
            .await
            .map_err(|e| match e {
                IdentityError::InvalidCredentials | IdentityError::NotFound => {
                    warn!(username = %username, "login rejected");
                    AppError::Unauthorized
                }
                IdentityError::Unavailable(reason) => {
                    error!(reason = %reason, "identity store unavailable");
                    AppError::Internal
                }
            })?;

        self.claims.build(&identity, extra).map_err(|e| {
            warn!(user_id = %identity.id, error = %e, "identity record unusable for login");
            AppError::Unauthorized
        })
    }
}
