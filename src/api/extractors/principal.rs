/*
 * Responsibility
 * - Hand the request's Principal to handlers
 * - access middleware has already stored `Authentication` in request extensions;
 *   without it the principal is anonymous (never an error)
 */
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::services::auth::{Authentication, Principal};

pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Authentication>()
            .map(|auth| auth.principal.clone())
            .unwrap_or_else(Principal::anonymous);
        Ok(CurrentPrincipal(principal))
    }
}
