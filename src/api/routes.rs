/*
 * Responsibility
 * - URL structure
 * - Which routes require which scheme (AuthRequirement via guard::require)
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{
    health::health,
    session::{login, login_form, logout, private_page},
    token::{api_login, api_private},
};
use crate::middleware::auth::guard;
use crate::services::auth::AuthRequirement;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/login", post(api_login))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout).post(logout));

    let token_only = guard::require(
        Router::new().route("/api/private", get(api_private)),
        state,
        AuthRequirement::token(),
    );

    let cookie_only = guard::require(
        Router::new().route("/private", get(private_page)),
        state,
        AuthRequirement::cookie(),
    );

    public.merge(token_only).merge(cookie_only)
}
