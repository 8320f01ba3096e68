/*
 * Responsibility
 * - POST /api/login: credentials (JSON) -> bearer token
 * - GET /api/private: token-protected sample resource
 */
use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::{Value, json};

use crate::{
    api::{
        dto::login::{LoginRequest, TokenResponse},
        extractors::CurrentPrincipal,
    },
    error::AppError,
    state::AppState,
};

pub async fn api_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    req.validate()
        .map_err(|msg| AppError::InvalidRequest(msg.to_string()))?;

    let issued = state
        .login
        .login_with_token(&req.username, &req.password, &[])
        .await?;

    Ok(Json(TokenResponse {
        expires_in: issued.expires_in_seconds(Utc::now()),
        token: issued.token,
        token_type: "Bearer",
    }))
}

pub async fn api_private(CurrentPrincipal(principal): CurrentPrincipal) -> Json<Value> {
    let name = principal.name().unwrap_or("unknown");
    Json(json!({ "privateData": format!("some secret for {name}") }))
}
