/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 * - Clone is cheap (everything behind Arc, immutable after startup)
 */
use std::sync::Arc;

use crate::services::auth::{AuthenticationRouter, LoginService};

#[derive(Clone, Debug)]
pub struct AppState {
    pub login: Arc<LoginService>,
    pub auth: Arc<AuthenticationRouter>,
}

impl AppState {
    pub fn new(login: Arc<LoginService>, auth: Arc<AuthenticationRouter>) -> Self {
        Self { login, auth }
    }
}
