/*
 * Responsibility
 * - Extractors shared by handlers
 */
mod principal;

pub use principal::CurrentPrincipal;
