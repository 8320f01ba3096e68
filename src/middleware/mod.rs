/*
 * Responsibility
 * - middleware public interface
 * - auth::access (authenticate every request), auth::guard (per-route requirement), http (cross-cutting)
 */
pub mod auth;
pub mod http;
