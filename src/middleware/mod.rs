//! Axum middleware layered onto the routers.
pub mod auth;
