//! Constants (primary environment variables/secrets) used across the application.
pub mod api;
pub mod auth;
pub mod db;
pub mod email;
pub mod integrations;
pub mod payments;
pub mod redis;
pub mod s3;
mod secrets;
pub mod sessions;
