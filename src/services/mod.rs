//! Services which hold the core business logic routes call into.
pub mod ai_search;
pub mod auth;
pub mod cars;
pub mod cart;
pub mod errors;
pub mod fitments;
pub mod media;
pub mod notifications;
pub mod orders;
pub mod otp;
pub mod payments;
pub mod sessions;
pub mod sizes;
pub mod stats;
pub mod tyres;
pub mod wheels;
