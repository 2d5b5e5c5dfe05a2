//! Defines data models (structs) which map directly to rows in the database.
pub mod ai_fitment_cache;
pub mod apporder;
pub mod appuser;
pub mod car;
pub mod fitment;
pub mod fitment_cache;
pub mod password;
pub mod tyre;
