//! Defines the state shared across the Axum application.
use std::sync::Arc;

use object_store::ObjectStore;

use crate::{
    clients::{firebase::FirebaseClient, openrouter::OpenRouterClient, wheelsize::WheelSizeClient},
    db,
    services::{notifications::Mailer, otp, sessions},
};

#[derive(Clone)]
/// The state struct shared across routers.
pub struct AppState {
    /// A database connection pool for getting new database connections.
    pub db: db::ConnectionPool,
    /// A multiplexed connection for getting new session store connections.
    pub session_store: sessions::store::Connection,
    /// Pending one-time passwords, sharing the session store's Redis.
    pub otp_store: otp::store::Connection,
    pub mailer: Mailer,
    pub openrouter: OpenRouterClient,
    pub wheel_size: WheelSizeClient,
    pub firebase: FirebaseClient,
    /// Where uploaded tyre images go. `None` when no store is configured.
    pub media_store: Option<Arc<dyn ObjectStore>>,
}
