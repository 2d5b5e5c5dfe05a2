//! TyreFusion API: catalog, vehicle fitment lookup, checkout and back-office
//! for the TyreFusion storefront.
mod clients;
mod constants;
mod db;
mod middleware;
mod routes;
mod services;
mod state;
mod utils;

use std::time::Duration;

use axum::http::{Request, Response};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, OnResponse as _, TraceLayer},
};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use crate::{
    clients::{firebase::FirebaseClient, openrouter::OpenRouterClient, wheelsize::WheelSizeClient},
    constants::{
        api::BIND_ADDRESS,
        integrations::{
            FIREBASE_API_KEY, OPENROUTER_API_KEY, OPENROUTER_MODEL, WHEELSIZE_API_BASE,
            WHEELSIZE_API_KEY,
        },
    },
    services::{media, notifications::Mailer, otp, sessions},
    state::AppState,
};

#[tokio::main]
async fn main() {
    // A missing .env is normal in containers.
    let _ = dotenvy::dotenv();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tyrefusion_api=info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_conn = db::connect().await.expect("Failed to connect to database");
    db::migrate(&db_conn)
        .await
        .expect("Failed to apply database migrations");
    tracing::info!("Database ready");

    let session_store = sessions::store::Connection::connect()
        .await
        .expect("Failed to connect to session store");
    let otp_store = otp::store::Connection::new(session_store.multiplexed());

    let media_store = media::connect_store().expect("Failed to configure object store");
    if media_store.is_none() {
        tracing::warn!("S3_HOST is not set, image uploads are disabled");
    }

    let http = clients::http_client().expect("Failed to build HTTP client");
    let mailer = Mailer::from_env(http.clone()).expect("Failed to configure mailer");
    tracing::info!(provider = mailer.provider_name(), "Mailer configured");

    let state = AppState {
        db: db_conn,
        session_store,
        otp_store,
        mailer,
        openrouter: OpenRouterClient::new(
            http.clone(),
            OPENROUTER_API_KEY.clone(),
            &OPENROUTER_MODEL,
        ),
        wheel_size: WheelSizeClient::new(
            http.clone(),
            &WHEELSIZE_API_BASE,
            WHEELSIZE_API_KEY.clone(),
        ),
        firebase: FirebaseClient::new(http, FIREBASE_API_KEY.clone()),
        media_store,
    };

    let app = routes::create_router(&state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(BIND_ADDRESS.as_str())
        .await
        .expect("Failed to bind listener");
    tracing::info!(address = %*BIND_ADDRESS, "TyreFusion API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to init Axum service");
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
