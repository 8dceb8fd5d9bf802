use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wheeldash::{
    api,
    auth::{self, HostAuth},
    cue::BroadcastCues,
    llm,
    services::Services,
    session::Session,
    settings::ServerConfig,
    state::AppState,
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wheeldash=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting WheelDash...");

    let config = ServerConfig::from_env();
    let llm_config = llm::LlmConfig::from_env();

    // Cues ride the same channel as every other broadcast
    let (tx, _rx) = broadcast::channel(256);
    let services = Services::init(
        &config,
        llm_config,
        Arc::new(BroadcastCues::new(tx.clone())),
    );

    let state = Arc::new(
        AppState::with_parts(Session::new(), services, tx).with_host_auth(HostAuth::from_env()),
    );
    state.load_settings().await;

    let api_routes = Router::new()
        .route("/puzzles", get(api::list_puzzles).post(api::add_puzzle))
        .route("/puzzles/generate", post(api::generate_puzzles))
        .route("/settings", get(api::get_settings).put(api::put_settings))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::host_api_middleware,
        ));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    tracing::info!("Listening on http://{}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    state.services.teardown().await;
    tracing::info!("WheelDash stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
