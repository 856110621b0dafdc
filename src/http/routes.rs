use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Voice chat
        .route("/chat/lease", post(handlers::set_chat_lease))
        .route("/chat/capture/start", post(handlers::start_chat_capture))
        .route("/chat/capture/stop", post(handlers::stop_chat_capture))
        .route("/chat/state", get(handlers::get_chat_state))
        .route("/chat/transcript", get(handlers::get_chat_transcript))
        .route("/chat/turns/:index/replay", post(handlers::replay_chat_turn))
        .route("/chat/error/ack", post(handlers::ack_chat_error))
        // Maintenance reporting
        .route(
            "/maintenance/details",
            post(handlers::set_maintenance_details),
        )
        .route(
            "/maintenance/capture/start",
            post(handlers::start_maintenance_capture),
        )
        .route(
            "/maintenance/capture/stop",
            post(handlers::stop_maintenance_capture),
        )
        .route("/maintenance/state", get(handlers::get_maintenance_state))
        .route("/maintenance/result", get(handlers::get_maintenance_result))
        .route(
            "/maintenance/error/ack",
            post(handlers::ack_maintenance_error),
        )
        // Deposit walkthrough
        .route(
            "/walkthrough/capture/start",
            post(handlers::start_walkthrough_capture),
        )
        .route(
            "/walkthrough/capture/stop",
            post(handlers::stop_walkthrough_capture),
        )
        .route("/walkthrough/state", get(handlers::get_walkthrough_state))
        .route("/walkthrough/reset", post(handlers::reset_walkthrough))
        // The UI collaborator is a browser page on another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
