pub mod chat;
pub mod faq;
pub mod health;
pub mod session;
pub mod stats;

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::state::AppState;

/// API routes plus the static chat page served from `static_dir`
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/sessions", post(session::create_session_handler))
        .route(
            "/api/sessions/{session_id}",
            get(session::get_session_handler).delete(session::reset_session_handler),
        )
        .route("/api/faq", get(faq::faq_handler))
        .route("/api/cache/stats", get(stats::cache_stats_handler))
        .with_state(state);

    let static_files = ServeDir::new(static_dir)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    api_routes
        .fallback_service(static_files)
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
}
