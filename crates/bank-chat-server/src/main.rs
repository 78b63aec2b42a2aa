use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use bank_chat_server::config::Settings;
use bank_chat_server::handlers::build_router;
use bank_chat_server::services::conversation::SessionCache;
use bank_chat_server::services::{ConversationManager, GeminiService, ResponseCache};
use bank_chat_server::state::AppState;
use bank_chat_server::utils::{logger, Limiters};
use bank_chat_server::vector_store::VectorRepository;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (fails fast without an API key)
    let settings = Settings::load()?;

    let _log_guard = logger::init_logger(&settings.logging)?;
    info!("🚀 Starting Bank Chat Server...");
    info!("✅ Configuration loaded: {:?}", settings.gemini);

    let limiters = Arc::new(Limiters::new(&settings.limits));
    let gemini = Arc::new(GeminiService::new(settings.gemini.clone(), limiters)?);

    // Semantic tier
    let store = Arc::new(
        VectorRepository::open(&settings.cache.persist_directory, &settings.cache.collection)
            .await?,
    );
    let response_cache = Arc::new(ResponseCache::new(
        store,
        gemini.clone(),
        settings.cache.similarity_threshold,
    ));
    info!("✅ Response cache ready");

    let sessions = SessionCache::new(
        Duration::from_secs(settings.session.ttl_seconds),
        settings.session.max_memory_percent,
    );
    let cleanup = sessions.spawn_cleanup(Duration::from_secs(
        settings.session.cleanup_interval_seconds,
    ));

    let conversation_manager = Arc::new(ConversationManager::new(
        sessions,
        response_cache,
        gemini,
    ));

    let state = AppState::new(conversation_manager, settings.faq.clone());
    let app = build_router(state, &settings.server.static_dir);

    let addr = settings.bind_addr()?;
    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
