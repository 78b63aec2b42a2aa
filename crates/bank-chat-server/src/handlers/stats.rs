use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::chat::CacheStatsResponse;
use crate::services::ConversationManager;

pub async fn cache_stats_handler(
    State(manager): State<Arc<ConversationManager>>,
) -> Json<CacheStatsResponse> {
    let stats = manager.cache().stats();

    Json(CacheStatsResponse {
        semantic_entries: stats.semantic_entries,
        exact_hits: stats.exact_hits,
        semantic_hits: stats.semantic_hits,
        llm_calls: stats.llm_calls,
        llm_failures: stats.llm_failures,
        active_sessions: manager.sessions().len(),
    })
}
