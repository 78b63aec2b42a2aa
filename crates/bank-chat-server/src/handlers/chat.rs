use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::debug;

use crate::models::chat::{ChatRequest, ChatResponse};
use crate::services::ConversationManager;
use crate::utils::error::ApiError;

pub async fn chat_handler(
    State(manager): State<Arc<ConversationManager>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    debug!(
        "Chat request: session={:?}, message_len={}",
        request.session_id,
        request.message.len()
    );

    let response = manager
        .handle_message(request.session_id.as_deref(), &request.message)
        .await?;

    Ok(Json(response))
}
