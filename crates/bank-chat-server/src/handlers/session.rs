use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::chat::SessionView;
use crate::services::ConversationManager;
use crate::utils::error::ApiError;

pub async fn create_session_handler(
    State(manager): State<Arc<ConversationManager>>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let view = manager.create_session().await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    manager
        .session_view(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", session_id)))
}

pub async fn reset_session_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if manager.reset_session(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session {}", session_id)))
    }
}
