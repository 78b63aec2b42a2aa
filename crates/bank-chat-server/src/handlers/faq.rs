use axum::{extract::State, Json};
use std::sync::Arc;

use crate::config::FaqConfig;
use crate::models::chat::FaqResponse;

pub async fn faq_handler(State(faq): State<Arc<FaqConfig>>) -> Json<FaqResponse> {
    Json(FaqResponse {
        questions: faq.questions.clone(),
    })
}
