use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::FaqConfig;
use crate::services::ConversationManager;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversation_manager: Arc<ConversationManager>,
    pub faq: Arc<FaqConfig>,
}

impl AppState {
    pub fn new(conversation_manager: Arc<ConversationManager>, faq: FaqConfig) -> Self {
        Self {
            conversation_manager,
            faq: Arc::new(faq),
        }
    }
}

impl FromRef<AppState> for Arc<ConversationManager> {
    fn from_ref(state: &AppState) -> Self {
        state.conversation_manager.clone()
    }
}

impl FromRef<AppState> for Arc<FaqConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.faq.clone()
    }
}
