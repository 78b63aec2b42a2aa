use std::time::Instant;

use crate::models::chat::{AccountDetails, ChatMessage, FlowState, SessionId, SessionView};
use crate::services::response_cache::ExactMatchCache;

pub const WELCOME_MESSAGE: &str =
    "Welcome! I can help you with general banking questions or guide you through opening an account.";

/// Complete per-session state kept in memory
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: SessionId,

    /// Where the account-opening dialogue currently stands
    pub flow_state: FlowState,

    /// Details collected by the account-opening dialogue
    pub account_details: AccountDetails,

    /// Full transcript, starting with the welcome message
    pub messages: Vec<ChatMessage>,

    /// Exact-match tier of the response cache
    pub exact_cache: ExactMatchCache,

    /// Applications confirmed in this session
    pub submitted_applications: Vec<AccountDetails>,

    pub created_at: Instant,
}

impl SessionState {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            flow_state: FlowState::Idle,
            account_details: AccountDetails::default(),
            messages: vec![ChatMessage::assistant(WELCOME_MESSAGE)],
            exact_cache: ExactMatchCache::default(),
            submitted_applications: Vec::new(),
            created_at: Instant::now(),
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.session_id.clone(),
            flow_state: self.flow_state,
            account_details: self.account_details.clone(),
            messages: self.messages.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;

    #[test]
    fn test_new_session_starts_with_welcome() {
        let state = SessionState::new("abc".to_string());
        assert_eq!(state.flow_state, FlowState::Idle);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, Role::Assistant);
        assert_eq!(state.messages[0].content, WELCOME_MESSAGE);
        assert!(state.exact_cache.is_empty());
    }
}
