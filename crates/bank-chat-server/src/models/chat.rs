use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Where an assistant reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Flow,
    ExactCache,
    SemanticCache,
    Llm,
    Fallback,
}

/// Account-opening dialogue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    #[default]
    Idle,
    AskName,
    AskEmail,
    AskAccountType,
    Confirmation,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub message: String,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: SessionId,
    pub reply: String,
    pub source: ReplySource,
    pub flow_state: FlowState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub flow_state: FlowState,
    pub account_details: AccountDetails,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FaqResponse {
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub semantic_entries: usize,
    pub exact_hits: u64,
    pub semantic_hits: u64,
    pub llm_calls: u64,
    pub llm_failures: u64,
    pub active_sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_state_wire_names() {
        assert_eq!(serde_json::to_string(&FlowState::Idle).unwrap(), "\"IDLE\"");
        assert_eq!(
            serde_json::to_string(&FlowState::AskAccountType).unwrap(),
            "\"ASK_ACCOUNT_TYPE\""
        );
    }

    #[test]
    fn test_reply_source_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReplySource::SemanticCache).unwrap(),
            "\"semantic_cache\""
        );
    }

    #[test]
    fn test_chat_request_without_session() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.session_id.is_none());
        assert_eq!(req.message, "hi");
    }
}
