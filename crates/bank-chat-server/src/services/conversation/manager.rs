use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::cache::SessionCache;
use super::flow::AccountOpeningFlow;
use super::types::SessionState;
use crate::models::chat::{ChatMessage, ChatResponse, ReplySource, SessionView};
use crate::services::provider::LlmProvider;
use crate::services::response_cache::{ResponseCache, SemanticLookup};
use crate::utils::error::ApiError;

pub const FALLBACK_REPLY: &str =
    "I'm sorry, I'm having trouble generating a response right now. Please try again later.";

/// Routes each user message to the account-opening dialogue, the response
/// cache, or the LLM, and keeps the session transcript.
pub struct ConversationManager {
    sessions: SessionCache,
    cache: Arc<ResponseCache>,
    llm: Arc<dyn LlmProvider>,
}

impl ConversationManager {
    pub fn new(
        sessions: SessionCache,
        cache: Arc<ResponseCache>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            sessions,
            cache,
            llm,
        }
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn create_session(&self) -> Result<SessionView, ApiError> {
        let (_, handle) = self.sessions.create(None)?;
        let view = handle.lock().await.view();
        Ok(view)
    }

    pub async fn session_view(&self, session_id: &str) -> Option<SessionView> {
        let handle = self.sessions.get(session_id)?;
        let view = handle.lock().await.view();
        Some(view)
    }

    pub fn reset_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id);
        if removed {
            info!("Session {} reset", session_id);
        }
        removed
    }

    /// Handle one user message and return the assistant reply
    pub async fn handle_message(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<ChatResponse, ApiError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ApiError::BadRequest("message must not be empty".to_string()));
        }

        let start = Instant::now();
        let (session_id, handle) = self.sessions.get_or_create(session_id)?;
        let mut session = handle.lock().await;

        session.messages.push(ChatMessage::user(message));
        let (reply, source) = self.route(&mut session, message).await;
        session.messages.push(ChatMessage::assistant(reply.clone()));

        info!(
            session = %session_id,
            source = ?source,
            flow_state = ?session.flow_state,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Handled chat message"
        );

        Ok(ChatResponse {
            session_id,
            reply,
            source,
            flow_state: session.flow_state,
        })
    }

    async fn route(&self, session: &mut SessionState, message: &str) -> (String, ReplySource) {
        let flow_step = AccountOpeningFlow::advance(
            &mut session.flow_state,
            &mut session.account_details,
            message,
        );
        if let Some(step) = flow_step {
            if let Some(application) = step.submitted {
                info!(
                    session = %session.session_id,
                    account_type = application.account_type.as_deref().unwrap_or_default(),
                    session_age_secs = session.created_at.elapsed().as_secs(),
                    "Account opening request submitted"
                );
                session.submitted_applications.push(application);
            }
            return (step.reply, ReplySource::Flow);
        }

        if AccountOpeningFlow::is_open_intent(message) {
            let step =
                AccountOpeningFlow::start(&mut session.flow_state, &mut session.account_details);
            debug!("Session {} entered account opening flow", session.session_id);
            return (step.reply, ReplySource::Flow);
        }

        self.answer_question(session, message).await
    }

    /// Exact tier, then semantic tier, then the LLM
    async fn answer_question(
        &self,
        session: &mut SessionState,
        query: &str,
    ) -> (String, ReplySource) {
        if let Some(response) = self.cache.lookup_exact(&session.exact_cache, query) {
            return (response, ReplySource::ExactCache);
        }

        let embedding = match self.cache.lookup_semantic(query).await {
            Ok(SemanticLookup { hit: Some(hit), .. }) => {
                debug!(
                    session = %session.session_id,
                    record = %hit.id,
                    similarity = hit.similarity,
                    "Semantic cache hit"
                );
                session.exact_cache.insert(query, hit.response.clone());
                return (hit.response, ReplySource::SemanticCache);
            }
            Ok(SemanticLookup { hit: None, embedding }) => embedding,
            Err(e) => {
                warn!("Semantic cache lookup failed, falling through to LLM: {:#}", e);
                None
            }
        };

        self.cache.record_llm_call();
        match self.llm.generate(query).await {
            Ok(response) => {
                self.cache
                    .store(&mut session.exact_cache, query, &response, embedding)
                    .await;
                (response, ReplySource::Llm)
            }
            Err(e) => {
                self.cache.record_llm_failure();
                error!("An error occurred while generating a response: {:#}", e);
                (FALLBACK_REPLY.to_string(), ReplySource::Fallback)
            }
        }
    }
}
