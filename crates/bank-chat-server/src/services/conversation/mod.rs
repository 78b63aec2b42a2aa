//! Conversation management
//!
//! - Per-session state in a DashMap, one async mutex per session
//! - Guided account-opening dialogue
//! - Routing between the dialogue, the response cache and the LLM

mod cache;
pub mod flow;
pub mod manager;
pub mod types;

pub use cache::{SessionCache, SessionHandle};
pub use flow::{AccountOpeningFlow, FlowStep};
pub use manager::ConversationManager;
pub use types::SessionState;
