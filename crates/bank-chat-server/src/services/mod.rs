pub mod conversation;
pub mod gemini;
pub mod provider;
pub mod response_cache;

pub use conversation::ConversationManager;
pub use gemini::GeminiService;
pub use provider::{EmbeddingProvider, LlmProvider};
pub use response_cache::{CacheStats, ExactMatchCache, ResponseCache};
