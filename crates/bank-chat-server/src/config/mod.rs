pub mod settings;

pub use settings::{
    CacheConfig, FaqConfig, GeminiConfig, LimitsConfig, LoggingConfig, ServerConfig,
    SessionConfig, Settings,
};
