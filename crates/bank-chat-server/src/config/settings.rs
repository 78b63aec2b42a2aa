use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub faq: FaqConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

#[derive(Deserialize, Serialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
    /// Optional system instruction sent with every generation request
    #[serde(default)]
    pub system_instruction: String,
}

// Keep the key out of logs
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// Minimum cosine similarity for a semantic hit (0.0 - 1.0]
    pub similarity_threshold: f32,
    pub persist_directory: PathBuf,
    pub collection: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Idle time after which a session is dropped
    pub ttl_seconds: u64,
    pub cleanup_interval_seconds: u64,
    /// Refuse new sessions above this host memory usage
    pub max_memory_percent: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LimitsConfig {
    pub llm_concurrency: usize,
    pub embedding_concurrency: usize,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    pub format: String,
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
            directory: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FaqConfig {
    pub questions: Vec<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(true))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.finalize(std::env::var("GOOGLE_API_KEY").ok())
    }

    /// Parse settings from a TOML document (no environment overlay)
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.finalize(None)
    }

    /// Apply the GOOGLE_API_KEY fallback and validate
    fn finalize(mut self, env_api_key: Option<String>) -> Result<Self> {
        if self.gemini.api_key.trim().is_empty() {
            if let Some(key) = env_api_key.filter(|k| !k.trim().is_empty()) {
                self.gemini.api_key = key;
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gemini.api_key.trim().is_empty() {
            anyhow::bail!(
                "GOOGLE_API_KEY not found in environment variables (or APP__GEMINI__API_KEY)"
            );
        }

        let threshold = self.cache.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            anyhow::bail!(
                "cache.similarity_threshold must be in (0, 1], got {}",
                threshold
            );
        }

        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }

        if self.cache.collection.trim().is_empty() {
            anyhow::bail!("cache.collection must not be empty");
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<std::net::SocketAddr> {
        let ip = self
            .server
            .host
            .parse::<std::net::IpAddr>()
            .with_context(|| format!("Invalid server.host: {}", self.server.host))?;
        Ok(std::net::SocketAddr::from((ip, self.server.port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(api_key: &str, threshold: f32) -> String {
        format!(
            r#"
[server]
host = "0.0.0.0"
port = 8501

[gemini]
api_key = "{api_key}"
base_url = "https://generativelanguage.googleapis.com/v1beta"
model = "gemini-1.5-flash-latest"
embedding_model = "models/embedding-001"
timeout_seconds = 60

[cache]
similarity_threshold = {threshold}
persist_directory = "./vector_data"
collection = "chatbot_responses"

[session]
ttl_seconds = 21600
cleanup_interval_seconds = 300
max_memory_percent = 90.0

[limits]
llm_concurrency = 4
embedding_concurrency = 8
acquire_timeout_ms = 30000

[faq]
questions = ["What are your opening hours?"]
"#
        )
    }

    #[test]
    fn test_parse_full_settings() {
        let settings = Settings::from_toml(&sample("secret", 0.9)).unwrap();
        assert_eq!(settings.server.port, 8501);
        assert_eq!(settings.cache.collection, "chatbot_responses");
        assert_eq!(settings.faq.questions.len(), 1);
        assert_eq!(settings.logging.format, "pretty");
        assert_eq!(settings.server.static_dir, PathBuf::from("static"));
        assert_eq!(settings.bind_addr().unwrap().port(), 8501);
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let err = Settings::from_toml(&sample("", 0.9)).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_env_api_key_fallback() {
        let config = Config::builder()
            .add_source(File::from_str(&sample("", 0.9), FileFormat::Toml))
            .build()
            .unwrap();
        let settings: Settings = config.try_deserialize().unwrap();

        let settings = settings.finalize(Some("from-env".to_string())).unwrap();
        assert_eq!(settings.gemini.api_key, "from-env");
    }

    #[test]
    fn test_threshold_out_of_range() {
        assert!(Settings::from_toml(&sample("k", 0.0)).is_err());
        assert!(Settings::from_toml(&sample("k", 1.5)).is_err());
        assert!(Settings::from_toml(&sample("k", 1.0)).is_ok());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = Settings::from_toml(&sample("super-secret", 0.9)).unwrap();
        let printed = format!("{:?}", settings.gemini);
        assert!(!printed.contains("super-secret"));
    }
}
