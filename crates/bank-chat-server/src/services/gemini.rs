use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::services::provider::{EmbeddingProvider, LlmProvider};
use crate::utils::limiters::Limiters;

/// Gemini REST client used for both generation and embeddings
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    config: GeminiConfig,
    limiters: Arc<Limiters>,
}

impl GeminiService {
    pub fn new(config: GeminiConfig, limiters: Arc<Limiters>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            limiters,
        })
    }

    /// "gemini-1.5-flash" and "models/gemini-1.5-flash" both become the latter
    pub fn model_path(name: &str) -> String {
        if name.starts_with("models/") {
            name.to_string()
        } else {
            format!("models/{}", name)
        }
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            Self::model_path(model),
            method
        )
    }

    pub fn build_generate_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });

        if !self.config.system_instruction.trim().is_empty() {
            body["systemInstruction"] = json!({
                "parts": [{ "text": self.config.system_instruction }]
            });
        }

        body
    }

    /// Concatenate the text parts of the first candidate
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn extract_embedding(response: &Value) -> Option<Vec<f32>> {
        let values = response["embedding"]["values"].as_array()?;
        let embedding: Vec<f32> = values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if embedding.is_empty() || embedding.len() != values.len() {
            None
        } else {
            Some(embedding)
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .context("Failed to call Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, text);
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse Gemini response as JSON")
    }

    pub async fn generate_content(&self, prompt: &str) -> Result<String> {
        let (_permit, waited) = Limiters::acquire_timed(
            self.limiters.llm_generate.clone(),
            self.limiters.acquire_timeout,
            "gemini_generate",
        )
        .await?;

        debug!(
            "Generating with {} ({} chars, waited {:?})",
            self.config.model,
            prompt.len(),
            waited
        );

        let url = self.url(&self.config.model, "generateContent");
        let response = self.post_json(&url, &self.build_generate_body(prompt)).await?;

        Self::extract_text(&response).ok_or_else(|| {
            anyhow::anyhow!("Gemini returned no text candidates: {}", response)
        })
    }

    pub async fn embed_content(&self, text: &str) -> Result<Vec<f32>> {
        let (_permit, _waited) = Limiters::acquire_timed(
            self.limiters.embedding.clone(),
            self.limiters.acquire_timeout,
            "gemini_embedding",
        )
        .await?;

        let model = Self::model_path(&self.config.embedding_model);
        let body = json!({
            "model": model,
            "content": { "parts": [{ "text": text }] }
        });

        let url = self.url(&model, "embedContent");
        let response = self.post_json(&url, &body).await?;

        Self::extract_embedding(&response)
            .ok_or_else(|| anyhow::anyhow!("Gemini returned no embedding values"))
    }
}

#[async_trait]
impl LlmProvider for GeminiService {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt).await
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_content(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(base_url: &str, system_instruction: &str) -> GeminiService {
        let config = GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            model: "gemini-1.5-flash-latest".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            timeout_seconds: 5,
            system_instruction: system_instruction.to_string(),
        };
        let limiters = Arc::new(Limiters::new(&LimitsConfig {
            llm_concurrency: 2,
            embedding_concurrency: 2,
            acquire_timeout_ms: 1000,
        }));
        GeminiService::new(config, limiters).unwrap()
    }

    #[test]
    fn test_model_path() {
        assert_eq!(GeminiService::model_path("gemini-pro"), "models/gemini-pro");
        assert_eq!(
            GeminiService::model_path("models/embedding-001"),
            "models/embedding-001"
        );
    }

    #[test]
    fn test_system_instruction_optional() {
        let plain = service("http://localhost", "").build_generate_body("hi");
        assert!(plain.get("systemInstruction").is_none());

        let guided = service("http://localhost", "You are a bank assistant.")
            .build_generate_body("hi");
        assert_eq!(
            guided["systemInstruction"]["parts"][0]["text"],
            "You are a bank assistant."
        );
        assert_eq!(guided["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] } }]
        });
        assert_eq!(
            GeminiService::extract_text(&response).as_deref(),
            Some("Hello there")
        );
        assert!(GeminiService::extract_text(&json!({ "candidates": [] })).is_none());
    }

    #[tokio::test]
    async fn test_generate_content_wire_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash-latest:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "What is a savings account?" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "A savings account earns interest." }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = service(&server.uri(), "")
            .generate("What is a savings account?")
            .await
            .unwrap();
        assert_eq!(text, "A savings account earns interest.");
    }

    #[tokio::test]
    async fn test_embed_content_wire_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/embedding-001:embedContent"))
            .and(body_partial_json(json!({ "model": "models/embedding-001" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embedding": { "values": [0.25, -0.5, 1.0] }
            })))
            .mount(&server)
            .await;

        let embedding = service(&server.uri(), "").embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_api_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = service(&server.uri(), "").generate("hi").await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("quota exceeded"));
    }
}
