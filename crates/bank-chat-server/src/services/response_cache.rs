//! Two-tier response cache.
//!
//! The exact tier is a plain map keyed by the verbatim query and lives in each
//! session. The semantic tier is the shared persistent [`VectorRepository`],
//! probed with the embedding of the query.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::services::provider::EmbeddingProvider;
use crate::vector_store::VectorRepository;

/// Verbatim query -> response map
#[derive(Debug, Clone, Default)]
pub struct ExactMatchCache {
    entries: HashMap<String, String>,
}

impl ExactMatchCache {
    pub fn get(&self, query: &str) -> Option<&str> {
        self.entries.get(query).map(String::as_str)
    }

    pub fn insert(&mut self, query: impl Into<String>, response: impl Into<String>) {
        self.entries.insert(query.into(), response.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SemanticHit {
    pub id: String,
    pub response: String,
    pub similarity: f32,
}

/// Outcome of a semantic probe. `embedding` is the query embedding when one
/// was computed, so a following [`ResponseCache::store`] can reuse it.
#[derive(Debug, Default)]
pub struct SemanticLookup {
    pub hit: Option<SemanticHit>,
    pub embedding: Option<Vec<f32>>,
}

/// Counter snapshot
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub semantic_entries: usize,
    pub exact_hits: u64,
    pub semantic_hits: u64,
    pub llm_calls: u64,
    pub llm_failures: u64,
}

#[derive(Default)]
struct Counters {
    exact_hits: AtomicU64,
    semantic_hits: AtomicU64,
    llm_calls: AtomicU64,
    llm_failures: AtomicU64,
}

pub struct ResponseCache {
    store: Arc<VectorRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    similarity_threshold: f32,
    counters: Counters,
}

impl ResponseCache {
    pub fn new(
        store: Arc<VectorRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        similarity_threshold: f32,
    ) -> Self {
        info!(
            "Response cache ready: collection='{}', entries={}, threshold={}",
            store.name(),
            store.count(),
            similarity_threshold
        );
        Self {
            store,
            embedder,
            similarity_threshold,
            counters: Counters::default(),
        }
    }

    /// Largest normalized L2 distance still counted as a hit.
    /// For unit vectors this is similarity >= `1 - (1 - threshold) / 2`.
    pub fn max_distance(&self) -> f32 {
        1.0 - self.similarity_threshold
    }

    pub fn lookup_exact(&self, exact: &ExactMatchCache, query: &str) -> Option<String> {
        let hit = exact.get(query).map(str::to_string);
        if hit.is_some() {
            self.counters.exact_hits.fetch_add(1, Ordering::Relaxed);
            debug!("Exact cache hit ({} chars)", query.len());
        }
        hit
    }

    /// Probe the collection with the embedding of `query`. Embedding is
    /// skipped entirely while the collection is empty.
    pub async fn lookup_semantic(&self, query: &str) -> Result<SemanticLookup> {
        if self.store.count() == 0 {
            return Ok(SemanticLookup::default());
        }

        let embedding = self.embedder.embed(query).await?;
        let nearest = self.store.query(&embedding, 1).into_iter().next();

        let hit = match nearest {
            Some(nearest) if nearest.distance <= self.max_distance() => {
                self.counters.semantic_hits.fetch_add(1, Ordering::Relaxed);
                Some(SemanticHit {
                    id: nearest.record.id,
                    response: nearest.record.response,
                    similarity: 1.0 - nearest.distance / 2.0,
                })
            }
            Some(nearest) => {
                debug!(
                    "Semantic cache miss: nearest {} at distance {:.4}",
                    nearest.record.id, nearest.distance
                );
                None
            }
            None => None,
        };

        Ok(SemanticLookup {
            hit,
            embedding: Some(embedding),
        })
    }

    /// Save a fresh LLM answer in both tiers, embedding the query unless
    /// `embedding` is given. Semantic-tier failures are logged and
    /// swallowed; returns the new record id on success.
    pub async fn store(
        &self,
        exact: &mut ExactMatchCache,
        query: &str,
        response: &str,
        embedding: Option<Vec<f32>>,
    ) -> Option<String> {
        exact.insert(query, response);

        let embedding = match embedding {
            Some(embedding) => embedding,
            None => match self.embedder.embed(query).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!("Error embedding query for semantic cache: {:#}", e);
                    return None;
                }
            },
        };

        match self.store.add(query, response, embedding).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Error storing response in semantic cache: {:#}", e);
                None
            }
        }
    }

    pub fn record_llm_call(&self) {
        self.counters.llm_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_llm_failure(&self) {
        self.counters.llm_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            semantic_entries: self.store.count(),
            exact_hits: self.counters.exact_hits.load(Ordering::Relaxed),
            semantic_hits: self.counters.semantic_hits.load(Ordering::Relaxed),
            llm_calls: self.counters.llm_calls.load(Ordering::Relaxed),
            llm_failures: self.counters.llm_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::MockEmbeddingProvider;

    fn embedder_returning(vector: Vec<f32>) -> Arc<dyn EmbeddingProvider> {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed().returning(move |_| Ok(vector.clone()));
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_semantic_hit_above_threshold() {
        let store = Arc::new(VectorRepository::in_memory("test"));
        store
            .add("How do I open a savings account?", "Visit a branch.", vec![1.0, 0.0])
            .await
            .unwrap();

        // cos([1,0],[0.98, 0.199]) ~= 0.98, distance ~= 0.04
        let cache = ResponseCache::new(store, embedder_returning(vec![0.98, 0.199]), 0.9);
        let lookup = cache
            .lookup_semantic("how can I open a savings account")
            .await
            .unwrap();
        assert_eq!(lookup.embedding, Some(vec![0.98, 0.199]));
        let hit = lookup.hit.expect("should hit");

        assert_eq!(hit.id, "response_1");
        assert_eq!(hit.response, "Visit a branch.");
        assert!(hit.similarity > 0.97);
        assert_eq!(cache.stats().semantic_hits, 1);
    }

    #[tokio::test]
    async fn test_semantic_miss_below_threshold() {
        let store = Arc::new(VectorRepository::in_memory("test"));
        store.add("q", "a", vec![1.0, 0.0]).await.unwrap();

        // cos ~= 0.5
        let cache = ResponseCache::new(store, embedder_returning(vec![0.5, 0.866]), 0.9);
        assert!(cache.lookup_semantic("other").await.unwrap().hit.is_none());
        assert_eq!(cache.stats().semantic_hits, 0);
    }

    #[tokio::test]
    async fn test_neighbouring_question_at_cos_092_misses() {
        let store = Arc::new(VectorRepository::in_memory("test"));
        store
            .add("minimum balance for savings", "Savings minimum is $500", vec![1.0, 0.0])
            .await
            .unwrap();

        // Unit vector at cos 0.92: squared L2 distance 0.16 > 0.1
        let cache = ResponseCache::new(store, embedder_returning(vec![0.92, 0.391_918]), 0.9);
        let lookup = cache
            .lookup_semantic("minimum balance for checking")
            .await
            .unwrap();

        assert!(lookup.hit.is_none());
        assert_eq!(cache.stats().semantic_hits, 0);
    }

    #[tokio::test]
    async fn test_empty_store_skips_embedding() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed().never();

        let cache = ResponseCache::new(
            Arc::new(VectorRepository::in_memory("test")),
            Arc::new(mock),
            0.9,
        );
        let lookup = cache.lookup_semantic("anything").await.unwrap();
        assert!(lookup.hit.is_none());
        assert!(lookup.embedding.is_none());
    }

    #[tokio::test]
    async fn test_store_writes_both_tiers() {
        let store = Arc::new(VectorRepository::in_memory("test"));
        let cache = ResponseCache::new(store.clone(), embedder_returning(vec![0.1, 0.9]), 0.9);
        let mut exact = ExactMatchCache::default();

        let id = cache
            .store(&mut exact, "What is APR?", "Annual rate.", None)
            .await;

        assert_eq!(id.as_deref(), Some("response_1"));
        assert_eq!(exact.get("What is APR?"), Some("Annual rate."));
        assert_eq!(store.get("response_1").unwrap().query, "What is APR?");
    }

    #[tokio::test]
    async fn test_store_survives_embedding_failure() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed()
            .returning(|_| Err(anyhow::anyhow!("embedding backend down")));

        let store = Arc::new(VectorRepository::in_memory("test"));
        let cache = ResponseCache::new(store.clone(), Arc::new(mock), 0.9);
        let mut exact = ExactMatchCache::default();

        assert!(cache.store(&mut exact, "q", "a", None).await.is_none());
        assert_eq!(exact.len(), 1);
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_store_reuses_given_embedding() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed().never();

        let store = Arc::new(VectorRepository::in_memory("test"));
        let cache = ResponseCache::new(store.clone(), Arc::new(mock), 0.9);
        let mut exact = ExactMatchCache::default();

        let id = cache
            .store(&mut exact, "q", "a", Some(vec![0.6, 0.8]))
            .await;
        assert_eq!(id.as_deref(), Some("response_1"));
        assert_eq!(store.get("response_1").unwrap().embedding, vec![0.6, 0.8]);
    }

    #[test]
    fn test_exact_lookup_counts_hits() {
        let cache = ResponseCache::new(
            Arc::new(VectorRepository::in_memory("test")),
            Arc::new(MockEmbeddingProvider::new()),
            0.9,
        );
        let mut exact = ExactMatchCache::default();
        exact.insert("hello", "hi there");

        assert_eq!(cache.lookup_exact(&exact, "hello").as_deref(), Some("hi there"));
        assert!(cache.lookup_exact(&exact, "Hello").is_none());
        assert_eq!(cache.stats().exact_hits, 1);
    }
}
