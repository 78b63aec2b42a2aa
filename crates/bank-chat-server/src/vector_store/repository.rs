use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::models::{CacheRecord, CollectionFile, ScoredRecord};
use crate::utils::normalized_l2_distance;

/// Append-only collection of cached responses, searchable by embedding.
///
/// The whole collection is held in memory and mirrored to
/// `{dir}/{name}.json` after every insert. Lookups are a linear scan.
pub struct VectorRepository {
    name: String,
    path: Option<PathBuf>,
    records: RwLock<Vec<CacheRecord>>,
    /// Serializes inserts so ids and on-disk snapshots stay in order
    write_lock: tokio::sync::Mutex<()>,
}

impl VectorRepository {
    /// Open (or create) a persistent collection under `dir`
    pub async fn open(dir: &Path, name: &str) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create persist directory {}", dir.display()))?;

        let path = dir.join(format!("{}.json", name));
        let records = Self::load_records(&path).await;

        info!(
            "Opened collection '{}' at {} ({} records)",
            name,
            path.display(),
            records.len()
        );

        Ok(Self {
            name: name.to_string(),
            path: Some(path),
            records: RwLock::new(records),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Collection that never touches disk
    pub fn in_memory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: None,
            records: RwLock::new(Vec::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> usize {
        self.records.read().len()
    }

    pub fn get(&self, id: &str) -> Option<CacheRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }

    /// Nearest `n_results` records by normalized L2 distance, closest first.
    /// Records whose dimension differs from the probe are skipped.
    pub fn query(&self, embedding: &[f32], n_results: usize) -> Vec<ScoredRecord> {
        if n_results == 0 {
            return Vec::new();
        }

        let records = self.records.read();
        let mut scored: Vec<ScoredRecord> = records
            .iter()
            .filter_map(|record| match normalized_l2_distance(embedding, &record.embedding) {
                Ok(distance) => Some(ScoredRecord {
                    record: record.clone(),
                    distance,
                }),
                Err(e) => {
                    debug!("Skipping record {}: {}", record.id, e);
                    None
                }
            })
            .collect();
        drop(records);

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(n_results);
        scored
    }

    /// Append a record and persist the collection. Returns the new id.
    /// The record becomes visible only after the file is written.
    pub async fn add(&self, query: &str, response: &str, embedding: Vec<f32>) -> Result<String> {
        if embedding.is_empty() {
            anyhow::bail!("Refusing to store an empty embedding");
        }

        let _guard = self.write_lock.lock().await;

        let record = CacheRecord {
            id: format!("response_{}", self.count() + 1),
            query: query.to_string(),
            response: response.to_string(),
            embedding,
            created_at: Utc::now(),
        };

        if let Some(path) = self.path.as_ref() {
            let snapshot = {
                let records = self.records.read();
                let mut all = Vec::with_capacity(records.len() + 1);
                all.extend(records.iter().cloned());
                all.push(record.clone());
                CollectionFile {
                    name: self.name.clone(),
                    records: all,
                }
            };
            Self::persist(path, &snapshot).await?;
        }

        let id = record.id.clone();
        self.records.write().push(record);

        debug!("Stored {} in collection '{}'", id, self.name);
        Ok(id)
    }

    async fn load_records(path: &Path) -> Vec<CacheRecord> {
        match tokio::fs::read_to_string(path).await {
            Ok(data) => match serde_json::from_str::<CollectionFile>(&data) {
                Ok(file) => file.records,
                Err(e) => {
                    warn!(
                        "Collection file {} is corrupt, starting empty: {}",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(
                    "Failed to read collection file {}, starting empty: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Write to a temp file then rename over the target
    async fn persist(path: &Path, snapshot: &CollectionFile) -> Result<()> {
        let data = serde_json::to_vec(snapshot).context("Failed to serialize collection")?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, data)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }
}
