use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cached query -> answer pair with the embedding of the query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub id: String,
    pub query: String,
    pub response: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Query result: a record and its normalized L2 distance to the probe
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: CacheRecord,
    pub distance: f32,
}

/// On-disk layout of a collection
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CollectionFile {
    pub name: String,
    pub records: Vec<CacheRecord>,
}
