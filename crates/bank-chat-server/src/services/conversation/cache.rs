use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::System;
use tracing::{debug, info, warn};

use super::types::SessionState;
use crate::models::chat::SessionId;
use crate::utils::error::ApiError;

/// Shared handle to one session. The async mutex keeps messages of a
/// session strictly ordered while it is held across LLM calls.
pub type SessionHandle = Arc<tokio::sync::Mutex<SessionState>>;

struct SessionEntry {
    state: SessionHandle,
    last_activity: Mutex<Instant>,
}

impl SessionEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_activity.lock().elapsed() > ttl
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }
}

/// Thread-safe in-memory session store
#[derive(Clone)]
pub struct SessionCache {
    storage: Arc<DashMap<SessionId, SessionEntry>>,

    /// System info for RAM monitoring
    system: Arc<Mutex<System>>,

    ttl: Duration,
    max_memory_percent: f64,
}

impl SessionCache {
    pub fn new(ttl: Duration, max_memory_percent: f64) -> Self {
        info!(
            "Initializing session cache (idle ttl {:?}, memory cap {:.0}%)",
            ttl, max_memory_percent
        );
        Self {
            storage: Arc::new(DashMap::new()),
            system: Arc::new(Mutex::new(System::new())),
            ttl,
            max_memory_percent,
        }
    }

    /// Live session by id; expired sessions are dropped on access
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        let entry = self.storage.get(session_id)?;

        if entry.is_expired(self.ttl) {
            drop(entry); // Release shard lock before removing
            self.storage.remove(session_id);
            debug!("Session {} expired, removed from cache", session_id);
            return None;
        }

        entry.touch();
        Some(entry.state.clone())
    }

    /// Create a session under `session_id` (or a fresh uuid). When a live
    /// entry already holds that id, its handle is returned instead.
    pub fn create(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<(SessionId, SessionHandle), ApiError> {
        if !self.can_create_new_session() {
            return Err(ApiError::Overloaded(
                "Server is under memory pressure, try again later".to_string(),
            ));
        }

        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let entry = self
            .storage
            .entry(session_id.clone())
            .or_insert_with(|| {
                debug!("Created session {}", session_id);
                SessionEntry {
                    state: Arc::new(tokio::sync::Mutex::new(SessionState::new(
                        session_id.clone(),
                    ))),
                    last_activity: Mutex::new(Instant::now()),
                }
            });
        entry.touch();
        let handle = entry.state.clone();
        drop(entry);

        Ok((session_id, handle))
    }

    /// Resolve the caller's session, creating it when absent or unknown
    pub fn get_or_create(
        &self,
        session_id: Option<&str>,
    ) -> Result<(SessionId, SessionHandle), ApiError> {
        match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => match self.get(id) {
                Some(handle) => Ok((id.to_string(), handle)),
                None => self.create(Some(id.to_string())),
            },
            None => self.create(None),
        }
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.storage.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Check if we can create a new session under the memory cap
    pub fn can_create_new_session(&self) -> bool {
        let mut sys = self.system.lock();
        sys.refresh_memory();

        let total_memory = sys.total_memory();
        if total_memory == 0 {
            return true;
        }
        let used_memory = sys.used_memory();
        let usage_percent = (used_memory as f64 / total_memory as f64) * 100.0;

        if usage_percent >= self.max_memory_percent {
            warn!(
                "Memory usage at {:.2}% (used: {} MB, total: {} MB), rejecting new session",
                usage_percent,
                used_memory / 1024 / 1024,
                total_memory / 1024 / 1024
            );
            return false;
        }

        true
    }

    /// Drop idle sessions. Returns number of sessions removed.
    pub fn cleanup_expired(&self) -> usize {
        let start_len = self.storage.len();
        let ttl = self.ttl;
        self.storage.retain(|_, entry| !entry.is_expired(ttl));
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            info!("Cleaned up {} expired sessions", count);
        }

        count
    }

    /// Background sweep every `interval`
    pub fn spawn_cleanup(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.cleanup_expired();
            }
        })
    }
}
