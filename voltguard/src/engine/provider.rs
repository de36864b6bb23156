//! Circuit Data Provider
//!
//! The engine reads circuit data through this trait only. Whatever owns
//! persistence implements it. `Ok(None)` means the circuit no longer exists.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::tracker::ChangeTracker;
use crate::ucs::schema::CircuitRecord;

/// Errors a provider may report for a lookup
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the latest circuit snapshots.
///
/// Implementations must tolerate repeated and concurrent calls.
#[async_trait]
pub trait CircuitDataProvider: Send + Sync {
    async fn lookup(&self, id: &str) -> Result<Option<CircuitRecord>, ProviderError>;
}

/// In-memory circuit store.
///
/// Serves lookups and, when a tracker is attached, reports every upsert and
/// removal through it.
pub struct InMemoryCircuitStore {
    records: RwLock<HashMap<String, CircuitRecord>>,
    tracker: Option<Arc<ChangeTracker>>,
}

impl InMemoryCircuitStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            tracker: None,
        }
    }

    /// Report edits through `tracker`
    pub fn with_tracker(tracker: Arc<ChangeTracker>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            tracker: Some(tracker),
        }
    }

    /// Insert or replace a record, returning the previous snapshot
    pub async fn upsert(&self, record: CircuitRecord) -> Option<CircuitRecord> {
        let previous = {
            let mut records = self.records.write().await;
            records.insert(record.id.clone(), record.clone())
        };
        if let Some(tracker) = &self.tracker {
            tracker.record(previous.as_ref(), &record);
        }
        previous
    }

    /// Remove a record, returning it if it existed
    pub async fn remove(&self, id: &str) -> Option<CircuitRecord> {
        let removed = self.records.write().await.remove(id);
        if removed.is_some() {
            if let Some(tracker) = &self.tracker {
                tracker.record_removal(id);
            }
        }
        removed
    }

    pub async fn get(&self, id: &str) -> Option<CircuitRecord> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for InMemoryCircuitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CircuitDataProvider for InMemoryCircuitStore {
    async fn lookup(&self, id: &str) -> Result<Option<CircuitRecord>, ProviderError> {
        Ok(self.get(id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tracker::ChangeKind;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_lookup_and_miss() {
        let store = InMemoryCircuitStore::new();
        store.upsert(CircuitRecord::new("A")).await;

        assert!(store.lookup("A").await.unwrap().is_some());
        assert!(store.lookup("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_edits_reported_through_tracker() {
        let tracker = Arc::new(ChangeTracker::new());
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let k = kinds.clone();
        let _h = tracker.add_listener(move |c| k.lock().unwrap().push(c.kind));

        let store = InMemoryCircuitStore::with_tracker(tracker);
        let mut record = CircuitRecord::new("A");
        store.upsert(record.clone()).await;
        store.upsert(record.clone()).await; // unchanged
        record.current_a = 12.0;
        store.upsert(record).await;
        store.remove("A").await;
        store.remove("A").await; // already gone

        assert_eq!(
            *kinds.lock().unwrap(),
            vec![ChangeKind::Created, ChangeKind::Modified, ChangeKind::Removed]
        );
        assert_eq!(store.len().await, 0);
    }
}
