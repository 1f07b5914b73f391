use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use bounty_types::{BountyEvent, TaskId};

use crate::entry::{AuditEntry, AuditError};
use crate::traits::AuditLog;

/// In-memory audit log (default).
#[derive(Debug, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
    index_by_id: Arc<DashMap<Uuid, usize>>,
    index_by_task: Arc<DashMap<TaskId, Vec<usize>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            index_by_id: Arc::new(DashMap::new()),
            index_by_task: Arc::new(DashMap::new()),
        }
    }

    /// Rebuild a log from persisted entries. Integrity is not checked here;
    /// call `verify_integrity` after loading.
    pub fn from_entries(entries: Vec<AuditEntry>) -> Self {
        let log = Self::new();
        for (idx, entry) in entries.iter().enumerate() {
            log.index(idx, entry);
        }
        Self {
            entries: Arc::new(RwLock::new(entries)),
            ..log
        }
    }

    fn index(&self, idx: usize, entry: &AuditEntry) {
        self.index_by_id.insert(entry.id, idx);
        if let Some(task_id) = entry.task_id {
            self.index_by_task.entry(task_id).or_default().push(idx);
        }
    }

    fn push(&self, entries: &mut Vec<AuditEntry>, entry: AuditEntry) {
        let idx = entries.len();
        self.index(idx, &entry);
        entries.push(entry);
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, event: BountyEvent) -> Result<AuditEntry, AuditError> {
        let mut entries = self.entries.write().await;
        let previous = entries.last().map(|e| e.hash.clone());
        let entry = AuditEntry::new(entries.len() as u64, event, previous)?;
        tracing::debug!("Audit #{} {} ({})", entry.sequence, entry.kind, entry.hash);
        self.push(&mut entries, entry.clone());
        Ok(entry)
    }

    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut entries = self.entries.write().await;
        let head = entries.last().map(|e| &e.hash);
        if entry.sequence != entries.len() as u64 || entry.previous_hash.as_ref() != head {
            return Err(AuditError::ChainBroken {
                sequence: entry.sequence,
            });
        }
        self.push(&mut entries, entry);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AuditEntry>, AuditError> {
        let entries = self.entries.read().await;
        Ok(self
            .index_by_id
            .get(&id)
            .and_then(|idx| entries.get(*idx).cloned()))
    }

    async fn latest_hash(&self) -> Result<Option<String>, AuditError> {
        let entries = self.entries.read().await;
        Ok(entries.last().map(|e| e.hash.clone()))
    }

    async fn next_sequence(&self) -> Result<u64, AuditError> {
        Ok(self.entries.read().await.len() as u64)
    }

    async fn query_by_task(&self, task_id: TaskId) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.read().await;
        Ok(self
            .index_by_task
            .get(&task_id)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|i| entries.get(*i).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query_by_kind(&self, kind: &str) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| e.kind == kind).cloned().collect())
    }

    async fn all_entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.read().await;
        Ok(entries.clone())
    }

    async fn verify_integrity(&self) -> Result<bool, AuditError> {
        let entries = self.entries.read().await;
        for (i, entry) in entries.iter().enumerate() {
            let expected_prev = if i == 0 {
                None
            } else {
                Some(&entries[i - 1].hash)
            };
            if entry.sequence != i as u64
                || entry.previous_hash.as_ref() != expected_prev
                || !entry.is_intact()
            {
                tracing::warn!("Audit chain broken at entry {i}");
                return Ok(false);
            }
        }
        Ok(true)
    }
}
