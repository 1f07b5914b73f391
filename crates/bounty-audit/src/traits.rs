use async_trait::async_trait;
use uuid::Uuid;

use bounty_types::{BountyEvent, TaskId};

use crate::entry::{AuditEntry, AuditError};

/// Append-only audit trail. All implementations must keep the hash chain intact.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Chain `event` onto the current head and store it.
    async fn record(&self, event: BountyEvent) -> Result<AuditEntry, AuditError>;

    /// Append a pre-built entry. Rejected unless it extends the current head.
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;

    async fn get(&self, id: Uuid) -> Result<Option<AuditEntry>, AuditError>;

    /// Hash of the newest entry (for chaining).
    async fn latest_hash(&self) -> Result<Option<String>, AuditError>;

    /// Sequence number the next appended entry must carry.
    async fn next_sequence(&self) -> Result<u64, AuditError>;

    async fn query_by_task(&self, task_id: TaskId) -> Result<Vec<AuditEntry>, AuditError>;

    async fn query_by_kind(&self, kind: &str) -> Result<Vec<AuditEntry>, AuditError>;

    async fn all_entries(&self) -> Result<Vec<AuditEntry>, AuditError>;

    /// Recompute every hash and check every link.
    async fn verify_integrity(&self) -> Result<bool, AuditError>;

    /// Build entries chaining `events` onto the current head without storing
    /// them. They can be appended in order as long as nothing else is
    /// recorded in between.
    async fn prepare(&self, events: &[BountyEvent]) -> Result<Vec<AuditEntry>, AuditError> {
        let mut sequence = self.next_sequence().await?;
        let mut previous = self.latest_hash().await?;
        let mut prepared = Vec::with_capacity(events.len());
        for event in events {
            let entry = AuditEntry::new(sequence, event.clone(), previous.take())?;
            previous = Some(entry.hash.clone());
            sequence += 1;
            prepared.push(entry);
        }
        Ok(prepared)
    }

    /// Record a batch of events in order.
    async fn record_all(&self, events: &[BountyEvent]) -> Result<Vec<AuditEntry>, AuditError> {
        let mut recorded = Vec::with_capacity(events.len());
        for event in events {
            recorded.push(self.record(event.clone()).await?);
        }
        Ok(recorded)
    }
}
