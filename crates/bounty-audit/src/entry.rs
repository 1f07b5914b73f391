use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use bounty_types::{BountyEvent, Principal, TaskId};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entry {sequence} does not extend the chain head")]
    ChainBroken { sequence: u64 },
}

/// An immutable, hash-chained record of one committed domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Position in the log, starting at 0.
    pub sequence: u64,
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub actor: Principal,
    pub task_id: Option<TaskId>,
    pub event: BountyEvent,
    pub previous_hash: Option<String>,
    pub hash: String,
}

impl AuditEntry {
    pub fn new(
        sequence: u64,
        event: BountyEvent,
        previous_hash: Option<String>,
    ) -> Result<Self, AuditError> {
        let mut entry = Self {
            id: Uuid::new_v4(),
            sequence,
            kind: event.kind().to_string(),
            timestamp: Utc::now(),
            actor: event.actor().clone(),
            task_id: event.task_id(),
            event,
            previous_hash,
            hash: String::new(),
        };
        entry.hash = entry.compute_hash()?;
        Ok(entry)
    }

    /// SHA-256 over every field except `hash`, hex encoded.
    pub fn compute_hash(&self) -> Result<String, AuditError> {
        let payload = serde_json::to_string(&self.event)?;
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(
            self.timestamp
                .timestamp_nanos_opt()
                .unwrap_or(0)
                .to_be_bytes(),
        );
        hasher.update(self.kind.as_bytes());
        hasher.update(self.actor.as_str().as_bytes());
        hasher.update(self.task_id.unwrap_or(0).to_be_bytes());
        hasher.update(payload.as_bytes());
        hasher.update(self.previous_hash.as_deref().unwrap_or("genesis").as_bytes());
        Ok(hex(&hasher.finalize()))
    }

    /// Whether the stored hash still matches the entry contents.
    pub fn is_intact(&self) -> bool {
        self.compute_hash().map(|h| h == self.hash).unwrap_or(false)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(amount: u64) -> BountyEvent {
        BountyEvent::Deposited {
            account: Principal::from("alice"),
            amount,
        }
    }

    #[test]
    fn test_entry_creation() {
        let entry = AuditEntry::new(0, deposit(10), None).unwrap();
        assert_eq!(entry.hash.len(), 64);
        assert_eq!(entry.kind, "deposited");
        assert!(entry.previous_hash.is_none());
        assert!(entry.task_id.is_none());
        assert!(entry.is_intact());
    }

    #[test]
    fn test_chained_entries() {
        let first = AuditEntry::new(0, deposit(10), None).unwrap();
        let second = AuditEntry::new(
            1,
            BountyEvent::TaskCreated {
                task_id: 1,
                creator: Principal::from("alice"),
                bounty: 10,
            },
            Some(first.hash.clone()),
        )
        .unwrap();
        assert_eq!(second.previous_hash.as_ref(), Some(&first.hash));
        assert_eq!(second.task_id, Some(1));
        assert_ne!(first.hash, second.hash);
    }

    #[test]
    fn test_tampered_payload_detected() {
        let mut entry = AuditEntry::new(0, deposit(10), None).unwrap();
        entry.event = deposit(10_000);
        assert!(!entry.is_intact());
    }
}
