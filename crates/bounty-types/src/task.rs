use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BountyError, Result};
use crate::principal::{Amount, Principal, TaskId};

/// Task lifecycle states. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    Claimed,
    Completed,
    Cancelled,
}

/// Events that drive task status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskEvent {
    Claim,
    Complete,
    Cancel,
}

impl TaskStatus {
    /// The status reached by applying `event`, or `None` if the transition is illegal.
    pub fn next(self, event: TaskEvent) -> Option<TaskStatus> {
        match (self, event) {
            (TaskStatus::Open, TaskEvent::Claim) => Some(TaskStatus::Claimed),
            (TaskStatus::Open, TaskEvent::Cancel) => Some(TaskStatus::Cancelled),
            (TaskStatus::Claimed, TaskEvent::Complete) => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Whether the bounty for a task in this status is still held in escrow.
    pub fn holds_escrow(self) -> bool {
        matches!(self, TaskStatus::Open | TaskStatus::Claimed)
    }
}

/// A posted task and its bounty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub creator: Principal,
    pub worker: Option<Principal>,
    pub bounty: Amount,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: TaskId,
        creator: Principal,
        bounty: Amount,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            creator,
            worker: None,
            bounty,
            description: description.into(),
            status: TaskStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    /// Resolve the status `event` would move this task to.
    ///
    /// Terminal re-entry and cancel-after-claim get their own error variants;
    /// every other illegal pairing is reported as `InvalidState`.
    pub fn transition(&self, event: TaskEvent) -> Result<TaskStatus> {
        if let Some(next) = self.status.next(event) {
            return Ok(next);
        }
        Err(match (self.status, event) {
            (TaskStatus::Completed, TaskEvent::Complete) => BountyError::AlreadyCompleted(self.id),
            (_, TaskEvent::Cancel) => BountyError::CannotCancelClaimed(self.id),
            (status, event) => BountyError::InvalidState {
                task_id: self.id,
                status,
                event,
            },
        })
    }

    /// Apply a transition. `worker` is recorded on claim and ignored otherwise.
    pub fn apply_event(&mut self, event: TaskEvent, worker: Option<Principal>) -> Result<()> {
        let next = self.transition(event)?;
        if event == TaskEvent::Claim {
            self.worker = worker;
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_creator(&self, who: &Principal) -> bool {
        &self.creator == who
    }

    pub fn is_worker(&self, who: &Principal) -> bool {
        self.worker.as_ref() == Some(who)
    }
}
