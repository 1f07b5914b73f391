use serde::{Deserialize, Serialize};

use crate::principal::{Amount, Principal, TaskId};
use crate::rating::{RatingDirection, Score};

/// Domain events emitted by committed operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BountyEvent {
    Deposited {
        account: Principal,
        amount: Amount,
    },
    TaskCreated {
        task_id: TaskId,
        creator: Principal,
        bounty: Amount,
    },
    TaskClaimed {
        task_id: TaskId,
        worker: Principal,
    },
    TaskCompleted {
        task_id: TaskId,
        worker: Principal,
    },
    TaskCancelled {
        task_id: TaskId,
        creator: Principal,
    },
    EscrowLocked {
        task_id: TaskId,
        from: Principal,
        amount: Amount,
    },
    EscrowReleased {
        task_id: TaskId,
        to: Principal,
        amount: Amount,
    },
    EscrowRefunded {
        task_id: TaskId,
        to: Principal,
        amount: Amount,
    },
    RatingSubmitted {
        task_id: TaskId,
        direction: RatingDirection,
        rater: Principal,
        target: Principal,
        score: Score,
    },
}

impl BountyEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BountyEvent::Deposited { .. } => "deposited",
            BountyEvent::TaskCreated { .. } => "task_created",
            BountyEvent::TaskClaimed { .. } => "task_claimed",
            BountyEvent::TaskCompleted { .. } => "task_completed",
            BountyEvent::TaskCancelled { .. } => "task_cancelled",
            BountyEvent::EscrowLocked { .. } => "escrow_locked",
            BountyEvent::EscrowReleased { .. } => "escrow_released",
            BountyEvent::EscrowRefunded { .. } => "escrow_refunded",
            BountyEvent::RatingSubmitted { .. } => "rating_submitted",
        }
    }

    /// The account that caused or received the event.
    pub fn actor(&self) -> &Principal {
        match self {
            BountyEvent::Deposited { account, .. } => account,
            BountyEvent::TaskCreated { creator, .. } => creator,
            BountyEvent::TaskClaimed { worker, .. } => worker,
            BountyEvent::TaskCompleted { worker, .. } => worker,
            BountyEvent::TaskCancelled { creator, .. } => creator,
            BountyEvent::EscrowLocked { from, .. } => from,
            BountyEvent::EscrowReleased { to, .. } => to,
            BountyEvent::EscrowRefunded { to, .. } => to,
            BountyEvent::RatingSubmitted { rater, .. } => rater,
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            BountyEvent::Deposited { .. } => None,
            BountyEvent::TaskCreated { task_id, .. }
            | BountyEvent::TaskClaimed { task_id, .. }
            | BountyEvent::TaskCompleted { task_id, .. }
            | BountyEvent::TaskCancelled { task_id, .. }
            | BountyEvent::EscrowLocked { task_id, .. }
            | BountyEvent::EscrowReleased { task_id, .. }
            | BountyEvent::EscrowRefunded { task_id, .. }
            | BountyEvent::RatingSubmitted { task_id, .. } => Some(*task_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = BountyEvent::EscrowReleased {
            task_id: 1,
            to: Principal::from("bob"),
            amount: 1000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "escrow_released");
        assert_eq!(json["to"], "bob");
        assert_eq!(event.kind(), "escrow_released");
        assert_eq!(event.task_id(), Some(1));
    }
}
