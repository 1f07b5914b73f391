use serde::{Deserialize, Serialize};

use bounty_types::{Amount, BountyEvent, Principal, Score, TaskId};

/// A mutating operation against the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateTask { bounty: Amount, description: String },
    ClaimTask { task_id: TaskId },
    CompleteTask { task_id: TaskId },
    CancelTask { task_id: TaskId },
    RateWorker { task_id: TaskId, score: Score },
    RateCreator { task_id: TaskId, score: Score },
}

/// An operation together with the identity submitting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub caller: Principal,
    #[serde(flatten)]
    pub operation: Operation,
}

impl Call {
    pub fn new(caller: impl Into<Principal>, operation: Operation) -> Self {
        Self {
            caller: caller.into(),
            operation,
        }
    }
}

/// Success value of an operation: the new task id for creates, `true` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReceiptValue {
    TaskId(TaskId),
    Bool(bool),
}

/// Result of a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub value: ReceiptValue,
    pub events: Vec<BountyEvent>,
}

impl Receipt {
    pub fn task_id(&self) -> Option<TaskId> {
        match self.value {
            ReceiptValue::TaskId(id) => Some(id),
            ReceiptValue::Bool(_) => None,
        }
    }
}
