use thiserror::Error;

use crate::principal::{Amount, Principal, TaskId};
use crate::rating::{RatingDirection, Score};
use crate::task::{TaskEvent, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BountyError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Unauthorized: {caller} may not {action} task {task_id}")]
    Unauthorized {
        task_id: TaskId,
        caller: Principal,
        action: &'static str,
    },

    #[error("Invalid state: task {task_id} is {status:?}, cannot apply {event:?}")]
    InvalidState {
        task_id: TaskId,
        status: TaskStatus,
        event: TaskEvent,
    },

    #[error("Task {0} is already completed")]
    AlreadyCompleted(TaskId),

    #[error("Task {0} has been claimed or closed and cannot be cancelled")]
    CannotCancelClaimed(TaskId),

    #[error("Insufficient funds: {account} has {balance}, needs {required}")]
    InsufficientFunds {
        account: Principal,
        balance: Amount,
        required: Amount,
    },

    #[error("Escrow for task {0} was already released")]
    AlreadyReleased(TaskId),

    #[error("No escrow entry for task {0}")]
    EscrowMissing(TaskId),

    #[error("Escrow for task {0} already exists")]
    EscrowExists(TaskId),

    #[error("Task {0} is not completed")]
    NotCompleted(TaskId),

    #[error("Task {task_id} already rated in direction {direction:?}")]
    AlreadyRated {
        task_id: TaskId,
        direction: RatingDirection,
    },

    #[error("Score {score} out of range [{min}, {max}]")]
    ScoreOutOfRange { score: Score, min: Score, max: Score },

    #[error("Bounty amount must be greater than zero")]
    InvalidAmount,

    #[error("Description is {len} characters, limit is {max}")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("Balance overflow for {0}")]
    BalanceOverflow(Principal),
}

impl BountyError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            BountyError::NotFound(_) => "NotFound",
            BountyError::Unauthorized { .. } => "Unauthorized",
            BountyError::InvalidState { .. } => "InvalidState",
            BountyError::AlreadyCompleted(_) => "AlreadyCompleted",
            BountyError::CannotCancelClaimed(_) => "CannotCancelClaimed",
            BountyError::InsufficientFunds { .. } => "InsufficientFunds",
            BountyError::AlreadyReleased(_) => "AlreadyReleased",
            BountyError::EscrowMissing(_) => "EscrowMissing",
            BountyError::EscrowExists(_) => "EscrowExists",
            BountyError::NotCompleted(_) => "NotCompleted",
            BountyError::AlreadyRated { .. } => "AlreadyRated",
            BountyError::ScoreOutOfRange { .. } => "ScoreOutOfRange",
            BountyError::InvalidAmount => "InvalidAmount",
            BountyError::DescriptionTooLong { .. } => "DescriptionTooLong",
            BountyError::BalanceOverflow(_) => "BalanceOverflow",
        }
    }
}

pub type Result<T> = std::result::Result<T, BountyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_variant_names() {
        assert_eq!(BountyError::NotFound(1).code(), "NotFound");
        assert_eq!(BountyError::AlreadyCompleted(1).code(), "AlreadyCompleted");
        assert_eq!(
            BountyError::CannotCancelClaimed(1).code(),
            "CannotCancelClaimed"
        );
        assert_eq!(
            BountyError::ScoreOutOfRange {
                score: 9,
                min: 1,
                max: 5
            }
            .code(),
            "ScoreOutOfRange"
        );
    }

    #[test]
    fn test_display_includes_context() {
        let err = BountyError::InsufficientFunds {
            account: Principal::from("alice"),
            balance: 5,
            required: 1000,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: alice has 5, needs 1000"
        );
    }
}
