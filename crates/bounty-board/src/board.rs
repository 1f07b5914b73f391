use serde::{Deserialize, Serialize};
use thiserror::Error;

use bounty_escrow::{EscrowEntry, EscrowLedger};
use bounty_reputation::{ReputationEngine, UserRating};
use bounty_types::{
    Amount, BoardRules, BountyError, BountyEvent, Principal, RatingDirection, Result, Score,
    Task, TaskEvent, TaskId,
};

use crate::operation::{Call, Operation, Receipt, ReceiptValue};
use crate::store::TaskStore;

/// Everything the board owns. Cloned as a working copy for atomic batches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    pub tasks: TaskStore,
    pub escrow: EscrowLedger,
    pub reputation: ReputationEngine,
}

/// A batch that was rolled back because one of its operations failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("batch operation {index} failed: {source}")]
pub struct BatchError {
    pub index: usize,
    #[source]
    pub source: BountyError,
}

/// The task-bounty board: task store, escrow ledger and reputation engine
/// behind one transaction boundary.
///
/// Every operation either commits all of its effects or returns an error with
/// the state untouched. Single operations get this by validating every
/// component's preconditions before the first write; batches run against a
/// working copy that replaces the live state only if every operation succeeds.
#[derive(Debug, Clone, Default)]
pub struct BountyBoard {
    state: BoardState,
    rules: BoardRules,
}

impl BountyBoard {
    pub fn new(rules: BoardRules) -> Self {
        Self {
            state: BoardState::default(),
            rules,
        }
    }

    pub fn from_state(state: BoardState, rules: BoardRules) -> Self {
        Self { state, rules }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Replace the live state with an earlier copy, undoing everything since.
    pub fn restore(&mut self, state: BoardState) {
        self.state = state;
    }

    pub fn rules(&self) -> &BoardRules {
        &self.rules
    }

    pub fn deposit(&mut self, account: &Principal, amount: Amount) -> Result<BountyEvent> {
        self.state.escrow.deposit(account, amount)
    }

    pub fn create_task(
        &mut self,
        caller: &Principal,
        bounty: Amount,
        description: impl Into<String>,
    ) -> Result<Receipt> {
        create_task(&mut self.state, &self.rules, caller, bounty, description.into())
    }

    pub fn claim_task(&mut self, caller: &Principal, task_id: TaskId) -> Result<Receipt> {
        claim_task(&mut self.state, &self.rules, caller, task_id)
    }

    pub fn complete_task(&mut self, caller: &Principal, task_id: TaskId) -> Result<Receipt> {
        complete_task(&mut self.state, caller, task_id)
    }

    pub fn cancel_task(&mut self, caller: &Principal, task_id: TaskId) -> Result<Receipt> {
        cancel_task(&mut self.state, caller, task_id)
    }

    pub fn rate_worker(&mut self, caller: &Principal, task_id: TaskId, score: Score) -> Result<Receipt> {
        rate(
            &mut self.state,
            &self.rules,
            caller,
            task_id,
            RatingDirection::CreatorToWorker,
            score,
        )
    }

    pub fn rate_creator(&mut self, caller: &Principal, task_id: TaskId, score: Score) -> Result<Receipt> {
        rate(
            &mut self.state,
            &self.rules,
            caller,
            task_id,
            RatingDirection::WorkerToCreator,
            score,
        )
    }

    /// Run a single call.
    pub fn execute(&mut self, call: &Call) -> Result<Receipt> {
        apply(&mut self.state, &self.rules, call)
    }

    /// Run calls in order as one unit. Later calls see the effects of earlier
    /// ones; any failure discards the whole batch.
    pub fn execute_batch(&mut self, calls: &[Call]) -> std::result::Result<Vec<Receipt>, BatchError> {
        let mut working = self.state.clone();
        let mut receipts = Vec::with_capacity(calls.len());
        for (index, call) in calls.iter().enumerate() {
            match apply(&mut working, &self.rules, call) {
                Ok(receipt) => receipts.push(receipt),
                Err(source) => {
                    tracing::debug!("Batch rolled back at operation {index}: {source}");
                    return Err(BatchError { index, source });
                }
            }
        }
        self.state = working;
        tracing::info!("Committed batch of {} operations", receipts.len());
        Ok(receipts)
    }

    pub fn task_count(&self) -> u64 {
        self.state.tasks.task_count()
    }

    pub fn task(&self, task_id: TaskId) -> Result<&Task> {
        self.state.tasks.get(task_id)
    }

    pub fn user_rating(&self, account: &Principal) -> UserRating {
        self.state.reputation.get_rating(account)
    }

    pub fn balance(&self, account: &Principal) -> Amount {
        self.state.escrow.balance(account)
    }

    pub fn escrow(&self, task_id: TaskId) -> Option<&EscrowEntry> {
        self.state.escrow.entry(task_id)
    }
}

fn apply(state: &mut BoardState, rules: &BoardRules, call: &Call) -> Result<Receipt> {
    let caller = &call.caller;
    let result = match &call.operation {
        Operation::CreateTask {
            bounty,
            description,
        } => create_task(state, rules, caller, *bounty, description.clone()),
        Operation::ClaimTask { task_id } => claim_task(state, rules, caller, *task_id),
        Operation::CompleteTask { task_id } => complete_task(state, caller, *task_id),
        Operation::CancelTask { task_id } => cancel_task(state, caller, *task_id),
        Operation::RateWorker { task_id, score } => rate(
            state,
            rules,
            caller,
            *task_id,
            RatingDirection::CreatorToWorker,
            *score,
        ),
        Operation::RateCreator { task_id, score } => rate(
            state,
            rules,
            caller,
            *task_id,
            RatingDirection::WorkerToCreator,
            *score,
        ),
    };
    if let Err(e) = &result {
        tracing::debug!("Rejected {:?} from {caller}: {e}", call.operation);
    }
    result
}

fn create_task(
    state: &mut BoardState,
    rules: &BoardRules,
    caller: &Principal,
    bounty: Amount,
    description: String,
) -> Result<Receipt> {
    state.tasks.check_create(bounty, &description, rules)?;
    let task_id = state.tasks.next_id();
    // The lock is the only step that can still fail.
    let locked = state.escrow.lock(caller, bounty, task_id)?;
    let inserted = state.tasks.insert(caller.clone(), bounty, description);
    debug_assert_eq!(inserted, task_id);

    tracing::info!("Task {task_id} created by {caller} with bounty {bounty}");
    Ok(Receipt {
        value: ReceiptValue::TaskId(task_id),
        events: vec![
            BountyEvent::TaskCreated {
                task_id,
                creator: caller.clone(),
                bounty,
            },
            locked,
        ],
    })
}

fn claim_task(
    state: &mut BoardState,
    rules: &BoardRules,
    caller: &Principal,
    task_id: TaskId,
) -> Result<Receipt> {
    state.tasks.check_claim(task_id, caller, rules)?;
    state.tasks.commit(task_id, TaskEvent::Claim, caller)?;

    tracing::info!("Task {task_id} claimed by {caller}");
    Ok(Receipt {
        value: ReceiptValue::Bool(true),
        events: vec![BountyEvent::TaskClaimed {
            task_id,
            worker: caller.clone(),
        }],
    })
}

fn complete_task(state: &mut BoardState, caller: &Principal, task_id: TaskId) -> Result<Receipt> {
    state.tasks.check_complete(task_id, caller)?;
    state.escrow.check_settle(task_id, caller)?;
    let released = state.escrow.release(task_id, caller)?;
    state.tasks.commit(task_id, TaskEvent::Complete, caller)?;

    tracing::info!("Task {task_id} completed by {caller}");
    Ok(Receipt {
        value: ReceiptValue::Bool(true),
        events: vec![
            BountyEvent::TaskCompleted {
                task_id,
                worker: caller.clone(),
            },
            released,
        ],
    })
}

fn cancel_task(state: &mut BoardState, caller: &Principal, task_id: TaskId) -> Result<Receipt> {
    state.tasks.check_cancel(task_id, caller)?;
    state.escrow.check_settle(task_id, caller)?;
    let refunded = state.escrow.refund(task_id)?;
    state.tasks.commit(task_id, TaskEvent::Cancel, caller)?;

    tracing::info!("Task {task_id} cancelled by {caller}");
    Ok(Receipt {
        value: ReceiptValue::Bool(true),
        events: vec![
            BountyEvent::TaskCancelled {
                task_id,
                creator: caller.clone(),
            },
            refunded,
        ],
    })
}

fn rate(
    state: &mut BoardState,
    rules: &BoardRules,
    caller: &Principal,
    task_id: TaskId,
    direction: RatingDirection,
    score: Score,
) -> Result<Receipt> {
    let task = state.tasks.get(task_id)?;
    let submitted = state.reputation.rate(task, direction, caller, score, rules)?;
    Ok(Receipt {
        value: ReceiptValue::Bool(true),
        events: vec![submitted],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> (BountyBoard, Principal, Principal) {
        let mut board = BountyBoard::new(BoardRules::default());
        let alice = Principal::from("alice");
        let bob = Principal::from("bob");
        board.deposit(&alice, 10_000).unwrap();
        (board, alice, bob)
    }

    #[test]
    fn test_create_returns_new_count() {
        let (mut board, alice, _) = board();
        for expected in 1..=3 {
            let receipt = board.create_task(&alice, 100, "t").unwrap();
            assert_eq!(receipt.task_id(), Some(expected));
            assert_eq!(board.task_count(), expected);
        }
        assert_eq!(board.balance(&alice), 9_700);
    }

    #[test]
    fn test_create_emits_created_and_locked() {
        let (mut board, alice, _) = board();
        let receipt = board.create_task(&alice, 1000, "Test task description").unwrap();
        assert_eq!(receipt.events.len(), 2);
        assert_eq!(receipt.events[0].kind(), "task_created");
        assert_eq!(receipt.events[1].kind(), "escrow_locked");
    }

    #[test]
    fn test_insufficient_funds_does_not_consume_id() {
        let (mut board, alice, bob) = board();
        let before = board.state().clone();
        let err = board.create_task(&bob, 1000, "unfunded").unwrap_err();
        assert_eq!(err.code(), "InsufficientFunds");
        assert_eq!(board.state(), &before);

        let receipt = board.create_task(&alice, 1000, "funded").unwrap();
        assert_eq!(receipt.task_id(), Some(1));
    }

    #[test]
    fn test_failed_complete_leaves_state_unchanged() {
        let (mut board, alice, bob) = board();
        board.create_task(&alice, 1000, "t").unwrap();
        board.claim_task(&bob, 1).unwrap();
        let before = board.state().clone();

        let err = board.complete_task(&alice, 1).unwrap_err();
        assert_eq!(err.code(), "Unauthorized");
        assert_eq!(board.state(), &before);
    }

    #[test]
    fn test_batch_sees_earlier_operations() {
        let (mut board, alice, bob) = board();
        let receipts = board
            .execute_batch(&[
                Call::new(
                    alice.clone(),
                    Operation::CreateTask {
                        bounty: 500,
                        description: "batched".into(),
                    },
                ),
                Call::new(bob.clone(), Operation::ClaimTask { task_id: 1 }),
                Call::new(bob.clone(), Operation::CompleteTask { task_id: 1 }),
            ])
            .unwrap();
        assert_eq!(receipts.len(), 3);
        assert_eq!(receipts[0].value, ReceiptValue::TaskId(1));
        assert_eq!(board.balance(&bob), 500);
    }

    #[test]
    fn test_failed_batch_rolls_back_everything() {
        let (mut board, alice, bob) = board();
        let before = board.state().clone();
        let err = board
            .execute_batch(&[
                Call::new(
                    alice.clone(),
                    Operation::CreateTask {
                        bounty: 500,
                        description: "batched".into(),
                    },
                ),
                Call::new(bob.clone(), Operation::ClaimTask { task_id: 1 }),
                Call::new(alice.clone(), Operation::CancelTask { task_id: 1 }),
            ])
            .unwrap_err();
        assert_eq!(err.index, 2);
        assert_eq!(err.source, BountyError::CannotCancelClaimed(1));
        assert_eq!(board.state(), &before);
        assert_eq!(board.task_count(), 0);
    }

    #[test]
    fn test_execute_dispatches_rating() {
        let (mut board, alice, bob) = board();
        board.create_task(&alice, 1000, "t").unwrap();
        board.claim_task(&bob, 1).unwrap();
        board.complete_task(&bob, 1).unwrap();
        let receipt = board
            .execute(&Call::new(
                bob.clone(),
                Operation::RateCreator {
                    task_id: 1,
                    score: 3,
                },
            ))
            .unwrap();
        assert_eq!(receipt.value, ReceiptValue::Bool(true));
        assert_eq!(board.user_rating(&alice).average_rating, 3);
    }

    #[test]
    fn test_rate_unknown_task() {
        let (mut board, alice, _) = board();
        assert_eq!(
            board.rate_worker(&alice, 42, 5).unwrap_err(),
            BountyError::NotFound(42)
        );
    }

    #[test]
    fn test_restore_undoes_committed_operations() {
        let (mut board, alice, bob) = board();
        let before = board.state().clone();
        board.create_task(&alice, 500, "t").unwrap();
        board.claim_task(&bob, 1).unwrap();

        board.restore(before.clone());
        assert_eq!(board.state(), &before);
        assert_eq!(board.task_count(), 0);
        assert_eq!(board.balance(&alice), 10_000);
        assert_eq!(board.create_task(&alice, 500, "t").unwrap().task_id(), Some(1));
    }
}
