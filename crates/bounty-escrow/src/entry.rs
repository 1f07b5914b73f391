use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bounty_types::{Amount, Principal, TaskId};

/// Funds held against a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowEntry {
    pub task_id: TaskId,
    /// Account the bounty was debited from; receives refunds.
    pub depositor: Principal,
    /// Bounty originally locked.
    pub amount: Amount,
    /// Amount still held. Zero once settled.
    pub locked_amount: Amount,
    /// One-shot settlement flag covering both release and refund.
    pub released: bool,
    /// Who was credited on settlement.
    pub beneficiary: Option<Principal>,
    pub locked_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl EscrowEntry {
    pub fn new(task_id: TaskId, depositor: Principal, amount: Amount) -> Self {
        Self {
            task_id,
            depositor,
            amount,
            locked_amount: amount,
            released: false,
            beneficiary: None,
            locked_at: Utc::now(),
            settled_at: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        !self.released && self.locked_amount > 0
    }

    pub(crate) fn settle(&mut self, to: Principal) -> Amount {
        let amount = self.locked_amount;
        self.locked_amount = 0;
        self.released = true;
        self.beneficiary = Some(to);
        self.settled_at = Some(Utc::now());
        amount
    }
}
