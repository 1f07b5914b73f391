use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bounty_types::{Amount, BountyError, BountyEvent, Principal, Result, TaskId};

use crate::entry::EscrowEntry;

/// Account balances plus the bounty funds locked against tasks.
///
/// Every mutating method checks all of its preconditions before touching any
/// balance, so a returned error always means nothing changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscrowLedger {
    balances: BTreeMap<Principal, Amount>,
    entries: BTreeMap<TaskId, EscrowEntry>,
}

impl EscrowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &Principal) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn entry(&self, task_id: TaskId) -> Option<&EscrowEntry> {
        self.entries.get(&task_id)
    }

    /// Amount currently held for a task; zero for unknown or settled tasks.
    pub fn locked_amount(&self, task_id: TaskId) -> Amount {
        self.entries
            .get(&task_id)
            .map(|e| e.locked_amount)
            .unwrap_or(0)
    }

    pub fn total_locked(&self) -> u128 {
        self.entries
            .values()
            .map(|e| u128::from(e.locked_amount))
            .sum()
    }

    pub fn total_balances(&self) -> u128 {
        self.balances.values().map(|b| u128::from(*b)).sum()
    }

    /// Credit an account from outside the ledger (genesis allocation, faucet).
    pub fn deposit(&mut self, account: &Principal, amount: Amount) -> Result<BountyEvent> {
        if amount == 0 {
            return Err(BountyError::InvalidAmount);
        }
        let new_balance = self.checked_credit(account, amount)?;
        self.balances.insert(account.clone(), new_balance);
        tracing::info!("Deposited {amount} to {account} (balance {new_balance})");
        Ok(BountyEvent::Deposited {
            account: account.clone(),
            amount,
        })
    }

    /// Debit `from` and hold `amount` against `task_id`.
    pub fn lock(&mut self, from: &Principal, amount: Amount, task_id: TaskId) -> Result<BountyEvent> {
        if amount == 0 {
            return Err(BountyError::InvalidAmount);
        }
        if self.entries.contains_key(&task_id) {
            return Err(BountyError::EscrowExists(task_id));
        }
        let balance = self.balance(from);
        let remaining = balance
            .checked_sub(amount)
            .ok_or_else(|| BountyError::InsufficientFunds {
                account: from.clone(),
                balance,
                required: amount,
            })?;

        self.balances.insert(from.clone(), remaining);
        self.entries
            .insert(task_id, EscrowEntry::new(task_id, from.clone(), amount));
        tracing::info!("Locked {amount} from {from} for task {task_id}");
        Ok(BountyEvent::EscrowLocked {
            task_id,
            from: from.clone(),
            amount,
        })
    }

    /// Pay the held bounty out to `to`. Rejected once the entry has settled.
    pub fn release(&mut self, task_id: TaskId, to: &Principal) -> Result<BountyEvent> {
        let amount = self.settle(task_id, to)?;
        tracing::info!("Released {amount} for task {task_id} to {to}");
        Ok(BountyEvent::EscrowReleased {
            task_id,
            to: to.clone(),
            amount,
        })
    }

    /// Return the held bounty to its depositor. Mutually exclusive with `release`.
    pub fn refund(&mut self, task_id: TaskId) -> Result<BountyEvent> {
        let depositor = self
            .entries
            .get(&task_id)
            .map(|e| e.depositor.clone())
            .ok_or(BountyError::EscrowMissing(task_id))?;
        let amount = self.settle(task_id, &depositor)?;
        tracing::info!("Refunded {amount} for task {task_id} to {depositor}");
        Ok(BountyEvent::EscrowRefunded {
            task_id,
            to: depositor,
            amount,
        })
    }

    /// Check that `task_id` can be settled to `to` without changing anything.
    pub fn check_settle(&self, task_id: TaskId, to: &Principal) -> Result<Amount> {
        let entry = self
            .entries
            .get(&task_id)
            .ok_or(BountyError::EscrowMissing(task_id))?;
        if entry.released {
            return Err(BountyError::AlreadyReleased(task_id));
        }
        self.checked_credit(to, entry.locked_amount)?;
        Ok(entry.locked_amount)
    }

    fn settle(&mut self, task_id: TaskId, to: &Principal) -> Result<Amount> {
        self.check_settle(task_id, to)?;
        let amount = match self.entries.get_mut(&task_id) {
            Some(entry) => entry.settle(to.clone()),
            None => return Err(BountyError::EscrowMissing(task_id)),
        };
        let new_balance = self.checked_credit(to, amount)?;
        self.balances.insert(to.clone(), new_balance);
        Ok(amount)
    }

    fn checked_credit(&self, account: &Principal, amount: Amount) -> Result<Amount> {
        self.balance(account)
            .checked_add(amount)
            .ok_or_else(|| BountyError::BalanceOverflow(account.clone()))
    }
}
