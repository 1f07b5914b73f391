use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bounty_types::{
    Amount, BoardRules, BountyError, Principal, Result, Task, TaskEvent, TaskId, TaskStatus,
};

/// Task records and the sequential id counter.
///
/// The store is the only place `status` and `worker` are written. The
/// `check_*` methods validate a transition for a caller without mutating;
/// `commit` applies a transition that was just checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStore {
    tasks: BTreeMap<TaskId, Task>,
    task_count: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_count(&self) -> u64 {
        self.task_count
    }

    /// Id the next successful create will receive.
    pub fn next_id(&self) -> TaskId {
        self.task_count + 1
    }

    pub fn get(&self, task_id: TaskId) -> Result<&Task> {
        self.tasks
            .get(&task_id)
            .ok_or(BountyError::NotFound(task_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn check_create(&self, bounty: Amount, description: &str, rules: &BoardRules) -> Result<()> {
        if bounty == 0 {
            return Err(BountyError::InvalidAmount);
        }
        let len = description.chars().count();
        if len > rules.max_description_chars {
            return Err(BountyError::DescriptionTooLong {
                len,
                max: rules.max_description_chars,
            });
        }
        Ok(())
    }

    /// Insert a new Open task under `next_id` and advance the counter.
    pub fn insert(&mut self, creator: Principal, bounty: Amount, description: String) -> TaskId {
        let id = self.next_id();
        self.tasks
            .insert(id, Task::new(id, creator, bounty, description));
        self.task_count = id;
        id
    }

    pub fn check_claim(&self, task_id: TaskId, caller: &Principal, rules: &BoardRules) -> Result<&Task> {
        let task = self.get(task_id)?;
        task.transition(TaskEvent::Claim)?;
        if task.is_creator(caller) && !rules.allow_self_claim {
            return Err(unauthorized(task_id, caller, "claim"));
        }
        Ok(task)
    }

    pub fn check_complete(&self, task_id: TaskId, caller: &Principal) -> Result<&Task> {
        let task = self.get(task_id)?;
        task.transition(TaskEvent::Complete)?;
        if !task.is_worker(caller) {
            return Err(unauthorized(task_id, caller, "complete"));
        }
        Ok(task)
    }

    pub fn check_cancel(&self, task_id: TaskId, caller: &Principal) -> Result<&Task> {
        let task = self.get(task_id)?;
        if !task.is_creator(caller) {
            return Err(unauthorized(task_id, caller, "cancel"));
        }
        task.transition(TaskEvent::Cancel)?;
        Ok(task)
    }

    /// Apply a checked transition. `caller` becomes the worker on claim.
    pub fn commit(&mut self, task_id: TaskId, event: TaskEvent, caller: &Principal) -> Result<TaskStatus> {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(BountyError::NotFound(task_id))?;
        task.apply_event(event, Some(caller.clone()))?;
        Ok(task.status)
    }
}

fn unauthorized(task_id: TaskId, caller: &Principal, action: &'static str) -> BountyError {
    BountyError::Unauthorized {
        task_id,
        caller: caller.clone(),
        action,
    }
}
