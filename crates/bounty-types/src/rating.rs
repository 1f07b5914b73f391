use serde::{Deserialize, Serialize};

use crate::principal::Principal;
use crate::task::Task;

/// Numeric rating score. Valid bounds come from `BoardRules`.
pub type Score = u64;

/// Which party of a completed task is being rated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RatingDirection {
    /// The creator rates the worker.
    CreatorToWorker,
    /// The worker rates the creator.
    WorkerToCreator,
}

impl RatingDirection {
    /// The party allowed to submit a rating in this direction.
    pub fn rater(self, task: &Task) -> Option<&Principal> {
        match self {
            RatingDirection::CreatorToWorker => Some(&task.creator),
            RatingDirection::WorkerToCreator => task.worker.as_ref(),
        }
    }

    /// The party whose reputation the rating is applied to.
    pub fn target(self, task: &Task) -> Option<&Principal> {
        match self {
            RatingDirection::CreatorToWorker => task.worker.as_ref(),
            RatingDirection::WorkerToCreator => Some(&task.creator),
        }
    }
}
