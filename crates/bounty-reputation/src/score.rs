use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bounty_types::{Principal, RatingDirection, Score, TaskId};

/// A single submitted rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub task_id: TaskId,
    pub direction: RatingDirection,
    pub rater: Principal,
    pub target: Principal,
    pub score: Score,
    pub submitted_at: DateTime<Utc>,
}

/// Both rating slots of one task. A filled slot is a submitted rating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRatings {
    pub of_worker: Option<RatingRecord>,
    pub of_creator: Option<RatingRecord>,
}

impl TaskRatings {
    pub fn slot(&self, direction: RatingDirection) -> Option<&RatingRecord> {
        match direction {
            RatingDirection::CreatorToWorker => self.of_worker.as_ref(),
            RatingDirection::WorkerToCreator => self.of_creator.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, direction: RatingDirection) -> &mut Option<RatingRecord> {
        match direction {
            RatingDirection::CreatorToWorker => &mut self.of_worker,
            RatingDirection::WorkerToCreator => &mut self.of_creator,
        }
    }
}

/// Running aggregate of every score an account has received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reputation {
    pub account: Principal,
    pub rating_count: u64,
    /// Widened so summing any number of `Score`s cannot overflow.
    pub rating_sum: u128,
}

impl Reputation {
    pub fn new(account: Principal) -> Self {
        Self {
            account,
            rating_count: 0,
            rating_sum: 0,
        }
    }

    /// Integer average, rounded down. Zero when nothing has been received.
    pub fn average(&self) -> u64 {
        self.rating_sum
            .checked_div(u128::from(self.rating_count))
            .map_or(0, |avg| u64::try_from(avg).unwrap_or(u64::MAX))
    }

    pub fn summary(&self) -> UserRating {
        UserRating {
            rating_count: self.rating_count,
            average_rating: self.average(),
        }
    }
}

/// Read-side view returned by rating queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRating {
    pub rating_count: u64,
    pub average_rating: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_rounds_down() {
        let rep = Reputation {
            account: Principal::from("bob"),
            rating_count: 2,
            rating_sum: 9,
        };
        assert_eq!(rep.average(), 4);
    }

    #[test]
    fn test_empty_reputation_is_zero() {
        let rep = Reputation::new(Principal::from("bob"));
        assert_eq!(rep.summary(), UserRating::default());
    }
}
