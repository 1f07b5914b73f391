use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use bounty_types::{
    BoardRules, BountyError, BountyEvent, Principal, RatingDirection, Result, Score, Task,
    TaskId, TaskStatus,
};

use crate::score::{RatingRecord, Reputation, TaskRatings, UserRating};

/// Per-task rating records and per-account aggregates.
///
/// The engine reads tasks it is handed but never mutates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReputationEngine {
    ratings: BTreeMap<TaskId, TaskRatings>,
    reputations: BTreeMap<Principal, Reputation>,
}

impl ReputationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a rating without recording it. Returns the account being rated.
    pub fn check_rate<'t>(
        &self,
        task: &'t Task,
        direction: RatingDirection,
        rater: &Principal,
        score: Score,
        rules: &BoardRules,
    ) -> Result<&'t Principal> {
        if task.status != TaskStatus::Completed {
            return Err(BountyError::NotCompleted(task.id));
        }
        if direction.rater(task) != Some(rater) {
            return Err(BountyError::Unauthorized {
                task_id: task.id,
                caller: rater.clone(),
                action: match direction {
                    RatingDirection::CreatorToWorker => "rate the worker of",
                    RatingDirection::WorkerToCreator => "rate the creator of",
                },
            });
        }
        if !rules.score_in_range(score) {
            return Err(BountyError::ScoreOutOfRange {
                score,
                min: rules.min_score,
                max: rules.max_score,
            });
        }
        if self.rating(task.id, direction).is_some() {
            return Err(BountyError::AlreadyRated {
                task_id: task.id,
                direction,
            });
        }
        // A completed task always has a worker, so the target is present.
        direction
            .target(task)
            .ok_or(BountyError::NotCompleted(task.id))
    }

    /// Record a rating and fold it into the target's reputation.
    pub fn rate(
        &mut self,
        task: &Task,
        direction: RatingDirection,
        rater: &Principal,
        score: Score,
        rules: &BoardRules,
    ) -> Result<BountyEvent> {
        let target = self.check_rate(task, direction, rater, score, rules)?.clone();

        *self.ratings.entry(task.id).or_default().slot_mut(direction) = Some(RatingRecord {
            task_id: task.id,
            direction,
            rater: rater.clone(),
            target: target.clone(),
            score,
            submitted_at: Utc::now(),
        });

        let rep = self
            .reputations
            .entry(target.clone())
            .or_insert_with(|| Reputation::new(target.clone()));
        rep.rating_count += 1;
        rep.rating_sum += u128::from(score);

        tracing::info!(
            "Rating {score} for {target} on task {} ({direction:?}), average now {}",
            task.id,
            rep.average()
        );

        Ok(BountyEvent::RatingSubmitted {
            task_id: task.id,
            direction,
            rater: rater.clone(),
            target,
            score,
        })
    }

    /// Aggregate for an account. Accounts never rated get the zero summary.
    pub fn get_rating(&self, account: &Principal) -> UserRating {
        self.reputations
            .get(account)
            .map(Reputation::summary)
            .unwrap_or_default()
    }

    pub fn reputation(&self, account: &Principal) -> Option<&Reputation> {
        self.reputations.get(account)
    }

    pub fn rating(&self, task_id: TaskId, direction: RatingDirection) -> Option<&RatingRecord> {
        self.ratings.get(&task_id).and_then(|r| r.slot(direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounty_types::TaskEvent;

    fn completed_task(id: TaskId) -> Task {
        let mut task = Task::new(id, Principal::from("alice"), 1000, "Test task description");
        task.apply_event(TaskEvent::Claim, Some(Principal::from("bob")))
            .unwrap();
        task.apply_event(TaskEvent::Complete, None).unwrap();
        task
    }

    #[test]
    fn test_rate_both_directions() {
        let mut engine = ReputationEngine::new();
        let rules = BoardRules::default();
        let task = completed_task(1);
        let alice = Principal::from("alice");
        let bob = Principal::from("bob");

        engine
            .rate(&task, RatingDirection::CreatorToWorker, &alice, 5, &rules)
            .unwrap();
        engine
            .rate(&task, RatingDirection::WorkerToCreator, &bob, 4, &rules)
            .unwrap();

        assert_eq!(
            engine.get_rating(&bob),
            UserRating {
                rating_count: 1,
                average_rating: 5
            }
        );
        assert_eq!(engine.get_rating(&alice).average_rating, 4);
        assert_eq!(
            engine
                .rating(1, RatingDirection::WorkerToCreator)
                .map(|r| r.score),
            Some(4)
        );
    }

    #[test]
    fn test_rate_requires_completion() {
        let mut engine = ReputationEngine::new();
        let mut task = Task::new(2, Principal::from("alice"), 10, "d");
        task.apply_event(TaskEvent::Claim, Some(Principal::from("bob")))
            .unwrap();
        let err = engine
            .rate(
                &task,
                RatingDirection::CreatorToWorker,
                &Principal::from("alice"),
                5,
                &BoardRules::default(),
            )
            .unwrap_err();
        assert_eq!(err, BountyError::NotCompleted(2));
        assert_eq!(engine, ReputationEngine::new());
    }

    #[test]
    fn test_only_the_expected_party_may_rate() {
        let mut engine = ReputationEngine::new();
        let rules = BoardRules::default();
        let task = completed_task(1);

        // The worker cannot rate itself, and outsiders cannot rate anyone.
        let err = engine
            .rate(&task, RatingDirection::CreatorToWorker, &Principal::from("bob"), 5, &rules)
            .unwrap_err();
        assert_eq!(err.code(), "Unauthorized");
        let err = engine
            .rate(&task, RatingDirection::WorkerToCreator, &Principal::from("mallory"), 1, &rules)
            .unwrap_err();
        assert_eq!(err.code(), "Unauthorized");
        assert_eq!(engine.get_rating(&Principal::from("bob")).rating_count, 0);
    }

    #[test]
    fn test_score_bounds_are_rejected_not_clamped() {
        let mut engine = ReputationEngine::new();
        let rules = BoardRules::default();
        let task = completed_task(1);
        let alice = Principal::from("alice");

        for score in [0, 6, 100] {
            let err = engine
                .rate(&task, RatingDirection::CreatorToWorker, &alice, score, &rules)
                .unwrap_err();
            assert_eq!(
                err,
                BountyError::ScoreOutOfRange {
                    score,
                    min: 1,
                    max: 5
                }
            );
        }
        assert!(engine.rating(1, RatingDirection::CreatorToWorker).is_none());
    }

    #[test]
    fn test_second_rating_rejected() {
        let mut engine = ReputationEngine::new();
        let rules = BoardRules::default();
        let task = completed_task(1);
        let alice = Principal::from("alice");

        engine
            .rate(&task, RatingDirection::CreatorToWorker, &alice, 2, &rules)
            .unwrap();
        let before = engine.clone();
        let err = engine
            .rate(&task, RatingDirection::CreatorToWorker, &alice, 5, &rules)
            .unwrap_err();
        assert_eq!(
            err,
            BountyError::AlreadyRated {
                task_id: 1,
                direction: RatingDirection::CreatorToWorker
            }
        );
        assert_eq!(engine, before);
        assert_eq!(engine.get_rating(&Principal::from("bob")).average_rating, 2);
    }

    #[test]
    fn test_aggregate_across_tasks() {
        let mut engine = ReputationEngine::new();
        let rules = BoardRules::default();
        let alice = Principal::from("alice");
        for (id, score) in [(1, 5), (2, 4), (3, 4)] {
            engine
                .rate(&completed_task(id), RatingDirection::CreatorToWorker, &alice, score, &rules)
                .unwrap();
        }
        let rep = engine.reputation(&Principal::from("bob")).unwrap();
        assert_eq!(rep.rating_count, 3);
        assert_eq!(rep.rating_sum, 13);
        assert_eq!(rep.average(), 4);
    }

    #[test]
    fn test_maximal_scores_do_not_skew_average() {
        let mut engine = ReputationEngine::new();
        let rules = BoardRules {
            max_score: Score::MAX,
            ..BoardRules::default()
        };
        let alice = Principal::from("alice");
        for id in [1, 2] {
            engine
                .rate(&completed_task(id), RatingDirection::CreatorToWorker, &alice, Score::MAX, &rules)
                .unwrap();
        }
        let rep = engine.reputation(&Principal::from("bob")).unwrap();
        assert_eq!(rep.rating_sum, u128::from(Score::MAX) * 2);
        assert_eq!(
            engine.get_rating(&Principal::from("bob")),
            UserRating {
                rating_count: 2,
                average_rating: Score::MAX
            }
        );
    }

    #[test]
    fn test_unknown_account_has_zero_rating() {
        let engine = ReputationEngine::new();
        assert_eq!(
            engine.get_rating(&Principal::from("nobody")),
            UserRating::default()
        );
    }

    #[test]
    fn test_state_serializes_to_json() {
        let mut engine = ReputationEngine::new();
        engine
            .rate(
                &completed_task(1),
                RatingDirection::CreatorToWorker,
                &Principal::from("alice"),
                3,
                &BoardRules::default(),
            )
            .unwrap();
        let json = serde_json::to_string(&engine).unwrap();
        let back: ReputationEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(back, engine);
    }
}
