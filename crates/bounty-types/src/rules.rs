use serde::{Deserialize, Serialize};

use crate::rating::Score;

/// Policy knobs for the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRules {
    /// Maximum task description length in characters.
    #[serde(default = "default_max_description_chars")]
    pub max_description_chars: usize,

    /// Lowest accepted rating score (inclusive).
    #[serde(default = "default_min_score")]
    pub min_score: Score,

    /// Highest accepted rating score (inclusive).
    #[serde(default = "default_max_score")]
    pub max_score: Score,

    /// Whether a creator may claim their own task.
    #[serde(default)]
    pub allow_self_claim: bool,
}

fn default_max_description_chars() -> usize {
    256
}

fn default_min_score() -> Score {
    1
}

fn default_max_score() -> Score {
    5
}

impl Default for BoardRules {
    fn default() -> Self {
        Self {
            max_description_chars: default_max_description_chars(),
            min_score: default_min_score(),
            max_score: default_max_score(),
            allow_self_claim: false,
        }
    }
}

impl BoardRules {
    pub fn score_in_range(&self, score: Score) -> bool {
        (self.min_score..=self.max_score).contains(&score)
    }
}
