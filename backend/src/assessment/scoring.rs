//! 5 C's credit scoring
//!
//! Character, capacity, capital, collateral and conditions are each scored
//! 1 to 5. The total (5 to 25) is compared against the configured pass score;
//! a failing total is a soft block that the assessor can confirm past.

use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowError;

pub const MIN_SUB_SCORE: i32 = 1;
pub const MAX_SUB_SCORE: i32 = 5;

/// Validated set of the five sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiveCScores {
    pub character: i32,
    pub capacity: i32,
    pub capital: i32,
    pub collateral: i32,
    pub conditions: i32,
}

/// Result of comparing a total against the pass score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOutcome {
    Pass,
    BelowThreshold,
}

impl FiveCScores {
    pub fn new(
        character: i32,
        capacity: i32,
        capital: i32,
        collateral: i32,
        conditions: i32,
    ) -> Result<Self, WorkflowError> {
        let scores = Self {
            character,
            capacity,
            capital,
            collateral,
            conditions,
        };

        for (name, value) in scores.named() {
            if !(MIN_SUB_SCORE..=MAX_SUB_SCORE).contains(&value) {
                return Err(WorkflowError::Invalid(format!(
                    "{} score must be between {} and {}, got {}",
                    name, MIN_SUB_SCORE, MAX_SUB_SCORE, value
                )));
            }
        }

        Ok(scores)
    }

    fn named(&self) -> [(&'static str, i32); 5] {
        [
            ("Character", self.character),
            ("Capacity", self.capacity),
            ("Capital", self.capital),
            ("Collateral", self.collateral),
            ("Conditions", self.conditions),
        ]
    }

    pub fn total(&self) -> i32 {
        self.character + self.capacity + self.capital + self.collateral + self.conditions
    }

    pub fn classify(&self, pass_score: i32) -> ScoreOutcome {
        if self.total() >= pass_score {
            ScoreOutcome::Pass
        } else {
            ScoreOutcome::BelowThreshold
        }
    }

    /// Gate a submission. Returns whether the stored assessment carries a
    /// below-threshold override.
    pub fn check_submission(
        &self,
        pass_score: i32,
        confirm_low_score: bool,
    ) -> Result<bool, WorkflowError> {
        match self.classify(pass_score) {
            ScoreOutcome::Pass => Ok(false),
            ScoreOutcome::BelowThreshold if confirm_low_score => Ok(true),
            ScoreOutcome::BelowThreshold => Err(WorkflowError::LowScoreNeedsConfirmation {
                total: self.total(),
                pass_score,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_sum() {
        let scores = FiveCScores::new(4, 3, 5, 2, 4).unwrap();
        assert_eq!(scores.total(), 18);
        assert_eq!(scores.classify(18), ScoreOutcome::Pass);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(FiveCScores::new(1, 1, 1, 1, 1).unwrap().total(), 5);
        assert_eq!(FiveCScores::new(5, 5, 5, 5, 5).unwrap().total(), 25);
        assert!(FiveCScores::new(0, 3, 3, 3, 3).is_err());
        assert!(FiveCScores::new(3, 3, 3, 3, 6).is_err());
    }

    #[test]
    fn test_out_of_range_names_the_field() {
        let err = FiveCScores::new(3, 3, 9, 3, 3).unwrap_err();
        assert!(err.to_string().starts_with("Capital score"));
    }

    #[test]
    fn test_low_score_is_a_soft_block() {
        let scores = FiveCScores::new(3, 3, 3, 4, 4).unwrap();
        assert_eq!(scores.total(), 17);

        let err = scores.check_submission(18, false).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::LowScoreNeedsConfirmation {
                total: 17,
                pass_score: 18
            }
        ));

        assert_eq!(scores.check_submission(18, true).unwrap(), true);
    }

    #[test]
    fn test_passing_score_is_not_an_override() {
        let scores = FiveCScores::new(4, 4, 4, 4, 4).unwrap();
        assert_eq!(scores.check_submission(18, true).unwrap(), false);
        assert_eq!(scores.check_submission(18, false).unwrap(), false);
    }
}
