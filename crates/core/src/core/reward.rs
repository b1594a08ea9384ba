//! Reward accounting: per-step deltas, geometric step decay and truncation.
//!
//! A step is two-phase. First the raw deltas of the move are summed onto the
//! running score; then the whole running score is scaled by
//! `decay ^ steps_so_far` and rounded. The scaled value becomes the running score
//! for the next step, so decay compounds on already-decayed scores.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Source of one reward delta within a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum RewardKind {
    StepPenalty,
    WallPenalty,
    Bonus,
    Goal,
    Trap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RewardDelta {
    pub kind: RewardKind,
    pub amount: f64,
}

impl RewardDelta {
    pub fn new(kind: RewardKind, amount: f64) -> Self {
        Self { kind, amount }
    }
}

/// Round half up (`2.5 -> 3`, `-2.5 -> -2`), the rounding the play UI shows.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Cumulative integer score and elapsed step count of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardAccumulator {
    decay: f64,
    score: i64,
    steps: u32,
}

impl RewardAccumulator {
    pub fn new(decay: f64) -> Self {
        Self {
            decay,
            score: 0,
            steps: 0,
        }
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Commits one step whose raw deltas sum to `delta`.
    ///
    /// Returns the new score: `round((score + delta) * decay^steps)` with `steps`
    /// already incremented.
    pub fn commit(&mut self, delta: f64) -> i64 {
        self.steps = self.steps.saturating_add(1);
        let running = self.score as f64 + delta;
        let factor = self.decay.powi(self.steps.min(i32::MAX as u32) as i32);
        self.score = round_half_up(running * factor);
        self.score
    }

    /// Commits a step from its itemised deltas.
    pub fn commit_deltas(&mut self, deltas: &[RewardDelta]) -> i64 {
        let sum: f64 = deltas.iter().map(|d| d.amount).sum();
        self.commit(sum)
    }

    /// Hard reset of the score on exceeding the step budget.
    pub fn truncate(&mut self) {
        self.score = 0;
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.steps = 0;
    }
}

/// Integer score after each step for a sequence of raw per-step deltas.
pub fn trajectory(deltas: &[f64], decay: f64) -> Vec<i64> {
    let mut acc = RewardAccumulator::new(decay);
    deltas.iter().map(|d| acc.commit(*d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-0.99), -1);
        assert_eq!(round_half_up(-1.9602), -2);
        assert_eq!(round_half_up(16.495083), 16);
    }

    #[test]
    fn canonical_trajectory() {
        // right, right, down onto the collectible, down onto the goal.
        let scores = trajectory(&[-1.0, -1.0, 19.0, 99.0], 0.99);
        assert_eq!(scores, vec![-1, -2, 16, 110]);
    }

    #[test]
    fn decay_compounds_on_decayed_score() {
        // Without decay the trajectory is the plain running sum.
        assert_eq!(trajectory(&[5.0, 5.0, -3.0], 1.0), vec![5, 10, 7]);

        // 100 * 0.5 = 50; (50 + 0) * 0.25 = 12.5 -> 13; 13 * 0.125 = 1.625 -> 2
        assert_eq!(trajectory(&[100.0, 0.0, 0.0], 0.5), vec![50, 13, 2]);
    }

    #[test]
    fn negative_scores_decay_toward_zero() {
        let scores = trajectory(&[-100.0, 0.0, 0.0, 0.0], 0.5);
        assert_eq!(scores, vec![-50, -12, -1, 0]);
        assert!(scores.windows(2).all(|w| w[1].abs() <= w[0].abs()));
    }

    #[test]
    fn accumulator_counts_steps_and_truncates() {
        let mut acc = RewardAccumulator::new(1.0);
        acc.commit_deltas(&[
            RewardDelta::new(RewardKind::StepPenalty, -1.0),
            RewardDelta::new(RewardKind::Bonus, 20.0),
        ]);
        assert_eq!(acc.score(), 19);
        assert_eq!(acc.steps(), 1);
        acc.commit(-5.0);
        assert_eq!(acc.score(), 14);
        assert_eq!(acc.steps(), 2);
        acc.truncate();
        assert_eq!(acc.score(), 0);
        assert_eq!(acc.steps(), 2);
        acc.reset();
        assert_eq!(acc.steps(), 0);
    }
}
