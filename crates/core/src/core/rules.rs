//! Reward rules for one play session.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::grid::Cell;

fn default_bonus_reward() -> f64 {
    10.0
}

fn default_step_decay() -> f64 {
    1.0
}

fn default_step_penalty() -> f64 {
    -1.0
}

fn default_goal_reward() -> f64 {
    100.0
}

fn default_wall_penalty() -> f64 {
    -1.0
}

fn default_max_steps() -> u32 {
    100
}

/// Immutable reward configuration.
///
/// Field names on the wire follow the rule service (`bonusReward`, `stepDecay`, ...).
/// Missing fields take the rule service defaults; unknown fields (the trainer's
/// `learningRate`, `epsilon`, ...) are ignored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct RuleSet {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,

    /// Value of a collectible.
    #[cfg_attr(feature = "serde", serde(default = "default_bonus_reward"))]
    pub bonus_reward: f64,
    /// Per-move cost (usually negative).
    #[cfg_attr(feature = "serde", serde(default = "default_step_penalty"))]
    pub step_penalty: f64,
    /// Geometric decay factor in `(0, 1]`.
    #[cfg_attr(feature = "serde", serde(default = "default_step_decay"))]
    pub step_decay: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_goal_reward"))]
    pub goal_reward: f64,
    /// Cost of an attempted move into a wall or off the grid.
    #[cfg_attr(feature = "serde", serde(default = "default_wall_penalty"))]
    pub wall_penalty: f64,
    /// Truncation threshold.
    #[cfg_attr(feature = "serde", serde(default = "default_max_steps"))]
    pub max_steps: u32,
    /// Extra delta for entering a trap cell. Zero keeps traps equivalent to empty cells.
    #[cfg_attr(feature = "serde", serde(default))]
    pub trap_penalty: f64,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            bonus_reward: default_bonus_reward(),
            step_penalty: default_step_penalty(),
            step_decay: default_step_decay(),
            goal_reward: default_goal_reward(),
            wall_penalty: default_wall_penalty(),
            max_steps: default_max_steps(),
            trap_penalty: 0.0,
        }
    }
}

impl RuleSet {
    /// Rejects rules the step function cannot honour.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("bonusReward", self.bonus_reward),
            ("stepPenalty", self.step_penalty),
            ("stepDecay", self.step_decay),
            ("goalReward", self.goal_reward),
            ("wallPenalty", self.wall_penalty),
            ("trapPenalty", self.trap_penalty),
        ];
        if let Some((name, v)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(GridError::invalid(format!("{name} is not finite ({v})")));
        }
        if !(self.step_decay > 0.0 && self.step_decay <= 1.0) {
            return Err(GridError::invalid(format!(
                "stepDecay must be in (0, 1], got {}",
                self.step_decay
            )));
        }
        if self.max_steps == 0 {
            return Err(GridError::invalid("maxSteps must be at least 1"));
        }
        Ok(())
    }

    /// Cell-specific reward delta on entering `cell`, beyond the per-step penalty.
    ///
    /// Goal and collectible map to their bonuses; traps to `trap_penalty`.
    pub fn cell_delta(&self, cell: Cell) -> f64 {
        match cell {
            Cell::Collectible => self.bonus_reward,
            Cell::Goal => self.goal_reward,
            Cell::Trap => self.trap_penalty,
            Cell::Empty | Cell::Start | Cell::Wall => 0.0,
        }
    }

    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Self> {
        let rules: RuleSet = serde_json::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }
}
