//! Manual-play environment: the step function over one session's working grid.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, Result};
use crate::grid::{Cell, Direction, Grid, GridMap, Pos};
use crate::reward::{RewardAccumulator, RewardDelta, RewardKind};
use crate::rules::RuleSet;

/// Salient outcome of one step, for UI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum StepEvent {
    Blocked,
    Moved,
    Collected,
    ReachedGoal,
    Truncated,
}

impl StepEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            StepEvent::Blocked => "blocked",
            StepEvent::Moved => "moved",
            StepEvent::Collected => "collected",
            StepEvent::ReachedGoal => "reached_goal",
            StepEvent::Truncated => "truncated",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepResult {
    pub position: Pos,
    pub score: i64,
    pub step_count: u32,
    pub terminated: bool,
    pub event: StepEvent,
    /// Raw deltas applied before decay, in application order.
    pub rewards: Vec<RewardDelta>,
}

/// One play-through over a map under a rule set.
///
/// The session owns a private working copy of the grid; collectibles consumed
/// here never show up in the shared [`GridMap`] or in any other session.
#[derive(Debug, Clone)]
pub struct Session {
    map: Arc<GridMap>,
    rules: RuleSet,
    grid: Grid,
    position: Pos,
    reward: RewardAccumulator,
    terminated: bool,
    last_event: Option<StepEvent>,
}

impl Session {
    /// Binds a map and rule set and enters the active state.
    pub fn new(map: Arc<GridMap>, rules: RuleSet) -> Result<Self> {
        rules.validate()?;
        let grid = map.grid().clone();
        let position = map.start();
        if !grid.contains(position) {
            return Err(GridError::invalid(format!(
                "start {position} is outside the {}x{} grid",
                grid.rows(),
                grid.cols()
            )));
        }
        debug!(
            map = map.name(),
            rows = grid.rows(),
            cols = grid.cols(),
            max_steps = rules.max_steps,
            "session started"
        );
        let reward = RewardAccumulator::new(rules.step_decay);
        Ok(Self {
            map,
            rules,
            grid,
            position,
            reward,
            terminated: false,
            last_event: None,
        })
    }

    /// Same map and rules, fresh state.
    pub fn restart(&mut self) {
        self.grid = self.map.grid().clone();
        self.position = self.map.start();
        self.reward.reset();
        self.terminated = false;
        self.last_event = None;
    }

    pub fn map(&self) -> &Arc<GridMap> {
        &self.map
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Working grid, with consumed collectibles cleared.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn position(&self) -> Pos {
        self.position
    }

    pub fn score(&self) -> i64 {
        self.reward.score()
    }

    pub fn step_count(&self) -> u32 {
        self.reward.steps()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn last_event(&self) -> Option<StepEvent> {
        self.last_event
    }

    /// Parses a direction name or key name and steps.
    pub fn step_str(&mut self, direction: &str) -> Result<StepResult> {
        let dir = direction.parse::<Direction>()?;
        self.step(dir)
    }

    pub fn step(&mut self, dir: Direction) -> Result<StepResult> {
        if self.terminated {
            return Err(GridError::SessionEnded);
        }

        let mut rewards = Vec::with_capacity(2);
        let target = self
            .grid
            .neighbor(self.position, dir)
            .and_then(|p| self.grid.get(p).map(|c| (p, c)))
            .filter(|(_, c)| c.is_passable());

        let mut event = match target {
            None => {
                rewards.push(RewardDelta::new(RewardKind::WallPenalty, self.rules.wall_penalty));
                StepEvent::Blocked
            }
            Some((next, cell)) => {
                self.position = next;
                rewards.push(RewardDelta::new(RewardKind::StepPenalty, self.rules.step_penalty));
                self.enter(next, cell, &mut rewards)
            }
        };

        self.reward.commit_deltas(&rewards);

        if self.reward.steps() >= self.rules.max_steps {
            self.reward.truncate();
            self.terminated = true;
            event = StepEvent::Truncated;
        }

        if self.terminated {
            debug!(
                event = event.as_str(),
                score = self.reward.score(),
                steps = self.reward.steps(),
                "session terminated"
            );
        }
        self.last_event = Some(event);

        Ok(StepResult {
            position: self.position,
            score: self.reward.score(),
            step_count: self.reward.steps(),
            terminated: self.terminated,
            event,
            rewards,
        })
    }

    fn enter(&mut self, at: Pos, cell: Cell, rewards: &mut Vec<RewardDelta>) -> StepEvent {
        match cell {
            Cell::Collectible => {
                rewards.push(RewardDelta::new(RewardKind::Bonus, self.rules.cell_delta(cell)));
                self.grid.set(at, Cell::Empty);
                debug!(row = at.row, col = at.col, "collectible picked up");
                StepEvent::Collected
            }
            Cell::Goal => {
                rewards.push(RewardDelta::new(RewardKind::Goal, self.rules.cell_delta(cell)));
                self.terminated = true;
                StepEvent::ReachedGoal
            }
            Cell::Trap => {
                let delta = self.rules.cell_delta(cell);
                if delta != 0.0 {
                    rewards.push(RewardDelta::new(RewardKind::Trap, delta));
                }
                StepEvent::Moved
            }
            Cell::Empty | Cell::Start | Cell::Wall => StepEvent::Moved,
        }
    }
}
