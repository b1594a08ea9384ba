//! # gridplay
//!
//! Grid-world reinforcement-learning environment with manual play and
//! replay of precomputed policy paths.
//!
//! The crate holds the pure parts of the system: the cell model, rule sets,
//! the reward/step function, path replay and the greedy rollout of a trained
//! Q-table. Loading documents from disk and serving clients live in the
//! `gridplayd` daemon.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use gridplay::prelude::*;
//!
//! let grid = Grid::from_text("S00\n01R\n00G").unwrap();
//! let map = Arc::new(GridMap::new("demo", grid).unwrap());
//! let rules = RuleSet { bonus_reward: 20.0, step_decay: 0.99, ..RuleSet::default() };
//!
//! let mut session = Session::new(map, rules).unwrap();
//! let r = session.step(Direction::Right).unwrap();
//! assert_eq!(r.score, -1);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): JSON documents for maps, rules, paths and Q-tables
//!
//! ## Modules
//!
//! - [`grid`]: Cells, positions, directions and maps
//! - [`rules`]: Reward/termination parameters
//! - [`reward`]: Decay and rounding of the running score
//! - [`env`]: Manual-play sessions
//! - [`replay`]: Step-indexed path playback
//! - [`policy`]: Greedy Q-table rollout and path scoring
//! - [`loader`]: Supersession of in-flight loads

#[path = "core/error.rs"]
pub mod error;

#[path = "core/grid.rs"]
pub mod grid;

#[path = "core/rules.rs"]
pub mod rules;

#[path = "core/reward.rs"]
pub mod reward;

#[path = "core/env.rs"]
pub mod env;

#[path = "core/replay.rs"]
pub mod replay;

#[path = "core/policy.rs"]
pub mod policy;

#[path = "core/loader.rs"]
pub mod loader;

/// Prelude module for convenient imports.
///
/// ```
/// use gridplay::prelude::*;
/// ```
pub mod prelude {
    pub use crate::env::{Session, StepEvent, StepResult};
    pub use crate::error::{GridError, Result};
    pub use crate::grid::{Cell, Direction, Grid, GridMap, Pos};
    pub use crate::loader::{LoadSequencer, LoadTicket};
    pub use crate::policy::{greedy_path, score_path, QRecord, QTable};
    #[cfg(feature = "serde")]
    pub use crate::replay::PathDocument;
    pub use crate::replay::{PathReplay, ReplayPhase};
    pub use crate::reward::{RewardAccumulator, RewardDelta, RewardKind};
    pub use crate::rules::RuleSet;
}
