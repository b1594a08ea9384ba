// ═══════════════════════════════════════════════════════════════════════════
// Protocol Messages
// ═══════════════════════════════════════════════════════════════════════════

use gridplay::env::{StepEvent, StepResult};
use gridplay::grid::Pos;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    ListMaps,
    ListRules,

    // Manual play
    StartSession {
        map_id: String,
        rule_id: String,
    },
    /// Same map and rules, fresh state.
    Restart,
    Step {
        direction: String,
    },
    GetSession,

    // Path replay
    LoadReplay {
        map_id: String,
        path_id: String,
    },
    /// Rolls out the greedy policy of a stored Q-table; scores it when a rule
    /// set is given.
    LoadOptimalPath {
        map_id: String,
        qtable_id: String,
        #[serde(default)]
        rule_id: Option<String>,
    },
    ReplayAdvance,
    ReplayReset,
    ReplayPlay,
    ReplayPause,
    GetReplay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Maps {
        maps: Vec<String>,
    },
    Rules {
        rules: Vec<RuleSummary>,
    },
    Session(Box<SessionSnapshot>),
    Step(StepResult),
    Replay(Box<ReplaySnapshot>),
    Success {
        message: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub id: String,
    pub name: String,
    pub max_steps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub map_id: String,
    pub rule_id: String,
    /// Working grid as cell codes, consumed collectibles cleared.
    pub grid: Vec<Vec<String>>,
    pub position: Pos,
    pub score: i64,
    pub step_count: u32,
    pub max_steps: u32,
    pub terminated: bool,
    #[serde(default)]
    pub last_event: Option<StepEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySnapshot {
    pub map_id: String,
    /// `path:<id>` or `qtable:<id>`.
    pub source: String,
    pub grid: Vec<Vec<String>>,
    pub index: usize,
    pub len: usize,
    pub position: Pos,
    #[serde(default)]
    pub score: Option<i64>,
    pub at_end: bool,
    pub playing: bool,
    /// Distinct cells visited so far, in first-visit order.
    pub trail: Vec<Pos>,
}
