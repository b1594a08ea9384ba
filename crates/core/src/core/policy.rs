//! Greedy rollout of a trained Q-table, and scoring of a path through the
//! environment so that replayed scores match what manual play would show.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::env::Session;
use crate::error::{GridError, Result};
use crate::grid::{Cell, Direction, GridMap, Pos};
use crate::rules::RuleSet;

/// Longest rollout the analysis view produces.
pub const MAX_ROLLOUT_HOPS: usize = 100;

/// One row of the trainer's Q-table export.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QRecord {
    /// `"row,col"`.
    pub state: String,
    pub action: String,
    pub value: f64,
}

/// Action values per state, in export order.
#[derive(Debug, Clone, Default)]
pub struct QTable {
    values: HashMap<Pos, Vec<(Direction, f64)>>,
}

impl QTable {
    pub fn from_records(records: &[QRecord]) -> Result<Self> {
        let mut values: HashMap<Pos, Vec<(Direction, f64)>> = HashMap::new();
        for r in records {
            let pos: Pos = r.state.parse()?;
            let dir: Direction = r
                .action
                .parse()
                .map_err(|_| GridError::invalid(format!("unknown action {:?} in q-table", r.action)))?;
            values.entry(pos).or_default().push((dir, r.value));
        }
        Ok(Self { values })
    }

    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Self> {
        let records: Vec<QRecord> = serde_json::from_str(text)?;
        Self::from_records(&records)
    }

    pub fn insert(&mut self, pos: Pos, dir: Direction, value: f64) {
        self.values.entry(pos).or_default().push((dir, value));
    }

    pub fn len(&self) -> usize {
        self.values.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Highest-valued action at `pos`; ties go to the earliest entry.
    pub fn best_action(&self, pos: Pos) -> Option<Direction> {
        let entries = self.values.get(&pos)?;
        let mut best: Option<(Direction, f64)> = None;
        for &(dir, v) in entries {
            match best {
                Some((_, bv)) if v <= bv => {}
                _ => best = Some((dir, v)),
            }
        }
        best.map(|(d, _)| d)
    }
}

/// Follows the greedy policy from the map's start.
///
/// Stops when the state has no values, when the chosen move leaves the grid or
/// hits a wall, on reaching a goal, on revisiting a cell (the revisited cell is
/// still appended), or after [`MAX_ROLLOUT_HOPS`] iterations.
pub fn greedy_path(map: &GridMap, q: &QTable) -> Vec<Pos> {
    let grid = map.grid();
    let mut state = map.start();
    let mut path = vec![state];
    let mut visited = HashSet::new();

    for _ in 0..MAX_ROLLOUT_HOPS {
        visited.insert(state);
        let Some(dir) = q.best_action(state) else {
            break;
        };
        let Some(next) = grid.neighbor(state, dir) else {
            break;
        };
        let cell = grid.get(next).unwrap_or(Cell::Wall);
        if cell == Cell::Wall {
            break;
        }
        state = next;
        path.push(state);
        if cell == Cell::Goal || visited.contains(&state) {
            break;
        }
    }
    path
}

/// Score after each index of `path` when it is played through a fresh session.
///
/// Index 0 (the start) scores 0. If the session terminates before the path
/// ends, the remaining indices carry the terminal score.
pub fn score_path(map: Arc<GridMap>, rules: RuleSet, path: &[Pos]) -> Result<Vec<i64>> {
    let Some(&first) = path.first() else {
        return Err(GridError::invalid("path is empty"));
    };
    if first != map.start() {
        return Err(GridError::invalid(format!(
            "path begins at {first}, map starts at {}",
            map.start()
        )));
    }

    let mut session = Session::new(map, rules)?;
    let mut scores = Vec::with_capacity(path.len());
    scores.push(0);
    for (i, pair) in path.windows(2).enumerate() {
        let dir = Direction::between(pair[0], pair[1]).ok_or_else(|| {
            GridError::invalid(format!(
                "path[{}] = {} is not adjacent to path[{i}] = {}",
                i + 1,
                pair[1],
                pair[0]
            ))
        })?;
        if session.is_terminated() {
            scores.push(session.score());
            continue;
        }
        scores.push(session.step(dir)?.score);
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn map(text: &str) -> GridMap {
        GridMap::new("t", Grid::from_text(text).unwrap()).unwrap()
    }

    fn table(entries: &[((usize, usize), Direction, f64)]) -> QTable {
        let mut q = QTable::default();
        for &(p, d, v) in entries {
            q.insert(Pos::from(p), d, v);
        }
        q
    }

    #[test]
    fn best_action_prefers_first_on_ties() {
        let q = table(&[
            ((0, 0), Direction::Down, 1.0),
            ((0, 0), Direction::Right, 1.0),
            ((0, 0), Direction::Left, -3.0),
        ]);
        assert_eq!(q.best_action(Pos::new(0, 0)), Some(Direction::Down));
        assert_eq!(q.best_action(Pos::new(5, 5)), None);
    }

    #[test]
    fn greedy_path_reaches_goal() {
        let m = map("S00\n01R\n00G");
        let q = table(&[
            ((0, 0), Direction::Right, 5.0),
            ((0, 0), Direction::Down, 1.0),
            ((0, 1), Direction::Right, 6.0),
            ((0, 2), Direction::Down, 7.0),
            ((1, 2), Direction::Down, 9.0),
        ]);
        assert_eq!(
            greedy_path(&m, &q),
            vec![
                Pos::new(0, 0),
                Pos::new(0, 1),
                Pos::new(0, 2),
                Pos::new(1, 2),
                Pos::new(2, 2)
            ]
        );
    }

    #[test]
    fn greedy_path_stops_on_walls_edges_and_loops() {
        let m = map("S1\n00");
        let into_wall = table(&[((0, 0), Direction::Right, 1.0)]);
        assert_eq!(greedy_path(&m, &into_wall), vec![Pos::new(0, 0)]);

        let off_grid = table(&[((0, 0), Direction::Up, 1.0)]);
        assert_eq!(greedy_path(&m, &off_grid), vec![Pos::new(0, 0)]);

        let looping = table(&[
            ((0, 0), Direction::Down, 1.0),
            ((1, 0), Direction::Up, 1.0),
        ]);
        assert_eq!(
            greedy_path(&m, &looping),
            vec![Pos::new(0, 0), Pos::new(1, 0), Pos::new(0, 0)]
        );
    }

    #[test]
    fn scores_match_manual_play() {
        let m = Arc::new(map("S00\n01R\n00G"));
        let rules = RuleSet {
            bonus_reward: 20.0,
            step_decay: 0.99,
            step_penalty: -1.0,
            goal_reward: 100.0,
            wall_penalty: -5.0,
            max_steps: 10,
            ..RuleSet::default()
        };
        let path: Vec<Pos> = [(0, 0), (0, 1), (0, 2), (1, 2), (2, 2)]
            .into_iter()
            .map(Pos::from)
            .collect();
        assert_eq!(
            score_path(Arc::clone(&m), rules.clone(), &path).unwrap(),
            vec![0, -1, -2, 16, 110]
        );

        let jump = vec![Pos::new(0, 0), Pos::new(0, 2)];
        assert!(matches!(
            score_path(Arc::clone(&m), rules.clone(), &jump),
            Err(GridError::InvalidInput(_))
        ));
        let off_start = vec![Pos::new(0, 1)];
        assert!(score_path(m, rules, &off_start).is_err());
    }

    #[test]
    fn scores_hold_after_truncation() {
        let m = Arc::new(map("S000"));
        let rules = RuleSet {
            step_decay: 1.0,
            max_steps: 2,
            ..RuleSet::default()
        };
        let path: Vec<Pos> = (0..4).map(|c| Pos::new(0, c)).collect();
        assert_eq!(score_path(m, rules, &path).unwrap(), vec![0, -1, 0, 0]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn q_table_parses_trainer_export() {
        let q = QTable::from_json(
            r#"[{"state":"0,0","action":"right","value":0.5},
                {"state":"0,0","action":"down","value":0.75}]"#,
        )
        .unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.best_action(Pos::new(0, 0)), Some(Direction::Down));

        assert!(QTable::from_json(r#"[{"state":"0,0","action":"jump","value":1}]"#).is_err());
        assert!(QTable::from_json(r#"[{"state":"zero","action":"up","value":1}]"#).is_err());
    }
}
