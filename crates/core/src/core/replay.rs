//! Step-indexed playback of a precomputed path over a static map.
//!
//! The replay never computes rewards and never checks collisions: the path is
//! whatever the analysis service produced. It only guarantees that the index it
//! holds always points at a renderable position.

use std::sync::Arc;

use hashbrown::HashSet;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::grid::{GridMap, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ReplayPhase {
    Active,
    AtEnd,
}

/// Path document as served by the analysis service.
///
/// Accepts `{"optimal_path": [[i,j], ...], "scores": [...]}` or a bare array.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathDocument {
    #[serde(alias = "path")]
    pub optimal_path: Vec<Pos>,
    #[serde(default, alias = "score_list", alias = "scoreList")]
    pub scores: Option<Vec<i64>>,
}

#[cfg(feature = "serde")]
impl PathDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Doc(PathDocument),
            Bare(Vec<Pos>),
        }
        Ok(match serde_json::from_str::<Wire>(text)? {
            Wire::Doc(d) => d,
            Wire::Bare(optimal_path) => PathDocument {
                optimal_path,
                scores: None,
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct PathReplay {
    map: Arc<GridMap>,
    path: Vec<Pos>,
    scores: Option<Vec<i64>>,
    idx: usize,
}

impl PathReplay {
    /// Binds a map and path. Empty paths and out-of-map positions are rejected.
    pub fn new(map: Arc<GridMap>, path: Vec<Pos>, scores: Option<Vec<i64>>) -> Result<Self> {
        if map.rows() == 0 || map.cols() == 0 {
            return Err(GridError::invalid("replay map is empty"));
        }
        if path.is_empty() {
            return Err(GridError::invalid("replay path is empty"));
        }
        if let Some((i, p)) = path
            .iter()
            .enumerate()
            .find(|(_, p)| !map.grid().contains(**p))
        {
            return Err(GridError::invalid(format!(
                "path[{i}] = {p} lies outside the {}x{} map",
                map.rows(),
                map.cols()
            )));
        }
        Ok(Self {
            map,
            path,
            scores,
            idx: 0,
        })
    }

    #[cfg(feature = "serde")]
    pub fn from_document(map: Arc<GridMap>, doc: PathDocument) -> Result<Self> {
        Self::new(map, doc.optimal_path, doc.scores)
    }

    pub fn map(&self) -> &Arc<GridMap> {
        &self.map
    }

    pub fn path(&self) -> &[Pos] {
        &self.path
    }

    pub fn scores(&self) -> Option<&[i64]> {
        self.scores.as_deref()
    }

    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn phase(&self) -> ReplayPhase {
        if self.is_at_end() {
            ReplayPhase::AtEnd
        } else {
            ReplayPhase::Active
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.idx + 1 >= self.path.len()
    }

    /// Moves forward one index; a no-op at the last index.
    pub fn advance(&mut self) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.idx += 1;
        true
    }

    pub fn reset(&mut self) {
        self.idx = 0;
    }

    pub fn current_position(&self) -> Pos {
        self.path[self.idx]
    }

    /// Score at the current index, if a score list was supplied and covers it.
    pub fn current_score(&self) -> Option<i64> {
        self.scores.as_ref().and_then(|s| s.get(self.idx).copied())
    }

    /// Distinct positions at indices `0..=k` (clamped to the last index).
    pub fn visited_cells(&self, k: usize) -> HashSet<Pos> {
        self.prefix(k).iter().copied().collect()
    }

    /// Distinct positions at indices `0..=k` in first-visit order.
    pub fn trail(&self, k: usize) -> Vec<Pos> {
        let mut seen = HashSet::new();
        self.prefix(k)
            .iter()
            .copied()
            .filter(|p| seen.insert(*p))
            .collect()
    }

    fn prefix(&self, k: usize) -> &[Pos] {
        let end = k.min(self.path.len() - 1);
        &self.path[..=end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn map(text: &str) -> Arc<GridMap> {
        Arc::new(GridMap::new("t", Grid::from_text(text).unwrap()).unwrap())
    }

    fn path(cells: &[(usize, usize)]) -> Vec<Pos> {
        cells.iter().copied().map(Pos::from).collect()
    }

    #[test]
    fn advances_to_end_then_holds() {
        let mut r = PathReplay::new(map("S0\n0G"), path(&[(0, 0), (0, 1), (1, 1)]), None).unwrap();
        assert_eq!(r.phase(), ReplayPhase::Active);
        assert!(r.advance());
        assert!(r.advance());
        assert_eq!(r.current_position(), Pos::new(1, 1));
        assert!(r.is_at_end());
        assert!(!r.advance());
        assert_eq!(r.index(), 2);
        assert_eq!(r.phase(), ReplayPhase::AtEnd);

        r.reset();
        assert_eq!(r.index(), 0);
        assert_eq!(r.current_position(), Pos::new(0, 0));
        assert!(!r.is_at_end());
    }

    #[test]
    fn single_position_path_starts_at_end() {
        let mut r = PathReplay::new(map("S"), path(&[(0, 0)]), None).unwrap();
        assert!(r.is_at_end());
        assert!(!r.advance());
        assert_eq!(r.current_position(), Pos::new(0, 0));
    }

    #[test]
    fn visited_cells_dedup_without_touching_the_path() {
        let p = path(&[(0, 0), (0, 1), (0, 0), (0, 1), (1, 1)]);
        let r = PathReplay::new(map("S0\n0G"), p.clone(), None).unwrap();
        let visited = r.visited_cells(3);
        assert_eq!(visited.len(), 2);
        assert!(visited.contains(&Pos::new(0, 1)));
        assert!(!visited.contains(&Pos::new(1, 1)));
        assert_eq!(r.visited_cells(99).len(), 3);
        assert_eq!(r.trail(4), path(&[(0, 0), (0, 1), (1, 1)]));
        assert_eq!(r.path(), p.as_slice());
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn invalid_input_is_reported() {
        assert!(matches!(
            PathReplay::new(map("S0"), Vec::new(), None),
            Err(GridError::InvalidInput(_))
        ));
        assert!(matches!(
            PathReplay::new(map("S0"), path(&[(0, 0), (3, 0)]), None),
            Err(GridError::InvalidInput(_))
        ));
    }

    #[test]
    fn scores_follow_the_index() {
        let mut r =
            PathReplay::new(map("S0G"), path(&[(0, 0), (0, 1), (0, 2)]), Some(vec![0, -1])).unwrap();
        assert_eq!(r.current_score(), Some(0));
        r.advance();
        assert_eq!(r.current_score(), Some(-1));
        r.advance();
        assert_eq!(r.current_score(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn path_documents_parse_both_shapes() {
        let doc = PathDocument::from_json(r#"{"optimal_path":[[0,0],[0,1]],"scores":[0,-1]}"#).unwrap();
        assert_eq!(doc.optimal_path, path(&[(0, 0), (0, 1)]));
        assert_eq!(doc.scores, Some(vec![0, -1]));

        let bare = PathDocument::from_json("[[0,0],[1,0]]").unwrap();
        assert_eq!(bare.optimal_path, path(&[(0, 0), (1, 0)]));
        assert!(bare.scores.is_none());

        assert!(PathDocument::from_json(r#"{"nope":1}"#).is_err());
    }
}
