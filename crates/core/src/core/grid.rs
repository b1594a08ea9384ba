//! Grid model: cell codes, positions, directions and the authoritative map asset.
//!
//! A [`GridMap`] is what the map service hands us. It is immutable once built and
//! is meant to be shared (`Arc<GridMap>`) between any number of sessions and
//! replays. Sessions that need to consume collectibles work on their own
//! [`Grid`] clone.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// One cell of the grid.
///
/// Wire codes: `0` empty, `1` wall, `S` start, `G` goal, `R` collectible, `T` trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum Cell {
    Empty,
    Wall,
    Start,
    Goal,
    Collectible,
    Trap,
}

impl Cell {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" | "" => Some(Cell::Empty),
            "1" => Some(Cell::Wall),
            "S" => Some(Cell::Start),
            "G" => Some(Cell::Goal),
            "R" => Some(Cell::Collectible),
            "T" => Some(Cell::Trap),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Cell::Empty => "0",
            Cell::Wall => "1",
            Cell::Start => "S",
            Cell::Goal => "G",
            Cell::Collectible => "R",
            Cell::Trap => "T",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Cell::Empty => "empty",
            Cell::Wall => "wall",
            Cell::Start => "start",
            Cell::Goal => "goal",
            Cell::Collectible => "collectible",
            Cell::Trap => "trap",
        }
    }

    /// Walls are the only impassable cells.
    pub fn is_passable(self) -> bool {
        self != Cell::Wall
    }
}

impl TryFrom<String> for Cell {
    type Error = GridError;

    fn try_from(code: String) -> Result<Self> {
        Cell::from_code(&code).ok_or_else(|| GridError::invalid(format!("unknown cell code {code:?}")))
    }
}

impl From<Cell> for String {
    fn from(cell: Cell) -> Self {
        cell.code().to_string()
    }
}

/// `(row, col)` position. Serialized as `[row, col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "[usize; 2]", into = "[usize; 2]")
)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Unit offset applied to this position. `None` when it would underflow.
    pub fn offset(self, dir: Direction) -> Option<Pos> {
        let (di, dj) = dir.offset();
        let row = self.row.checked_add_signed(di)?;
        let col = self.col.checked_add_signed(dj)?;
        Some(Pos { row, col })
    }
}

impl From<[usize; 2]> for Pos {
    fn from([row, col]: [usize; 2]) -> Self {
        Pos { row, col }
    }
}

impl From<Pos> for [usize; 2] {
    fn from(p: Pos) -> Self {
        [p.row, p.col]
    }
}

impl From<(usize, usize)> for Pos {
    fn from((row, col): (usize, usize)) -> Self {
        Pos { row, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl FromStr for Pos {
    type Err = GridError;

    /// Parses the trainer's `"i,j"` state key.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || GridError::invalid(format!("bad position {s:?}"));
        let (r, c) = s.split_once(',').ok_or_else(bad)?;
        let row = r.trim().parse().map_err(|_| bad())?;
        let col = c.trim().parse().map_err(|_| bad())?;
        Ok(Pos { row, col })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Trainer action order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(d_row, d_col)`.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn from_offset(di: isize, dj: isize) -> Option<Self> {
        match (di, dj) {
            (-1, 0) => Some(Direction::Up),
            (1, 0) => Some(Direction::Down),
            (0, -1) => Some(Direction::Left),
            (0, 1) => Some(Direction::Right),
            _ => None,
        }
    }

    /// Direction that moves `from` onto `to`, if they are orthogonal neighbours.
    pub fn between(from: Pos, to: Pos) -> Option<Self> {
        let di = to.row as isize - from.row as isize;
        let dj = to.col as isize - from.col as isize;
        Self::from_offset(di, dj)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl FromStr for Direction {
    type Err = GridError;

    /// Accepts action names (`up`) and keyboard key names (`ArrowUp`).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "arrowup" => Ok(Direction::Up),
            "down" | "arrowdown" => Ok(Direction::Down),
            "left" | "arrowleft" => Ok(Direction::Left),
            "right" | "arrowright" => Ok(Direction::Right),
            _ => Err(GridError::InvalidDirection(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rectangular, row-major cell matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Builds a grid from rows, rejecting empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        if n_rows == 0 || n_cols == 0 {
            return Err(GridError::invalid("grid is empty"));
        }
        if let Some(i) = rows.iter().position(|r| r.len() != n_cols) {
            return Err(GridError::invalid(format!(
                "row {i} has {} cells, expected {n_cols}",
                rows[i].len()
            )));
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Builds a grid from wire cell codes (`"S"`, `"0"`, ...).
    pub fn from_codes<S: AsRef<str>>(rows: &[Vec<S>]) -> Result<Self> {
        let parsed = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, code)| {
                        Cell::from_code(code.as_ref()).ok_or_else(|| {
                            GridError::invalid(format!(
                                "unknown cell code {:?} at ({i},{j})",
                                code.as_ref()
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(parsed)
    }

    /// Compact text form: one line per row, one code character per cell.
    /// Blank lines and spaces are ignored.
    pub fn from_text(text: &str) -> Result<Self> {
        let rows: Vec<Vec<String>> = text
            .lines()
            .map(|l| {
                l.chars()
                    .filter(|c| !c.is_whitespace())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|r| !r.is_empty())
            .collect();
        Self::from_codes(&rows)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, p: Pos) -> bool {
        p.row < self.rows && p.col < self.cols
    }

    pub fn get(&self, p: Pos) -> Option<Cell> {
        if self.contains(p) {
            Some(self.cells[self.idx(p)])
        } else {
            None
        }
    }

    pub(crate) fn set(&mut self, p: Pos, cell: Cell) {
        if self.contains(p) {
            let i = self.idx(p);
            self.cells[i] = cell;
        }
    }

    /// Neighbour of `p` in `dir`, if it lies inside the grid.
    pub fn neighbor(&self, p: Pos, dir: Direction) -> Option<Pos> {
        p.offset(dir).filter(|n| self.contains(*n))
    }

    /// All positions holding `cell`, row-major.
    pub fn positions_of(&self, cell: Cell) -> impl Iterator<Item = Pos> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, c)| **c == cell)
            .map(move |(i, _)| Pos::new(i / self.cols, i % self.cols))
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }

    /// Wire-code rows, the shape the UI renders.
    pub fn to_codes(&self) -> Vec<Vec<String>> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|c| c.code().to_string()).collect())
            .collect()
    }

    fn idx(&self, p: Pos) -> usize {
        p.row * self.cols + p.col
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.cols) {
            for c in row {
                f.write_str(c.code())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Map document as served by the map service.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MapDocument {
    #[serde(default)]
    pub name: String,
    /// `[rows, cols]`.
    #[serde(default)]
    pub size: Option<[usize; 2]>,
    #[serde(default)]
    pub start: Option<Pos>,
    #[serde(default)]
    pub goal: Option<Pos>,
    pub map: Vec<Vec<String>>,
}

/// The authoritative, validated map asset.
#[derive(Debug, Clone)]
pub struct GridMap {
    name: String,
    grid: Grid,
    start: Pos,
}

impl GridMap {
    /// Validates a grid into a playable map. The start is the first `S` cell in
    /// row-major order.
    pub fn new(name: impl Into<String>, grid: Grid) -> Result<Self> {
        Self::with_fallback_start(name.into(), grid, None)
    }

    fn with_fallback_start(name: String, grid: Grid, fallback: Option<Pos>) -> Result<Self> {
        let start = match grid.positions_of(Cell::Start).next() {
            Some(p) => p,
            None => {
                let p = fallback.ok_or_else(|| GridError::invalid("map has no start cell"))?;
                match grid.get(p) {
                    None => {
                        return Err(GridError::invalid(format!("start {p} is out of bounds")))
                    }
                    Some(Cell::Wall) => {
                        return Err(GridError::invalid(format!("start {p} is a wall")))
                    }
                    Some(_) => p,
                }
            }
        };
        Ok(Self { name, grid, start })
    }

    #[cfg(feature = "serde")]
    pub fn from_document(doc: MapDocument) -> Result<Self> {
        let grid = Grid::from_codes(&doc.map)?;
        if let Some([rows, cols]) = doc.size {
            if rows != grid.rows() || cols != grid.cols() {
                return Err(GridError::invalid(format!(
                    "size [{rows}, {cols}] does not match grid {}x{}",
                    grid.rows(),
                    grid.cols()
                )));
            }
        }
        Self::with_fallback_start(doc.name, grid, doc.start)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: MapDocument = serde_json::from_str(text)?;
        Self::from_document(doc)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn goals(&self) -> Vec<Pos> {
        self.grid.positions_of(Cell::Goal).collect()
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }
}
