use indexmap::IndexMap;
use rand::Rng;
use serde::{Serialize, Serializer};

use crate::state::action_log::Action;

/// Width and height of the square target grid.
pub const GRID_SIZE: usize = 3;

/// Keyboard layout mapped onto the grid, row by row.
const KEY_LAYOUT: [[&str; GRID_SIZE]; GRID_SIZE] =
    [["w", "e", "r"], ["s", "d", "f"], ["x", "c", "v"]];

/// Content of a single grid cell.
///
/// Serialized as `0` (empty), `1` (scoring target) or `2` (penalty target).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cell {
    #[default]
    Empty,
    Score,
    Penalty,
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let code = match self {
            Cell::Empty => 0,
            Cell::Score => 1,
            Cell::Penalty => 2,
        };
        serializer.serialize_u8(code)
    }
}

/// Row-major grid of cells.
pub type Grid = [[Cell; GRID_SIZE]; GRID_SIZE];

/// Position of a cell on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    fn from_index(index: usize) -> Self {
        Self {
            row: index / GRID_SIZE,
            col: index % GRID_SIZE,
        }
    }
}

/// Resolve an input symbol (e.g. `"d"`) to the grid cell it targets.
pub fn cell_for_input(input: &str) -> Option<CellPos> {
    KEY_LAYOUT.iter().enumerate().find_map(|(row, keys)| {
        keys.iter()
            .position(|key| *key == input)
            .map(|col| CellPos { row, col })
    })
}

/// Resolve the numeric hit code sent by structured clients (0..=8) to its key symbol.
pub fn input_for_hit(hit: i64) -> Option<&'static str> {
    let index = usize::try_from(hit).ok()?;
    if index >= GRID_SIZE * GRID_SIZE {
        return None;
    }
    let pos = CellPos::from_index(index);
    Some(KEY_LAYOUT[pos.row][pos.col])
}

/// What applying a single action did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitEffect {
    Scored,
    Penalized,
    Missed,
    Ignored,
}

/// Snapshot of a running round, broadcast to every member each tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameBoard {
    /// Score per player identifier.
    pub scores: IndexMap<String, u32>,
    /// Remaining health per player identifier; never below zero.
    pub healths: IndexMap<String, u32>,
    /// Remaining round time in milliseconds.
    #[serde(rename = "gameTime")]
    pub remaining_ms: i64,
    /// Target grid holding exactly one scoring and one penalty cell.
    pub board: Grid,
}

impl GameBoard {
    /// Fresh board for a new round: zeroed scores, full health, random targets.
    pub fn new<'a, R>(
        players: impl IntoIterator<Item = &'a str>,
        starting_health: u32,
        remaining_ms: i64,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut scores = IndexMap::new();
        let mut healths = IndexMap::new();
        for player in players {
            scores.insert(player.to_string(), 0);
            healths.insert(player.to_string(), starting_health);
        }

        Self {
            scores,
            healths,
            remaining_ms,
            board: place_targets(rng),
        }
    }

    /// Next board in the round: scores and health carry forward, targets move.
    pub fn next<R>(&self, remaining_ms: i64, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            scores: self.scores.clone(),
            healths: self.healths.clone(),
            remaining_ms,
            board: place_targets(rng),
        }
    }

    /// Apply one action against the current target positions.
    pub fn apply(&mut self, action: &Action) -> HitEffect {
        if !self.scores.contains_key(&action.player_id) {
            return HitEffect::Ignored;
        }
        let Some(pos) = cell_for_input(&action.input) else {
            return HitEffect::Ignored;
        };

        match self.board[pos.row][pos.col] {
            Cell::Score => {
                if let Some(score) = self.scores.get_mut(&action.player_id) {
                    *score += 1;
                }
                HitEffect::Scored
            }
            Cell::Penalty => {
                if let Some(health) = self.healths.get_mut(&action.player_id) {
                    *health = health.saturating_sub(1);
                }
                HitEffect::Penalized
            }
            Cell::Empty => HitEffect::Missed,
        }
    }

    /// Position of the scoring target.
    pub fn scoring_cell(&self) -> Option<CellPos> {
        self.find(Cell::Score)
    }

    /// Position of the penalty target.
    pub fn penalty_cell(&self) -> Option<CellPos> {
        self.find(Cell::Penalty)
    }

    fn find(&self, wanted: Cell) -> Option<CellPos> {
        (0..GRID_SIZE * GRID_SIZE)
            .map(CellPos::from_index)
            .find(|pos| self.board[pos.row][pos.col] == wanted)
    }
}

/// Place one scoring and one penalty target on distinct cells.
fn place_targets<R>(rng: &mut R) -> Grid
where
    R: Rng + ?Sized,
{
    let cells = GRID_SIZE * GRID_SIZE;
    let score = rng.random_range(0..cells);
    // Draw from the remaining cells so the two targets can never collide.
    let mut penalty = rng.random_range(0..cells - 1);
    if penalty >= score {
        penalty += 1;
    }

    let mut grid = Grid::default();
    let score = CellPos::from_index(score);
    let penalty = CellPos::from_index(penalty);
    grid[score.row][score.col] = Cell::Score;
    grid[penalty.row][penalty.col] = Cell::Penalty;
    grid
}
