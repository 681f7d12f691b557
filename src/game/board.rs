//! Board Grid
//!
//! Fixed-size grid of cells, each holding at most one piece.
//! Row 0 is seat 1's home edge; row `height - 1` is seat 2's.

use serde::{Deserialize, Serialize};

use crate::game::piece::Piece;

/// Smallest accepted board dimension.
pub const MIN_DIMENSION: u8 = 4;

/// Largest accepted board dimension.
pub const MAX_DIMENSION: u8 = 12;

/// Default board width.
pub const DEFAULT_WIDTH: u8 = 7;

/// Default board height.
pub const DEFAULT_HEIGHT: u8 = 7;

/// Orthogonal step directions in cleave resolution order:
/// up (toward row 0), down, left, right. Iteration order is part of
/// the rules contract and must not change.
pub const ORTHOGONAL_DIRS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// A board coordinate. Signed so that out-of-bounds deltas can be
/// represented before bounds checking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Row index, 0 at seat 1's home edge.
    pub row: i8,
    /// Column index.
    pub col: i8,
}

impl Coord {
    /// Create a coordinate.
    pub const fn new(row: i8, col: i8) -> Self {
        Self { row, col }
    }

    /// Row/column delta from `self` to `other`.
    pub fn delta_to(&self, other: Coord) -> (i8, i8) {
        (other.row - self.row, other.col - self.col)
    }

    /// Manhattan distance to another coordinate.
    pub fn manhattan(&self, other: Coord) -> u8 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// Coordinate one step in `dir` from `self`.
    pub fn step(&self, dir: (i8, i8)) -> Coord {
        Coord::new(self.row + dir.0, self.col + dir.1)
    }
}

/// Reduce a straight orthogonal delta to a unit direction.
/// Returns `None` for diagonal or zero deltas.
pub fn unit_direction(delta: (i8, i8)) -> Option<(i8, i8)> {
    match delta {
        (0, 0) => None,
        (dr, 0) => Some((dr.signum(), 0)),
        (0, dc) => Some((0, dc.signum())),
        _ => None,
    }
}

/// The playing field. One optional piece per cell, row-major storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    width: u8,
    height: u8,
    cells: Vec<Option<Piece>>,
}

impl Board {
    /// Create an empty board. Dimensions are assumed pre-validated
    /// against [`MIN_DIMENSION`]/[`MAX_DIMENSION`].
    pub fn new(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    /// Board width in columns.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Board height in rows.
    pub fn height(&self) -> u8 {
        self.height
    }

    /// Whether a coordinate lies on the board.
    pub fn in_bounds(&self, at: Coord) -> bool {
        at.row >= 0 && at.col >= 0 && (at.row as u8) < self.height && (at.col as u8) < self.width
    }

    fn index(&self, at: Coord) -> Option<usize> {
        if self.in_bounds(at) {
            Some(at.row as usize * self.width as usize + at.col as usize)
        } else {
            None
        }
    }

    /// Piece at a cell, if any. Out-of-bounds reads as empty.
    pub fn piece_at(&self, at: Coord) -> Option<&Piece> {
        self.index(at).and_then(|i| self.cells[i].as_ref())
    }

    /// Mutable piece at a cell, if any.
    pub fn piece_at_mut(&mut self, at: Coord) -> Option<&mut Piece> {
        self.index(at).and_then(|i| self.cells[i].as_mut())
    }

    /// Whether a cell is on the board and empty.
    pub fn is_empty_cell(&self, at: Coord) -> bool {
        self.index(at).map(|i| self.cells[i].is_none()).unwrap_or(false)
    }

    /// Put a piece on a cell, returning whatever occupied it before.
    /// Callers validate emptiness first; the return value exists so a
    /// violated occupancy invariant is observable rather than silent.
    pub fn put(&mut self, at: Coord, piece: Piece) -> Option<Piece> {
        match self.index(at) {
            Some(i) => self.cells[i].replace(piece),
            None => Some(piece),
        }
    }

    /// Remove and return the piece at a cell.
    pub fn take(&mut self, at: Coord) -> Option<Piece> {
        self.index(at).and_then(|i| self.cells[i].take())
    }

    /// Iterate all occupied cells.
    pub fn pieces(&self) -> impl Iterator<Item = (Coord, &Piece)> {
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.as_ref().map(|p| {
                let row = (i / self.width as usize) as i8;
                let col = (i % self.width as usize) as i8;
                (Coord::new(row, col), p)
            })
        })
    }

    /// Clear every piece's transient charge direction.
    pub fn clear_charges(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.charge_dir = None;
        }
    }

    /// Depth of each seat's deployment band in rows: `ceil(height / 3)`.
    pub fn deployment_depth(&self) -> u8 {
        (self.height + 2) / 3
    }

    /// Whether a cell lies in a seat's deployment band (the contiguous
    /// rows nearest that seat's home edge).
    pub fn in_deployment_zone(&self, seat: u8, at: Coord) -> bool {
        if !self.in_bounds(at) {
            return false;
        }
        let depth = self.deployment_depth();
        match seat {
            1 => (at.row as u8) < depth,
            2 => at.row as u8 >= self.height - depth,
            _ => false,
        }
    }

    /// A seat's home edge row, where pieces replenish.
    pub fn home_row(&self, seat: u8) -> i8 {
        if seat == 1 {
            0
        } else {
            (self.height - 1) as i8
        }
    }

    /// Count of cells holding more than zero pieces owned by `seat`.
    pub fn piece_count(&self, seat: u8) -> usize {
        self.pieces().filter(|(_, p)| p.owner == seat).count()
    }
}
