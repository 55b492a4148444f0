//! Grid cells and the occupancy index.
//!
//! The grid is a bounded square of `grid_size x grid_size` cells. `x` grows to the right and
//! `y` grows downwards. At most one agent may stand on a cell; [`GridOccupancy`] tracks which
//! cells are taken so free-cell queries are *O*(1).
use std::fmt::{self, Display, Formatter};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::EpiGridError;

/// Number of cells in a grid with side `grid_size`, or `None` if it does not fit the coordinate
/// type.
#[must_use]
pub fn cell_count(grid_size: usize) -> Option<usize> {
    i32::try_from(grid_size).ok()?;
    grid_size.checked_mul(grid_size)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Cell {
        Cell { x, y }
    }

    /// The cell at position `index` when the grid is enumerated column by column.
    ///
    /// `index` must be smaller than `grid_size * grid_size`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn from_index(index: usize, grid_size: usize) -> Cell {
        Cell::new((index / grid_size) as i32, (index % grid_size) as i32)
    }

    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Cell {
        Cell::new(self.x + dx, self.y + dy)
    }

    #[must_use]
    pub fn in_bounds(self, grid_size: usize) -> bool {
        let inside = |coordinate: i32| usize::try_from(coordinate).is_ok_and(|c| c < grid_size);
        inside(self.x) && inside(self.y)
    }

    /// Chessboard distance: the larger of the two axis distances.
    #[must_use]
    pub fn chebyshev_distance(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The set of occupied cells of one grid.
#[derive(Debug, Clone)]
pub struct GridOccupancy {
    grid_size: usize,
    occupied: FxHashSet<Cell>,
}

impl GridOccupancy {
    #[must_use]
    pub fn new(grid_size: usize) -> GridOccupancy {
        GridOccupancy {
            grid_size,
            occupied: FxHashSet::default(),
        }
    }

    /// Builds the index for agents standing on `cells`.
    ///
    /// # Errors
    ///
    /// Returns `EpiGridError::ConfigError` if a cell is out of bounds or listed twice.
    pub fn from_cells(
        grid_size: usize,
        cells: impl IntoIterator<Item = Cell>,
    ) -> Result<GridOccupancy, EpiGridError> {
        let mut occupancy = GridOccupancy::new(grid_size);
        for cell in cells {
            if !occupancy.in_bounds(cell) {
                return Err(EpiGridError::ConfigError(format!(
                    "cell {cell} is outside a {grid_size}x{grid_size} grid"
                )));
            }
            if !occupancy.occupied.insert(cell) {
                return Err(EpiGridError::ConfigError(format!(
                    "cell {cell} is occupied by more than one agent"
                )));
            }
        }
        Ok(occupancy)
    }

    #[must_use]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    #[must_use]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.in_bounds(self.grid_size)
    }

    /// True iff no agent stands on `cell`. Bounds are not checked.
    #[must_use]
    pub fn is_free(&self, cell: Cell) -> bool {
        !self.occupied.contains(&cell)
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Moves an occupant from `from` to `to`. A move to the same cell is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `EpiGridError::InvariantViolation` if `from` is empty, or if `to` is taken or
    /// out of bounds. The index is unchanged in that case.
    pub fn commit_move(&mut self, from: Cell, to: Cell) -> Result<(), EpiGridError> {
        if !self.occupied.contains(&from) {
            return Err(EpiGridError::InvariantViolation(format!(
                "no agent to move from {from}"
            )));
        }
        if from == to {
            return Ok(());
        }
        if !self.in_bounds(to) || !self.is_free(to) {
            return Err(EpiGridError::InvariantViolation(format!(
                "cannot move from {from} to unavailable cell {to}"
            )));
        }
        self.occupied.remove(&from);
        self.occupied.insert(to);
        Ok(())
    }

    /// Iterates the occupied cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.occupied.iter()
    }
}
