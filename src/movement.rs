//! Movement resolution.
//!
//! Every step each agent considers the nine moves (stay plus the eight neighbours) in a freshly
//! shuffled order and takes the first one that is valid. Staying is always valid, so an agent
//! that is boxed in simply stays.
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::context::Context;
use crate::define_rng;
use crate::error::EpiGridError;
use crate::grid::{Cell, GridOccupancy};
use crate::random::ContextRandomExt;

define_rng!(MoveRng);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum Move {
    Stay,
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Move {
    /// `(dx, dy)` for this move. Up decreases `y`.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Move::Stay => (0, 0),
            Move::Up => (0, -1),
            Move::Down => (0, 1),
            Move::Left => (-1, 0),
            Move::Right => (1, 0),
            Move::UpLeft => (-1, -1),
            Move::UpRight => (1, -1),
            Move::DownLeft => (-1, 1),
            Move::DownRight => (1, 1),
        }
    }

    #[must_use]
    pub const fn destination(self, from: Cell) -> Cell {
        let (dx, dy) = self.offset();
        from.offset(dx, dy)
    }

    /// Staying is always valid. Any other move needs an in-bounds, free destination.
    #[must_use]
    pub fn is_valid(self, from: Cell, occupancy: &GridOccupancy) -> bool {
        if self == Move::Stay {
            return true;
        }
        let destination = self.destination(from);
        occupancy.in_bounds(destination) && occupancy.is_free(destination)
    }
}

/// All nine moves in a uniformly random order.
#[must_use]
pub fn shuffled_moves(context: &Context) -> [Move; Move::COUNT] {
    let mut candidates = [Move::Stay; Move::COUNT];
    for (slot, candidate) in candidates.iter_mut().zip(Move::iter()) {
        *slot = candidate;
    }
    context.shuffle(MoveRng, &mut candidates);
    candidates
}

/// Returns the first valid move among `candidates`.
///
/// # Errors
///
/// Returns `EpiGridError::InvariantViolation` if no candidate is valid, which can only happen
/// when `candidates` does not contain [`Move::Stay`].
pub fn select_move(
    candidates: &[Move],
    from: Cell,
    occupancy: &GridOccupancy,
) -> Result<Move, EpiGridError> {
    candidates
        .iter()
        .copied()
        .find(|candidate| candidate.is_valid(from, occupancy))
        .ok_or_else(|| {
            EpiGridError::InvariantViolation(format!("no valid move from {from}"))
        })
}
