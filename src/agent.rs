use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::grid::Cell;
use crate::transmission::TransmissionTable;

/// Agents closer than this (Chebyshev distance) can transmit.
pub const MAXIMUM_CONTACT_DISTANCE: u32 = 1;

/// Identifier of an agent, unique within one population. Ids are dense: a population of `n`
/// agents uses `0..n`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl Display for AgentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One person on the grid. Only the simulation engine moves or infects agents.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Agent {
    id: AgentId,
    cell: Cell,
    infected: bool,
    masked: bool,
}

impl Agent {
    #[must_use]
    pub fn new(id: AgentId, cell: Cell, infected: bool, masked: bool) -> Agent {
        Agent {
            id,
            cell,
            infected,
            masked,
        }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn cell(&self) -> Cell {
        self.cell
    }

    #[must_use]
    pub fn is_infected(&self) -> bool {
        self.infected
    }

    #[must_use]
    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// True iff `other` stands within contact distance of this agent.
    #[must_use]
    pub fn is_close(&self, other: &Agent) -> bool {
        self.cell.chebyshev_distance(other.cell) <= MAXIMUM_CONTACT_DISTANCE
    }

    /// Probability that this agent infects `susceptible`, given both agents' masks.
    #[must_use]
    pub fn transmission_probability(&self, susceptible: &Agent, table: &TransmissionTable) -> f64 {
        table.probability(self.masked, susceptible.masked)
    }

    /// Marks the agent infected. Returns `false` if it already was.
    pub(crate) fn infect(&mut self) -> bool {
        !std::mem::replace(&mut self.infected, true)
    }

    pub(crate) fn move_to(&mut self, cell: Cell) {
        self.cell = cell;
    }
}

/// Placement and status of one agent in an explicitly constructed population.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub cell: Cell,
    pub infected: bool,
    pub masked: bool,
}

impl AgentSpec {
    #[must_use]
    pub fn new(x: i32, y: i32, infected: bool, masked: bool) -> AgentSpec {
        AgentSpec {
            cell: Cell::new(x, y),
            infected,
            masked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closeness_includes_diagonals_and_same_cell() {
        let agent = Agent::new(AgentId(0), Cell::new(2, 2), false, false);
        for (x, y, close) in [
            (2, 2, true),
            (1, 1, true),
            (3, 1, true),
            (2, 3, true),
            (4, 2, false),
            (0, 0, false),
            (3, 4, false),
        ] {
            let other = Agent::new(AgentId(1), Cell::new(x, y), false, false);
            assert_eq!(agent.is_close(&other), close, "({x}, {y})");
            assert_eq!(other.is_close(&agent), close, "({x}, {y}) reversed");
        }
    }

    #[test]
    fn infection_is_sticky() {
        let mut agent = Agent::new(AgentId(3), Cell::new(0, 0), false, true);
        assert!(agent.infect());
        assert!(agent.is_infected());
        assert!(!agent.infect());
        assert!(agent.is_infected());
        assert!(agent.is_masked());
    }

    #[test]
    fn transmission_probability_uses_both_masks() {
        let table = TransmissionTable::default();
        let masked = Agent::new(AgentId(0), Cell::new(0, 0), true, true);
        let unmasked = Agent::new(AgentId(1), Cell::new(0, 1), false, false);
        assert_eq!(masked.transmission_probability(&unmasked, &table), 0.05);
        assert_eq!(unmasked.transmission_probability(&masked, &table), 0.7);
    }
}
