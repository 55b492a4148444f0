//! Pairwise infection resolution.
//!
//! Two agents can only transmit when they are close (Chebyshev distance at most one) and
//! exactly one of them is infected. The infected agent is always the transmitter, whichever
//! argument position it occupies, and one Bernoulli draw decides the outcome.
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::context::Context;
use crate::define_rng;
use crate::error::EpiGridError;
use crate::log::trace;
use crate::random::ContextRandomExt;

define_rng!(TransmissionRng);

/// Probability of transmission keyed by (infected agent masked?, susceptible agent masked?).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TransmissionTable {
    pub unmasked_to_unmasked: f64,
    pub unmasked_to_masked: f64,
    pub masked_to_unmasked: f64,
    pub masked_to_masked: f64,
}

impl TransmissionTable {
    /// A table with the same probability for every mask combination.
    #[must_use]
    pub fn uniform(probability: f64) -> Self {
        TransmissionTable {
            unmasked_to_unmasked: probability,
            unmasked_to_masked: probability,
            masked_to_unmasked: probability,
            masked_to_masked: probability,
        }
    }

    #[must_use]
    pub fn probability(&self, infected_masked: bool, susceptible_masked: bool) -> f64 {
        match (infected_masked, susceptible_masked) {
            (false, false) => self.unmasked_to_unmasked,
            (false, true) => self.unmasked_to_masked,
            (true, false) => self.masked_to_unmasked,
            (true, true) => self.masked_to_masked,
        }
    }

    /// # Errors
    ///
    /// Returns `EpiGridError::ConfigError` if any entry is outside `[0, 1]` or not a number.
    pub fn validate(&self) -> Result<(), EpiGridError> {
        let entries = [
            ("unmasked_to_unmasked", self.unmasked_to_unmasked),
            ("unmasked_to_masked", self.unmasked_to_masked),
            ("masked_to_unmasked", self.masked_to_unmasked),
            ("masked_to_masked", self.masked_to_masked),
        ];
        for (name, probability) in entries {
            if !(0.0..=1.0).contains(&probability) {
                return Err(EpiGridError::ConfigError(format!(
                    "transmission probability {name} must be within [0, 1], got {probability}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for TransmissionTable {
    fn default() -> Self {
        TransmissionTable {
            unmasked_to_unmasked: 0.9,
            unmasked_to_masked: 0.7,
            masked_to_unmasked: 0.05,
            masked_to_masked: 0.015,
        }
    }
}

/// Which members of a checked pair should become infected.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InfectionOutcome {
    pub infect_first: bool,
    pub infect_second: bool,
}

impl InfectionOutcome {
    pub const NONE: InfectionOutcome = InfectionOutcome {
        infect_first: false,
        infect_second: false,
    };
}

/// Decides whether the infected member of `(first, second)` infects the other one.
///
/// Returns [`InfectionOutcome::NONE`] without drawing a random number when the agents are not
/// close or share the same infection status.
#[must_use]
pub fn check_infection(
    context: &Context,
    first: &Agent,
    second: &Agent,
    table: &TransmissionTable,
) -> InfectionOutcome {
    if !first.is_close(second) || first.is_infected() == second.is_infected() {
        return InfectionOutcome::NONE;
    }

    let (infected, susceptible) = if first.is_infected() {
        (first, second)
    } else {
        (second, first)
    };
    let probability = infected.transmission_probability(susceptible, table);
    if !context.sample_bool(TransmissionRng, probability) {
        return InfectionOutcome::NONE;
    }

    trace!(
        "{:?} at {} transmits to {:?} at {} (p={probability})",
        infected.id(),
        infected.cell(),
        susceptible.id(),
        susceptible.cell()
    );
    if first.is_infected() {
        InfectionOutcome {
            infect_first: false,
            infect_second: true,
        }
    } else {
        InfectionOutcome {
            infect_first: true,
            infect_second: false,
        }
    }
}
