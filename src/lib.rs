//! An agent-based epidemic simulation on a bounded square grid.
//!
//! A population of agents, each infected or susceptible and masked or not, random-walks over
//! the grid one cell at a time. Whenever an infected agent stands within one cell of a
//! susceptible one, it may transmit with a probability that depends on whether either of them
//! wears a mask. Infection is permanent, so every run either ends with the whole population
//! infected or is stopped.
//!
//! The central object is the [`Context`], which owns all state of one simulation:
//! * the parameters ([`parameters`]) and the population ([`population`]) built from them,
//! * the engine state ([`simulation`]), which advances the model one step per plan,
//! * named random number generators ([`random`]) derived from a single seed,
//! * report writers ([`report`]).
//!
//! Behaviour is added to the context through extension traits, collected in the [`prelude`].
//! Observers subscribe to the engine's events instead of polling it; the bundled
//! [`incidence_report`] and [`periodic_report`] are built that way, as is the `epigrid` binary.
//!
//! ```
//! use epigrid::prelude::*;
//!
//! let mut context = Context::new();
//! context.init_random(42);
//! context
//!     .set_parameters(Parameters {
//!         grid_size: 20,
//!         population_size: 50,
//!         initial_infected: Share::Count(1),
//!         ..Parameters::default()
//!     })
//!     .unwrap();
//! context.subscribe_to_event(|_, event: StepCompleteEvent| {
//!     println!("epoch {}: {}/{} infected", event.epoch, event.infected, event.total);
//! });
//! context.init_simulation().unwrap();
//! context.start_simulation().unwrap();
//! context.execute();
//! assert_eq!(context.infected_count(), 50);
//! ```
pub mod agent;
pub mod context;
pub mod error;
pub mod grid;
pub mod incidence_report;
pub mod log;
pub mod movement;
pub mod parameters;
pub mod periodic_report;
pub mod plan;
pub mod population;
pub mod prelude;
pub mod random;
pub mod report;
pub mod runner;
pub mod simulation;
pub mod transmission;

pub use context::{Context, Event};
pub use error::EpiGridError;

// Re-exports for the macros
pub use csv;
pub use rand;
