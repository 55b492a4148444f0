//! The simulation engine.
//!
//! A run is a sequence of discrete steps. Each step has two phases:
//!
//! 1. **Scan.** Every unordered pair of agents is checked for transmission, in the iteration
//!    order left by the previous step. Infection status is read as of the start of the step,
//!    so an agent infected during the scan cannot infect anyone else in the same step.
//!    Infections are only recorded as pending.
//! 2. **Commit.** The iteration order is reshuffled. Walking that order, each agent first has
//!    any pending infection applied and then moves, so later agents see the cells freed and
//!    taken by earlier ones.
//!
//! The engine drives steps as plans on the [`Context`], one plan per step. Observers subscribe
//! to the events below; their handlers run after the step that emitted them has completed.
//!
//! ```
//! use epigrid::prelude::*;
//!
//! let mut context = Context::new();
//! context.init_random(8675309);
//! context.subscribe_to_event(|_, event: RunEndedEvent| {
//!     println!("{} after {} steps", event.reason, event.epoch);
//! });
//! context.init_simulation().unwrap();
//! context.start_simulation().unwrap();
//! context.execute();
//! assert_eq!(context.run_state(), RunState::Finished);
//! ```
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::agent::{AgentId, AgentSpec};
use crate::context::{Context, Event};
use crate::error::EpiGridError;
use crate::grid::Cell;
use crate::log::{debug, info, trace, warn};
use crate::movement::{select_move, shuffled_moves, Move};
use crate::parameters::{ContextParametersExt, Parameters};
use crate::population::{
    population_data, population_data_mut, ContextPopulationExt, PopulationCounts,
};
use crate::random::ContextRandomExt;
use crate::transmission::{check_infection, TransmissionTable};
use crate::{define_data_plugin, define_rng};

define_rng!(MovementOrderRng);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RunState {
    /// Population built, no step taken by the step loop yet.
    Idle,
    Running,
    /// Every agent is infected.
    Finished,
    /// Ended by a stop request or the step limit.
    Stopped,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RunEndReason {
    Finished,
    Stopped,
}

impl From<RunEndReason> for RunState {
    fn from(reason: RunEndReason) -> Self {
        match reason {
            RunEndReason::Finished => RunState::Finished,
            RunEndReason::Stopped => RunState::Stopped,
        }
    }
}

/// Emitted after a population has been built. Use
/// [`population_snapshot`](ContextPopulationExt::population_snapshot) for the agents themselves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PopulationInitializedEvent {
    pub grid_size: usize,
    pub counts: PopulationCounts,
}
impl Event for PopulationInitializedEvent {}

/// Emitted when a pending infection is committed. `cell` is where the agent stood when it was
/// infected, before its move in the same step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AgentInfectedEvent {
    pub epoch: u64,
    pub agent_id: AgentId,
    pub cell: Cell,
    pub masked: bool,
}
impl Event for AgentInfectedEvent {}

/// Emitted once per agent per step. `from == to` when the agent stayed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AgentMovedEvent {
    pub epoch: u64,
    pub agent_id: AgentId,
    pub direction: Move,
    pub from: Cell,
    pub to: Cell,
}
impl Event for AgentMovedEvent {}

/// Counts after one completed step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    /// Number of steps completed so far, this one included.
    pub epoch: u64,
    pub infected: usize,
    pub total: usize,
    pub newly_infected: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepCompleteEvent {
    pub epoch: u64,
    pub infected: usize,
    pub total: usize,
    pub newly_infected: usize,
}
impl Event for StepCompleteEvent {}

impl From<StepSummary> for StepCompleteEvent {
    fn from(summary: StepSummary) -> Self {
        StepCompleteEvent {
            epoch: summary.epoch,
            infected: summary.infected,
            total: summary.total,
            newly_infected: summary.newly_infected,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunEndedEvent {
    pub reason: RunEndReason,
    pub epoch: u64,
    pub infected: usize,
    pub total: usize,
}
impl Event for RunEndedEvent {}

/// Requests that a run stop. Clones share one flag, so a handle can be moved to another thread
/// (a signal handler, a UI) while the simulation runs. The flag is only read between steps: a
/// step that has started always completes.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct SimulationData {
    state: RunState,
    epoch: u64,
    stop: StopHandle,
    step_delay: Duration,
    max_steps: Option<u64>,
    transmission: TransmissionTable,
}

impl Default for SimulationData {
    fn default() -> Self {
        SimulationData {
            state: RunState::Idle,
            epoch: 0,
            stop: StopHandle::default(),
            step_delay: Duration::ZERO,
            max_steps: None,
            transmission: TransmissionTable::default(),
        }
    }
}

define_data_plugin!(SimulationPlugin, SimulationData, SimulationData::default());

pub trait ContextSimulationExt {
    /// Builds a population from the stored parameters and resets the run to `Idle` at epoch 0.
    ///
    /// # Errors
    ///
    /// `EpiGridError::InvalidState` while a run is in progress, or `EpiGridError::ConfigError`
    /// if the parameters are invalid. The previous population is kept on error.
    ///
    /// # Panics
    ///
    /// Panics if [`init_random`](ContextRandomExt::init_random) has not been called on this
    /// context.
    fn init_simulation(&mut self) -> Result<(), EpiGridError>;

    /// Like [`init_simulation`](Self::init_simulation) but places the given agents. The grid
    /// and population sizes of the stored parameters are ignored; the rest (transmission
    /// table, delay, step limit) applies.
    ///
    /// # Errors
    ///
    /// As for `init_simulation`, plus any placement error of
    /// [`init_population_from`](ContextPopulationExt::init_population_from).
    ///
    /// # Panics
    ///
    /// Stepping panics if `init_random` has not been called on this context.
    fn init_simulation_from(
        &mut self,
        grid_size: usize,
        specs: &[AgentSpec],
    ) -> Result<(), EpiGridError>;

    /// Starts the step loop. Steps run as plans when the context executes.
    ///
    /// # Errors
    ///
    /// `EpiGridError::InvalidState` unless the simulation is initialised and `Idle`.
    fn start_simulation(&mut self) -> Result<(), EpiGridError>;

    /// Runs a single step and returns its summary. Does not change the run state; the step loop
    /// started by [`start_simulation`](Self::start_simulation) decides when a run ends.
    ///
    /// # Errors
    ///
    /// `EpiGridError::InvalidState` if there is no population or the run has ended, and
    /// `EpiGridError::InvariantViolation` if the engine's bookkeeping is inconsistent.
    fn step_simulation(&mut self) -> Result<StepSummary, EpiGridError>;

    fn run_state(&self) -> RunState;

    /// Number of completed steps.
    fn current_epoch(&self) -> u64;

    /// A handle that stops the current and any later run of this context when triggered.
    fn stop_handle(&mut self) -> StopHandle;

    fn request_stop(&mut self) {
        self.stop_handle().request_stop();
    }
}

fn prepare_run(
    context: &mut Context,
    populate: impl FnOnce(&mut Context, &Parameters) -> Result<(), EpiGridError>,
) -> Result<(), EpiGridError> {
    if context.run_state() == RunState::Running {
        return Err(EpiGridError::InvalidState(
            "cannot reinitialize a running simulation".to_string(),
        ));
    }
    let parameters = context.get_parameters();
    populate(context, &parameters)?;

    let data = context.get_data_mut(SimulationPlugin);
    data.state = RunState::Idle;
    data.epoch = 0;
    data.stop.reset();
    data.step_delay = parameters.step_delay;
    data.max_steps = parameters.max_steps;
    data.transmission = parameters.transmission;

    let counts = context.population_counts();
    let grid_size = context
        .grid_occupancy()
        .map_or(parameters.grid_size, |occupancy| occupancy.grid_size());
    info!(
        "simulation initialized: {} agents on a {grid_size}x{grid_size} grid, {} infected, {} masked",
        counts.total, counts.infected, counts.masked
    );
    if counts.infected == 0 {
        warn!("no agent is infected; the run can only end by a stop request or the step limit");
    }
    context.emit_event(PopulationInitializedEvent { grid_size, counts });
    Ok(())
}

fn end_condition(context: &Context) -> Option<RunEndReason> {
    let population = population_data(context).ok()?;
    if population.infected_count == population.agents.len() {
        return Some(RunEndReason::Finished);
    }
    let data = context.get_data(SimulationPlugin)?;
    let limit_reached = data.max_steps.is_some_and(|max_steps| data.epoch >= max_steps);
    if data.stop.is_stop_requested() || limit_reached {
        return Some(RunEndReason::Stopped);
    }
    None
}

fn end_run(context: &mut Context, reason: RunEndReason) {
    let data = context.get_data_mut(SimulationPlugin);
    data.state = reason.into();
    let epoch = data.epoch;
    let counts = context.population_counts();
    info!(
        "run {reason} after {epoch} steps with {}/{} agents infected",
        counts.infected, counts.total
    );
    context.emit_event(RunEndedEvent {
        reason,
        epoch,
        infected: counts.infected,
        total: counts.total,
    });
}

/// One iteration of the step loop; reschedules itself until the run ends.
fn run_step(context: &mut Context) {
    if let Some(reason) = end_condition(context) {
        end_run(context, reason);
        return;
    }

    let step_delay = context
        .get_data(SimulationPlugin)
        .map_or(Duration::ZERO, |data| data.step_delay);
    if !step_delay.is_zero() {
        thread::sleep(step_delay);
        if let Some(reason) = end_condition(context) {
            end_run(context, reason);
            return;
        }
    }

    if let Err(error) = context.step_simulation() {
        panic!(
            "step {} failed: {error}",
            context.current_epoch() + 1
        );
    }

    match end_condition(context) {
        Some(reason) => end_run(context, reason),
        None => {
            let next_time = context.get_current_time() + 1.0;
            context.add_plan(next_time, run_step);
        }
    }
}

/// Phase 1: pairwise scan in the current iteration order. Returns pending infections by id.
fn scan_for_infections(
    context: &Context,
    transmission: &TransmissionTable,
) -> Result<Vec<bool>, EpiGridError> {
    let population = population_data(context)?;
    let mut pending = vec![false; population.agents.len()];
    for (position, &first_id) in population.order.iter().enumerate() {
        let first = population.agent(first_id)?;
        for &second_id in &population.order[position + 1..] {
            let second = population.agent(second_id)?;
            let outcome = check_infection(context, first, second, transmission);
            pending[first_id.0] |= outcome.infect_first;
            pending[second_id.0] |= outcome.infect_second;
        }
    }
    Ok(pending)
}

/// Phase 2: in `order`, apply pending infections and move each agent. Returns the number of
/// new infections.
fn commit_step(
    context: &mut Context,
    epoch: u64,
    order: &[AgentId],
    pending: &[bool],
) -> Result<usize, EpiGridError> {
    let mut newly_infected = 0;
    for &agent_id in order {
        let candidates = shuffled_moves(context);
        let population = population_data_mut(context)?;

        let infection = if pending[agent_id.0] && population.infect(agent_id)? {
            let agent = population.agent(agent_id)?;
            Some(AgentInfectedEvent {
                epoch,
                agent_id,
                cell: agent.cell(),
                masked: agent.is_masked(),
            })
        } else {
            None
        };

        let from = population.agent(agent_id)?.cell();
        let direction = select_move(&candidates, from, &population.occupancy)?;
        let to = direction.destination(from);
        population.relocate(agent_id, to)?;
        trace!("epoch {epoch}: agent {agent_id} moves {direction:?} from {from} to {to}");

        if let Some(event) = infection {
            trace!("epoch {epoch}: agent {agent_id} infected at {}", event.cell);
            newly_infected += 1;
            context.emit_event(event);
        }
        context.emit_event(AgentMovedEvent {
            epoch,
            agent_id,
            direction,
            from,
            to,
        });
    }
    Ok(newly_infected)
}

impl ContextSimulationExt for Context {
    fn init_simulation(&mut self) -> Result<(), EpiGridError> {
        prepare_run(self, |context, parameters| {
            context.init_population(parameters)
        })
    }

    fn init_simulation_from(
        &mut self,
        grid_size: usize,
        specs: &[AgentSpec],
    ) -> Result<(), EpiGridError> {
        prepare_run(self, |context, _| {
            context.init_population_from(grid_size, specs)
        })
    }

    fn start_simulation(&mut self) -> Result<(), EpiGridError> {
        let state = self.run_state();
        if state != RunState::Idle {
            return Err(EpiGridError::InvalidState(format!(
                "cannot start a simulation that is {state}"
            )));
        }
        population_data(self)?;
        self.get_data_mut(SimulationPlugin).state = RunState::Running;
        info!("starting simulation");
        let now = self.get_current_time();
        self.add_plan(now, run_step);
        Ok(())
    }

    fn step_simulation(&mut self) -> Result<StepSummary, EpiGridError> {
        let data = self.get_data_mut(SimulationPlugin);
        if matches!(data.state, RunState::Finished | RunState::Stopped) {
            return Err(EpiGridError::InvalidState(format!(
                "cannot step a simulation that is {}",
                data.state
            )));
        }
        let transmission = data.transmission;
        let epoch = data.epoch + 1;

        let pending = scan_for_infections(self, &transmission)?;

        let mut order = std::mem::take(&mut population_data_mut(self)?.order);
        self.shuffle(MovementOrderRng, &mut order);
        let committed = commit_step(self, epoch, &order, &pending);
        // The movement order becomes the next step's scan order.
        population_data_mut(self)?.order = order;
        let newly_infected = committed?;

        self.get_data_mut(SimulationPlugin).epoch = epoch;
        let population = population_data(self)?;
        let summary = StepSummary {
            epoch,
            infected: population.infected_count,
            total: population.agents.len(),
            newly_infected,
        };
        debug!(
            "epoch {epoch}: {} newly infected, {}/{} infected",
            summary.newly_infected, summary.infected, summary.total
        );
        self.emit_event(StepCompleteEvent::from(summary));
        Ok(summary)
    }

    fn run_state(&self) -> RunState {
        self.get_data(SimulationPlugin)
            .map_or(RunState::Idle, |data| data.state)
    }

    fn current_epoch(&self) -> u64 {
        self.get_data(SimulationPlugin).map_or(0, |data| data.epoch)
    }

    fn stop_handle(&mut self) -> StopHandle {
        self.get_data_mut(SimulationPlugin).stop.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::agent::Agent;
    use crate::parameters::Share;

    fn context_with_table(probability: f64) -> Context {
        let mut context = Context::new();
        context.init_random(42);
        context
            .set_parameters(Parameters {
                transmission: TransmissionTable::uniform(probability),
                ..Parameters::default()
            })
            .unwrap();
        context
    }

    fn infected(context: &Context, id: usize) -> bool {
        context.get_agent(AgentId(id)).unwrap().is_infected()
    }

    #[test]
    fn adjacent_pair_with_certain_transmission() {
        let mut context = context_with_table(1.0);
        context
            .init_simulation_from(
                5,
                &[
                    AgentSpec::new(2, 2, true, false),
                    AgentSpec::new(3, 2, false, false),
                ],
            )
            .unwrap();
        let summary = context.step_simulation().unwrap();
        assert_eq!(summary.epoch, 1);
        assert_eq!(summary.infected, 2);
        assert_eq!(summary.newly_infected, 1);
        assert!(infected(&context, 1));
    }

    #[test]
    fn distant_pair_is_not_infected_in_the_first_step() {
        let mut context = context_with_table(1.0);
        context
            .init_simulation_from(
                5,
                &[
                    AgentSpec::new(0, 0, true, false),
                    AgentSpec::new(2, 0, false, false),
                ],
            )
            .unwrap();
        let summary = context.step_simulation().unwrap();
        assert_eq!(summary.infected, 1);
        assert!(!infected(&context, 1));
    }

    #[test]
    fn no_cascade_within_a_step() {
        let mut context = context_with_table(1.0);
        context
            .init_simulation_from(
                3,
                &[
                    AgentSpec::new(0, 0, true, false),
                    AgentSpec::new(1, 0, false, false),
                    AgentSpec::new(2, 0, false, false),
                ],
            )
            .unwrap();
        context.step_simulation().unwrap();
        assert!(infected(&context, 1));
        assert!(!infected(&context, 2));
    }

    #[test]
    fn full_two_by_two_grid_finishes_in_one_step() {
        let mut context = context_with_table(1.0);
        let specs = [
            AgentSpec::new(0, 0, true, false),
            AgentSpec::new(1, 0, false, true),
            AgentSpec::new(0, 1, false, false),
            AgentSpec::new(1, 1, false, true),
        ];
        context.init_simulation_from(2, &specs).unwrap();
        let before = context.population_snapshot();
        context.start_simulation().unwrap();
        context.execute();

        assert_eq!(context.run_state(), RunState::Finished);
        assert_eq!(context.current_epoch(), 1);
        // Nobody can move on a full grid.
        let after = context.population_snapshot();
        for (old, new) in before.iter().zip(&after) {
            assert_eq!(old.cell(), new.cell());
            assert!(new.is_infected());
        }
    }

    #[test]
    fn fully_infected_population_finishes_without_steps() {
        let mut context = context_with_table(1.0);
        context
            .init_simulation_from(1, &[AgentSpec::new(0, 0, true, false)])
            .unwrap();
        let ended = Rc::new(RefCell::new(None));
        let ended_clone = Rc::clone(&ended);
        context.subscribe_to_event(move |_, event: RunEndedEvent| {
            *ended_clone.borrow_mut() = Some(event);
        });
        context.start_simulation().unwrap();
        context.execute();

        assert_eq!(context.run_state(), RunState::Finished);
        let event = ended.borrow().unwrap();
        assert_eq!(event.reason, RunEndReason::Finished);
        assert_eq!(event.epoch, 0);
    }

    #[test]
    fn stop_before_start_ends_without_steps() {
        let mut context = context_with_table(0.5);
        context.init_simulation().unwrap();
        let handle = context.stop_handle();
        context.start_simulation().unwrap();
        handle.request_stop();
        context.execute();
        assert_eq!(context.run_state(), RunState::Stopped);
        assert_eq!(context.current_epoch(), 0);
    }

    #[test]
    fn stop_from_a_step_handler_ends_after_that_step() {
        let mut context = context_with_table(0.0);
        context.init_simulation().unwrap();
        context.subscribe_to_event(|context, event: StepCompleteEvent| {
            if event.epoch == 3 {
                context.request_stop();
            }
        });
        context.start_simulation().unwrap();
        context.execute();
        assert_eq!(context.run_state(), RunState::Stopped);
        assert_eq!(context.current_epoch(), 3);
    }

    #[test]
    fn step_limit_stops_a_run_that_cannot_finish() {
        let mut context = Context::new();
        context.init_random(42);
        context
            .set_parameters(Parameters {
                initial_infected: Share::Count(0),
                max_steps: Some(5),
                ..Parameters::default()
            })
            .unwrap();
        context.init_simulation().unwrap();
        context.start_simulation().unwrap();
        context.execute();
        assert_eq!(context.run_state(), RunState::Stopped);
        assert_eq!(context.current_epoch(), 5);
        assert_eq!(context.infected_count(), 0);
    }

    #[test]
    fn state_transitions_are_checked() {
        let mut context = context_with_table(0.5);
        assert!(matches!(
            context.start_simulation(),
            Err(EpiGridError::InvalidState(_))
        ));
        assert!(context.step_simulation().is_err());

        context.init_simulation().unwrap();
        assert_eq!(context.run_state(), RunState::Idle);
        context.start_simulation().unwrap();
        assert_eq!(context.run_state(), RunState::Running);
        assert!(matches!(
            context.start_simulation(),
            Err(EpiGridError::InvalidState(_))
        ));
        assert!(matches!(
            context.init_simulation(),
            Err(EpiGridError::InvalidState(_))
        ));

        context.execute();
        assert_eq!(context.run_state(), RunState::Finished);
        assert!(matches!(
            context.step_simulation(),
            Err(EpiGridError::InvalidState(_))
        ));

        // A finished run can be reinitialized.
        context.init_simulation().unwrap();
        assert_eq!(context.run_state(), RunState::Idle);
        assert_eq!(context.current_epoch(), 0);
    }

    #[test]
    fn events_describe_each_step() {
        let mut context = context_with_table(0.9);
        context.init_simulation().unwrap();

        let moves = Rc::new(RefCell::new(Vec::<AgentMovedEvent>::new()));
        let infections = Rc::new(RefCell::new(Vec::<AgentInfectedEvent>::new()));
        let steps = Rc::new(RefCell::new(Vec::<StepCompleteEvent>::new()));
        let moves_clone = Rc::clone(&moves);
        context.subscribe_to_event(move |_, event: AgentMovedEvent| {
            moves_clone.borrow_mut().push(event);
        });
        let infections_clone = Rc::clone(&infections);
        context.subscribe_to_event(move |_, event: AgentInfectedEvent| {
            infections_clone.borrow_mut().push(event);
        });
        let steps_clone = Rc::clone(&steps);
        context.subscribe_to_event(move |_, event: StepCompleteEvent| {
            steps_clone.borrow_mut().push(event);
        });

        context.start_simulation().unwrap();
        context.execute();

        let steps = steps.borrow();
        let epochs = context.current_epoch();
        assert_eq!(steps.len() as u64, epochs);
        assert_eq!(moves.borrow().len() as u64, 100 * epochs);
        assert!(moves
            .borrow()
            .iter()
            .all(|event| event.from.chebyshev_distance(event.to) <= 1
                && event.direction.destination(event.from) == event.to));

        let newly_infected: usize = steps.iter().map(|step| step.newly_infected).sum();
        assert_eq!(infections.borrow().len(), newly_infected);
        assert_eq!(newly_infected, 100 - 20);
        assert!(steps.windows(2).all(|pair| pair[0].infected <= pair[1].infected));
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Seen {
        Infected(u64, AgentId),
        Moved(u64, AgentId),
        Step(u64),
    }

    #[test]
    fn each_infection_is_reported_right_before_that_agents_move() {
        let mut context = context_with_table(0.9);
        context.init_simulation().unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let infected_clone = Rc::clone(&seen);
        context.subscribe_to_event(move |_, event: AgentInfectedEvent| {
            infected_clone
                .borrow_mut()
                .push(Seen::Infected(event.epoch, event.agent_id));
        });
        let moved_clone = Rc::clone(&seen);
        context.subscribe_to_event(move |_, event: AgentMovedEvent| {
            moved_clone
                .borrow_mut()
                .push(Seen::Moved(event.epoch, event.agent_id));
        });
        let step_clone = Rc::clone(&seen);
        context.subscribe_to_event(move |_, event: StepCompleteEvent| {
            step_clone.borrow_mut().push(Seen::Step(event.epoch));
        });

        context.start_simulation().unwrap();
        context.execute();

        let seen = seen.borrow();
        assert!(seen.iter().any(|entry| matches!(entry, Seen::Infected(..))));
        for (position, entry) in seen.iter().enumerate() {
            if let Seen::Infected(epoch, agent_id) = *entry {
                assert_eq!(seen.get(position + 1), Some(&Seen::Moved(epoch, agent_id)));
            }
        }

        // Every step moves each agent exactly once, then reports its summary.
        let mut moved = vec![false; 100];
        let mut epoch = 1;
        for entry in seen.iter() {
            match *entry {
                Seen::Infected(infection_epoch, _) => assert_eq!(infection_epoch, epoch),
                Seen::Moved(move_epoch, agent_id) => {
                    assert_eq!(move_epoch, epoch);
                    assert!(!moved[agent_id.0], "agent {agent_id} moved twice in step {epoch}");
                    moved[agent_id.0] = true;
                }
                Seen::Step(step_epoch) => {
                    assert_eq!(step_epoch, epoch);
                    assert!(moved.iter().all(|&done| done));
                    moved = vec![false; 100];
                    epoch += 1;
                }
            }
        }
        assert_eq!(epoch - 1, context.current_epoch());
    }

    #[test]
    #[should_panic(expected = "You must initialize the random number generator")]
    fn init_without_random_seed_panics() {
        let mut context = Context::new();
        let _ = context.init_simulation();
    }

    #[test]
    fn infection_is_monotonic_and_grid_stays_consistent() {
        let mut context = context_with_table(0.3);
        context.init_simulation().unwrap();
        let mut previous: Vec<Agent> = context.population_snapshot();
        for _ in 0..30 {
            context.step_simulation().unwrap();
            let current = context.population_snapshot();
            for (old, new) in previous.iter().zip(&current) {
                assert!(!old.is_infected() || new.is_infected());
                assert!(old.cell().chebyshev_distance(new.cell()) <= 1);
            }
            let occupancy = context.grid_occupancy().unwrap();
            assert_eq!(occupancy.len(), current.len());
            assert!(current.iter().all(|agent| !occupancy.is_free(agent.cell())));
            previous = current;
        }
    }
}
