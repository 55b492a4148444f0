//! The population of a simulation.
//!
//! Agents are stored in a vector indexed by [`AgentId`], so lookups never search. Separately, an
//! iteration order is kept which the engine reshuffles every step; the pairwise infection scan
//! of the following step walks agents in that order.
use crate::agent::{Agent, AgentId, AgentSpec};
use crate::context::Context;
use crate::error::EpiGridError;
use crate::grid::{cell_count, Cell, GridOccupancy};
use crate::log::{debug, trace};
use crate::parameters::{validate_dimensions, Parameters};
use crate::random::ContextRandomExt;
use crate::{define_data_plugin, define_rng};

define_rng!(PlacementRng);

pub(crate) struct PopulationData {
    pub(crate) agents: Vec<Agent>,
    pub(crate) order: Vec<AgentId>,
    pub(crate) occupancy: GridOccupancy,
    pub(crate) infected_count: usize,
}

impl PopulationData {
    fn from_agents(agents: Vec<Agent>, occupancy: GridOccupancy) -> PopulationData {
        let infected_count = agents.iter().filter(|agent| agent.is_infected()).count();
        let order = agents.iter().map(Agent::id).collect();
        PopulationData {
            agents,
            order,
            occupancy,
            infected_count,
        }
    }

    pub(crate) fn agent(&self, id: AgentId) -> Result<&Agent, EpiGridError> {
        self.agents
            .get(id.0)
            .ok_or_else(|| EpiGridError::InvariantViolation(format!("unknown agent {id}")))
    }

    pub(crate) fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent, EpiGridError> {
        self.agents
            .get_mut(id.0)
            .ok_or_else(|| EpiGridError::InvariantViolation(format!("unknown agent {id}")))
    }

    /// Infects `id` and updates the counter. Returns `false` if it was already infected.
    pub(crate) fn infect(&mut self, id: AgentId) -> Result<bool, EpiGridError> {
        let newly_infected = self.agent_mut(id)?.infect();
        if newly_infected {
            self.infected_count += 1;
        }
        Ok(newly_infected)
    }

    /// Moves `id` to `to`, keeping the occupancy index in sync.
    pub(crate) fn relocate(&mut self, id: AgentId, to: Cell) -> Result<Cell, EpiGridError> {
        let from = self.agent(id)?.cell();
        self.occupancy.commit_move(from, to)?;
        self.agent_mut(id)?.move_to(to);
        Ok(from)
    }
}

define_data_plugin!(PopulationPlugin, Option<PopulationData>, None);

pub(crate) fn population_data(context: &Context) -> Result<&PopulationData, EpiGridError> {
    context
        .get_data(PopulationPlugin)
        .and_then(Option::as_ref)
        .ok_or_else(|| EpiGridError::InvalidState("population is not initialized".to_string()))
}

pub(crate) fn population_data_mut(
    context: &mut Context,
) -> Result<&mut PopulationData, EpiGridError> {
    context
        .get_data_mut(PopulationPlugin)
        .as_mut()
        .ok_or_else(|| EpiGridError::InvalidState("population is not initialized".to_string()))
}

/// Aggregate counts of a population.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PopulationCounts {
    pub total: usize,
    pub infected: usize,
    pub masked: usize,
}

pub trait ContextPopulationExt {
    /// Builds a random population from `parameters`, replacing any existing one. Agents get
    /// distinct cells drawn uniformly without replacement; exactly
    /// `parameters.initial_infected_count()` of them are infected and
    /// `parameters.masked_count()` wear masks, with both groups chosen independently at random.
    ///
    /// # Errors
    ///
    /// Returns `EpiGridError::ConfigError` if the parameters are invalid. No population is
    /// created in that case.
    fn init_population(&mut self, parameters: &Parameters) -> Result<(), EpiGridError>;

    /// Builds a population from explicit agent placements, replacing any existing one. Agent
    /// `i` of `specs` gets `AgentId(i)`.
    ///
    /// # Errors
    ///
    /// Returns `EpiGridError::ConfigError` if `specs` is empty, does not fit the grid, or puts
    /// two agents on the same cell or an agent outside the grid.
    fn init_population_from(
        &mut self,
        grid_size: usize,
        specs: &[AgentSpec],
    ) -> Result<(), EpiGridError>;

    fn is_population_initialized(&self) -> bool;

    /// Returns `None` if there is no population or no such agent.
    fn get_agent(&self, id: AgentId) -> Option<&Agent>;

    /// Every agent, ordered by id.
    fn population_snapshot(&self) -> Vec<Agent>;

    fn population_counts(&self) -> PopulationCounts;

    fn infected_count(&self) -> usize {
        self.population_counts().infected
    }

    fn population_size(&self) -> usize {
        self.population_counts().total
    }

    fn grid_occupancy(&self) -> Option<&GridOccupancy>;
}

impl ContextPopulationExt for Context {
    fn init_population(&mut self, parameters: &Parameters) -> Result<(), EpiGridError> {
        parameters.validate()?;
        let grid_size = parameters.grid_size;
        let size = parameters.population_size;
        let cells = cell_count(grid_size).ok_or_else(|| {
            EpiGridError::ConfigError(format!("grid_size {grid_size} is too large"))
        })?;

        let placements = self.sample_indices(PlacementRng, cells, size);
        let mut infected_pool = vec![false; size];
        infected_pool[..parameters.initial_infected_count()].fill(true);
        self.shuffle(PlacementRng, &mut infected_pool);
        let mut masked_pool = vec![false; size];
        masked_pool[..parameters.masked_count()].fill(true);
        self.shuffle(PlacementRng, &mut masked_pool);

        let agents: Vec<Agent> = placements
            .into_iter()
            .enumerate()
            .map(|(i, index)| {
                Agent::new(
                    AgentId(i),
                    Cell::from_index(index, grid_size),
                    infected_pool[i],
                    masked_pool[i],
                )
            })
            .collect();
        let occupancy = GridOccupancy::from_cells(grid_size, agents.iter().map(Agent::cell))?;
        debug!(
            "placed {size} agents on a {grid_size}x{grid_size} grid ({} infected, {} masked)",
            parameters.initial_infected_count(),
            parameters.masked_count()
        );
        *self.get_data_mut(PopulationPlugin) =
            Some(PopulationData::from_agents(agents, occupancy));
        Ok(())
    }

    fn init_population_from(
        &mut self,
        grid_size: usize,
        specs: &[AgentSpec],
    ) -> Result<(), EpiGridError> {
        validate_dimensions(grid_size, specs.len())?;
        let occupancy = GridOccupancy::from_cells(grid_size, specs.iter().map(|spec| spec.cell))?;
        let agents: Vec<Agent> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| Agent::new(AgentId(i), spec.cell, spec.infected, spec.masked))
            .collect();
        trace!("placed {} explicitly specified agents", agents.len());
        *self.get_data_mut(PopulationPlugin) =
            Some(PopulationData::from_agents(agents, occupancy));
        Ok(())
    }

    fn is_population_initialized(&self) -> bool {
        population_data(self).is_ok()
    }

    fn get_agent(&self, id: AgentId) -> Option<&Agent> {
        population_data(self).ok()?.agents.get(id.0)
    }

    fn population_snapshot(&self) -> Vec<Agent> {
        population_data(self)
            .map(|population| population.agents.clone())
            .unwrap_or_default()
    }

    fn population_counts(&self) -> PopulationCounts {
        population_data(self)
            .map(|population| PopulationCounts {
                total: population.agents.len(),
                infected: population.infected_count,
                masked: population
                    .agents
                    .iter()
                    .filter(|agent| agent.is_masked())
                    .count(),
            })
            .unwrap_or_default()
    }

    fn grid_occupancy(&self) -> Option<&GridOccupancy> {
        population_data(self)
            .ok()
            .map(|population| &population.occupancy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Share;
    use rustc_hash::FxHashSet;

    fn parameters(grid_size: usize, population_size: usize, infected: usize, masked: usize) -> Parameters {
        Parameters {
            grid_size,
            population_size,
            initial_infected: Share::Count(infected),
            masked: Share::Count(masked),
            ..Parameters::default()
        }
    }

    #[test]
    fn random_population_matches_parameters() {
        let mut context = Context::new();
        context.init_random(42);
        context
            .init_population(&parameters(10, 60, 7, 25))
            .unwrap();

        let agents = context.population_snapshot();
        assert_eq!(agents.len(), 60);
        let ids: Vec<usize> = agents.iter().map(|agent| agent.id().0).collect();
        assert_eq!(ids, (0..60).collect::<Vec<_>>());

        let cells: FxHashSet<Cell> = agents.iter().map(Agent::cell).collect();
        assert_eq!(cells.len(), 60);
        assert!(cells.iter().all(|cell| cell.in_bounds(10)));

        let counts = context.population_counts();
        assert_eq!(counts.infected, 7);
        assert_eq!(counts.masked, 25);
        assert_eq!(
            agents.iter().filter(|agent| agent.is_infected()).count(),
            7
        );

        let occupancy = context.grid_occupancy().unwrap();
        assert_eq!(occupancy.len(), 60);
        assert!(cells.iter().all(|cell| !occupancy.is_free(*cell)));
    }

    #[test]
    fn full_grid_population() {
        let mut context = Context::new();
        context.init_random(1);
        context.init_population(&parameters(3, 9, 1, 0)).unwrap();
        assert_eq!(context.grid_occupancy().unwrap().len(), 9);
    }

    #[test]
    fn same_seed_same_population() {
        let build = |seed| {
            let mut context = Context::new();
            context.init_random(seed);
            context.init_population(&parameters(8, 20, 3, 10)).unwrap();
            context.population_snapshot()
        };
        assert_eq!(build(5), build(5));
        assert_ne!(build(5), build(6));
    }

    #[test]
    fn invalid_parameters_leave_no_population() {
        let mut context = Context::new();
        context.init_random(42);
        assert!(matches!(
            context.init_population(&parameters(2, 5, 0, 0)),
            Err(EpiGridError::ConfigError(_))
        ));
        assert!(!context.is_population_initialized());
        assert_eq!(context.population_size(), 0);
    }

    #[test]
    fn reinitialization_restarts_ids() {
        let mut context = Context::new();
        context.init_random(42);
        context.init_population(&parameters(5, 10, 2, 2)).unwrap();
        context.init_population(&parameters(5, 4, 1, 0)).unwrap();
        let ids: Vec<AgentId> = context
            .population_snapshot()
            .iter()
            .map(Agent::id)
            .collect();
        assert_eq!(ids, vec![AgentId(0), AgentId(1), AgentId(2), AgentId(3)]);
        assert_eq!(context.grid_occupancy().unwrap().len(), 4);
    }

    #[test]
    fn explicit_population() {
        let mut context = Context::new();
        context
            .init_population_from(
                4,
                &[
                    AgentSpec::new(0, 0, true, false),
                    AgentSpec::new(3, 3, false, true),
                ],
            )
            .unwrap();
        let second = context.get_agent(AgentId(1)).unwrap();
        assert_eq!(second.cell(), Cell::new(3, 3));
        assert!(second.is_masked());
        assert_eq!(context.infected_count(), 1);
        assert!(context.get_agent(AgentId(2)).is_none());
    }

    #[test]
    fn explicit_population_rejects_bad_placements() {
        let mut context = Context::new();
        assert!(context.init_population_from(2, &[]).is_err());
        assert!(context
            .init_population_from(
                2,
                &[
                    AgentSpec::new(1, 1, true, false),
                    AgentSpec::new(1, 1, false, false)
                ]
            )
            .is_err());
        assert!(context
            .init_population_from(2, &[AgentSpec::new(2, 0, true, false)])
            .is_err());
        assert!(!context.is_population_initialized());
    }

    #[test]
    fn relocate_keeps_index_in_sync() {
        let mut context = Context::new();
        context
            .init_population_from(
                3,
                &[
                    AgentSpec::new(0, 0, false, false),
                    AgentSpec::new(1, 0, false, false),
                ],
            )
            .unwrap();
        let population = population_data_mut(&mut context).unwrap();
        assert!(population.relocate(AgentId(0), Cell::new(1, 0)).is_err());
        assert_eq!(
            population.relocate(AgentId(0), Cell::new(0, 1)).unwrap(),
            Cell::new(0, 0)
        );
        assert!(population.occupancy.is_free(Cell::new(0, 0)));
        assert_eq!(population.agent(AgentId(0)).unwrap().cell(), Cell::new(0, 1));

        assert!(population.infect(AgentId(1)).unwrap());
        assert!(!population.infect(AgentId(1)).unwrap());
        assert_eq!(population.infected_count, 1);
    }
}
