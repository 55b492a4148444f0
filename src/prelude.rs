pub use crate::agent::{Agent, AgentId, AgentSpec};
pub use crate::context::Context;
pub use crate::error::EpiGridError;
pub use crate::grid::Cell;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::movement::Move;
pub use crate::parameters::{ContextParametersExt, Parameters, Share};
pub use crate::population::ContextPopulationExt;
pub use crate::random::ContextRandomExt;
pub use crate::report::ContextReportExt;
pub use crate::simulation::{
    AgentInfectedEvent, AgentMovedEvent, ContextSimulationExt, PopulationInitializedEvent,
    RunEndReason, RunEndedEvent, RunState, StepCompleteEvent, StepSummary, StopHandle,
};
pub use crate::transmission::TransmissionTable;
pub use crate::{define_data_plugin, define_report, define_rng};
