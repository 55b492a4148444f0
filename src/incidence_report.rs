//! One row per infection: when and where an agent was infected.
use serde_derive::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_report;
use crate::error::EpiGridError;
use crate::log::error;
use crate::report::ContextReportExt;
use crate::simulation::AgentInfectedEvent;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IncidenceReportItem {
    pub epoch: u64,
    pub agent_id: usize,
    pub x: i32,
    pub y: i32,
    pub masked: bool,
}

define_report!(IncidenceReportItem);

impl From<AgentInfectedEvent> for IncidenceReportItem {
    fn from(event: AgentInfectedEvent) -> Self {
        IncidenceReportItem {
            epoch: event.epoch,
            agent_id: event.agent_id.0,
            x: event.cell.x,
            y: event.cell.y,
            masked: event.masked,
        }
    }
}

fn handle_infection_event(context: &mut Context, event: AgentInfectedEvent) {
    if let Err(e) = context.send_report(IncidenceReportItem::from(event)) {
        error!("failed to write incidence row for agent {}: {e}", event.agent_id);
    }
}

/// Adds the `incidence` report and subscribes it to infection events.
///
/// # Errors
///
/// Returns an error if the report file cannot be created.
pub fn init(context: &mut Context) -> Result<(), EpiGridError> {
    context.add_report::<IncidenceReportItem>("incidence")?;
    context.subscribe_to_event(handle_infection_event);
    Ok(())
}
