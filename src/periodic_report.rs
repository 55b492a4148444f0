//! One row per epoch with the infected count, starting with the initial population at epoch 0.
use serde_derive::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_report;
use crate::error::EpiGridError;
use crate::log::error;
use crate::report::ContextReportExt;
use crate::simulation::{PopulationInitializedEvent, StepCompleteEvent};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PeriodicReportItem {
    pub epoch: u64,
    pub infected: usize,
    pub total: usize,
}

define_report!(PeriodicReportItem);

fn write_row(context: &Context, row: PeriodicReportItem) {
    let epoch = row.epoch;
    if let Err(e) = context.send_report(row) {
        error!("failed to write periodic row for epoch {epoch}: {e}");
    }
}

/// Adds the `periodic` report and subscribes it to initialization and step events.
///
/// # Errors
///
/// Returns an error if the report file cannot be created.
pub fn init(context: &mut Context) -> Result<(), EpiGridError> {
    context.add_report::<PeriodicReportItem>("periodic")?;
    context.subscribe_to_event(|context, event: PopulationInitializedEvent| {
        write_row(
            context,
            PeriodicReportItem {
                epoch: 0,
                infected: event.counts.infected,
                total: event.counts.total,
            },
        );
    });
    context.subscribe_to_event(|context, event: StepCompleteEvent| {
        write_row(
            context,
            PeriodicReportItem {
                epoch: event.epoch,
                infected: event.infected,
                total: event.total,
            },
        );
    });
    Ok(())
}
