use epigrid::prelude::*;
use epigrid::runner::run_with_args;
use epigrid::{incidence_report, periodic_report};

fn main() {
    let result = run_with_args(|context, args, _| {
        if args.output_dir.is_some() {
            incidence_report::init(context)?;
            periodic_report::init(context)?;
        }

        context.subscribe_to_event(|_, event: PopulationInitializedEvent| {
            println!(
                "Grid {0}x{0}: {1} agents, {2} infected, {3} masked",
                event.grid_size, event.counts.total, event.counts.infected, event.counts.masked
            );
        });
        context.subscribe_to_event(|_, event: StepCompleteEvent| {
            println!(
                "Epoch {}: {}/{} infected",
                event.epoch, event.infected, event.total
            );
        });
        context.subscribe_to_event(|_, event: RunEndedEvent| {
            println!(
                "Run {} after {} epochs: {}/{} infected",
                event.reason, event.epoch, event.infected, event.total
            );
        });

        context.init_simulation()?;
        context.start_simulation()
    });

    if let Err(e) = result {
        eprintln!("epigrid: {e}");
        std::process::exit(1);
    }
}
