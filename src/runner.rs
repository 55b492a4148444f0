use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Command, FromArgMatches as _};

use crate::context::Context;
use crate::error::EpiGridError;
use crate::log::{apply_log_spec, info};
use crate::parameters::{read_parameters_from_json, ContextParametersExt, Parameters};
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;

/// Default cli arguments for the epigrid runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path for a parameters config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional directory for report output
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Optional prefix for report file names
    #[arg(long)]
    pub prefix: Option<String>,

    /// Overwrite existing report files
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Enable logging: a level (`info`) and/or `module=level` pairs, comma separated
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Side length of the grid, overriding the config file
    #[arg(long)]
    pub grid_size: Option<usize>,

    /// Number of agents, overriding the config file
    #[arg(long)]
    pub population_size: Option<usize>,

    /// Pause before every step, e.g. `250ms`, overriding the config file
    #[arg(long, value_parser = humantime::parse_duration)]
    pub step_delay: Option<Duration>,

    /// Stop after this many steps, overriding the config file
    #[arg(long)]
    pub max_steps: Option<u64>,
}

impl BaseArgs {
    fn apply_overrides(&self, parameters: &mut Parameters) {
        if let Some(grid_size) = self.grid_size {
            parameters.grid_size = grid_size;
        }
        if let Some(population_size) = self.population_size {
            parameters.population_size = population_size;
        }
        if let Some(step_delay) = self.step_delay {
            parameters.step_delay = step_delay;
        }
        if self.max_steps.is_some() {
            parameters.max_steps = self.max_steps;
        }
    }
}

#[derive(Args)]
pub struct PlaceholderCustom {}

fn create_epigrid_cli() -> Command {
    let cli = Command::new("epigrid");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with custom cli arguments.
///
/// This function allows you to define custom arguments and a setup function
///
/// # Parameters
/// - `setup_fn`: A function that takes a mutable reference to a `Context`, a `BaseArgs` struct,
///   an `Option<A>` where A is the custom cli arguments struct
///
/// # Errors
/// Returns an error if argument parsing, configuration or the setup function fails
pub fn run_with_custom_args<A, F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    A: Args,
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), EpiGridError>,
{
    run_with_custom_args_from(std::env::args_os(), setup_fn)
}

/// Like [`run_with_custom_args`], parsing `args` instead of the process arguments. The first
/// item is the program name.
///
/// # Errors
/// Returns an error if argument parsing, configuration or the setup function fails
pub fn run_with_custom_args_from<A, F, I, T>(
    args: I,
    setup_fn: F,
) -> Result<Context, Box<dyn std::error::Error>>
where
    A: Args,
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), EpiGridError>,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = A::augment_args(create_epigrid_cli());
    let matches = cli.try_get_matches_from(args)?;

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    let custom_matches = A::from_arg_matches(&matches)?;
    run_with_args_internal(base_args_matches, Some(custom_matches), setup_fn)
}

/// Runs a simulation with default cli arguments
///
/// This function parses command line arguments and allows you to define a setup function
///
/// # Parameters
/// - `setup_fn`: A function that takes a mutable reference to a `Context` and `BaseArgs` struct
///
/// # Errors
/// Returns an error if argument parsing, configuration or the setup function fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, BaseArgs, Option<PlaceholderCustom>) -> Result<(), EpiGridError>,
{
    let matches = create_epigrid_cli().get_matches();
    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    run_with_args_internal(base_args_matches, None, setup_fn)
}

fn run_with_args_internal<A, F>(
    args: BaseArgs,
    custom_args: Option<A>,
    setup_fn: F,
) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), EpiGridError>,
{
    if let Some(log_spec) = &args.log_level {
        apply_log_spec(log_spec)?;
    }

    // Instantiate a context
    let mut context = Context::new();

    // Optionally read parameters from a file, then apply command line overrides. Validation
    // happens once, on the merged result.
    let mut parameters = match &args.config {
        Some(config_path) => {
            info!("Loading parameters from: {}", config_path.display());
            read_parameters_from_json(config_path)?
        }
        None => Parameters::default(),
    };
    args.apply_overrides(&mut parameters);
    context.set_parameters(parameters)?;

    // Optionally set output dir for reports
    if let Some(output_dir) = &args.output_dir {
        let report_config = context.report_options();
        report_config
            .directory(output_dir.clone())
            .overwrite(args.force_overwrite);
        if let Some(prefix) = &args.prefix {
            report_config.file_prefix(prefix.clone());
        }
    }

    context.init_random(args.random_seed);

    // Run the provided Fn
    setup_fn(&mut context, args, custom_args)?;

    // Execute the context
    context.execute();
    Ok(context)
}
