//! Simulation parameters.
//!
//! Parameters are plain serde structs loaded from JSON and stored in the context through
//! [`ContextParametersExt`]. A parameters file only needs the fields it changes:
//!
//! ```json
//! {
//!     "grid_size": 20,
//!     "population_size": 150,
//!     "initial_infected": { "fraction": 0.1 },
//!     "masked": 40,
//!     "step_delay": "250ms",
//!     "max_steps": 500
//! }
//! ```
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpiGridError;
use crate::grid::cell_count;
use crate::transmission::TransmissionTable;

/// A number of agents given either as an exact count or as a fraction of the population.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum Share {
    Count(usize),
    Fraction { fraction: f64 },
}

impl Share {
    /// Resolves the share against a population of `population_size` agents. Fractions are
    /// rounded down.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn resolve(self, population_size: usize) -> usize {
        match self {
            Share::Count(count) => count,
            Share::Fraction { fraction } => (population_size as f64 * fraction).floor() as usize,
        }
    }

    fn validate(self, name: &str, population_size: usize) -> Result<(), EpiGridError> {
        match self {
            Share::Count(count) if count > population_size => Err(EpiGridError::ConfigError(
                format!("{name} ({count}) exceeds the population size ({population_size})"),
            )),
            Share::Fraction { fraction } if !(0.0..=1.0).contains(&fraction) => Err(
                EpiGridError::ConfigError(format!("{name} fraction must be within [0, 1], got {fraction}")),
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Side length of the square grid.
    pub grid_size: usize,
    pub population_size: usize,
    pub initial_infected: Share,
    pub masked: Share,
    /// Pause taken before every step, written as a human readable duration (`"250ms"`).
    #[serde(with = "duration_string")]
    pub step_delay: Duration,
    /// Ends the run as stopped once this many steps have completed.
    pub max_steps: Option<u64>,
    pub transmission: TransmissionTable,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            grid_size: 10,
            population_size: 100,
            initial_infected: Share::Fraction { fraction: 0.2 },
            masked: Share::Fraction { fraction: 0.5 },
            step_delay: Duration::ZERO,
            max_steps: None,
            transmission: TransmissionTable::default(),
        }
    }
}

impl Parameters {
    /// Number of agents infected at initialisation.
    #[must_use]
    pub fn initial_infected_count(&self) -> usize {
        self.initial_infected.resolve(self.population_size)
    }

    /// Number of agents wearing a mask.
    #[must_use]
    pub fn masked_count(&self) -> usize {
        self.masked.resolve(self.population_size)
    }

    /// Checks that a population can be built from these parameters.
    ///
    /// # Errors
    ///
    /// Returns `EpiGridError::ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<(), EpiGridError> {
        validate_dimensions(self.grid_size, self.population_size)?;
        self.initial_infected
            .validate("initial_infected", self.population_size)?;
        self.masked.validate("masked", self.population_size)?;
        self.transmission.validate()
    }
}

/// Checks a grid and population size pair.
///
/// # Errors
///
/// Returns `EpiGridError::ConfigError` if either is zero, if the grid is too large to address,
/// or if the population does not fit on the grid.
pub fn validate_dimensions(grid_size: usize, population_size: usize) -> Result<(), EpiGridError> {
    if grid_size == 0 {
        return Err(EpiGridError::ConfigError(
            "grid_size must be positive".to_string(),
        ));
    }
    if population_size == 0 {
        return Err(EpiGridError::ConfigError(
            "population_size must be positive".to_string(),
        ));
    }
    let cells = cell_count(grid_size).ok_or_else(|| {
        EpiGridError::ConfigError(format!("grid_size {grid_size} is too large"))
    })?;
    if population_size > cells {
        return Err(EpiGridError::ConfigError(format!(
            "population_size {population_size} exceeds the {cells} cells of a {grid_size}x{grid_size} grid"
        )));
    }
    Ok(())
}

/// Reads parameters from a JSON file without validating them. Missing fields take their
/// default values, so the result may only become valid once other fields are filled in.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_parameters_from_json(file_path: &Path) -> Result<Parameters, EpiGridError> {
    let contents = fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Reads parameters from a JSON file and validates them.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the parameters are invalid.
pub fn load_parameters_from_json(file_path: &Path) -> Result<Parameters, EpiGridError> {
    let parameters = read_parameters_from_json(file_path)?;
    parameters.validate()?;
    Ok(parameters)
}

mod duration_string {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(de::Error::custom)
    }
}

define_data_plugin!(ParametersPlugin, Option<Parameters>, None);

pub trait ContextParametersExt {
    /// Validates and stores `parameters`, replacing any previous ones.
    ///
    /// # Errors
    ///
    /// Returns `EpiGridError::ConfigError` if the parameters are invalid. The stored parameters
    /// are left untouched in that case.
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), EpiGridError>;

    /// Returns the stored parameters, or the defaults if none were set.
    fn get_parameters(&self) -> Parameters;

    /// Loads, validates and stores parameters from a JSON file.
    ///
    /// # Errors
    ///
    /// See [`load_parameters_from_json`].
    fn load_parameters(&mut self, file_path: &Path) -> Result<(), EpiGridError> {
        let parameters = load_parameters_from_json(file_path)?;
        self.set_parameters(parameters)
    }
}

impl ContextParametersExt for Context {
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), EpiGridError> {
        parameters.validate()?;
        *self.get_data_mut(ParametersPlugin) = Some(parameters);
        Ok(())
    }

    fn get_parameters(&self) -> Parameters {
        self.get_data(ParametersPlugin)
            .and_then(Option::as_ref)
            .cloned()
            .unwrap_or_default()
    }
}
