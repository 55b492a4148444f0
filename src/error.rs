//! The error type shared by every fallible operation in `epigrid`.
//!
//! Configuration problems are reported as [`EpiGridError::ConfigError`] before any simulation
//! state is created. [`EpiGridError::InvariantViolation`] signals a defect in the engine (for
//! example, two agents claiming the same cell) and is never expected in a correct run.
use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `EpiGridError` and maps other errors to it
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EpiGridError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    ConfigError(String),
    InvariantViolation(String),
    InvalidState(String),
    ReportError(String),
}

impl From<io::Error> for EpiGridError {
    fn from(error: io::Error) -> Self {
        EpiGridError::IoError(error)
    }
}

impl From<serde_json::Error> for EpiGridError {
    fn from(error: serde_json::Error) -> Self {
        EpiGridError::JsonError(error)
    }
}

impl From<csv::Error> for EpiGridError {
    fn from(error: csv::Error) -> Self {
        EpiGridError::CsvError(error)
    }
}

impl std::error::Error for EpiGridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpiGridError::IoError(error) => Some(error),
            EpiGridError::JsonError(error) => Some(error),
            EpiGridError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for EpiGridError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpiGridError::IoError(error) => write!(f, "I/O error: {error}"),
            EpiGridError::JsonError(error) => write!(f, "invalid JSON: {error}"),
            EpiGridError::CsvError(error) => write!(f, "CSV error: {error}"),
            EpiGridError::ConfigError(msg) => write!(f, "invalid configuration: {msg}"),
            EpiGridError::InvariantViolation(msg) => write!(f, "invariant violated: {msg}"),
            EpiGridError::InvalidState(msg) => write!(f, "invalid simulation state: {msg}"),
            EpiGridError::ReportError(msg) => write!(f, "report error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_error_converts_and_keeps_source() {
        let error: EpiGridError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(error, EpiGridError::IoError(_)));
        assert!(error.source().is_some());
        assert_eq!(error.to_string(), "I/O error: gone");
    }

    #[test]
    fn json_error_converts() {
        let json_error = serde_json::from_str::<u32>("not json").unwrap_err();
        let error: EpiGridError = json_error.into();
        assert!(matches!(error, EpiGridError::JsonError(_)));
    }

    #[test]
    fn config_error_display() {
        let error = EpiGridError::ConfigError("population_size must be positive".to_string());
        assert_eq!(
            error.to_string(),
            "invalid configuration: population_size must be positive"
        );
        assert!(error.source().is_none());
    }
}
