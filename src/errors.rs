//! Error type for the stockflow crate.
use thiserror::Error;

/// Custom error type for the stockflow crate.
#[derive(Error, Debug)]
pub enum SimError {
    /// A stock or flow was declared under a name already in the registry.
    #[error("Variable {0} already defined.")]
    DuplicateName(String),
    /// A name was never declared, or a flow endpoint does not name a stock.
    #[error("Unknown variable {0}.")]
    UnknownVariable(String),
    /// Result series were requested before a completed run.
    #[error("Simulation has not been run.")]
    NotRun,
    /// The time grid cannot be integrated.
    #[error("Invalid time grid: {0}")]
    InvalidTimeGrid(String),
    /// The ODE solver gave up on a segment.
    #[error("Integration failed on segment starting at t = {time}: {reason}")]
    Integration {
        /// Start of the failing segment.
        time: f64,
        /// Diagnostic reported by the solver.
        reason: String,
    },
    /// Coefficient sampling range has a non-finite bound.
    #[error("Invalid coefficient range: {0}")]
    InvalidRange(String),
    /// Forcing columns are empty, ragged or contain NaN.
    #[error("Invalid forcing data: {0}")]
    InvalidForcing(String),
    /// Error type from csv crate.
    #[error("Could not serialize/deserialize csv file: {0}")]
    Csv(#[from] csv::Error),
    /// Error type from std::io.
    #[error("Could not read file from path provided: {0}")]
    Io(#[from] std::io::Error),
    /// A data field was not a number.
    #[error("Could not parse value: {0}")]
    Parse(#[from] std::num::ParseFloatError),
    /// Error raised by the plotting backend.
    #[error("Could not draw plot: {0}")]
    Plot(String),
}

/// Convenience type for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
