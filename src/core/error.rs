use thiserror::Error;

/// Input problems are surfaced as values before any simulation period runs.
/// Non-convergence is not an error; it is reported on `PayoffSummary`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("invalid input: {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl SimulationError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
