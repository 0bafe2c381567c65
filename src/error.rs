use thiserror::Error;

/// Failures surfaced to the caller of a prediction request. The `Display`
/// strings are the exact messages returned in error responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error("Bus {0} not found or bus service unavailable")]
    BusNotFound(i64),

    #[error("Stop {0} not found or stop service unavailable")]
    StopNotFound(i64),

    #[error("Could not fetch the bus roster, bus service unavailable")]
    RosterUnavailable,
}
