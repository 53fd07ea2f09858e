//! Structured error types for tokensim.
//!
//! All fallible public APIs return `Result<T, SimError>`. Wiring mistakes
//! (unknown places, arity mismatches, duplicate names) surface when an
//! event is registered, before any simulation step runs. Errors raised
//! while firing indicate a defect in the model or the kernel and stop the
//! run; nothing is retried.

use thiserror::Error;

/// The top-level error type for the simulation kernel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    // ── Token / place errors ──────────────────────────────

    /// A token selected for consumption is no longer in its place.
    #[error("token #{token} is not available in place '{place}'")]
    NotAvailable { place: String, token: u64 },

    /// A place id does not belong to this net.
    #[error("unknown place id {0}")]
    UnknownPlace(usize),

    /// A token's payload kind does not match the kind declared by its place.
    #[error("place '{place}' holds '{expected}' tokens, got '{actual}'")]
    KindMismatch {
        place: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A deposit would place a token earlier than a timestamp already
    /// consumed from the same place.
    #[error("token at T={time} deposited in '{place}' after consuming T={consumed}")]
    TimeTravel {
        place: String,
        time: f64,
        consumed: f64,
    },

    // ── Wiring errors ─────────────────────────────────────

    /// An event (or its guard) references a place that does not exist.
    #[error("event '{event}' references unknown place id {place}")]
    GuardEvaluation { event: String, place: usize },

    /// Declared arcs and the action/guard disagree on arity.
    #[error("event '{event}' expects {expected} values, got {actual}")]
    ArityMismatch {
        event: String,
        expected: usize,
        actual: usize,
    },

    /// The same place is bound twice as an input of one event.
    #[error("event '{event}' consumes place '{place}' more than once")]
    DuplicateInput { event: String, place: String },

    /// An event has no input places and would be permanently enabled.
    #[error("event '{0}' has no input places")]
    NoInputs(String),

    /// Two places share a name.
    #[error("place '{0}' is already declared")]
    DuplicatePlace(String),

    /// Two events share a name.
    #[error("event '{0}' is already declared")]
    DuplicateEvent(String),

    /// An event builder was registered without an action.
    #[error("event '{0}' has no action")]
    MissingAction(String),

    // ── Scheduling errors ─────────────────────────────────

    /// An action produced a negative or non-finite delay.
    #[error("event '{event}' produced invalid delay {delay}")]
    InvalidDelay { event: String, delay: f64 },

    /// A raw value could not be turned into a `VirtualTime`.
    #[error("invalid virtual time {0}")]
    InvalidTime(f64),

    /// The configured step limit was reached before the horizon.
    #[error("step limit {limit} exceeded at T={time}")]
    StepLimitExceeded { limit: u64, time: f64 },

    // ── Config errors ─────────────────────────────────────

    /// A model configuration parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A model action received a payload of the wrong kind.
    #[error("expected a '{expected}' value, got '{actual}'")]
    UnexpectedValue {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_available() {
        let e = SimError::NotAvailable {
            place: "waiting".into(),
            token: 7,
        };
        assert_eq!(e.to_string(), "token #7 is not available in place 'waiting'");
    }

    #[test]
    fn test_error_display_arity() {
        let e = SimError::ArityMismatch {
            event: "arrive".into(),
            expected: 2,
            actual: 3,
        };
        let s = e.to_string();
        assert!(s.contains("arrive"));
        assert!(s.contains('2'));
        assert!(s.contains('3'));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(SimError::NoInputs("x".into()));
        assert!(!e.to_string().is_empty());
    }
}
