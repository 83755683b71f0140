use std::fmt;

use saga_log::LogStoreError;
use thiserror::Error;

/// Error value carried by a failed action.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which half of a step an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRole {
    Forward,
    Compensate,
}

impl fmt::Display for ActionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => f.write_str("forward action"),
            Self::Compensate => f.write_str("compensating action"),
        }
    }
}

/// Contract violation detected while registering a step.
///
/// The saga is left unchanged when registration fails.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error("{role} of step '{step}' is not callable, but {found}")]
    InvalidStepKind {
        step: String,
        role: ActionRole,
        found: &'static str,
    },

    #[error("{role} of step '{step}' must take the saga context {expected} as its first parameter, found {found}")]
    MissingContextParam {
        step: String,
        role: ActionRole,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{role} of step '{step}' must return {expected}, but declares {found} return value(s)")]
    MissingErrorReturn {
        step: String,
        role: ActionRole,
        expected: &'static str,
        found: usize,
    },

    #[error("step '{step}' is already registered")]
    DuplicateStepName { step: String },

    #[error(
        "compensating action of step '{step}' takes ({}) after the context, but the forward action returns ({})",
        .found.join(", "),
        .expected.join(", ")
    )]
    CompensationMismatch {
        step: String,
        expected: Vec<&'static str>,
        found: Vec<&'static str>,
    },

    /// The forward action returns its outputs only on success, but the
    /// step's compensation expects them and also runs when the step fails.
    #[error(
        "forward action of step '{step}' returns no values when it fails, but its compensation takes ({}); return `(outputs, Result<(), E>)` to keep them",
        .found.join(", ")
    )]
    FailureDropsOutputs {
        step: String,
        found: Vec<&'static str>,
    },
}

impl RegistrationError {
    /// Role of the offending action, if the error concerns a single action.
    #[must_use]
    pub fn role(&self) -> Option<ActionRole> {
        match self {
            Self::InvalidStepKind { role, .. }
            | Self::MissingContextParam { role, .. }
            | Self::MissingErrorReturn { role, .. } => Some(*role),
            Self::FailureDropsOutputs { .. } => Some(ActionRole::Forward),
            Self::CompensationMismatch { .. } => Some(ActionRole::Compensate),
            Self::DuplicateStepName { .. } => None,
        }
    }
}

/// Failure to bind erased values to an action at call time.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("action takes {expected} argument(s) after the context, got {found}")]
    Arity { expected: usize, found: usize },

    #[error("argument {position} after the context is not of type {expected}")]
    ArgumentType {
        position: usize,
        expected: &'static str,
    },

    #[error("action declares {expected} return value(s) but produced {found}")]
    ReturnArity { expected: usize, found: usize },

    #[error("trailing return value of the action is not an error slot")]
    ErrorSlot,
}

/// Error from a failed compensating action.
#[derive(Debug, Error)]
#[error("compensation failed for step '{step}': {description}")]
pub struct CompensationError {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Position of the step in the saga.
    pub index: usize,
    /// Description of what the compensation was trying to do.
    pub description: String,
    #[source]
    pub source: BoxError,
}

/// Error form of an unsuccessful [`Outcome`](crate::Outcome).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError {
    /// A step failed and all compensations succeeded.
    #[error("step '{step}' of saga '{saga}' failed")]
    StepFailed {
        saga: String,
        step: String,
        #[source]
        source: BoxError,
    },

    /// A step failed and some compensations also failed.
    #[error("step '{failed_step}' of saga '{saga}' failed, and {} compensation(s) also failed", compensation_errors.len())]
    CompensationFailed {
        saga: String,
        failed_step: String,
        step_error: BoxError,
        compensation_errors: Vec<CompensationError>,
    },

    /// The run was halted because its history could not be recorded.
    #[error("saga '{saga}' halted: its log could not be written")]
    Log {
        saga: String,
        #[source]
        source: LogStoreError,
    },
}
