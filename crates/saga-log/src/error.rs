use std::path::PathBuf;

use thiserror::Error;

use crate::event::{ExecutionId, LogKind};

/// Error raised by a [`LogStore`](crate::LogStore) backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LogStoreError {
    /// No events were ever appended for the execution.
    #[error("no log events found for execution '{0}'")]
    NotFound(ExecutionId),

    #[error("failed to access log file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode log event for execution '{execution_id}'")]
    Encode {
        execution_id: ExecutionId,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed log entry at '{path}' line {line}")]
    Decode {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A writer panicked while holding the store lock.
    #[error("log store lock poisoned")]
    Poisoned,
}

impl LogStoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, LogStoreError>;

/// Error raised when a stored event stream does not describe a valid run.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuditError {
    #[error("event stream is empty")]
    Empty,

    #[error("event stream must begin with StartSaga, found {0}")]
    MissingStart(LogKind),

    #[error("unexpected {found} event at position {position}")]
    OutOfOrder { position: usize, found: LogKind },

    #[error("{kind} event at position {position} has no step index")]
    MissingStepIndex { position: usize, kind: LogKind },

    #[error("event at position {position} belongs to execution '{found}', expected '{expected}'")]
    ForeignEvent {
        position: usize,
        expected: ExecutionId,
        found: ExecutionId,
    },

    #[error("compensation of step {index} does not match any executed step")]
    UnknownCompensation { index: usize },

    #[error("saga aborted to compensate {declared} step(s) but {executed} were executed")]
    AbortCountMismatch { declared: usize, executed: usize },

    /// `SagaComplete` arrived before every executed step was compensated.
    #[error("saga completed at position {position} with {remaining} step(s) left uncompensated")]
    IncompleteUnwind { position: usize, remaining: usize },
}
