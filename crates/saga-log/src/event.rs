use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque token correlating all log events of one saga run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Wraps an id produced elsewhere, such as by an id generator.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExecutionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ExecutionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Kind of transition recorded by a [`LogEvent`].
///
/// The serialized names are stable and shared by every store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    StartSaga,
    StepExec,
    StepCompensate,
    SagaAbort,
    SagaComplete,
}

impl LogKind {
    /// Stable name, identical to the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartSaga => "StartSaga",
            Self::StepExec => "StepExec",
            Self::StepCompensate => "StepCompensate",
            Self::SagaAbort => "SagaAbort",
            Self::SagaComplete => "SagaComplete",
        }
    }

    /// Whether events of this kind refer to a single step.
    #[must_use]
    pub fn is_step_event(self) -> bool {
        matches!(self, Self::StepExec | Self::StepCompensate)
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only record of a saga transition.
///
/// `step_index` and `step_name` are only set for [`LogKind::StepExec`] and
/// [`LogKind::StepCompensate`]; `compensations` is only set for
/// [`LogKind::SagaAbort`] and holds the number of steps about to be
/// compensated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub execution_id: ExecutionId,
    pub saga_name: String,
    pub timestamp: DateTime<Utc>,
    pub kind: LogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensations: Option<usize>,
}

impl LogEvent {
    fn bare(execution_id: &ExecutionId, saga_name: &str, kind: LogKind) -> Self {
        Self {
            execution_id: execution_id.clone(),
            saga_name: saga_name.to_string(),
            timestamp: Utc::now(),
            kind,
            step_index: None,
            step_name: None,
            compensations: None,
        }
    }

    /// First event of every run.
    #[must_use]
    pub fn start(execution_id: &ExecutionId, saga_name: &str) -> Self {
        Self::bare(execution_id, saga_name, LogKind::StartSaga)
    }

    /// Recorded before step `index` runs its forward action.
    #[must_use]
    pub fn step_exec(
        execution_id: &ExecutionId,
        saga_name: &str,
        index: usize,
        step_name: &str,
    ) -> Self {
        Self {
            step_index: Some(index),
            step_name: Some(step_name.to_string()),
            ..Self::bare(execution_id, saga_name, LogKind::StepExec)
        }
    }

    /// Recorded before step `index` runs its compensating action.
    #[must_use]
    pub fn step_compensate(
        execution_id: &ExecutionId,
        saga_name: &str,
        index: usize,
        step_name: &str,
    ) -> Self {
        Self {
            step_index: Some(index),
            step_name: Some(step_name.to_string()),
            ..Self::bare(execution_id, saga_name, LogKind::StepCompensate)
        }
    }

    /// Recorded once a step failed, with the number of steps to compensate.
    #[must_use]
    pub fn abort(execution_id: &ExecutionId, saga_name: &str, compensations: usize) -> Self {
        Self {
            compensations: Some(compensations),
            ..Self::bare(execution_id, saga_name, LogKind::SagaAbort)
        }
    }

    /// Last event of every run, successful or compensated.
    #[must_use]
    pub fn complete(execution_id: &ExecutionId, saga_name: &str) -> Self {
        Self::bare(execution_id, saga_name, LogKind::SagaComplete)
    }
}
