use chrono::{DateTime, Utc};

use crate::error::AuditError;
use crate::event::{ExecutionId, LogEvent, LogKind};

/// Status of a step reconstructed from the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step executed and was never compensated.
    Executed,
    /// Step was the last one executed before the saga aborted and has not
    /// been compensated yet.
    Failed,
    /// Step's compensation was invoked.
    Compensated,
}

/// Record of a step's execution in the saga.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    /// When the step was started.
    pub executed_at: DateTime<Utc>,
    /// When its compensation was started, if it was.
    pub compensated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Forward,
    Compensating,
    Complete,
}

/// Per-step view of one saga run, rebuilt from its stored events.
///
/// Replaying also validates the stream against the order the engine emits:
/// `StartSaga`, then `StepExec` for consecutive indexes, then optionally
/// `SagaAbort` followed by `StepCompensate` in reverse index order, and
/// finally `SagaComplete`. A stream without `SagaComplete` is accepted and
/// reported as unfinished.
#[derive(Debug)]
pub struct SagaAuditLog {
    execution_id: ExecutionId,
    saga_name: String,
    records: Vec<StepRecord>,
    failed_step: Option<usize>,
    aborted: bool,
    complete: bool,
}

impl SagaAuditLog {
    /// Replays `events` of a single execution.
    ///
    /// # Errors
    ///
    /// Returns an [`AuditError`] if the stream is empty, mixes executions or
    /// violates the emission order.
    pub fn from_events(events: &[LogEvent]) -> Result<Self, AuditError> {
        let first = events.first().ok_or(AuditError::Empty)?;
        if first.kind != LogKind::StartSaga {
            return Err(AuditError::MissingStart(first.kind));
        }

        let mut log = Self {
            execution_id: first.execution_id.clone(),
            saga_name: first.saga_name.clone(),
            records: Vec::new(),
            failed_step: None,
            aborted: false,
            complete: false,
        };
        let mut phase = Phase::Forward;
        let mut next_compensation = 0;

        for (position, event) in events.iter().enumerate().skip(1) {
            if event.execution_id != log.execution_id {
                return Err(AuditError::ForeignEvent {
                    position,
                    expected: log.execution_id.clone(),
                    found: event.execution_id.clone(),
                });
            }
            let out_of_order = AuditError::OutOfOrder {
                position,
                found: event.kind,
            };

            match (phase, event.kind) {
                (Phase::Forward, LogKind::StepExec) => {
                    let index = step_index(position, event)?;
                    if index != log.records.len() {
                        return Err(out_of_order);
                    }
                    log.records.push(StepRecord {
                        index,
                        name: event.step_name.clone().unwrap_or_default(),
                        status: StepStatus::Executed,
                        executed_at: event.timestamp,
                        compensated_at: None,
                    });
                }
                (Phase::Forward, LogKind::SagaAbort) => {
                    let executed = log.records.len();
                    let declared = event.compensations.unwrap_or(executed);
                    if declared != executed {
                        return Err(AuditError::AbortCountMismatch { declared, executed });
                    }
                    if let Some(last) = log.records.last_mut() {
                        last.status = StepStatus::Failed;
                        log.failed_step = Some(last.index);
                    }
                    log.aborted = true;
                    next_compensation = executed;
                    phase = Phase::Compensating;
                }
                (Phase::Compensating, LogKind::StepCompensate) => {
                    let index = step_index(position, event)?;
                    if index >= log.records.len() {
                        return Err(AuditError::UnknownCompensation { index });
                    }
                    if next_compensation == 0 || index != next_compensation - 1 {
                        return Err(out_of_order);
                    }
                    next_compensation = index;
                    let record = &mut log.records[index];
                    record.status = StepStatus::Compensated;
                    record.compensated_at = Some(event.timestamp);
                }
                (Phase::Compensating, LogKind::SagaComplete) if next_compensation > 0 => {
                    return Err(AuditError::IncompleteUnwind {
                        position,
                        remaining: next_compensation,
                    });
                }
                (Phase::Forward | Phase::Compensating, LogKind::SagaComplete) => {
                    log.complete = true;
                    phase = Phase::Complete;
                }
                _ => return Err(out_of_order),
            }
        }

        Ok(log)
    }

    #[must_use]
    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    #[must_use]
    pub fn saga_name(&self) -> &str {
        &self.saga_name
    }

    /// Get all records in the audit log.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Index of the step whose failure aborted the run.
    #[must_use]
    pub fn failed_step(&self) -> Option<usize> {
        self.failed_step
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Whether the stream ends with `SagaComplete`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Get a summary of the saga execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Executed => "✓",
                StepStatus::Failed => "✗",
                StepStatus::Compensated if self.failed_step == Some(record.index) => "✗↩",
                StepStatus::Compensated => "↩",
            };
            lines.push(format!("{status} {}", record.name));
        }
        lines.join("\n")
    }
}

fn step_index(position: usize, event: &LogEvent) -> Result<usize, AuditError> {
    event.step_index.ok_or(AuditError::MissingStepIndex {
        position,
        kind: event.kind,
    })
}
