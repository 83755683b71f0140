use saga_log::{ExecutionId, LogStoreError};

use crate::error::{BoxError, CompensationError, SagaError};
use crate::saga::SagaState;

/// Aggregated result of playing a saga.
#[derive(Debug)]
pub struct Outcome {
    pub execution_id: ExecutionId,
    pub saga_name: String,
    /// State the run ended in. Only non-terminal if the log store failed.
    pub state: SagaState,
    /// Name of the step whose forward action failed.
    pub failed_step: Option<String>,
    /// First forward error. `None` if no step failed.
    pub execution_error: Option<BoxError>,
    /// Compensation failures in invocation order, latest step first.
    pub compensation_errors: Vec<CompensationError>,
    /// Set if an append failed; the run was halted at that point.
    pub log_error: Option<LogStoreError>,
}

impl Outcome {
    /// Whether every step ran and the full history was recorded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.execution_error.is_none() && self.log_error.is_none()
    }

    /// Converts the outcome into a `Result`, folding failures into a
    /// [`SagaError`]. A log failure takes precedence over step failures.
    ///
    /// # Errors
    ///
    /// Returns an error unless [`is_success`](Self::is_success) holds.
    pub fn into_result(self) -> Result<(), SagaError> {
        let saga = self.saga_name;
        if let Some(source) = self.log_error {
            return Err(SagaError::Log { saga, source });
        }
        let Some(step_error) = self.execution_error else {
            return Ok(());
        };
        let failed_step = self.failed_step.unwrap_or_default();

        if self.compensation_errors.is_empty() {
            Err(SagaError::StepFailed {
                saga,
                step: failed_step,
                source: step_error,
            })
        } else {
            Err(SagaError::CompensationFailed {
                saga,
                failed_step,
                step_error,
                compensation_errors: self.compensation_errors,
            })
        }
    }
}
