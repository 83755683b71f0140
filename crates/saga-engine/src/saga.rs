use std::fmt;

use saga_log::{ExecutionId, LogEvent, LogStore, LogStoreError};
use tracing::{debug, info, warn};

use crate::action::Func;
use crate::error::{BoxError, CompensationError, RegistrationError};
use crate::id::{IdGenerator, UuidGenerator};
use crate::invoke::invoke;
use crate::outcome::Outcome;
use crate::signature::Value;
use crate::step::{RegisteredStep, Step};

/// Saga-wide settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SagaOptions {
    strict_signatures: bool,
}

impl SagaOptions {
    /// Default options: loose compensation binding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require each compensating action to take, after the context, exactly
    /// the types its forward action returns before the error.
    ///
    /// Off by default: a mismatch then surfaces as a dispatch failure when
    /// the compensation runs.
    #[must_use]
    pub fn strict_signatures(mut self, enabled: bool) -> Self {
        self.strict_signatures = enabled;
        self
    }

    /// Whether compensation binding is checked at registration.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict_signatures
    }
}

/// Lifecycle of one saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaState {
    NotStarted,
    Running,
    Aborting,
    Completed,
    Compensated,
}

impl SagaState {
    /// Whether the run ended, either completed or fully compensated.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Compensated)
    }

    fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Running)
                | (Self::Running, Self::Completed | Self::Aborting)
                | (Self::Aborting, Self::Compensated)
        )
    }
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Aborting => "aborting",
            Self::Completed => "completed",
            Self::Compensated => "compensated",
        };
        f.write_str(name)
    }
}

/// A step that ran, with what its compensation needs.
struct Executed<C> {
    index: usize,
    outputs: Vec<Value>,
    compensate: Func<C>,
}

/// An ordered list of steps with the state of its single run.
///
/// Steps are registered with [`add_step`](Self::add_step) and the saga is
/// then handed to a [`Coordinator`](crate::Coordinator), which consumes it.
pub struct Saga<C> {
    execution_id: ExecutionId,
    name: String,
    options: SagaOptions,
    steps: Vec<RegisteredStep<C>>,
    executed: Vec<Executed<C>>,
    state: SagaState,
    aborted: bool,
    failed_index: Option<usize>,
    error: Option<BoxError>,
}

impl<C: 'static> Saga<C> {
    /// Creates a saga with a random execution id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id_generator(name, &UuidGenerator)
    }

    /// Creates a saga whose execution id is drawn from `ids`.
    pub fn with_id_generator(name: impl Into<String>, ids: &dyn IdGenerator) -> Self {
        Self::with_execution_id(name, ids.next_id())
    }

    /// Creates a saga recorded under the given execution id.
    ///
    /// The caller is responsible for the id being unique in the store.
    pub fn with_execution_id(name: impl Into<String>, execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            name: name.into(),
            options: SagaOptions::default(),
            steps: Vec::new(),
            executed: Vec::new(),
            state: SagaState::NotStarted,
            aborted: false,
            failed_index: None,
            error: None,
        }
    }

    /// Replaces the saga's options. Applies to steps registered afterwards.
    #[must_use]
    pub fn with_options(mut self, options: SagaOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates `step` and appends it.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] if either action is not callable,
    /// does not take the context first, does not return the error slot
    /// where required, or if the name is already used. The saga is
    /// unchanged in that case.
    pub fn add_step(&mut self, step: Step<C>) -> Result<(), RegistrationError> {
        if self.steps.iter().any(|existing| existing.name == step.name()) {
            return Err(RegistrationError::DuplicateStepName {
                step: step.name().to_string(),
            });
        }
        let registered = step.validate(self.options.is_strict())?;
        debug!(
            saga = %self.name,
            step = %registered.name,
            index = self.steps.len(),
            "registered step"
        );
        self.steps.push(registered);
        Ok(())
    }
}

impl<C> Saga<C> {
    /// Id under which the run's events are recorded.
    #[must_use]
    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    /// Saga name recorded in every log event.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of registered steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Registered step names in execution order.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.name.as_str())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SagaState {
        self.state
    }

    /// Runs the saga to a terminal state, recording every transition.
    pub(crate) fn play<S>(mut self, ctx: &C, store: &S) -> Outcome
    where
        S: LogStore + ?Sized,
    {
        let mut compensation_errors = Vec::new();
        let log_error = self.drive(ctx, store, &mut compensation_errors).err();
        if let Some(err) = &log_error {
            warn!(
                saga = %self.name,
                execution_id = %self.execution_id,
                state = %self.state,
                error = %err,
                "halting saga: log store failed"
            );
        }

        let failed_step = self
            .failed_index
            .map(|index| self.steps[index].name.clone());
        Outcome {
            execution_id: self.execution_id,
            saga_name: self.name,
            state: self.state,
            failed_step,
            execution_error: self.error,
            compensation_errors,
            log_error,
        }
    }

    fn drive<S>(
        &mut self,
        ctx: &C,
        store: &S,
        compensation_errors: &mut Vec<CompensationError>,
    ) -> Result<(), LogStoreError>
    where
        S: LogStore + ?Sized,
    {
        info!(
            saga = %self.name,
            execution_id = %self.execution_id,
            steps = self.steps.len(),
            "starting saga"
        );
        store.append_log(&LogEvent::start(&self.execution_id, &self.name))?;
        self.transition(SagaState::Running);

        for index in 0..self.steps.len() {
            if self.aborted {
                break;
            }
            self.exec_step(index, ctx, store)?;
        }

        if self.aborted {
            self.abort(ctx, store, compensation_errors)?;
            self.transition(SagaState::Compensated);
        } else {
            self.transition(SagaState::Completed);
        }

        store.append_log(&LogEvent::complete(&self.execution_id, &self.name))?;
        info!(
            saga = %self.name,
            execution_id = %self.execution_id,
            state = %self.state,
            compensation_errors = compensation_errors.len(),
            "saga complete"
        );
        Ok(())
    }

    fn exec_step<S>(&mut self, index: usize, ctx: &C, store: &S) -> Result<(), LogStoreError>
    where
        S: LogStore + ?Sized,
    {
        let step = &self.steps[index];
        store.append_log(&LogEvent::step_exec(
            &self.execution_id,
            &self.name,
            index,
            &step.name,
        ))?;
        debug!(saga = %self.name, step = %step.name, index, "executing step");

        let (outputs, error) = match invoke(&step.forward, ctx, Vec::new()) {
            Ok(invocation) => (invocation.outputs, invocation.error),
            Err(dispatch) => (Vec::new(), Some(BoxError::from(dispatch))),
        };
        let compensate = step.compensate.clone();
        let failed = error.is_some();

        if let Some(error) = error {
            warn!(
                saga = %self.name,
                step = %step.name,
                index,
                error = %error,
                "step failed, aborting saga"
            );
            self.error = Some(error);
            self.failed_index = Some(index);
            self.aborted = true;
        }
        self.executed.push(Executed {
            index,
            outputs,
            compensate,
        });
        if failed {
            self.transition(SagaState::Aborting);
        }
        Ok(())
    }

    fn abort<S>(
        &mut self,
        ctx: &C,
        store: &S,
        compensation_errors: &mut Vec<CompensationError>,
    ) -> Result<(), LogStoreError>
    where
        S: LogStore + ?Sized,
    {
        let pending = self.executed.len();
        store.append_log(&LogEvent::abort(&self.execution_id, &self.name, pending))?;

        while let Some(Executed {
            index,
            outputs,
            compensate,
        }) = self.executed.pop()
        {
            let step = &self.steps[index];
            store.append_log(&LogEvent::step_compensate(
                &self.execution_id,
                &self.name,
                index,
                &step.name,
            ))?;
            debug!(
                saga = %self.name,
                step = %step.name,
                index,
                description = %step.description,
                "compensating step"
            );

            let failure = match invoke(&compensate, ctx, outputs) {
                Ok(invocation) => invocation.error,
                Err(dispatch) => Some(BoxError::from(dispatch)),
            };
            if let Some(source) = failure {
                warn!(
                    saga = %self.name,
                    step = %step.name,
                    index,
                    error = %source,
                    "compensation failed, continuing unwind"
                );
                compensation_errors.push(CompensationError {
                    step: step.name.clone(),
                    index,
                    description: step.description.clone(),
                    source,
                });
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: SagaState) {
        debug_assert!(
            self.state.can_become(next),
            "invalid saga transition {} -> {next}",
            self.state
        );
        debug!(
            saga = %self.name,
            from = %self.state,
            to = %next,
            "saga transition"
        );
        self.state = next;
    }
}

impl<C> fmt::Debug for Saga<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saga")
            .field("execution_id", &self.execution_id)
            .field("name", &self.name)
            .field("options", &self.options)
            .field("steps", &self.step_names().collect::<Vec<_>>())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
