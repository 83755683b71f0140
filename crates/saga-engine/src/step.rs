use std::any::{TypeId, type_name};

use crate::action::{Action, Func, IntoFunc, Uncallable};
use crate::error::{ActionRole, RegistrationError};
use crate::signature::{Signature, TypeSlot};

/// Per-step settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOptions {
    compensation_description: Option<String>,
}

impl StepOptions {
    /// Options with the default compensation description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Human-readable description of what compensation will do.
    ///
    /// Defaults to `undo <step name>`.
    #[must_use]
    pub fn with_compensation_description(mut self, description: impl Into<String>) -> Self {
        self.compensation_description = Some(description.into());
        self
    }
}

/// A step as supplied by the caller: a name, a forward action and the
/// action compensating it.
#[derive(Debug)]
pub struct Step<C> {
    name: String,
    forward: Action<C>,
    compensate: Action<C>,
    options: StepOptions,
}

impl<C> Step<C> {
    /// Builds a step from two actions of any kind; both are validated when
    /// the step is registered.
    pub fn new(
        name: impl Into<String>,
        forward: impl Into<Action<C>>,
        compensate: impl Into<Action<C>>,
    ) -> Self {
        Self {
            name: name.into(),
            forward: forward.into(),
            compensate: compensate.into(),
            options: StepOptions::default(),
        }
    }

    /// Builds a step from two typed closures.
    pub fn from_fns<M1, M2>(
        name: impl Into<String>,
        forward: impl IntoFunc<C, M1>,
        compensate: impl IntoFunc<C, M2>,
    ) -> Self {
        Self::new(name, forward.into_func(), compensate.into_func())
    }

    /// Replaces the step's options.
    #[must_use]
    pub fn with_options(mut self, options: StepOptions) -> Self {
        self.options = options;
        self
    }

    /// Name recorded in the step's log events; unique within a saga.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A step that passed validation.
pub(crate) struct RegisteredStep<C> {
    pub(crate) name: String,
    pub(crate) forward: Func<C>,
    pub(crate) compensate: Func<C>,
    pub(crate) description: String,
}

impl<C: 'static> Step<C> {
    /// Checks both actions without invoking them.
    pub(crate) fn validate(self, strict: bool) -> Result<RegisteredStep<C>, RegistrationError> {
        let Self {
            name,
            forward,
            compensate,
            options,
        } = self;

        let forward = callable(&name, ActionRole::Forward, forward)?;
        check_context::<C>(&name, ActionRole::Forward, forward.signature())?;
        if !forward.signature().ends_with_error() {
            return Err(RegistrationError::MissingErrorReturn {
                step: name,
                role: ActionRole::Forward,
                expected: "at least one value ending with an error",
                found: forward.signature().return_slots().len(),
            });
        }

        let compensate = callable(&name, ActionRole::Compensate, compensate)?;
        check_context::<C>(&name, ActionRole::Compensate, compensate.signature())?;
        let returns = compensate.signature().return_slots();
        if returns.len() != 1 || !returns[0].is_error() {
            return Err(RegistrationError::MissingErrorReturn {
                step: name,
                role: ActionRole::Compensate,
                expected: "a single error value",
                found: returns.len(),
            });
        }

        if strict {
            check_binding(&name, forward.signature(), compensate.signature())?;
        }

        let description = options
            .compensation_description
            .unwrap_or_else(|| format!("undo {name}"));
        Ok(RegisteredStep {
            name,
            forward,
            compensate,
            description,
        })
    }
}

fn callable<C>(step: &str, role: ActionRole, action: Action<C>) -> Result<Func<C>, RegistrationError> {
    action.into_func().map_err(|reason| match reason {
        Uncallable::Opaque(found) => RegistrationError::InvalidStepKind {
            step: step.to_string(),
            role,
            found,
        },
        Uncallable::ForeignContext(found) => RegistrationError::MissingContextParam {
            step: step.to_string(),
            role,
            expected: type_name::<C>(),
            found,
        },
    })
}

fn check_context<C: 'static>(
    step: &str,
    role: ActionRole,
    signature: &Signature,
) -> Result<(), RegistrationError> {
    match signature.params().first() {
        Some(slot) if slot.type_id() == TypeId::of::<C>() => Ok(()),
        first => Err(RegistrationError::MissingContextParam {
            step: step.to_string(),
            role,
            expected: type_name::<C>(),
            found: first.map_or("no parameters", |slot| slot.name()),
        }),
    }
}

/// Compensation parameters after the context must match the forward
/// outputs position by position, and those outputs must survive a failure
/// of the forward action.
fn check_binding(
    step: &str,
    forward: &Signature,
    compensate: &Signature,
) -> Result<(), RegistrationError> {
    let outputs = forward.output_slots();
    let params = compensate.extra_params();
    let names = |slots: &[TypeSlot]| -> Vec<&'static str> {
        slots.iter().map(TypeSlot::name).collect()
    };
    if outputs != params {
        return Err(RegistrationError::CompensationMismatch {
            step: step.to_string(),
            expected: names(outputs),
            found: names(params),
        });
    }
    if !params.is_empty() && !forward.keeps_outputs_on_failure() {
        return Err(RegistrationError::FailureDropsOutputs {
            step: step.to_string(),
            found: names(params),
        });
    }
    Ok(())
}
