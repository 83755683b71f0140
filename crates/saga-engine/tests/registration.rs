//! Integration tests for step registration.

use std::sync::{Arc, Mutex};

use saga_engine::{
    Action, ActionRole, Coordinator, Func, RegistrationError, Saga, SagaOptions, SagaState,
    Signature, Step,
};
use saga_log::MemoryLogStore;

struct TestContext;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

fn noop() -> Func<TestContext> {
    Func::from_fn(|_ctx: &TestContext| -> Result<(), TestError> { Ok(()) })
}

fn register(saga: &mut Saga<TestContext>, step: Step<TestContext>) -> RegistrationError {
    match saga.add_step(step) {
        Ok(()) => panic!("step should be rejected"),
        Err(err) => err,
    }
}

#[test]
fn non_callable_actions_are_rejected() {
    let mut saga = Saga::new("kinds");

    let err = register(
        &mut saga,
        Step::new("first", Action::from_value("hello"), Action::from_value("world")),
    );

    assert!(matches!(
        err,
        RegistrationError::InvalidStepKind {
            role: ActionRole::Forward,
            ..
        }
    ));
    assert_eq!(saga.step_count(), 0);
}

#[test]
fn non_callable_compensation_is_rejected() {
    let mut saga = Saga::new("kinds");

    let err = register(&mut saga, Step::new("first", noop(), Action::from_value(42_u8)));

    assert_eq!(
        err,
        RegistrationError::InvalidStepKind {
            step: "first".to_string(),
            role: ActionRole::Compensate,
            found: "u8",
        }
    );
}

#[test]
fn func_wrapped_as_value_stays_callable() -> anyhow::Result<()> {
    let mut saga: Saga<TestContext> = Saga::new("wrapped");

    saga.add_step(Step::new(
        "first",
        Action::from_value(noop()),
        Action::from_value(noop()),
    ))?;

    assert_eq!(saga.step_names().collect::<Vec<_>>(), vec!["first"]);
    Ok(())
}

#[test]
fn action_must_take_the_context_first() {
    let mut saga = Saga::new("context");
    let forward = Func::dynamic(
        Signature::new().param::<String>().returns_error(),
        |_ctx: &TestContext, _args| Ok(Vec::new()),
    );

    let err = register(&mut saga, Step::new("first", forward, noop()));

    assert!(matches!(
        err,
        RegistrationError::MissingContextParam {
            role: ActionRole::Forward,
            found,
            ..
        } if found.ends_with("String")
    ));
}

#[test]
fn forward_must_end_with_an_error() {
    let mut saga = Saga::new("errors");
    let forward = Func::dynamic(
        Signature::new().param::<TestContext>().returns::<u32>(),
        |_ctx: &TestContext, _args| Ok(Vec::new()),
    );

    let err = register(&mut saga, Step::new("first", forward, noop()));

    assert_eq!(err.role(), Some(ActionRole::Forward));
    assert!(matches!(
        err,
        RegistrationError::MissingErrorReturn { found: 1, .. }
    ));
}

#[test]
fn compensation_must_return_only_an_error() {
    let mut saga = Saga::new("errors");
    let compensate = Func::from_fn(|_ctx: &TestContext| -> Result<(u32,), TestError> { Ok((1,)) });

    let err = register(&mut saga, Step::new("first", noop(), compensate));

    assert!(matches!(
        err,
        RegistrationError::MissingErrorReturn {
            role: ActionRole::Compensate,
            found: 2,
            ..
        }
    ));
}

#[test]
fn duplicate_names_are_rejected_after_valid_registration() -> anyhow::Result<()> {
    let mut saga = Saga::new("names");
    saga.add_step(Step::new("first", noop(), noop()))?;
    saga.add_step(Step::new("second", noop(), noop()))?;

    let err = register(&mut saga, Step::new("first", noop(), noop()));

    assert_eq!(err.to_string(), "step 'first' is already registered");
    assert_eq!(
        saga.step_names().collect::<Vec<_>>(),
        vec!["first", "second"]
    );
    Ok(())
}

#[test]
fn loose_binding_accepts_mismatched_compensation() -> anyhow::Result<()> {
    let mut saga = Saga::new("loose");

    saga.add_step(Step::from_fns(
        "first",
        |_ctx: &TestContext| -> Result<(u32,), TestError> { Ok((1,)) },
        |_ctx: &TestContext, _name: String| -> Result<(), TestError> { Ok(()) },
    ))?;

    assert_eq!(saga.step_count(), 1);
    Ok(())
}

#[test]
fn strict_binding_rejects_mismatched_compensation() {
    let mut saga = Saga::new("strict").with_options(SagaOptions::new().strict_signatures(true));

    let err = register(
        &mut saga,
        Step::from_fns(
            "first",
            |_ctx: &TestContext| -> Result<(u32,), TestError> { Ok((1,)) },
            |_ctx: &TestContext, _name: String| -> Result<(), TestError> { Ok(()) },
        ),
    );

    match err {
        RegistrationError::CompensationMismatch {
            step,
            expected,
            found,
        } => {
            assert_eq!(step, "first");
            assert_eq!(expected, vec!["u32"]);
            assert_eq!(found.len(), 1);
            assert!(found[0].ends_with("String"));
        }
        other => panic!("expected CompensationMismatch, got {other:?}"),
    }
    assert_eq!(saga.step_count(), 0);
}

#[test]
fn strict_binding_accepts_matching_compensation() -> anyhow::Result<()> {
    let mut saga = Saga::new("strict").with_options(SagaOptions::new().strict_signatures(true));

    saga.add_step(Step::from_fns(
        "first",
        |_ctx: &TestContext| -> ((u32, String), Result<(), TestError>) {
            ((1, "a".to_string()), Ok(()))
        },
        |_ctx: &TestContext, _id: u32, _name: String| -> Result<(), TestError> { Ok(()) },
    ))?;

    assert_eq!(saga.step_count(), 1);
    Ok(())
}

#[test]
fn strict_binding_rejects_outputs_that_a_failure_would_drop() {
    let mut saga = Saga::new("strict").with_options(SagaOptions::new().strict_signatures(true));

    let err = register(
        &mut saga,
        Step::from_fns(
            "lookup",
            |_ctx: &TestContext| -> Result<(u32,), TestError> {
                Err(TestError("lookup failed".to_string()))
            },
            |_ctx: &TestContext, _id: u32| -> Result<(), TestError> { Ok(()) },
        ),
    );

    assert_eq!(
        err,
        RegistrationError::FailureDropsOutputs {
            step: "lookup".to_string(),
            found: vec!["u32"],
        }
    );
    assert!(err.to_string().contains("Result<(), E>"));
    assert_eq!(saga.step_count(), 0);
}

#[test]
fn strict_binding_delivers_outputs_of_a_failing_step() -> anyhow::Result<()> {
    let released = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&released);
    let mut saga = Saga::new("strict").with_options(SagaOptions::new().strict_signatures(true));
    saga.add_step(Step::from_fns(
        "lookup",
        |_ctx: &TestContext| -> ((u32,), Result<(), TestError>) {
            ((7,), Err(TestError("lookup failed".to_string())))
        },
        move |_ctx: &TestContext, id: u32| -> Result<(), TestError> {
            sink.lock().expect("released lock").push(id);
            Ok(())
        },
    ))?;

    let outcome = Coordinator::new(TestContext, saga, MemoryLogStore::new()).play();

    assert_eq!(outcome.state, SagaState::Compensated);
    assert!(outcome.compensation_errors.is_empty());
    assert_eq!(*released.lock().expect("released lock"), vec![7]);
    Ok(())
}

#[test]
fn func_for_another_context_misses_the_context() {
    struct OtherContext;
    let mut saga = Saga::new("context");
    let foreign = Func::from_fn(|_ctx: &OtherContext| -> Result<(), TestError> { Ok(()) });

    let err = register(
        &mut saga,
        Step::new("first", Action::from_value(foreign), noop()),
    );

    assert!(matches!(
        err,
        RegistrationError::MissingContextParam {
            role: ActionRole::Forward,
            found,
            ..
        } if found.ends_with("OtherContext")
    ));
    assert_eq!(saga.step_count(), 0);
}
