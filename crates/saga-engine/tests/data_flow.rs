//! Integration tests for values flowing from forward actions into their
//! compensations.

use std::sync::{Arc, Mutex};

use saga_engine::{
    BoxError, Coordinator, DispatchError, Fault, Func, Outcome, Saga, SagaState, Signature, Step,
    Value,
};
use saga_log::MemoryLogStore;

#[derive(Default)]
struct TestContext {
    received: Arc<Mutex<Vec<String>>>,
}

impl TestContext {
    fn record(&self, entry: impl Into<String>) {
        self.received.lock().expect("received lock").push(entry.into());
    }
}

/// Plays `saga` and returns its outcome with everything the actions recorded.
fn play(saga: Saga<TestContext>) -> (Outcome, Vec<String>) {
    let ctx = TestContext::default();
    let received = Arc::clone(&ctx.received);

    let outcome = Coordinator::new(ctx, saga, MemoryLogStore::new()).play();

    let received = received.lock().expect("received lock").clone();
    (outcome, received)
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

#[test]
fn outputs_of_a_failing_step_reach_its_compensation() -> anyhow::Result<()> {
    let mut saga = Saga::new("hello");
    saga.add_step(Step::from_fns(
        "greet",
        |_ctx: &TestContext| -> ((String,), Result<(), TestError>) {
            (("hello".to_string(),), Err(TestError("some error".to_string())))
        },
        |ctx: &TestContext, greeting: String| -> Result<(), TestError> {
            ctx.record(greeting);
            Ok(())
        },
    ))?;

    let (outcome, received) = play(saga);

    assert_eq!(outcome.state, SagaState::Compensated);
    assert!(outcome.compensation_errors.is_empty());
    assert_eq!(received, vec!["hello"]);
    Ok(())
}

#[test]
fn outputs_of_successful_steps_reach_their_compensations() -> anyhow::Result<()> {
    let mut saga = Saga::new("booking");
    saga.add_step(Step::from_fns(
        "reserve",
        |_ctx: &TestContext| -> Result<(u32, String), TestError> {
            Ok((17, "room".to_string()))
        },
        |ctx: &TestContext, id: u32, kind: String| -> Result<(), TestError> {
            ctx.record(format!("release {kind} {id}"));
            Ok(())
        },
    ))?;
    saga.add_step(Step::from_fns(
        "charge",
        |_ctx: &TestContext| -> Result<(u64,), TestError> { Ok((250,)) },
        |ctx: &TestContext, amount: u64| -> Result<(), TestError> {
            ctx.record(format!("refund {amount}"));
            Ok(())
        },
    ))?;
    saga.add_step(Step::from_fns(
        "ship",
        |_ctx: &TestContext| -> Result<(), TestError> {
            Err(TestError("no courier".to_string()))
        },
        |ctx: &TestContext| -> Result<(), TestError> {
            ctx.record("cancel shipment");
            Ok(())
        },
    ))?;

    let (outcome, received) = play(saga);

    assert_eq!(outcome.failed_step.as_deref(), Some("ship"));
    assert_eq!(
        received,
        vec!["cancel shipment", "refund 250", "release room 17"]
    );
    Ok(())
}

#[test]
fn failed_step_without_outputs_cannot_feed_a_typed_compensation() -> anyhow::Result<()> {
    let mut saga = Saga::new("loose");
    saga.add_step(Step::from_fns(
        "lookup",
        |_ctx: &TestContext| -> Result<(u32,), TestError> {
            Err(TestError("lookup failed".to_string()))
        },
        |ctx: &TestContext, id: u32| -> Result<(), TestError> {
            ctx.record(format!("undo {id}"));
            Ok(())
        },
    ))?;

    let (outcome, received) = play(saga);

    assert!(received.is_empty());
    assert_eq!(outcome.compensation_errors.len(), 1);
    let failure = &outcome.compensation_errors[0];
    assert_eq!(failure.step, "lookup");
    let dispatch = failure
        .source
        .downcast_ref::<DispatchError>()
        .expect("dispatch error");
    assert_eq!(
        dispatch,
        &DispatchError::Arity {
            expected: 1,
            found: 0
        }
    );
    Ok(())
}

#[test]
fn dynamic_actions_exchange_erased_values() -> anyhow::Result<()> {
    let forward = Func::dynamic(
        Signature::new()
            .param::<TestContext>()
            .returns::<String>()
            .returns_error(),
        |_ctx: &TestContext, _args: Vec<Value>| {
            let fault: Fault = Some(BoxError::from("remote refused"));
            Ok(vec![Box::new("ticket-9".to_string()) as Value, Box::new(fault)])
        },
    );
    let compensate = Func::dynamic(
        Signature::new()
            .param::<TestContext>()
            .param::<String>()
            .returns_error(),
        |ctx: &TestContext, args: Vec<Value>| {
            let mut args = args.into_iter();
            let ticket = args
                .next()
                .and_then(|value| value.downcast::<String>().ok())
                .ok_or(DispatchError::ArgumentType {
                    position: 0,
                    expected: "String",
                })?;
            ctx.record(format!("void {ticket}"));
            let fault: Fault = None;
            Ok(vec![Box::new(fault) as Value])
        },
    );
    let mut saga = Saga::new("dynamic");
    saga.add_step(Step::new("issue", forward, compensate))?;

    let (outcome, received) = play(saga);

    assert_eq!(
        outcome.execution_error.map(|e| e.to_string()).as_deref(),
        Some("remote refused")
    );
    assert_eq!(received, vec!["void ticket-9"]);
    Ok(())
}
