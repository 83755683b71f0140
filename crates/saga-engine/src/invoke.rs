use tracing::trace;

use crate::action::Func;
use crate::error::{BoxError, DispatchError};
use crate::signature::{Fault, Value};

/// Result of calling an action: the values it produced before its trailing
/// error, and that error if it was set.
#[derive(Debug)]
pub(crate) struct Invocation {
    pub(crate) outputs: Vec<Value>,
    pub(crate) error: Option<BoxError>,
}

/// Calls `func` with `ctx` followed by `extra`.
///
/// The extra arguments are checked against the declared parameters after
/// the context, and the returned values against the declared returns, so a
/// shape mismatch surfaces as a [`DispatchError`] rather than a panic.
pub(crate) fn invoke<C>(
    func: &Func<C>,
    ctx: &C,
    extra: Vec<Value>,
) -> Result<Invocation, DispatchError> {
    let signature = func.signature();
    let params = signature.extra_params();
    if params.len() != extra.len() {
        return Err(DispatchError::Arity {
            expected: params.len(),
            found: extra.len(),
        });
    }
    if let Some(position) = params
        .iter()
        .zip(&extra)
        .position(|(slot, value)| !slot.accepts(value))
    {
        return Err(DispatchError::ArgumentType {
            position,
            expected: params[position].name(),
        });
    }

    trace!(arguments = extra.len(), "invoking action");
    let mut outputs = func.call(ctx, extra)?;

    let declared = signature.return_slots().len();
    if outputs.len() != declared {
        return Err(DispatchError::ReturnArity {
            expected: declared,
            found: outputs.len(),
        });
    }

    let error = if signature.ends_with_error() {
        split_trailing_error(&mut outputs)?
    } else {
        None
    };
    Ok(Invocation { outputs, error })
}

fn split_trailing_error(outputs: &mut Vec<Value>) -> Result<Option<BoxError>, DispatchError> {
    let Some(last) = outputs.pop() else {
        return Err(DispatchError::ErrorSlot);
    };
    last.downcast::<Fault>()
        .map(|fault| *fault)
        .map_err(|_| DispatchError::ErrorSlot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;

    struct Ctx;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct TestError(String);

    #[test]
    fn outputs_exclude_the_error_slot() {
        let func = Func::from_fn(|_ctx: &Ctx| -> Result<(u32, String), TestError> {
            Ok((7, "seven".to_string()))
        });

        let invocation = invoke(&func, &Ctx, Vec::new()).expect("dispatch succeeds");

        assert_eq!(invocation.outputs.len(), 2);
        assert!(invocation.error.is_none());
    }

    #[test]
    fn set_error_slot_is_surfaced() {
        let func = Func::from_fn(|_ctx: &Ctx| -> Result<(), TestError> {
            Err(TestError("hello".to_string()))
        });

        let invocation = invoke(&func, &Ctx, Vec::new()).expect("dispatch succeeds");

        assert_eq!(
            invocation.error.map(|e| e.to_string()).as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn extra_arguments_are_checked_before_calling() {
        let func = Func::<Ctx>::dynamic(
            Signature::new().param::<Ctx>().param::<u64>().returns_error(),
            |_ctx, _args| panic!("must not be called"),
        );

        let result = invoke(&func, &Ctx, vec![Box::new(String::from("x"))]);

        assert_eq!(
            result.err(),
            Some(DispatchError::ArgumentType {
                position: 0,
                expected: "u64"
            })
        );
    }

    #[test]
    fn missing_arguments_are_an_arity_error() {
        let func = Func::from_fn(|_ctx: &Ctx, _s: String| -> Result<(), TestError> { Ok(()) });

        let result = invoke(&func, &Ctx, Vec::new());

        assert_eq!(
            result.err(),
            Some(DispatchError::Arity {
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn dynamic_body_returning_too_few_values_is_rejected() {
        let func = Func::<Ctx>::dynamic(
            Signature::new().param::<Ctx>().returns::<u8>().returns_error(),
            |_ctx, _args| Ok(vec![Box::new(None::<BoxError>) as Value]),
        );

        let result = invoke(&func, &Ctx, Vec::new());

        assert_eq!(
            result.err(),
            Some(DispatchError::ReturnArity {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn dynamic_body_without_fault_value_is_rejected() {
        let func = Func::<Ctx>::dynamic(Signature::new().param::<Ctx>().returns_error(), |_ctx, _args| {
            Ok(vec![Box::new(5_u8) as Value])
        });

        let result = invoke(&func, &Ctx, Vec::new());

        assert_eq!(result.err(), Some(DispatchError::ErrorSlot));
    }
}
