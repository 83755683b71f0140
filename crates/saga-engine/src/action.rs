//! Callables registered as step actions.
//!
//! An [`Action`] can hold any value; only a [`Func`] is callable. A `Func`
//! pairs an erased body with the [`Signature`] it declares, which is what
//! registration validates. Ordinary closures become a `Func` through
//! [`IntoFunc`], deriving the signature from their types:
//!
//! ```
//! use saga_engine::{Func, Signature};
//!
//! struct Ctx;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("declined")]
//! struct Declined;
//!
//! let charge = Func::from_fn(|_ctx: &Ctx| -> Result<(u64,), Declined> { Ok((42,)) });
//!
//! assert_eq!(
//!     charge.signature(),
//!     &Signature::new()
//!         .param::<Ctx>()
//!         .returns::<u64>()
//!         .returns_error()
//!         .drops_outputs_on_failure()
//! );
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{BoxError, DispatchError};
use crate::signature::{Fault, Signature, TypeSlot, Value};

type Body<C> = dyn Fn(&C, Vec<Value>) -> Result<Vec<Value>, DispatchError> + Send + Sync;

/// A callable action with a declared signature.
///
/// The body receives the context and the extra arguments, and returns every
/// declared return value in order, including the trailing [`Fault`] slot.
pub struct Func<C> {
    signature: Signature,
    body: Arc<Body<C>>,
}

impl<C: 'static> Func<C> {
    /// Builds an action from an explicit signature and an erased body.
    ///
    /// The signature is trusted: registration validates it, and the invoker
    /// checks the extra arguments against it before calling `body`.
    pub fn dynamic<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(&C, Vec<Value>) -> Result<Vec<Value>, DispatchError> + Send + Sync + 'static,
    {
        remember_context::<C>();
        Self {
            signature,
            body: Arc::new(body),
        }
    }

    /// Builds an action from a typed closure.
    pub fn from_fn<M>(f: impl IntoFunc<C, M>) -> Self {
        f.into_func()
    }
}

impl<C> Func<C> {
    /// Parameters and returns the action declares.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn call(&self, ctx: &C, args: Vec<Value>) -> Result<Vec<Value>, DispatchError> {
        (self.body)(ctx, args)
    }
}

impl<C> Clone for Func<C> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

impl<C> fmt::Debug for Func<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Context type names of every `Func<D>` built so far, keyed by the
/// `TypeId` of `Func<D>`.
fn func_contexts() -> &'static RwLock<HashMap<TypeId, &'static str>> {
    static CONTEXTS: OnceLock<RwLock<HashMap<TypeId, &'static str>>> = OnceLock::new();
    CONTEXTS.get_or_init(RwLock::default)
}

fn remember_context<C: 'static>() {
    let key = TypeId::of::<Func<C>>();
    let known = func_contexts()
        .read()
        .is_ok_and(|contexts| contexts.contains_key(&key));
    if known {
        return;
    }
    if let Ok(mut contexts) = func_contexts().write() {
        contexts.insert(key, type_name::<C>());
    }
}

/// Context type of `T` if `T` is a [`Func`] for some context.
fn func_context(value_type: TypeId) -> Option<&'static str> {
    func_contexts().read().ok()?.get(&value_type).copied()
}

/// Why an [`Action`] could not be turned into a [`Func`] for the saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Uncallable {
    /// Not a function at all; holds the supplied type name.
    Opaque(&'static str),
    /// A `Func` built for another context type; holds that type's name.
    ForeignContext(&'static str),
}

enum ActionKind<C> {
    Callable(Func<C>),
    Rejected(Uncallable),
}

/// Anything supplied as a step's forward or compensating action.
///
/// Whether it is actually callable is decided when the step is registered.
pub struct Action<C> {
    kind: ActionKind<C>,
}

impl<C: 'static> Action<C> {
    /// Wraps an arbitrary value. A [`Func<C>`] stays callable. A `Func`
    /// for another context is rejected at registration as taking the wrong
    /// context; any other value is kept only by its type name and rejected
    /// as not callable.
    pub fn from_value<T: Any>(value: T) -> Self {
        let boxed: Box<dyn Any> = Box::new(value);
        let kind = match boxed.downcast::<Func<C>>() {
            Ok(func) => ActionKind::Callable(*func),
            Err(_) => ActionKind::Rejected(match func_context(TypeId::of::<T>()) {
                Some(context) => Uncallable::ForeignContext(context),
                None => Uncallable::Opaque(type_name::<T>()),
            }),
        };
        Self { kind }
    }
}

impl<C> Action<C> {
    pub(crate) fn into_func(self) -> Result<Func<C>, Uncallable> {
        match self.kind {
            ActionKind::Callable(func) => Ok(func),
            ActionKind::Rejected(reason) => Err(reason),
        }
    }
}

impl<C> From<Func<C>> for Action<C> {
    fn from(func: Func<C>) -> Self {
        Self {
            kind: ActionKind::Callable(func),
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Callable(func) => f.debug_tuple("Action").field(func).finish(),
            ActionKind::Rejected(reason) => f.debug_tuple("Action").field(reason).finish(),
        }
    }
}

/// Typed values an action produces before its trailing error.
///
/// Implemented for tuples of up to three values.
pub trait Outputs: Send + 'static {
    fn slots() -> Vec<TypeSlot>;

    fn into_values(self) -> Vec<Value>;
}

/// Typed arguments an action takes after the context.
pub trait Inputs: Sized {
    fn slots() -> Vec<TypeSlot>;

    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the number or types of `values` do
    /// not match.
    fn from_values(values: Vec<Value>) -> Result<Self, DispatchError>;
}

macro_rules! impl_tuples {
    ($len:expr; $($ty:ident $val:ident $pos:tt),*) => {
        impl<$($ty: Send + 'static),*> Outputs for ($($ty,)*) {
            fn slots() -> Vec<TypeSlot> {
                vec![$(TypeSlot::of::<$ty>()),*]
            }

            fn into_values(self) -> Vec<Value> {
                vec![$(Box::new(self.$pos) as Value),*]
            }
        }

        impl<$($ty: Send + 'static),*> Inputs for ($($ty,)*) {
            fn slots() -> Vec<TypeSlot> {
                vec![$(TypeSlot::of::<$ty>()),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn from_values(values: Vec<Value>) -> Result<Self, DispatchError> {
                if values.len() != $len {
                    return Err(DispatchError::Arity {
                        expected: $len,
                        found: values.len(),
                    });
                }
                let mut values = values.into_iter();
                $(
                    let $val = values
                        .next()
                        .ok_or(DispatchError::Arity { expected: $len, found: $pos })?
                        .downcast::<$ty>()
                        .map_err(|_| DispatchError::ArgumentType {
                            position: $pos,
                            expected: type_name::<$ty>(),
                        })?;
                )*
                Ok(($(*$val,)*))
            }
        }
    };
}

impl_tuples!(0;);
impl_tuples!(1; A a 0);
impl_tuples!(2; A a 0, B b 1);
impl_tuples!(3; A a 0, B b 1, D d 2);

/// Return shapes a typed closure may use.
///
/// - `Result<O, E>`: outputs on success, no outputs on failure.
/// - `(O, Result<(), E>)`: outputs are produced even when the action fails,
///   so the step's compensation still receives them.
pub trait Returns: Send + 'static {
    fn slots() -> Vec<TypeSlot>;

    /// Whether [`into_values`](Self::into_values) still yields the outputs
    /// when the action fails.
    fn keeps_outputs_on_failure() -> bool;

    fn into_values(self) -> Vec<Value>;
}

fn with_fault(mut values: Vec<Value>, fault: Fault) -> Vec<Value> {
    values.push(Box::new(fault));
    values
}

impl<O, E> Returns for Result<O, E>
where
    O: Outputs,
    E: Error + Send + Sync + 'static,
{
    fn slots() -> Vec<TypeSlot> {
        let mut slots = O::slots();
        slots.push(TypeSlot::error());
        slots
    }

    fn keeps_outputs_on_failure() -> bool {
        O::slots().is_empty()
    }

    fn into_values(self) -> Vec<Value> {
        match self {
            Ok(outputs) => with_fault(outputs.into_values(), None),
            Err(error) => with_fault(Vec::new(), Some(Box::new(error) as BoxError)),
        }
    }
}

impl<O, E> Returns for (O, Result<(), E>)
where
    O: Outputs,
    E: Error + Send + Sync + 'static,
{
    fn slots() -> Vec<TypeSlot> {
        let mut slots = O::slots();
        slots.push(TypeSlot::error());
        slots
    }

    fn keeps_outputs_on_failure() -> bool {
        true
    }

    fn into_values(self) -> Vec<Value> {
        let (outputs, result) = self;
        let fault = result.err().map(|error| Box::new(error) as BoxError);
        with_fault(outputs.into_values(), fault)
    }
}

/// Conversion of a typed closure into a [`Func`].
///
/// `Marker` only distinguishes the implementations per closure arity and
/// is always inferred. Closure parameters need explicit types, e.g.
/// `|ctx: &Ctx, id: u64| -> Result<(), MyError> { .. }`.
pub trait IntoFunc<C, Marker> {
    fn into_func(self) -> Func<C>;
}

macro_rules! impl_into_func {
    ($($ty:ident $val:ident),*) => {
        impl<C, F, R, $($ty,)*> IntoFunc<C, fn(&C, $($ty,)*) -> R> for F
        where
            C: 'static,
            F: Fn(&C, $($ty,)*) -> R + Send + Sync + 'static,
            R: Returns,
            $($ty: Send + 'static,)*
        {
            fn into_func(self) -> Func<C> {
                let mut signature = Signature::new().param::<C>();
                for slot in <($($ty,)*) as Inputs>::slots() {
                    signature.push_param(slot);
                }
                for slot in R::slots() {
                    signature.push_return(slot);
                }
                if !R::keeps_outputs_on_failure() {
                    signature = signature.drops_outputs_on_failure();
                }
                let f = self;
                Func::dynamic(signature, move |ctx: &C, args: Vec<Value>| {
                    let ($($val,)*) = <($($ty,)*) as Inputs>::from_values(args)?;
                    Ok(f(ctx, $($val,)*).into_values())
                })
            }
        }
    };
}

impl_into_func!();
impl_into_func!(A a);
impl_into_func!(A a, B b);
impl_into_func!(A a, B b, D d);
