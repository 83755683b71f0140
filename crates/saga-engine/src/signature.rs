use std::any::{Any, TypeId, type_name};
use std::fmt;

use crate::error::BoxError;

/// A type-erased argument or return value.
pub type Value = Box<dyn Any + Send>;

/// Value occupying the trailing error slot of an action's returns.
///
/// `None` means the action succeeded.
pub type Fault = Option<BoxError>;

/// Runtime description of one parameter or return position.
#[derive(Clone, Copy)]
pub struct TypeSlot {
    id: TypeId,
    name: &'static str,
}

impl TypeSlot {
    /// Slot holding values of type `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The slot an action uses to report failure.
    #[must_use]
    pub fn error() -> Self {
        Self::of::<Fault>()
    }

    /// Identity used to compare slots.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Type name for messages. Not guaranteed to be stable.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is the [`TypeSlot::error`] slot.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.id == TypeId::of::<Fault>()
    }

    /// Whether `value` holds exactly this slot's type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        (**value).type_id() == self.id
    }
}

impl PartialEq for TypeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeSlot {}

impl fmt::Debug for TypeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Declared parameters and returns of an action.
///
/// For a well-formed action the first parameter is the saga context and the
/// last return is [`TypeSlot::error`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<TypeSlot>,
    returns: Vec<TypeSlot>,
    drops_outputs: bool,
}

impl Signature {
    /// Empty signature: no parameters, no returns, outputs kept on failure.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter of type `T`.
    #[must_use]
    pub fn param<T: Any>(mut self) -> Self {
        self.params.push(TypeSlot::of::<T>());
        self
    }

    /// Appends a return value of type `T`.
    #[must_use]
    pub fn returns<T: Any>(mut self) -> Self {
        self.returns.push(TypeSlot::of::<T>());
        self
    }

    /// Appends the trailing error slot.
    #[must_use]
    pub fn returns_error(mut self) -> Self {
        self.returns.push(TypeSlot::error());
        self
    }

    /// Declares that the action returns only the error slot when it fails,
    /// leaving its compensation without the output values.
    ///
    /// Typed actions returning `Result<O, E>` with a non-empty `O` carry
    /// this flag; `(O, Result<(), E>)` does not.
    #[must_use]
    pub fn drops_outputs_on_failure(mut self) -> Self {
        self.drops_outputs = true;
        self
    }

    pub(crate) fn push_param(&mut self, slot: TypeSlot) {
        self.params.push(slot);
    }

    pub(crate) fn push_return(&mut self, slot: TypeSlot) {
        self.returns.push(slot);
    }

    #[must_use]
    pub fn params(&self) -> &[TypeSlot] {
        &self.params
    }

    #[must_use]
    pub fn return_slots(&self) -> &[TypeSlot] {
        &self.returns
    }

    /// Whether the output values are still returned when the action fails.
    #[must_use]
    pub fn keeps_outputs_on_failure(&self) -> bool {
        !self.drops_outputs
    }

    /// Parameters following the context.
    #[must_use]
    pub fn extra_params(&self) -> &[TypeSlot] {
        self.params.get(1..).unwrap_or_default()
    }

    /// Whether the last return is the error slot.
    #[must_use]
    pub fn ends_with_error(&self) -> bool {
        self.returns.last().is_some_and(TypeSlot::is_error)
    }

    /// Returns preceding the trailing error slot.
    #[must_use]
    pub fn output_slots(&self) -> &[TypeSlot] {
        if self.ends_with_error() {
            &self.returns[..self.returns.len() - 1]
        } else {
            &self.returns
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx;

    #[test]
    fn slots_compare_by_type() {
        assert_eq!(TypeSlot::of::<u32>(), TypeSlot::of::<u32>());
        assert_ne!(TypeSlot::of::<u32>(), TypeSlot::of::<i32>());
        assert!(TypeSlot::error().is_error());
        assert!(!TypeSlot::of::<String>().is_error());
    }

    #[test]
    fn accepts_checks_the_boxed_type() {
        let value: Value = Box::new(String::from("order-7"));

        assert!(TypeSlot::of::<String>().accepts(&value));
        assert!(!TypeSlot::of::<&str>().accepts(&value));
    }

    #[test]
    fn output_slots_exclude_trailing_error() {
        let signature = Signature::new()
            .param::<Ctx>()
            .returns::<u64>()
            .returns::<String>()
            .returns_error();

        assert!(signature.ends_with_error());
        assert_eq!(
            signature.output_slots(),
            &[TypeSlot::of::<u64>(), TypeSlot::of::<String>()]
        );
    }

    #[test]
    fn output_slots_without_error_are_all_returns() {
        let signature = Signature::new().param::<Ctx>().returns::<u64>();

        assert!(!signature.ends_with_error());
        assert_eq!(signature.output_slots().len(), 1);
    }

    #[test]
    fn outputs_are_kept_on_failure_unless_declared_otherwise() {
        let kept = Signature::new().param::<Ctx>().returns::<u64>().returns_error();
        let dropped = kept.clone().drops_outputs_on_failure();

        assert!(kept.keeps_outputs_on_failure());
        assert!(!dropped.keeps_outputs_on_failure());
        assert_ne!(kept, dropped);
    }

    #[test]
    fn extra_params_skip_context() {
        let signature = Signature::new().param::<Ctx>().param::<u64>();
        let empty = Signature::new();

        assert_eq!(signature.extra_params(), &[TypeSlot::of::<u64>()]);
        assert!(empty.extra_params().is_empty());
    }
}
