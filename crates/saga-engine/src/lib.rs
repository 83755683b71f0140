//! Saga pattern orchestrator.
//!
//! A [`Saga`] is an ordered list of steps, each pairing a forward action
//! with a compensating action. Playing it through a [`Coordinator`] runs
//! the forward actions in order; when one fails, the compensating actions
//! of every executed step, the failing one included, run in reverse order.
//! Each compensation receives the values its forward action returned.
//! Every transition is appended to a [`LogStore`](saga_log::LogStore).
//!
//! ```
//! use saga_engine::{Coordinator, Saga, Step};
//! use saga_log::MemoryLogStore;
//!
//! struct Ctx;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("{0}")]
//! struct BookingError(String);
//!
//! let mut saga = Saga::new("trip");
//! saga.add_step(Step::from_fns(
//!     "book_hotel",
//!     |_ctx: &Ctx| -> Result<(u32,), BookingError> { Ok((7,)) },
//!     |_ctx: &Ctx, _booking: u32| -> Result<(), BookingError> { Ok(()) },
//! ))?;
//! saga.add_step(Step::from_fns(
//!     "book_flight",
//!     |_ctx: &Ctx| -> Result<(), BookingError> { Err(BookingError("sold out".into())) },
//!     |_ctx: &Ctx| -> Result<(), BookingError> { Ok(()) },
//! ))?;
//!
//! let outcome = Coordinator::new(Ctx, saga, MemoryLogStore::new()).play();
//!
//! assert_eq!(outcome.failed_step.as_deref(), Some("book_flight"));
//! assert!(outcome.compensation_errors.is_empty());
//! # Ok::<(), saga_engine::RegistrationError>(())
//! ```

mod action;
mod coordinator;
mod error;
mod id;
mod invoke;
mod outcome;
mod saga;
mod signature;
mod step;

pub use action::{Action, Func, Inputs, IntoFunc, Outputs, Returns};
pub use coordinator::Coordinator;
pub use error::{ActionRole, BoxError, CompensationError, DispatchError, RegistrationError, SagaError};
pub use id::{IdGenerator, SequentialIds, UuidGenerator};
pub use outcome::Outcome;
pub use saga::{Saga, SagaOptions, SagaState};
pub use signature::{Fault, Signature, TypeSlot, Value};
pub use step::{Step, StepOptions};
