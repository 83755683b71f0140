//! Append-only event log for saga executions.
//!
//! Every state transition of a saga run is recorded as a [`LogEvent`]
//! keyed by the run's [`ExecutionId`]. Stores implement [`LogStore`]; two
//! reference backends are provided, one in memory and one backed by a
//! JSON-lines file. [`SagaAuditLog`] replays a stored stream into a
//! per-step view.

mod audit;
mod error;
mod event;
mod file;
mod memory;
mod store;

pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use error::{AuditError, LogStoreError, Result};
pub use event::{ExecutionId, LogEvent, LogKind};
pub use file::JsonLinesLogStore;
pub use memory::MemoryLogStore;
pub use store::LogStore;
