use std::sync::Arc;

use crate::Result;
use crate::event::{ExecutionId, LogEvent};

/// Durable, queryable, append-only store of saga events.
///
/// Appends for the same execution must be kept in call order. Stores are
/// shared between concurrently running sagas, so implementations need
/// interior synchronization.
pub trait LogStore: Send + Sync {
    /// Records one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be persisted.
    fn append_log(&self, event: &LogEvent) -> Result<()>;

    /// Returns every event of one execution in append order.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::NotFound`](crate::LogStoreError::NotFound)
    /// if nothing was ever appended for `id`, or a backend error if the
    /// store cannot be read.
    fn get_all_logs_by_execution_id(&self, id: &ExecutionId) -> Result<Vec<LogEvent>>;

    /// Returns the distinct execution ids in order of first appearance.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn execution_ids(&self) -> Result<Vec<ExecutionId>>;
}

impl<S: LogStore + ?Sized> LogStore for &S {
    fn append_log(&self, event: &LogEvent) -> Result<()> {
        (**self).append_log(event)
    }

    fn get_all_logs_by_execution_id(&self, id: &ExecutionId) -> Result<Vec<LogEvent>> {
        (**self).get_all_logs_by_execution_id(id)
    }

    fn execution_ids(&self) -> Result<Vec<ExecutionId>> {
        (**self).execution_ids()
    }
}

impl<S: LogStore + ?Sized> LogStore for Arc<S> {
    fn append_log(&self, event: &LogEvent) -> Result<()> {
        (**self).append_log(event)
    }

    fn get_all_logs_by_execution_id(&self, id: &ExecutionId) -> Result<Vec<LogEvent>> {
        (**self).get_all_logs_by_execution_id(id)
    }

    fn execution_ids(&self) -> Result<Vec<ExecutionId>> {
        (**self).execution_ids()
    }
}

impl<S: LogStore + ?Sized> LogStore for Box<S> {
    fn append_log(&self, event: &LogEvent) -> Result<()> {
        (**self).append_log(event)
    }

    fn get_all_logs_by_execution_id(&self, id: &ExecutionId) -> Result<Vec<LogEvent>> {
        (**self).get_all_logs_by_execution_id(id)
    }

    fn execution_ids(&self) -> Result<Vec<ExecutionId>> {
        (**self).execution_ids()
    }
}
