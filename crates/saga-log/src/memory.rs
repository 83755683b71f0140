use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{LogStoreError, Result};
use crate::event::{ExecutionId, LogEvent};
use crate::store::LogStore;

#[derive(Debug, Default)]
struct Entries {
    order: Vec<ExecutionId>,
    by_id: HashMap<ExecutionId, Vec<LogEvent>>,
}

/// Process-local [`LogStore`] keeping every event in memory.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    entries: RwLock<Entries>,
}

impl MemoryLogStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all executions.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::Poisoned`] if a writer panicked.
    pub fn len(&self) -> Result<usize> {
        let entries = self.entries.read().map_err(|_| LogStoreError::Poisoned)?;
        Ok(entries.by_id.values().map(Vec::len).sum())
    }

    /// # Errors
    ///
    /// Returns [`LogStoreError::Poisoned`] if a writer panicked.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl LogStore for MemoryLogStore {
    fn append_log(&self, event: &LogEvent) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| LogStoreError::Poisoned)?;
        let Entries { order, by_id } = &mut *entries;
        by_id
            .entry(event.execution_id.clone())
            .or_insert_with(|| {
                order.push(event.execution_id.clone());
                Vec::new()
            })
            .push(event.clone());
        Ok(())
    }

    fn get_all_logs_by_execution_id(&self, id: &ExecutionId) -> Result<Vec<LogEvent>> {
        let entries = self.entries.read().map_err(|_| LogStoreError::Poisoned)?;
        entries
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| LogStoreError::NotFound(id.clone()))
    }

    fn execution_ids(&self) -> Result<Vec<ExecutionId>> {
        let entries = self.entries.read().map_err(|_| LogStoreError::Poisoned)?;
        Ok(entries.order.clone())
    }
}
