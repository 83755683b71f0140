use std::sync::atomic::{AtomicU64, Ordering};

use saga_log::ExecutionId;
use uuid::Uuid;

/// Source of execution identifiers, one per saga instance.
pub trait IdGenerator {
    /// Returns an id not handed out before by this generator.
    fn next_id(&self) -> ExecutionId;
}

/// Random version 4 UUIDs rendered without hyphens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> ExecutionId {
        ExecutionId::new(Uuid::new_v4().simple().to_string())
    }
}

/// Deterministic `<prefix>-<n>` identifiers, counting from 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    /// Generator whose first id is `<prefix>-1`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> ExecutionId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        ExecutionId::new(format!("{}-{n}", self.prefix))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn uuid_ids_are_distinct() {
        let ids: HashSet<ExecutionId> = (0..100).map(|_| UuidGenerator.next_id()).collect();

        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn uuid_ids_are_alphanumeric() {
        let id = UuidGenerator.next_id();

        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("test");

        assert_eq!(ids.next_id().as_str(), "test-1");
        assert_eq!(ids.next_id().as_str(), "test-2");
    }
}
