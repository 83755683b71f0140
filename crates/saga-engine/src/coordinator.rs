use saga_log::{ExecutionId, LogStore};

use crate::outcome::Outcome;
use crate::saga::Saga;

/// Binds a saga to the context its actions receive and the store its
/// history is written to.
///
/// The context is the run's cancellation scope: the engine never
/// interrupts an action, so actions observe cancellation through it.
pub struct Coordinator<C, S> {
    context: C,
    saga: Saga<C>,
    store: S,
}

impl<C, S> Coordinator<C, S>
where
    S: LogStore,
{
    /// Binds `saga` to the `context` passed to every action and the
    /// `store` receiving its events.
    pub fn new(context: C, saga: Saga<C>, store: S) -> Self {
        Self {
            context,
            saga,
            store,
        }
    }

    /// Id under which the run's events are recorded.
    #[must_use]
    pub fn execution_id(&self) -> &ExecutionId {
        self.saga.execution_id()
    }

    /// The saga as registered, not yet played.
    #[must_use]
    pub fn saga(&self) -> &Saga<C> {
        &self.saga
    }

    /// Plays the saga to completion or full compensation.
    ///
    /// Consumes the coordinator: a saga runs at most once.
    pub fn play(self) -> Outcome {
        let Self {
            context,
            saga,
            store,
        } = self;
        saga.play(&context, &store)
    }
}
