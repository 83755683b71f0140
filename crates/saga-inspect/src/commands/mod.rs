mod list;
mod show;

use clap::Subcommand;
use saga_log::{LogStore, SagaAuditLog};

use crate::error::Result;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List recorded executions with their final state
    List,
    /// Show the event stream and step summary of one execution
    Show {
        /// Execution id as printed by `list`
        execution_id: String,

        /// Print the raw events as a JSON array instead
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    pub(crate) fn execute<S: LogStore>(self, store: &S) -> Result<()> {
        match self {
            Self::List => list::run(store),
            Self::Show { execution_id, json } => show::run(store, execution_id.into(), json),
        }
    }
}

/// Where a replayed execution stands.
fn status(audit: &SagaAuditLog) -> &'static str {
    match (audit.is_aborted(), audit.is_complete()) {
        (false, true) => "completed",
        (true, true) => "compensated",
        (true, false) => "aborting",
        (false, false) => "running",
    }
}
