use saga_log::{AuditError, ExecutionId, LogStoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no log file given, pass --log or set SAGA_LOG_FILE")]
    MissingLogFile,

    #[error("failed to read saga log")]
    Store(#[from] LogStoreError),

    #[error("history of execution '{execution_id}' is inconsistent")]
    Audit {
        execution_id: ExecutionId,
        #[source]
        source: AuditError,
    },

    #[error("failed to encode events as JSON")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
