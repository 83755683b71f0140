use saga_log::{ExecutionId, LogStore, SagaAuditLog};
use tracing::warn;

use crate::error::Result;

struct ExecutionRow {
    id: ExecutionId,
    saga: String,
    status: &'static str,
    steps: usize,
}

pub(crate) fn run<S: LogStore>(store: &S) -> Result<()> {
    let mut rows = Vec::new();
    for id in store.execution_ids()? {
        let events = store.get_all_logs_by_execution_id(&id)?;
        let row = match SagaAuditLog::from_events(&events) {
            Ok(audit) => ExecutionRow {
                saga: audit.saga_name().to_string(),
                status: super::status(&audit),
                steps: audit.records().len(),
                id,
            },
            Err(err) => {
                warn!(execution_id = %id, error = %err, "cannot replay execution");
                ExecutionRow {
                    saga: events
                        .first()
                        .map(|e| e.saga_name.clone())
                        .unwrap_or_default(),
                    status: "inconsistent",
                    steps: 0,
                    id,
                }
            }
        };
        rows.push(row);
    }

    print_rows(&rows);
    Ok(())
}

fn print_rows(rows: &[ExecutionRow]) {
    if rows.is_empty() {
        println!("No executions recorded.");
        return;
    }

    println!("Executions: {}", rows.len());
    println!();
    for row in rows {
        println!(
            "  {}  {}  {} ({} step(s))",
            row.id, row.saga, row.status, row.steps
        );
    }
}
