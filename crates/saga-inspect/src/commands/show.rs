use saga_log::{ExecutionId, LogEvent, LogStore, SagaAuditLog};

use crate::error::{CliError, Result};

pub(crate) fn run<S: LogStore>(store: &S, execution_id: ExecutionId, json: bool) -> Result<()> {
    let events = store.get_all_logs_by_execution_id(&execution_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    print_events(&execution_id, &events);
    let audit = SagaAuditLog::from_events(&events).map_err(|source| CliError::Audit {
        execution_id,
        source,
    })?;
    print_summary(&audit);
    Ok(())
}

fn print_events(execution_id: &ExecutionId, events: &[LogEvent]) {
    println!("Execution: {execution_id}");
    if let Some(first) = events.first() {
        println!("Saga: {}", first.saga_name);
    }
    println!();
    println!("Events:");
    for event in events {
        println!("  {}  {}", event.timestamp.to_rfc3339(), describe(event));
    }
}

fn describe(event: &LogEvent) -> String {
    match (event.step_index, &event.step_name, event.compensations) {
        (Some(index), Some(name), _) => format!("{} #{index} {name}", event.kind),
        (_, _, Some(count)) => format!("{} compensations={count}", event.kind),
        _ => event.kind.to_string(),
    }
}

fn print_summary(audit: &SagaAuditLog) {
    println!();
    println!("Status: {}", super::status(audit));
    if let Some(index) = audit.failed_step() {
        let name = audit
            .records()
            .get(index)
            .map_or("<unknown>", |record| record.name.as_str());
        println!("Failed step: {name}");
    }
    if audit.records().is_empty() {
        return;
    }
    println!();
    println!("Steps:");
    for line in audit.summary().lines() {
        println!("  {line}");
    }
}
