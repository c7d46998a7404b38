use storyreel_core::{ErrorMetadata, WorkflowError};
use storyreel_workflow::WorkflowSnapshot;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// One stderr line for a progress snapshot, or `None` when there is nothing
/// to show. The persistent error is rendered separately by the caller.
pub fn progress_line(snapshot: &WorkflowSnapshot) -> Option<String> {
    if snapshot.progress.message.is_empty() {
        return None;
    }
    Some(format!(
        "[{:>5.1}%] {}",
        snapshot.progress.percent, snapshot.progress.message
    ))
}

/// Lines printed for a failed command: the `Error: ...` line, then the
/// suggested action when the error carries one.
pub fn failure_lines(err: &anyhow::Error) -> Vec<String> {
    match err.downcast_ref::<WorkflowError>() {
        Some(workflow) => {
            let message = workflow.client_message();
            let mut lines = vec![if message.starts_with("Error") {
                message
            } else {
                format!("Error: {}", message)
            }];
            if let Some(action) = workflow.suggested_action() {
                lines.push(format!("Hint: {}", action));
            }
            lines
        }
        None => vec![format!("Error: {:#}", err)],
    }
}

/// Initialize tracing for the CLI. `STORYREEL_LOG_FORMAT=json` switches to
/// JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("STORYREEL_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
