//! Error types module
//!
//! All failures a stage invocation can end with are unified under
//! [`WorkflowError`]. Every variant is terminal for the current invocation;
//! the user re-triggers the stage manually. [`ErrorMetadata`] describes how an
//! error is surfaced: a transient one-line message, or a persistent error that
//! stays visible until dismissed.

use crate::stage::Stage;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for conditions the user has to act on
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// How an error is presented to the observer of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// One-line progress message, may be overwritten by the next event.
    Transient,
    /// Distinct error state that survives until dismissed.
    Persistent,
}

/// Metadata for surfacing errors - lets each error self-describe its presentation
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "REMOTE_REJECTION")
    fn error_code(&self) -> &'static str;

    /// Transient message or persistent error
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error was reported through a blocking alert
    fn is_alert(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Structured error codes the backend attaches to generation events.
pub const QUOTA_EXHAUSTED_CODE: &str = "quota_exhausted";
pub const NO_CREDITS_CODE: &str = "no_credits";

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Missing required input; never reaches the network.
    #[error("{0}")]
    Validation(String),

    /// Non-success HTTP status from the remote service.
    #[error("Error: {detail}")]
    RemoteRejection { status: u16, detail: String },

    /// Connection or stream level failure.
    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    QuotaExhausted(String),

    #[error("{0}")]
    NoCredits(String),

    /// Unrecoverable failure reported by the generation stream.
    #[error("{0}")]
    GenerationFailed(String),

    /// Image stage finished without producing a single image.
    #[error("{0}")]
    NothingGenerated(String),

    /// Animation polling ceiling reached.
    #[error("{0}")]
    Timeout(String),

    #[error("Stage {0} cancelled")]
    Cancelled(Stage),

    #[error("Stage {running} is already running")]
    StageBusy { running: Stage },
}

impl WorkflowError {
    /// Classify a backend-signaled fatal error by its structured code.
    pub fn from_generation_code(code: Option<&str>, message: String) -> Self {
        match code {
            Some(QUOTA_EXHAUSTED_CODE) => WorkflowError::QuotaExhausted(message),
            Some(NO_CREDITS_CODE) => WorkflowError::NoCredits(message),
            _ => WorkflowError::GenerationFailed(message),
        }
    }
}

/// Returns true when a structured backend code requires user action
/// (the scene error is escalated to a persistent error).
pub fn is_escalating_code(code: Option<&str>) -> bool {
    matches!(code, Some(QUOTA_EXHAUSTED_CODE) | Some(NO_CREDITS_CODE))
}

/// Static metadata for each variant: (error_code, severity, alert, suggested_action, log_level).
fn workflow_error_static_metadata(
    err: &WorkflowError,
) -> (
    &'static str,
    ErrorSeverity,
    bool,
    Option<&'static str>,
    LogLevel,
) {
    match err {
        WorkflowError::Validation(_) => (
            "VALIDATION_ERROR",
            ErrorSeverity::Transient,
            false,
            Some("Provide the missing input and try again"),
            LogLevel::Debug,
        ),
        WorkflowError::RemoteRejection { .. } => (
            "REMOTE_REJECTION",
            ErrorSeverity::Transient,
            true,
            Some("Check the request and re-run the stage"),
            LogLevel::Warn,
        ),
        WorkflowError::Transport(_) => (
            "TRANSPORT_FAILURE",
            ErrorSeverity::Persistent,
            false,
            Some("Verify the backend is running and reachable"),
            LogLevel::Error,
        ),
        WorkflowError::QuotaExhausted(_) => (
            "QUOTA_EXHAUSTED",
            ErrorSeverity::Persistent,
            false,
            Some("Wait for the provider quota to reset or switch provider"),
            LogLevel::Warn,
        ),
        WorkflowError::NoCredits(_) => (
            "NO_CREDITS",
            ErrorSeverity::Persistent,
            false,
            Some("Top up provider credits or switch provider"),
            LogLevel::Warn,
        ),
        WorkflowError::GenerationFailed(_) => (
            "GENERATION_FAILED",
            ErrorSeverity::Persistent,
            false,
            Some("Re-run the stage"),
            LogLevel::Error,
        ),
        WorkflowError::NothingGenerated(_) => (
            "NOTHING_GENERATED",
            ErrorSeverity::Persistent,
            false,
            Some("Try a different provider"),
            LogLevel::Warn,
        ),
        WorkflowError::Timeout(_) => (
            "TIMEOUT",
            ErrorSeverity::Transient,
            false,
            Some("Check the project status manually"),
            LogLevel::Warn,
        ),
        WorkflowError::Cancelled(_) => (
            "CANCELLED",
            ErrorSeverity::Transient,
            false,
            None,
            LogLevel::Debug,
        ),
        WorkflowError::StageBusy { .. } => (
            "STAGE_BUSY",
            ErrorSeverity::Transient,
            false,
            Some("Wait for the running stage to finish"),
            LogLevel::Debug,
        ),
    }
}

impl ErrorMetadata for WorkflowError {
    fn error_code(&self) -> &'static str {
        workflow_error_static_metadata(self).0
    }

    fn severity(&self) -> ErrorSeverity {
        workflow_error_static_metadata(self).1
    }

    fn is_alert(&self) -> bool {
        workflow_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        workflow_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        workflow_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_rejection_renders_alert_text() {
        let err = WorkflowError::RemoteRejection {
            status: 402,
            detail: "No credits".to_string(),
        };
        assert_eq!(err.client_message(), "Error: No credits");
        assert!(err.is_alert());
        assert_eq!(err.error_code(), "REMOTE_REJECTION");
        assert_eq!(err.severity(), ErrorSeverity::Transient);
    }

    #[test]
    fn test_generation_code_classification() {
        let err = WorkflowError::from_generation_code(
            Some("quota_exhausted"),
            "Quota agotada".to_string(),
        );
        assert!(matches!(err, WorkflowError::QuotaExhausted(_)));
        assert_eq!(err.severity(), ErrorSeverity::Persistent);

        let err = WorkflowError::from_generation_code(Some("no_credits"), "Sin créditos".into());
        assert!(matches!(err, WorkflowError::NoCredits(_)));

        let err = WorkflowError::from_generation_code(Some("other"), "boom".into());
        assert!(matches!(err, WorkflowError::GenerationFailed(_)));
        let err = WorkflowError::from_generation_code(None, "boom".into());
        assert!(matches!(err, WorkflowError::GenerationFailed(_)));
    }

    #[test]
    fn test_escalating_codes() {
        assert!(is_escalating_code(Some("quota_exhausted")));
        assert!(is_escalating_code(Some("no_credits")));
        assert!(!is_escalating_code(Some("rate_limited")));
        assert!(!is_escalating_code(None));
    }

    #[test]
    fn test_validation_is_inline_and_quiet() {
        let err = WorkflowError::Validation("No hay guión para analizar".to_string());
        assert!(!err.is_alert());
        assert_eq!(err.severity(), ErrorSeverity::Transient);
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert_eq!(err.client_message(), "No hay guión para analizar");
    }

    #[test]
    fn test_stage_busy_message() {
        let err = WorkflowError::StageBusy {
            running: Stage::AnimatingScenes,
        };
        assert_eq!(err.to_string(), "Stage animating_scenes is already running");
        assert_eq!(
            err.suggested_action(),
            Some("Wait for the running stage to finish")
        );
    }
}
