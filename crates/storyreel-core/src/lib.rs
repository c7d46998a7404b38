//! Storyreel Core Library
//!
//! Domain models, the workflow error taxonomy, configuration and the
//! progress arithmetic shared by the API client, the orchestrator and the CLI.

pub mod config;
pub mod error;
pub mod models;
pub mod progress;
pub mod stage;

// Re-export commonly used types
pub use config::{ClientConfig, StreamFailurePolicy, WorkflowConfig};
pub use error::{ErrorMetadata, ErrorSeverity, LogLevel, WorkflowError};
pub use progress::WorkflowProgress;
pub use stage::{Stage, WorkflowState};
