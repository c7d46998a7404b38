//! Generation workflow orchestrator.
//!
//! A [`WorkflowSession`] drives one project through three remotely executed
//! stages: script analysis, image generation over an event stream, and scene
//! animation with status polling. Progress and errors are published on a
//! watch channel; cached project state is refreshed after every stage.

pub mod poller;
pub mod session;
mod stages;

pub use poller::{PollOutcome, PollProbe, Poller};
pub use session::{ReloadScope, StageReport, WorkflowSession, WorkflowSnapshot};
