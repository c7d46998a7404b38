//! Stage implementations, one `impl WorkflowSession` block per stage.

mod analysis;
mod animation;
mod images;
