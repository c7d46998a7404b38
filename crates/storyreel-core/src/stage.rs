//! Workflow stages and the per-session state union.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// One of the three user-triggered pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AnalyzingScript,
    GeneratingImages,
    AnimatingScenes,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Stage::AnalyzingScript => write!(f, "analyzing_script"),
            Stage::GeneratingImages => write!(f, "generating_images"),
            Stage::AnimatingScenes => write!(f, "animating_scenes"),
        }
    }
}

/// Overall workflow state of a session. At most one stage runs at a time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    AnalyzingScript,
    GeneratingImages,
    AnimatingScenes,
}

impl WorkflowState {
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::AnalyzingScript => WorkflowState::AnalyzingScript,
            Stage::GeneratingImages => WorkflowState::GeneratingImages,
            Stage::AnimatingScenes => WorkflowState::AnimatingScenes,
        }
    }

    /// The stage currently running, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WorkflowState::Idle => None,
            WorkflowState::AnalyzingScript => Some(Stage::AnalyzingScript),
            WorkflowState::GeneratingImages => Some(Stage::GeneratingImages),
            WorkflowState::AnimatingScenes => Some(Stage::AnimatingScenes),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, WorkflowState::Idle)
    }
}

impl Display for WorkflowState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.stage() {
            Some(stage) => stage.fmt(f),
            None => write!(f, "idle"),
        }
    }
}
