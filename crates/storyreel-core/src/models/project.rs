use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;
use validator::Validate;

use super::timestamp;

/// Lifecycle label of a project as reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    ProcessingScript,
    Processing,
    ScenesReady,
    GeneratingImages,
    ImagesReady,
    Animating,
    CreatingVideo,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl Display for ProjectStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::ProcessingScript => "processing_script",
            ProjectStatus::Processing => "processing",
            ProjectStatus::ScenesReady => "scenes_ready",
            ProjectStatus::GeneratingImages => "generating_images",
            ProjectStatus::ImagesReady => "images_ready",
            ProjectStatus::Animating => "animating",
            ProjectStatus::CreatingVideo => "creating_video",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Failed => "failed",
            ProjectStatus::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// One generation job. Owned by the remote service; read-only on the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original_script: Option<String>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub duration_target: Option<u32>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::option::deserialize")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Script text if present and not blank.
    pub fn script(&self) -> Option<&str> {
        self.original_script
            .as_deref()
            .filter(|script| !script.trim().is_empty())
    }
}

/// Body of `POST /projects/`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(length(min = 10))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[validate(range(min = 1, max = 600))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_target: Option<u32>,
}
