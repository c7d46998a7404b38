use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    Pending,
    ImageReady,
    Animating,
    VideoReady,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// The backend may send `"status": null`; that reads as `Unknown`.
fn status_or_unknown<'de, D>(deserializer: D) -> Result<SceneStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<SceneStatus>::deserialize(deserializer)?.unwrap_or_default())
}

impl Display for SceneStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            SceneStatus::Pending => "pending",
            SceneStatus::ImageReady => "image_ready",
            SceneStatus::Animating => "animating",
            SceneStatus::VideoReady => "video_ready",
            SceneStatus::Failed => "failed",
            SceneStatus::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// Ordered narrative unit of a project, produced by script analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: Uuid,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    pub order: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "status_or_unknown")]
    pub status: SceneStatus,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_status: Option<String>,
    #[serde(default)]
    pub video_provider: Option<String>,
}

impl Scene {
    pub fn is_video_ready(&self) -> bool {
        self.status == SceneStatus::VideoReady
    }
}

/// Sort scenes by order index. Returns the order values that occur more than once.
pub fn sort_by_order(scenes: &mut [Scene]) -> Vec<i32> {
    scenes.sort_by_key(|scene| scene.order);
    let mut seen = HashSet::new();
    let mut duplicates: Vec<i32> = scenes
        .iter()
        .filter(|scene| !seen.insert(scene.order))
        .map(|scene| scene.order)
        .collect();
    duplicates.dedup();
    duplicates
}

/// Count of scenes whose video is ready.
pub fn count_video_ready(scenes: &[Scene]) -> usize {
    scenes.iter().filter(|scene| scene.is_video_ready()).count()
}
