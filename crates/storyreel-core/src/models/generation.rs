//! Request and response bodies of the generation endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeScriptRequest {
    pub project_id: Uuid,
    pub script: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeScriptResponse {
    pub total_scenes: u32,
    #[serde(default)]
    pub estimated_duration: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// One scene animation task accepted by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationTask {
    pub scene_id: Uuid,
    #[serde(default)]
    pub scene_title: Option<String>,
    pub task_id: String,
    pub provider: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimateScenesResponse {
    #[serde(default)]
    pub tasks: Vec<AnimationTask>,
    #[serde(default)]
    pub total_scenes: Option<u32>,
    #[serde(default)]
    pub animated: Option<u32>,
    #[serde(default)]
    pub failed: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Capabilities of a video provider (`GET /generation/video-providers`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoProviderInfo {
    pub name: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub max_duration: Option<f64>,
    #[serde(default)]
    pub resolutions: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Structured error body returned with non-success statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorPayload {
    /// Human-readable detail from an error body, when it carries one.
    /// Non-string details (validation error lists) are rendered as JSON.
    pub fn extract_detail(body: &str) -> Option<String> {
        let payload: ErrorPayload = serde_json::from_str(body).ok()?;
        match payload.detail? {
            serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail),
            serde_json::Value::String(_) | serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
