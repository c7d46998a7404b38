use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use super::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    Video,
    Audio,
    Document,
    #[serde(other)]
    Unknown,
}

impl Display for AssetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssetType::Image => write!(f, "image"),
            AssetType::Video => write!(f, "video"),
            AssetType::Audio => write!(f, "audio"),
            AssetType::Document => write!(f, "document"),
            AssetType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Generated artifact tied to a scene. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub scene_id: Uuid,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub url: String,
    pub status: String,
    #[serde(default)]
    pub scene_order: Option<i32>,
    #[serde(default)]
    pub scene_title: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn is_image(&self) -> bool {
        self.asset_type == AssetType::Image
    }

    /// Local file name used when downloading, e.g. `escena_3_apertura.png`.
    pub fn download_file_name(&self) -> String {
        let extension = self
            .url
            .rsplit('/')
            .next()
            .and_then(|segment| segment.split('?').next())
            .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_string()))
            .filter(|ext| !ext.is_empty() && ext.len() <= 5)
            .unwrap_or_else(|| match self.asset_type {
                AssetType::Video => "mp4".to_string(),
                _ => "png".to_string(),
            });

        let title: String = self
            .scene_title
            .as_deref()
            .unwrap_or(match self.asset_type {
                AssetType::Video => "video",
                _ => "imagen",
            })
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();

        format!(
            "escena_{}_{}.{}",
            self.scene_order.unwrap_or_default(),
            title,
            extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset(asset_type: &str, url: &str, title: Option<&str>) -> Asset {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "scene_id": Uuid::new_v4(),
            "type": asset_type,
            "url": url,
            "status": "completed",
            "scene_order": 2,
            "scene_title": title,
            "metadata": null,
            "created_at": "2025-03-01T10:00:00"
        }))
        .unwrap()
    }

    #[test]
    fn test_asset_type_tag() {
        assert!(asset("image", "https://cdn.test/a.png", None).is_image());
        assert!(!asset("video", "https://cdn.test/a.mp4", None).is_image());
        assert_eq!(
            asset("hologram", "https://cdn.test/a", None).asset_type,
            AssetType::Unknown
        );
    }

    #[test]
    fn test_download_file_name() {
        let image = asset("image", "https://cdn.test/img/abc.jpg?token=1", Some("Gran Final"));
        assert_eq!(image.download_file_name(), "escena_2_gran_final.jpg");

        let video = asset("video", "https://cdn.test/stream", None);
        assert_eq!(video.download_file_name(), "escena_2_video.mp4");
    }
}
