//! Progress model of a stage invocation.
//!
//! Percentages of the image stream are mapped into the 5-90 band (`progress`)
//! and the 10-95 band (`scene_complete`), reserving the head and tail for
//! setup and teardown.

use serde::{Deserialize, Serialize};

pub const IMAGE_PROGRESS_FLOOR: f64 = 5.0;
pub const IMAGE_PROGRESS_BAND: f64 = 85.0;
pub const SCENE_COMPLETE_FLOOR: f64 = 10.0;
pub const COMPLETE: f64 = 100.0;

/// `n / total` clamped to `[0, 1]`; zero when total is zero.
fn fraction(n: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (n / total).clamp(0.0, 1.0)
}

/// Percentage for a `progress` event: `(current/total) * 85 + 5`, within `[5, 90]`.
pub fn image_progress_percent(current: u32, total: u32) -> f64 {
    fraction(current as f64, total as f64) * IMAGE_PROGRESS_BAND + IMAGE_PROGRESS_FLOOR
}

/// Percentage for a `scene_complete` event: `(scene/total) * 85 + 10`, within `[10, 95]`.
pub fn scene_complete_percent(scene: u32, total: u32) -> f64 {
    fraction(scene as f64, total as f64) * IMAGE_PROGRESS_BAND + SCENE_COMPLETE_FLOOR
}

/// Percentage of scenes whose animation is ready.
pub fn animation_percent(ready: usize, total: usize) -> f64 {
    fraction(ready as f64, total as f64) * COMPLETE
}

/// Observable progress of the running stage. The percentage never decreases
/// within one invocation.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowProgress {
    /// 0..=100
    pub percent: f64,
    pub message: String,
    /// Persistent, user-actionable error
    pub error: Option<String>,
}

impl WorkflowProgress {
    /// Move to `percent` unless it would go backwards. Returns the new value.
    pub fn advance(&mut self, percent: f64) -> f64 {
        if percent.is_finite() {
            self.percent = self.percent.max(percent.clamp(0.0, COMPLETE));
        }
        self.percent
    }

    /// Start of a stage invocation: everything is reset, the persistent
    /// error included.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Clears percent and message. The persistent error is kept.
    pub fn clear(&mut self) {
        self.percent = 0.0;
        self.message.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_progress_examples() {
        assert_eq!(image_progress_percent(1, 4), 26.25);
        assert_eq!(image_progress_percent(4, 4), 90.0);
        assert_eq!(image_progress_percent(0, 4), 5.0);
    }

    #[test]
    fn test_image_progress_stays_in_band() {
        for total in 1..=12u32 {
            for current in 0..=total + 2 {
                let percent = image_progress_percent(current, total);
                assert!((5.0..=90.0).contains(&percent), "{current}/{total} -> {percent}");
                let percent = scene_complete_percent(current, total);
                assert!((10.0..=95.0).contains(&percent), "{current}/{total} -> {percent}");
            }
        }
        assert_eq!(image_progress_percent(3, 0), 5.0);
        assert_eq!(scene_complete_percent(3, 0), 10.0);
    }

    #[test]
    fn test_animation_percent() {
        assert_eq!(animation_percent(4, 4), 100.0);
        assert_eq!(animation_percent(1, 4), 25.0);
        assert_eq!(animation_percent(0, 0), 0.0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut progress = WorkflowProgress::default();
        assert_eq!(progress.advance(47.5), 47.5);
        assert_eq!(progress.advance(31.25), 47.5);
        assert_eq!(progress.advance(f64::NAN), 47.5);
        assert_eq!(progress.advance(250.0), 100.0);
        progress.error = Some("Sin créditos".to_string());
        progress.reset();
        assert_eq!(progress, WorkflowProgress::default());
    }

    #[test]
    fn test_clear_keeps_persistent_error() {
        let mut progress = WorkflowProgress {
            percent: 40.0,
            message: "Generando".to_string(),
            error: Some("Quota agotada".to_string()),
        };
        progress.clear();
        assert_eq!(progress.percent, 0.0);
        assert!(progress.message.is_empty());
        assert_eq!(progress.error.as_deref(), Some("Quota agotada"));
    }
}
