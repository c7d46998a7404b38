//! Configuration module
//!
//! Client connection settings and the timing constants of the workflow
//! stages. Both load from the environment (after `dotenvy::dotenv()`);
//! every workflow timing has a default.

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Version prefix of every backend route.
pub const API_PREFIX: &str = "/api/v1";

/// Prefix of the environment variables read by [`WorkflowConfig::from_env`].
pub const ENV_PREFIX: &str = "STORYREEL_";

/// Remote service connection settings
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }

    /// Read STORYREEL_API_URL (or API_URL) and STORYREEL_REQUEST_TIMEOUT_SECS.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_url = env::var("STORYREEL_API_URL")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let request_timeout_secs = match env::var("STORYREEL_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("Invalid STORYREEL_REQUEST_TIMEOUT_SECS: {}", raw))?,
            Err(_) => REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url,
            request_timeout_secs,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// What to conclude when the image stream fails at the transport level
/// before a terminal event arrived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StreamFailurePolicy {
    /// Always a connectivity failure.
    Strict,
    /// Treat as implicit success when progress already exceeded the threshold.
    OptimisticAbove(f64),
}

fn default_analysis_tick_ms() -> u64 {
    500
}
fn default_analysis_step() -> f64 {
    10.0
}
fn default_analysis_ramp_cap() -> f64 {
    90.0
}
fn default_analysis_display_delay_ms() -> u64 {
    1500
}
fn default_images_complete_delay_ms() -> u64 {
    1500
}
fn default_images_fatal_delay_ms() -> u64 {
    2000
}
fn default_animation_poll_interval_ms() -> u64 {
    10_000
}
fn default_animation_timeout_ms() -> u64 {
    600_000
}
fn default_animation_display_delay_ms() -> u64 {
    2000
}

/// Timing constants of the three workflow stages
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    /// Interval of the synthetic analysis progress ramp
    #[serde(default = "default_analysis_tick_ms")]
    pub analysis_tick_ms: u64,
    #[serde(default = "default_analysis_step")]
    pub analysis_step: f64,
    /// The ramp never reaches completion on its own
    #[serde(default = "default_analysis_ramp_cap")]
    pub analysis_ramp_cap: f64,
    #[serde(default = "default_analysis_display_delay_ms")]
    pub analysis_display_delay_ms: u64,
    #[serde(default = "default_images_complete_delay_ms")]
    pub images_complete_delay_ms: u64,
    #[serde(default = "default_images_fatal_delay_ms")]
    pub images_fatal_delay_ms: u64,
    #[serde(default = "default_animation_poll_interval_ms")]
    pub animation_poll_interval_ms: u64,
    /// Overall ceiling of animation polling
    #[serde(default = "default_animation_timeout_ms")]
    pub animation_timeout_ms: u64,
    #[serde(default = "default_animation_display_delay_ms")]
    pub animation_display_delay_ms: u64,
    /// Enables the legacy optimistic rule for image stream transport failures.
    #[serde(default)]
    pub stream_optimistic_threshold: Option<f64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            analysis_tick_ms: default_analysis_tick_ms(),
            analysis_step: default_analysis_step(),
            analysis_ramp_cap: default_analysis_ramp_cap(),
            analysis_display_delay_ms: default_analysis_display_delay_ms(),
            images_complete_delay_ms: default_images_complete_delay_ms(),
            images_fatal_delay_ms: default_images_fatal_delay_ms(),
            animation_poll_interval_ms: default_animation_poll_interval_ms(),
            animation_timeout_ms: default_animation_timeout_ms(),
            animation_display_delay_ms: default_animation_display_delay_ms(),
            stream_optimistic_threshold: None,
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(env::vars())
    }

    /// Parse from explicit key/value pairs; keys carry the STORYREEL_ prefix.
    pub fn from_vars<I>(vars: I) -> Result<Self, anyhow::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: WorkflowConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("Failed to load workflow configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.analysis_tick_ms == 0 || self.animation_poll_interval_ms == 0 {
            anyhow::bail!("Tick and poll intervals must be greater than zero");
        }
        if !(0.0..100.0).contains(&self.analysis_ramp_cap) {
            anyhow::bail!(
                "analysis_ramp_cap must be below 100, got {}",
                self.analysis_ramp_cap
            );
        }
        if let Some(threshold) = self.stream_optimistic_threshold {
            if !(0.0..=100.0).contains(&threshold) {
                anyhow::bail!(
                    "stream_optimistic_threshold must be within 0..=100, got {}",
                    threshold
                );
            }
        }
        Ok(())
    }

    pub fn analysis_tick(&self) -> Duration {
        Duration::from_millis(self.analysis_tick_ms)
    }

    pub fn analysis_display_delay(&self) -> Duration {
        Duration::from_millis(self.analysis_display_delay_ms)
    }

    pub fn images_complete_delay(&self) -> Duration {
        Duration::from_millis(self.images_complete_delay_ms)
    }

    pub fn images_fatal_delay(&self) -> Duration {
        Duration::from_millis(self.images_fatal_delay_ms)
    }

    pub fn animation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.animation_poll_interval_ms)
    }

    pub fn animation_timeout(&self) -> Duration {
        Duration::from_millis(self.animation_timeout_ms)
    }

    pub fn animation_display_delay(&self) -> Duration {
        Duration::from_millis(self.animation_display_delay_ms)
    }

    pub fn stream_failure_policy(&self) -> StreamFailurePolicy {
        match self.stream_optimistic_threshold {
            Some(threshold) => StreamFailurePolicy::OptimisticAbove(threshold),
            None => StreamFailurePolicy::Strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_match_stage_timings() {
        let config = WorkflowConfig::from_vars(Vec::new()).unwrap();
        assert_eq!(config, WorkflowConfig::default());
        assert_eq!(config.analysis_tick(), Duration::from_millis(500));
        assert_eq!(config.analysis_display_delay(), Duration::from_millis(1500));
        assert_eq!(config.images_fatal_delay(), Duration::from_secs(2));
        assert_eq!(config.animation_poll_interval(), Duration::from_secs(10));
        assert_eq!(config.animation_timeout(), Duration::from_secs(600));
        assert_eq!(config.stream_failure_policy(), StreamFailurePolicy::Strict);
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = WorkflowConfig::from_vars(vars(&[
            ("STORYREEL_ANIMATION_POLL_INTERVAL_MS", "250"),
            ("STORYREEL_STREAM_OPTIMISTIC_THRESHOLD", "50"),
            ("UNRELATED", "x"),
        ]))
        .unwrap();
        assert_eq!(config.animation_poll_interval(), Duration::from_millis(250));
        assert_eq!(
            config.stream_failure_policy(),
            StreamFailurePolicy::OptimisticAbove(50.0)
        );
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(WorkflowConfig::from_vars(vars(&[("STORYREEL_ANALYSIS_TICK_MS", "0")])).is_err());
        assert!(
            WorkflowConfig::from_vars(vars(&[("STORYREEL_ANALYSIS_RAMP_CAP", "100")])).is_err()
        );
        assert!(WorkflowConfig::from_vars(vars(&[(
            "STORYREEL_STREAM_OPTIMISTIC_THRESHOLD",
            "150"
        )]))
        .is_err());
        assert!(WorkflowConfig::from_vars(vars(&[(
            "STORYREEL_ANALYSIS_TICK_MS",
            "not-a-number"
        )]))
        .is_err());
    }

    #[test]
    fn test_client_config_new_uses_default_timeout() {
        let config = ClientConfig::new("http://example.test");
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }
}
