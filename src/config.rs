//! Configuration management for slidewin.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, SlidewinError};
use crate::ratelimit::SlidingWindowLimiter;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlidewinConfig {
    /// Limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// Limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Buffer capacity and maximum limit
    #[serde(default = "default_max_events")]
    pub max_events: usize,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Initial limit; clamped into `[0, max_events]`. Defaults to `max_events`.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            window_ms: default_window_ms(),
            limit: None,
        }
    }
}

fn default_max_events() -> usize {
    100
}

fn default_window_ms() -> u64 {
    1000
}

impl LimiterConfig {
    /// Window length as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Build a limiter from this configuration.
    pub fn build(&self) -> SlidingWindowLimiter {
        let limiter = SlidingWindowLimiter::new(self.max_events, self.window());
        if let Some(limit) = self.limit {
            limiter.set_limit(limit);
        }
        limiter
    }
}

/// Probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Number of concurrent tasks
    #[serde(default = "default_tasks")]
    pub tasks: usize,

    /// Admission attempts issued by each task
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Upper bound of the random pause between attempts, in milliseconds
    #[serde(default)]
    pub jitter_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            tasks: default_tasks(),
            attempts: default_attempts(),
            jitter_ms: 0,
        }
    }
}

fn default_tasks() -> usize {
    8
}

fn default_attempts() -> usize {
    100
}

impl SlidewinConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading slidewin configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SlidewinConfig = serde_yaml::from_str(yaml)
            .map_err(|e| SlidewinError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings the limiter itself cannot normalize.
    pub fn validate(&self) -> Result<()> {
        if self.probe.tasks == 0 {
            return Err(SlidewinError::Config(
                "probe.tasks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SlidewinConfig::default();

        assert_eq!(config.limiter.max_events, 100);
        assert_eq!(config.limiter.window(), Duration::from_secs(1));
        assert_eq!(config.limiter.limit, None);
        assert_eq!(config.probe.tasks, 8);
        assert_eq!(config.probe.attempts, 100);
        assert_eq!(config.probe.jitter_ms, 0);
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
limiter:
  max_events: 10
  window_ms: 500
  limit: 4
probe:
  tasks: 3
  attempts: 20
  jitter_ms: 5
"#;

        let config = SlidewinConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limiter.max_events, 10);
        assert_eq!(config.limiter.window(), Duration::from_millis(500));
        assert_eq!(config.limiter.limit, Some(4));
        assert_eq!(config.probe.tasks, 3);
        assert_eq!(config.probe.attempts, 20);
        assert_eq!(config.probe.jitter_ms, 5);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = SlidewinConfig::from_yaml("limiter:\n  max_events: 7\n").unwrap();

        assert_eq!(config.limiter.max_events, 7);
        assert_eq!(config.limiter.window_ms, 1000);
        assert_eq!(config.probe.tasks, 8);
    }

    #[test]
    fn test_build_clamps_limit() {
        let mut config = LimiterConfig {
            max_events: 5,
            window_ms: 100,
            limit: Some(50),
        };
        let limiter = config.build();
        assert_eq!(limiter.capacity(), 5);
        assert_eq!(limiter.limit(), 5);
        assert_eq!(limiter.window(), Duration::from_millis(100));

        config.limit = Some(-3);
        assert_eq!(config.build().limit(), 0);

        config.limit = None;
        assert_eq!(config.build().limit(), 5);
    }

    #[test]
    fn test_rejects_zero_tasks() {
        let err = SlidewinConfig::from_yaml("probe:\n  tasks: 0\n").unwrap_err();
        assert!(matches!(err, SlidewinError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let err = SlidewinConfig::from_yaml("limiter: [not, a, map]").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("slidewin-config-{}.yaml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "limiter:\n  max_events: 3\n  window_ms: 250").unwrap();
        drop(file);

        let config = SlidewinConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.limiter.max_events, 3);
        assert_eq!(config.limiter.window_ms, 250);
    }

    #[test]
    fn test_from_missing_file() {
        let err = SlidewinConfig::from_file("/nonexistent/slidewin.yaml").unwrap_err();
        assert!(matches!(err, SlidewinError::Io(_)));
    }
}
