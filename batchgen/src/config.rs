//! batchgen configuration management.

use crate::batch::{Backoff, BatchOptions, RetryPolicy};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MAX_CHARS: usize = 280;
const DEFAULT_CHARS_PER_SUBTITLE: usize = 80;
const DEFAULT_DISPLAY_SECONDS: f64 = 5.0;
const DEFAULT_PAUSE_SECONDS: f64 = 1.0;

/// Retry wait shape selectable from the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// `retry_delay_ms` after every failure
    #[default]
    Fixed,
    /// `progressive_step_ms` times the failure count
    Progressive,
}

impl FromStr for BackoffKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "progressive" => Ok(Self::Progressive),
            other => Err(EngineError::invalid(format!(
                "unknown backoff '{}' (expected fixed or progressive)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchgenConfig {
    /// Segment size for the words and sentences policies
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Subtitle segment size
    #[serde(default = "default_chars_per_subtitle")]
    pub chars_per_subtitle: usize,

    /// Seconds each subtitle stays on screen
    #[serde(default = "default_display_seconds")]
    pub display_seconds: f64,

    /// Gap between subtitles
    #[serde(default = "default_pause_seconds")]
    pub pause_seconds: f64,

    /// Attempts per segment, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub backoff: BackoffKind,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_progressive_step_ms")]
    pub progressive_step_ms: u64,

    /// Pause between consecutive segments
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,

    /// Normalize typography before segmenting
    #[serde(default = "default_clean_text")]
    pub clean_text: bool,
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_chars_per_subtitle() -> usize {
    DEFAULT_CHARS_PER_SUBTITLE
}

fn default_display_seconds() -> f64 {
    DEFAULT_DISPLAY_SECONDS
}

fn default_pause_seconds() -> f64 {
    DEFAULT_PAUSE_SECONDS
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1500
}

fn default_progressive_step_ms() -> u64 {
    10_000
}

fn default_inter_item_delay_ms() -> u64 {
    1000
}

fn default_clean_text() -> bool {
    true
}

impl Default for BatchgenConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            chars_per_subtitle: default_chars_per_subtitle(),
            display_seconds: default_display_seconds(),
            pause_seconds: default_pause_seconds(),
            max_retries: default_max_retries(),
            backoff: BackoffKind::default(),
            retry_delay_ms: default_retry_delay_ms(),
            progressive_step_ms: default_progressive_step_ms(),
            inter_item_delay_ms: default_inter_item_delay_ms(),
            clean_text: default_clean_text(),
        }
    }
}

impl BatchgenConfig {
    /// Keys accepted by [`BatchgenConfig::set`], in file order.
    pub const KEYS: &'static [&'static str] = &[
        "max_chars",
        "chars_per_subtitle",
        "display_seconds",
        "pause_seconds",
        "max_retries",
        "backoff",
        "retry_delay_ms",
        "progressive_step_ms",
        "inter_item_delay_ms",
        "clean_text",
    ];

    /// Get the config file path: ~/.config/cli-programs/batchgen.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| EngineError::invalid("neither HOME nor USERPROFILE is set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("batchgen.toml"))
    }

    /// Load config from the default path, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: BatchgenConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Update one field from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "max_chars" => self.max_chars = parse(key, value)?,
            "chars_per_subtitle" => self.chars_per_subtitle = parse(key, value)?,
            "display_seconds" => self.display_seconds = parse(key, value)?,
            "pause_seconds" => self.pause_seconds = parse(key, value)?,
            "max_retries" => self.max_retries = parse(key, value)?,
            "backoff" => self.backoff = value.parse()?,
            "retry_delay_ms" => self.retry_delay_ms = parse(key, value)?,
            "progressive_step_ms" => self.progressive_step_ms = parse(key, value)?,
            "inter_item_delay_ms" => self.inter_item_delay_ms = parse(key, value)?,
            "clean_text" => self.clean_text = parse(key, value)?,
            _ => {
                return Err(EngineError::invalid(format!(
                    "unknown key '{}' (expected one of: {})",
                    key,
                    Self::KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed(Duration::from_millis(self.retry_delay_ms)),
            BackoffKind::Progressive => Backoff::Progressive {
                step: Duration::from_millis(self.progressive_step_ms),
            },
        };
        let policy = RetryPolicy::simple()
            .with_max_attempts(self.max_retries)
            .with_backoff(backoff);
        policy.validate()?;
        Ok(policy)
    }

    pub fn batch_options(&self) -> Result<BatchOptions> {
        Ok(BatchOptions::new()
            .with_retry(self.retry_policy()?)
            .with_inter_item_delay(Duration::from_millis(self.inter_item_delay_ms)))
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::invalid(format!("invalid value '{}' for {}", value, key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BatchgenConfig::default();
        assert_eq!(config.max_chars, 280);
        assert_eq!(config.chars_per_subtitle, 80);
        assert_eq!(config.display_seconds, 5.0);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff, BackoffKind::Fixed);
        assert!(config.clean_text);
    }

    #[test]
    fn test_config_path() {
        let path = BatchgenConfig::config_path().unwrap();
        assert!(path.ends_with("cli-programs/batchgen.toml"));
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
max_chars = 500
backoff = "progressive"
progressive_step_ms = 5000
clean_text = false
"#;
        let config: BatchgenConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.max_chars, 500);
        assert_eq!(config.backoff, BackoffKind::Progressive);
        assert!(!config.clean_text);
        assert_eq!(config.pause_seconds, 1.0);

        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.backoff.delay(2), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: BatchgenConfig = toml::from_str("").unwrap();
        assert_eq!(config, BatchgenConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = BatchgenConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, BatchgenConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("batchgen.toml");

        let mut config = BatchgenConfig::default();
        config.set("max_retries", "5").unwrap();
        config.set("backoff", "Progressive").unwrap();
        config.set("display_seconds", "3.5").unwrap();
        config.save_to(&path).unwrap();

        let loaded = BatchgenConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.max_retries, 5);
        assert_eq!(loaded.backoff, BackoffKind::Progressive);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = BatchgenConfig::default();
        assert!(config.set("colour", "blue").is_err());
        assert!(config.set("max_chars", "lots").is_err());
        assert!(config.set("backoff", "exponential").is_err());
        assert_eq!(config, BatchgenConfig::default());
    }

    #[test]
    fn test_zero_retries_invalid() {
        let config = BatchgenConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.batch_options(),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_batch_options() {
        let options = BatchgenConfig::default().batch_options().unwrap();
        assert_eq!(options.retry.max_attempts, 3);
        assert_eq!(options.inter_item_delay, Duration::from_secs(1));
        assert_eq!(options.retry.backoff.delay(1), Duration::from_millis(1500));
    }
}
