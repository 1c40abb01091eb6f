//! Config module.
//! Manages I/O for organograma.json (service URL, write mode, export page setup).
//! Writes default to opaque: the service's reply to a POST is never read.
//! Uses serde for JSON serialization.
//! A missing file means defaults; `ORGANOGRAMA_URL` and `--url` override the URL.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "organograma.json";
pub const URL_ENV: &str = "ORGANOGRAMA_URL";

const DEFAULT_BASE_URL: &str = "https://script.google.com/macros/s/AKfycbxQiT1azwadu1QljcSpr2LHelNp3zMDTh_pfKyzoHYHEUZruxXqtenoX4WxtZ0YQf3g6Q/exec";
const MAX_PHOTO_BYTES: u64 = 5 * 1024 * 1024;

/// How writes are sent to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Response body is never read; success is assumed.
    #[default]
    Opaque,
    /// `{success, error}` is read and failed writes are retried.
    Acknowledged,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Opaque => write!(f, "opaque"),
            WriteMode::Acknowledged => write!(f, "acknowledged"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub write_mode: WriteMode,
    pub timeout_secs: u64,
    pub max_write_retries: u32,
    pub retry_delay_ms: u64,
    pub status_duration_secs: u64,
    pub max_photo_bytes: u64,
    pub export: ExportConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub output_dir: PathBuf,
    pub file_stem: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            write_mode: WriteMode::default(),
            timeout_secs: 30,
            max_write_retries: 2,
            retry_delay_ms: 500,
            status_duration_secs: 5,
            max_photo_bytes: MAX_PHOTO_BYTES,
            export: ExportConfig::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 295.0,
            output_dir: PathBuf::from("."),
            file_stem: "organograma-agetrha".to_string(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn status_duration(&self) -> Duration {
        Duration::from_secs(self.status_duration_secs)
    }
}

/// Loads the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config JSON in {}", path.display()))?;
    Ok(config)
}

/// Applies the environment and CLI URL overrides, CLI last.
pub fn apply_overrides(mut config: Config, env_url: Option<String>, cli_url: Option<&str>) -> Config {
    if let Some(url) = env_url.filter(|u| !u.trim().is_empty()) {
        config.base_url = url;
    }
    if let Some(url) = cli_url {
        config.base_url = url.to_string();
    }
    config
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write config: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_photo_bytes, 5 * 1024 * 1024);
        assert_eq!(config.write_mode, WriteMode::Opaque);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("organograma.json");
        std::fs::write(&path, r#"{"write_mode":"acknowledged","export":{"page_height_mm":297.0}}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.write_mode, WriteMode::Acknowledged);
        assert_eq!(config.export.page_height_mm, 297.0);
        assert_eq!(config.export.page_width_mm, 210.0);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("organograma.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("organograma.json");
        let mut config = Config::default();
        config.base_url = "http://localhost:9000/exec".into();
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_cli_url_wins_over_env() {
        let config = apply_overrides(
            Config::default(),
            Some("http://env/exec".into()),
            Some("http://cli/exec"),
        );
        assert_eq!(config.base_url, "http://cli/exec");

        let config = apply_overrides(Config::default(), Some("http://env/exec".into()), None);
        assert_eq!(config.base_url, "http://env/exec");

        let config = apply_overrides(Config::default(), Some("  ".into()), None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
