//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReframeError, ReframeResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where rendered files are written.
    pub output_dir: PathBuf,

    /// Prefix prepended to the source file name to form the output name.
    pub output_prefix: String,

    /// Optional JSON file replacing the built-in option catalogs.
    pub options_file: Option<PathBuf>,

    /// External transcoder settings.
    pub transcoder: TranscoderConfig,

    /// Request worker pool settings.
    pub worker: WorkerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Settings for the external ffmpeg/ffprobe invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// ffmpeg executable name or path.
    pub ffmpeg_binary: PathBuf,

    /// ffprobe executable name or path.
    pub ffprobe_binary: PathBuf,

    /// Hard deadline for one render, in seconds.
    pub timeout_secs: u64,

    /// Deadline for one ffprobe inspection, in seconds. Expiry means
    /// "codec unknown", never an error.
    pub probe_timeout_secs: u64,

    /// Video encoder passed to `-c:v`.
    pub video_codec: String,

    /// Audio encoder passed to `-c:a` when audio is re-encoded.
    pub audio_codec: String,

    /// Copy the audio stream untouched when the output container allows it.
    pub prefer_audio_copy: bool,
}

/// Worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum renders running at once.
    pub max_concurrent_jobs: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reframe=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("uploads"),
            output_prefix: "processed_".to_string(),
            options_file: None,
            transcoder: TranscoderConfig::default(),
            worker: WorkerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: PathBuf::from("ffmpeg"),
            ffprobe_binary: PathBuf::from("ffprobe"),
            timeout_secs: 600,
            probe_timeout_secs: 30,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            prefer_audio_copy: false,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Errors are surfaced, not defaulted.
    pub fn load_from(path: &Path) -> ReframeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReframeError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            ReframeError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every render fail.
    pub fn validate(&self) -> ReframeResult<()> {
        if self.worker.max_concurrent_jobs == 0 {
            return Err(ReframeError::config(
                "worker.max_concurrent_jobs must be at least 1",
            ));
        }
        if self.transcoder.timeout_secs == 0 {
            return Err(ReframeError::config(
                "transcoder.timeout_secs must be at least 1",
            ));
        }
        if self.transcoder.probe_timeout_secs == 0 {
            return Err(ReframeError::config(
                "transcoder.probe_timeout_secs must be at least 1",
            ));
        }
        if self.transcoder.video_codec.trim().is_empty()
            || self.transcoder.audio_codec.trim().is_empty()
        {
            return Err(ReframeError::config("encoder names must not be empty"));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config as pretty JSON to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reframe").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"transcoder": {"timeout_secs": 30}}"#).unwrap();
        assert_eq!(config.transcoder.timeout_secs, 30);
        assert_eq!(config.transcoder.probe_timeout_secs, 30);
        assert_eq!(config.transcoder.video_codec, "libx264");
        assert_eq!(config.output_prefix, "processed_");
        assert_eq!(config.worker.max_concurrent_jobs, 2);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.transcoder.prefer_audio_copy = true;
        config.output_dir = PathBuf::from("/srv/out");
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert!(loaded.transcoder.prefer_audio_copy);
        assert_eq!(loaded.output_dir, PathBuf::from("/srv/out"));
    }

    #[test]
    fn test_load_from_rejects_zero_workers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"worker": {"max_concurrent_jobs": 0}}"#).unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ReframeError::Config { .. }));
    }

    #[test]
    fn test_zero_probe_deadline_is_rejected() {
        let mut config = AppConfig::default();
        config.transcoder.probe_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ReframeError::Config { .. })));
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }
}
