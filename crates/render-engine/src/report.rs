//! Per-render JSON report written next to the output file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reframe_job_model::RenderJob;

/// Summary of one finished render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub video_filter: Option<String>,
    pub audio_policy: String,
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
}

impl RenderReport {
    pub fn new(
        source: &Path,
        job: &RenderJob,
        engine: &Path,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let elapsed_secs = (finished_at - started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            source: source.to_path_buf(),
            destination: job.destination.clone(),
            inputs: job.inputs.clone(),
            video_filter: job.video_filter.as_ref().map(|f| f.render()),
            audio_policy: job.audio.name().to_string(),
            command: job.command_line(engine),
            started_at,
            finished_at,
            elapsed_secs,
        }
    }

    /// `<destination>.render.json`, e.g. `processed_clip.mp4.render.json`.
    pub fn path_for(destination: &Path) -> PathBuf {
        let mut name = destination.as_os_str().to_owned();
        name.push(".render.json");
        PathBuf::from(name)
    }

    /// Write the report beside the output. Failures are logged, not returned.
    pub fn write_beside_output(&self) -> Option<PathBuf> {
        let path = Self::path_for(&self.destination);
        let json = match serde_json::to_string_pretty(self) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize render report");
                return None;
            }
        };
        if let Err(err) = std::fs::write(&path, json) {
            tracing::warn!(error = %err, path = %path.display(), "Failed to write render report");
            return None;
        }
        tracing::info!(report = %path.display(), "Wrote render report");
        Some(path)
    }
}
