//! Source media inspection.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::transcode::{answers_version, VERSION_CHECK_TIMEOUT};

/// Reads stream facts from a media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Codec name of the first audio stream, or `None` if there is no audio
    /// stream or the file could not be inspected.
    async fn audio_codec(&self, path: &Path) -> Option<String>;
}

/// `ffprobe`-backed probe. Each inspection runs under its own deadline.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Whether `ffprobe -version` succeeds.
    pub async fn is_available(&self) -> bool {
        answers_version(&self.binary, VERSION_CHECK_TIMEOUT).await
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe", Duration::from_secs(30))
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn audio_codec(&self, path: &Path) -> Option<String> {
        let mut command = Command::new(&self.binary);
        command
            .args([
                "-v",
                "error",
                "-select_streams",
                "a:0",
                "-show_entries",
                "stream=codec_name",
                "-of",
                "csv=p=0",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // The child is killed when the timed-out future is dropped.
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                tracing::debug!(error = %err, binary = %self.binary.display(), "ffprobe unavailable");
                return None;
            }
            Err(_elapsed) => {
                tracing::warn!(
                    path = %path.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "ffprobe exceeded deadline, treating codec as unknown"
                );
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!(
                path = %path.display(),
                status = %output.status,
                "ffprobe could not read audio stream"
            );
            return None;
        }

        parse_codec_line(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_codec_line(raw: &str) -> Option<String> {
    let codec = raw.lines().next()?.trim().trim_end_matches(',');
    (!codec.is_empty()).then(|| codec.to_ascii_lowercase())
}

/// Probe that never inspects anything.
///
/// Useful where audio copy is disabled, since the audio policy then never
/// depends on the source codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

#[async_trait]
impl MediaProbe for NoProbe {
    async fn audio_codec(&self, _path: &Path) -> Option<String> {
        None
    }
}
