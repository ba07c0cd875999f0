//! External transcoder invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_job_model::RenderJob;

/// Deadline for `-version` availability checks.
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// What a finished render left behind.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    /// Engine stderr, kept for diagnostics even on success.
    pub stderr: String,
    pub elapsed: Duration,
}

/// Trait for transcoding backends.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Run one render job to completion.
    ///
    /// On any failure the destination must not be left half-written.
    async fn transcode(&self, job: &RenderJob) -> ReframeResult<TranscodeOutput>;

    /// Check if this backend is usable on the host.
    async fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Runs the `ffmpeg` executable as a child process.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn run(&self, job: &RenderJob) -> ReframeResult<TranscodeOutput> {
        let args = job.to_args();
        tracing::debug!(command = %job.command_line(&self.binary), "Running ffmpeg");

        let started = Instant::now();
        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => ReframeError::unsupported(format!(
                    "ffmpeg executable not found: {}",
                    self.binary.display()
                )),
                _ => ReframeError::Io(err),
            })?;

        tracing::info!(
            pid = child.id(),
            inputs = job.inputs.len(),
            audio = job.audio.name(),
            "ffmpeg process started"
        );

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_elapsed) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    destination = %job.destination.display(),
                    "ffmpeg exceeded deadline, killed"
                );
                return Err(ReframeError::TranscodeTimedOut {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ReframeError::transcode_failed(
                output.status.to_string(),
                stderr,
            ));
        }

        Ok(TranscodeOutput {
            stderr,
            elapsed: started.elapsed(),
        })
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg", Duration::from_secs(600))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, job: &RenderJob) -> ReframeResult<TranscodeOutput> {
        // Also fires when this future is dropped mid-render.
        let mut guard = PartialOutputGuard::new(&job.destination);
        let result = self.run(job).await;
        if result.is_ok() {
            guard.commit();
        }
        result
    }

    async fn is_available(&self) -> bool {
        answers_version(&self.binary, VERSION_CHECK_TIMEOUT).await
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Run `<binary> -version` under a deadline. Any failure, including a hang,
/// counts as unavailable.
pub(crate) async fn answers_version(binary: &Path, deadline: Duration) -> bool {
    let mut command = Command::new(binary);
    command
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    match tokio::time::timeout(deadline, command.status()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(_)) => false,
        Err(_elapsed) => {
            tracing::warn!(
                binary = %binary.display(),
                timeout_secs = deadline.as_secs(),
                "Version check timed out"
            );
            false
        }
    }
}

/// Deletes the destination on drop unless the render was committed.
struct PartialOutputGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialOutputGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn commit(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialOutputGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Removed partial output");
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to remove partial output"
                );
            }
        }
    }
}
