//! Request service: validation, planning, rendering, and batch dispatch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;

use reframe_common::config::AppConfig;
use reframe_common::error::{ReframeError, ReframeResult};
use reframe_job_model::{
    EncoderSettings, OptionRegistry, PipelineSpec, RenderJob, SourceAsset, TransformRequest,
    VideoPlan,
};
use reframe_pipeline_core::{
    assemble_render_job, build_pipeline_spec, destination_for, needs_audio_probe,
};

use crate::probe::{FfprobeProbe, MediaProbe};
use crate::report::RenderReport;
use crate::transcode::{FfmpegTranscoder, Transcoder};

/// Service-level settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub encoder: EncoderSettings,
    pub max_concurrent_jobs: usize,
    /// Engine path shown in logs and reports.
    pub engine: PathBuf,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            output_prefix: config.output_prefix.clone(),
            encoder: EncoderSettings {
                video_codec: config.transcoder.video_codec.clone(),
                audio_codec: config.transcoder.audio_codec.clone(),
                prefer_audio_copy: config.transcoder.prefer_audio_copy,
            },
            max_concurrent_jobs: config.worker.max_concurrent_jobs.max(1),
            engine: config.transcoder.ffmpeg_binary.clone(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Result of one successful render.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub destination: PathBuf,
    pub job: RenderJob,
    pub elapsed: Duration,
    /// Sidecar report, if it could be written.
    pub report: Option<PathBuf>,
}

/// Load the option catalogs named by the configuration, or the built-ins.
pub fn load_registry(config: &AppConfig) -> ReframeResult<OptionRegistry> {
    match &config.options_file {
        Some(path) => {
            let registry = OptionRegistry::from_json_file(path)?;
            tracing::info!(path = %path.display(), "Loaded option catalogs");
            Ok(registry)
        }
        None => Ok(OptionRegistry::builtin()),
    }
}

type ClaimSet = Arc<Mutex<HashSet<PathBuf>>>;

/// Exclusive hold on one output path, released on drop.
struct DestinationClaim {
    claims: ClaimSet,
    path: PathBuf,
}

impl DestinationClaim {
    fn acquire(claims: &ClaimSet, path: &Path) -> ReframeResult<Self> {
        let mut held = claims.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !held.insert(path.to_path_buf()) {
            return Err(ReframeError::DestinationConflict {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            claims: Arc::clone(claims),
            path: path.to_path_buf(),
        })
    }
}

impl Drop for DestinationClaim {
    fn drop(&mut self) {
        let mut held = self
            .claims
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        held.remove(&self.path);
    }
}

/// Turns transform requests into finished renders.
///
/// One instance serves any number of concurrent requests. Source inspection
/// and engine invocations are bounded by `max_concurrent_jobs`, and no two
/// in-flight renders may write the same output path.
pub struct RenderService {
    registry: Arc<OptionRegistry>,
    settings: ServiceSettings,
    transcoder: Arc<dyn Transcoder>,
    probe: Arc<dyn MediaProbe>,
    limiter: Arc<Semaphore>,
    claims: ClaimSet,
}

impl RenderService {
    pub fn new(
        registry: Arc<OptionRegistry>,
        settings: ServiceSettings,
        transcoder: Arc<dyn Transcoder>,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        let limiter = Arc::new(Semaphore::new(settings.max_concurrent_jobs.max(1)));
        Self {
            registry,
            settings,
            transcoder,
            probe,
            limiter,
            claims: ClaimSet::default(),
        }
    }

    /// Service backed by the real ffmpeg and ffprobe executables.
    pub fn from_config(config: &AppConfig) -> ReframeResult<Self> {
        config.validate()?;
        let registry = Arc::new(load_registry(config)?);
        let transcoder = Arc::new(FfmpegTranscoder::new(
            config.transcoder.ffmpeg_binary.clone(),
            Duration::from_secs(config.transcoder.timeout_secs),
        ));
        let probe = Arc::new(FfprobeProbe::new(
            config.transcoder.ffprobe_binary.clone(),
            Duration::from_secs(config.transcoder.probe_timeout_secs),
        ));
        Ok(Self::new(
            registry,
            ServiceSettings::from_config(config),
            transcoder,
            probe,
        ))
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn transcoder(&self) -> &dyn Transcoder {
        self.transcoder.as_ref()
    }

    /// Validate a request and assemble its render job without running it.
    pub async fn plan(&self, request: &TransformRequest) -> ReframeResult<RenderJob> {
        let (spec, destination) = self.prepare(request).await?;
        Ok(self.assemble(&spec, destination).await)
    }

    /// Where a request's output lands. Depends only on the primary file name.
    pub fn destination_of(&self, video: &SourceAsset) -> PathBuf {
        destination_for(
            video,
            &self.settings.output_dir,
            &self.settings.output_prefix,
        )
    }

    async fn prepare(&self, request: &TransformRequest) -> ReframeResult<(PipelineSpec, PathBuf)> {
        let spec = build_pipeline_spec(request, &self.registry)?;
        ensure_inputs_exist(&spec).await?;

        let destination = self.destination_of(&spec.source);
        if same_file(&destination, spec.source.path()) {
            return Err(ReframeError::config(format!(
                "Output path {} would overwrite its source",
                destination.display()
            )));
        }
        Ok((spec, destination))
    }

    async fn assemble(&self, spec: &PipelineSpec, destination: PathBuf) -> RenderJob {
        let source_codec = if needs_audio_probe(spec, &self.settings.encoder) {
            let codec = self.probe.audio_codec(spec.source.path()).await;
            tracing::debug!(codec = ?codec, source = %spec.source.file_name(), "Probed audio codec");
            codec
        } else {
            None
        };
        assemble_render_job(
            spec,
            &self.settings.encoder,
            source_codec.as_deref(),
            destination,
        )
    }

    /// Validate, render, and report one request.
    ///
    /// Fails with [`ReframeError::DestinationConflict`] while another render
    /// of this service is writing the same output path.
    pub async fn process(&self, request: &TransformRequest) -> ReframeResult<RenderOutcome> {
        let (spec, destination) = self.prepare(request).await?;
        let _claim = DestinationClaim::acquire(&self.claims, &destination)?;

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|err| ReframeError::Other(err.into()))?;

        let job = self.assemble(&spec, destination).await;

        tokio::fs::create_dir_all(&self.settings.output_dir).await?;

        tracing::info!(
            source = %request.video.file_name(),
            destination = %job.destination.display(),
            backend = self.transcoder.name(),
            audio = job.audio.name(),
            "Starting render"
        );

        let started_at = Utc::now();
        let output = match self.transcoder.transcode(&job).await {
            Ok(output) => output,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    destination = %job.destination.display(),
                    "Render failed"
                );
                return Err(err);
            }
        };
        let finished_at = Utc::now();

        if tokio::fs::metadata(&job.destination).await.is_err() {
            return Err(ReframeError::transcode_failed(
                "exit status: 0",
                format!("no output written to {}", job.destination.display()),
            ));
        }
        if !output.stderr.is_empty() {
            tracing::debug!(stderr = %output.stderr, "ffmpeg diagnostics");
        }

        let report = RenderReport::new(
            request.video.path(),
            &job,
            &self.settings.engine,
            started_at,
            finished_at,
        )
        .write_beside_output();

        tracing::info!(
            destination = %job.destination.display(),
            elapsed_secs = output.elapsed.as_secs_f64(),
            "Render finished"
        );

        Ok(RenderOutcome {
            destination: job.destination.clone(),
            job,
            elapsed: output.elapsed,
            report,
        })
    }

    /// Render many requests concurrently. Results keep submission order.
    ///
    /// A request whose output path repeats an earlier one in the batch is
    /// rejected with [`ReframeError::DestinationConflict`] and never started.
    pub async fn process_batch(
        self: &Arc<Self>,
        requests: Vec<TransformRequest>,
    ) -> Vec<ReframeResult<RenderOutcome>> {
        tracing::info!(
            requests = requests.len(),
            max_concurrent = self.settings.max_concurrent_jobs,
            "Starting batch"
        );

        let mut seen = HashSet::new();
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let destination = self.destination_of(&request.video);
                if !seen.insert(destination.clone()) {
                    tracing::warn!(
                        source = %request.video.path().display(),
                        destination = %destination.display(),
                        "Output path repeats an earlier request, skipping"
                    );
                    return Err(ReframeError::DestinationConflict { path: destination });
                }
                let service = Arc::clone(self);
                Ok(tokio::spawn(async move { service.process(&request).await }))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle {
                Err(err) => Err(err),
                Ok(task) => match task.await {
                    Ok(result) => result,
                    Err(err) => Err(ReframeError::Other(anyhow::anyhow!(
                        "render task aborted: {err}"
                    ))),
                },
            });
        }
        results
    }
}

async fn ensure_inputs_exist(spec: &PipelineSpec) -> ReframeResult<()> {
    let mut paths = vec![spec.source.path()];
    if let VideoPlan::Composite { background } = &spec.video {
        paths.push(background.path());
    }
    for path in paths {
        if tokio::fs::metadata(path).await.is_err() {
            return Err(ReframeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_follow_config() {
        let mut config = AppConfig::default();
        config.output_dir = PathBuf::from("/srv/out");
        config.transcoder.prefer_audio_copy = true;
        config.worker.max_concurrent_jobs = 0;

        let settings = ServiceSettings::from_config(&config);
        assert_eq!(settings.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(settings.output_prefix, "processed_");
        assert!(settings.encoder.prefer_audio_copy);
        assert_eq!(settings.max_concurrent_jobs, 1);
        assert_eq!(settings.engine, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_claim_is_exclusive_until_dropped() {
        let claims = ClaimSet::default();
        let path = Path::new("uploads/processed_clip.mp4");

        let first = DestinationClaim::acquire(&claims, path).unwrap();
        let err = DestinationClaim::acquire(&claims, path).err().unwrap();
        assert!(matches!(err, ReframeError::DestinationConflict { .. }));
        assert!(DestinationClaim::acquire(&claims, Path::new("uploads/processed_b.mp4")).is_ok());

        drop(first);
        assert!(DestinationClaim::acquire(&claims, path).is_ok());
    }

    #[test]
    fn test_load_registry_defaults_to_builtin() {
        let registry = load_registry(&AppConfig::default()).unwrap();
        assert_eq!(registry, OptionRegistry::builtin());
    }

    #[test]
    fn test_load_registry_reports_missing_file() {
        let mut config = AppConfig::default();
        config.options_file = Some(PathBuf::from("/nonexistent/options.json"));
        assert!(load_registry(&config).is_err());
    }
}
