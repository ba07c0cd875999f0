use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_job_model::{
    AudioPolicy, CropRegion, EncoderSettings, OptionRegistry, RenderJob, SourceAsset,
    TransformRequest, VideoFilter,
};
use reframe_render_engine::{
    MediaProbe, NoProbe, RenderReport, RenderService, ServiceSettings, TranscodeOutput, Transcoder,
};

/// Records every job and writes a stand-in output file.
#[derive(Default)]
struct RecordingTranscoder {
    jobs: Mutex<Vec<RenderJob>>,
    running: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl RecordingTranscoder {
    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn jobs(&self) -> Vec<RenderJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn transcode(&self, job: &RenderJob) -> ReframeResult<TranscodeOutput> {
        self.jobs.lock().unwrap().push(job.clone());
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(ReframeError::transcode_failed(
                "exit status: 1",
                "Invalid data found when processing input",
            ));
        }
        std::fs::write(&job.destination, b"rendered")?;
        Ok(TranscodeOutput {
            stderr: String::new(),
            elapsed: self.delay,
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct FixedProbe(&'static str);

#[async_trait]
impl MediaProbe for FixedProbe {
    async fn audio_codec(&self, _path: &Path) -> Option<String> {
        Some(self.0.to_string())
    }
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("in")).unwrap();
        Self { dir }
    }

    fn upload(&self, name: &str) -> SourceAsset {
        let path = self.dir.path().join("in").join(name);
        std::fs::write(&path, b"source").unwrap();
        SourceAsset::new(path).unwrap()
    }

    fn missing(&self, name: &str) -> SourceAsset {
        SourceAsset::new(self.dir.path().join("in").join(name)).unwrap()
    }

    fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn settings(&self) -> ServiceSettings {
        ServiceSettings {
            output_dir: self.out_dir(),
            ..ServiceSettings::default()
        }
    }

    fn service(&self, transcoder: Arc<dyn Transcoder>) -> RenderService {
        self.service_with(self.settings(), transcoder, Arc::new(NoProbe))
    }

    fn service_with(
        &self,
        settings: ServiceSettings,
        transcoder: Arc<dyn Transcoder>,
        probe: Arc<dyn MediaProbe>,
    ) -> RenderService {
        RenderService::new(
            Arc::new(OptionRegistry::builtin()),
            settings,
            transcoder,
            probe,
        )
    }
}

#[tokio::test]
async fn invalid_crop_never_reaches_the_engine() {
    let fx = Fixture::new();
    let transcoder = Arc::new(RecordingTranscoder::default());
    let service = fx.service(transcoder.clone());

    let request = TransformRequest::new(fx.upload("clip.mp4"))
        .with_ratio("4:5")
        .with_crop(CropRegion::new(0.0, 0.0, 0.0, 720.0));
    let err = service.process(&request).await.unwrap_err();

    assert!(matches!(err, ReframeError::InvalidCropRegion { .. }));
    assert_eq!(err.http_status(), 400);
    assert!(transcoder.jobs().is_empty());
    assert!(!fx.out_dir().exists());
}

#[tokio::test]
async fn missing_upload_is_reported_before_rendering() {
    let fx = Fixture::new();
    let transcoder = Arc::new(RecordingTranscoder::default());
    let service = fx.service(transcoder.clone());

    let request = TransformRequest::new(fx.missing("gone.mp4")).with_ratio("Original");
    let err = service.process(&request).await.unwrap_err();
    assert!(matches!(err, ReframeError::FileNotFound { .. }));

    let request = TransformRequest::new(fx.upload("clip.mp4"))
        .with_green_screen(Some(fx.missing("studio.mp4")));
    let err = service.process(&request).await.unwrap_err();
    match err {
        ReframeError::FileNotFound { path } => assert!(path.ends_with("studio.mp4")),
        other => panic!("expected FileNotFound, got {other}"),
    }
    assert!(transcoder.jobs().is_empty());
}

#[tokio::test]
async fn green_screen_with_silence_cut_renders_composite() {
    let fx = Fixture::new();
    let transcoder = Arc::new(RecordingTranscoder::default());
    let service = fx.service(transcoder.clone());

    let video = fx.upload("talk.mp4");
    let background = fx.upload("beach.mp4");
    let request = TransformRequest::new(video.clone())
        .with_zoom("Strong Zoom (1.5x)")
        .with_green_screen(Some(background.clone()))
        .with_cut_silence();

    let outcome = service.process(&request).await.unwrap();
    assert_eq!(outcome.destination, fx.out_dir().join("processed_talk.mp4"));
    assert!(outcome.destination.exists());

    let jobs = transcoder.jobs();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(
        job.inputs,
        vec![background.path().to_path_buf(), video.path().to_path_buf()]
    );
    assert!(matches!(job.video_filter, Some(VideoFilter::Graph(_))));
    assert!(matches!(job.audio, AudioPolicy::SilenceRemoval { .. }));

    let report_path = outcome.report.unwrap();
    assert_eq!(report_path, fx.out_dir().join("processed_talk.mp4.render.json"));
    let report: RenderReport =
        serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report.audio_policy, "silence_removal");
    assert_eq!(
        report.video_filter.as_deref(),
        Some("[1:v]chromakey=0x00FF00:0.3:0.1[fg];[0:v][fg]overlay=format=yuv420")
    );
}

#[tokio::test]
async fn planning_is_idempotent() {
    let fx = Fixture::new();
    let service = fx.service(Arc::new(RecordingTranscoder::default()));

    let request = TransformRequest::new(fx.upload("clip.mov"))
        .with_ratio("9:16")
        .with_filter("Vintage")
        .with_crop(CropRegion::new(120.0, 0.0, 405.0, 720.0));
    let first = service.plan(&request).await.unwrap();
    let second = service.plan(&request).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.destination, fx.out_dir().join("processed_clip.mov"));
}

#[tokio::test]
async fn audio_copy_follows_probe_and_container() {
    let fx = Fixture::new();
    let settings = ServiceSettings {
        encoder: EncoderSettings {
            prefer_audio_copy: true,
            ..EncoderSettings::default()
        },
        ..fx.settings()
    };
    let transcoder: Arc<dyn Transcoder> = Arc::new(RecordingTranscoder::default());

    let aac = fx.service_with(settings.clone(), transcoder.clone(), Arc::new(FixedProbe("aac")));
    let request = TransformRequest::new(fx.upload("clip.mp4")).with_ratio("Original");
    assert_eq!(aac.plan(&request).await.unwrap().audio, AudioPolicy::PassThrough);

    let vorbis = fx.service_with(settings, transcoder, Arc::new(FixedProbe("vorbis")));
    let job = vorbis.plan(&request).await.unwrap();
    assert_eq!(
        job.audio,
        AudioPolicy::ReEncode {
            codec: "aac".to_string()
        }
    );
}

#[tokio::test]
async fn engine_failure_is_a_server_error() {
    let fx = Fixture::new();
    let service = fx.service(Arc::new(RecordingTranscoder::failing()));

    let request = TransformRequest::new(fx.upload("clip.mp4")).with_ratio("Original");
    let err = service.process(&request).await.unwrap_err();
    assert!(matches!(err, ReframeError::TranscodeFailed { .. }));
    assert_eq!(err.http_status(), 500);
    assert!(!fx.out_dir().join("processed_clip.mp4.render.json").exists());
}

#[tokio::test]
async fn batch_is_bounded_and_ordered() {
    let fx = Fixture::new();
    let transcoder = Arc::new(RecordingTranscoder::slow(Duration::from_millis(40)));
    let settings = ServiceSettings {
        max_concurrent_jobs: 2,
        ..fx.settings()
    };
    let service = Arc::new(fx.service_with(settings, transcoder.clone(), Arc::new(NoProbe)));

    let mut requests: Vec<TransformRequest> = (0..5)
        .map(|i| TransformRequest::new(fx.upload(&format!("clip{i}.mp4"))).with_ratio("Original"))
        .collect();
    requests[2] = TransformRequest::new(fx.upload("clip2.mp4"))
        .with_ratio("1:1")
        .with_crop(CropRegion::new(0.0, 0.0, 100.0, -1.0));

    let results = service.process_batch(requests).await;
    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        if i == 2 {
            assert!(matches!(
                result,
                Err(ReframeError::InvalidCropRegion { .. })
            ));
        } else {
            let outcome = result.as_ref().unwrap();
            assert_eq!(
                outcome.destination,
                fx.out_dir().join(format!("processed_clip{i}.mp4"))
            );
        }
    }

    assert_eq!(transcoder.jobs().len(), 4);
    assert!(transcoder.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn batch_rejects_repeated_output_names() {
    let fx = Fixture::new();
    let transcoder = Arc::new(RecordingTranscoder::slow(Duration::from_millis(20)));
    let service = Arc::new(fx.service(transcoder.clone()));

    std::fs::create_dir_all(fx.dir.path().join("in/a")).unwrap();
    std::fs::create_dir_all(fx.dir.path().join("in/b")).unwrap();
    let first = fx.upload("a/clip.mp4");
    let requests = vec![
        TransformRequest::new(first.clone()).with_ratio("Original"),
        TransformRequest::new(fx.upload("b/clip.mp4")).with_ratio("Original"),
    ];

    let results = service.process_batch(requests).await;
    let outcome = results[0].as_ref().unwrap();
    let destination = fx.out_dir().join("processed_clip.mp4");
    assert_eq!(outcome.destination, destination);
    match &results[1] {
        Err(ReframeError::DestinationConflict { path }) => assert_eq!(path, &destination),
        other => panic!("expected DestinationConflict, got {other:?}"),
    }

    let jobs = transcoder.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].inputs, vec![first.path().to_path_buf()]);
    assert_eq!(std::fs::read(&destination).unwrap(), b"rendered");
}

#[tokio::test]
async fn concurrent_renders_cannot_share_an_output() {
    let fx = Fixture::new();
    let transcoder = Arc::new(RecordingTranscoder::slow(Duration::from_millis(200)));
    let service = fx.service(transcoder.clone());

    std::fs::create_dir_all(fx.dir.path().join("in/a")).unwrap();
    std::fs::create_dir_all(fx.dir.path().join("in/b")).unwrap();
    let a = TransformRequest::new(fx.upload("a/clip.mp4")).with_ratio("Original");
    let b = TransformRequest::new(fx.upload("b/clip.mp4")).with_ratio("Original");

    let (ra, rb) = tokio::join!(service.process(&a), service.process(&b));
    let conflicts = [&ra, &rb]
        .iter()
        .filter(|r| matches!(r, Err(ReframeError::DestinationConflict { .. })))
        .count();
    assert_eq!(conflicts, 1);
    assert!(ra.is_ok() || rb.is_ok());
    assert_eq!(transcoder.jobs().len(), 1);

    // The hold ends with the render.
    assert!(service.process(&b).await.is_ok());
}

#[cfg(unix)]
mod subprocess {
    use super::*;
    use reframe_render_engine::{FfmpegTranscoder, FfprobeProbe};
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable shell script. `$last` is its final argument.
    fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let script = format!("#!/bin/sh\nfor last; do :; done\n{body}\n");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Stand-in for ffmpeg; `$last` is the output path.
    fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
        fake_tool(dir, "fake-ffmpeg", body)
    }

    fn service_for(fx: &Fixture, engine: PathBuf, timeout: Duration) -> RenderService {
        let settings = ServiceSettings {
            engine: engine.clone(),
            ..fx.settings()
        };
        fx.service_with(
            settings,
            Arc::new(FfmpegTranscoder::new(engine, timeout)),
            Arc::new(NoProbe),
        )
    }

    #[tokio::test]
    async fn successful_exit_produces_output() {
        let fx = Fixture::new();
        let engine = fake_ffmpeg(fx.dir.path(), "echo rendered > \"$last\"\nexit 0");
        let service = service_for(&fx, engine, Duration::from_secs(10));

        let request = TransformRequest::new(fx.upload("clip.mp4")).with_ratio("Original");
        let outcome = service.process(&request).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&outcome.destination).unwrap().trim(),
            "rendered"
        );
    }

    #[tokio::test]
    async fn non_zero_exit_removes_partial_output() {
        let fx = Fixture::new();
        let engine = fake_ffmpeg(
            fx.dir.path(),
            "echo partial > \"$last\"\necho 'Conversion failed!' >&2\nexit 1",
        );
        let service = service_for(&fx, engine, Duration::from_secs(10));

        let request = TransformRequest::new(fx.upload("clip.mp4")).with_ratio("Original");
        let err = service.process(&request).await.unwrap_err();
        match err {
            ReframeError::TranscodeFailed { stderr, .. } => {
                assert!(stderr.contains("Conversion failed!"))
            }
            other => panic!("expected TranscodeFailed, got {other}"),
        }
        assert!(!fx.out_dir().join("processed_clip.mp4").exists());
    }

    #[tokio::test]
    async fn exit_zero_without_output_is_a_failure() {
        let fx = Fixture::new();
        let engine = fake_ffmpeg(fx.dir.path(), "exit 0");
        let service = service_for(&fx, engine, Duration::from_secs(10));

        let request = TransformRequest::new(fx.upload("clip.mp4")).with_ratio("Original");
        let err = service.process(&request).await.unwrap_err();
        assert!(matches!(err, ReframeError::TranscodeFailed { .. }));
    }

    #[tokio::test]
    async fn deadline_kills_engine_and_removes_partial_output() {
        let fx = Fixture::new();
        let engine = fake_ffmpeg(fx.dir.path(), "echo partial > \"$last\"\nexec sleep 30");
        let service = service_for(&fx, engine, Duration::from_millis(500));

        let request = TransformRequest::new(fx.upload("clip.mp4")).with_ratio("Original");
        let started = std::time::Instant::now();
        let err = service.process(&request).await.unwrap_err();

        assert!(matches!(err, ReframeError::TranscodeTimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!fx.out_dir().join("processed_clip.mp4").exists());
    }

    #[tokio::test]
    async fn cancelled_render_leaves_no_partial_output() {
        let fx = Fixture::new();
        let engine = fake_ffmpeg(fx.dir.path(), "echo partial > \"$last\"\nexec sleep 30");
        let service = service_for(&fx, engine, Duration::from_secs(60));

        let request = TransformRequest::new(fx.upload("clip.mp4")).with_ratio("Original");
        let cancelled =
            tokio::time::timeout(Duration::from_millis(500), service.process(&request)).await;

        assert!(cancelled.is_err());
        assert!(!fx.out_dir().join("processed_clip.mp4").exists());
    }

    #[tokio::test]
    async fn hung_ffprobe_counts_as_unknown_codec() {
        let fx = Fixture::new();
        let binary = fake_tool(fx.dir.path(), "fake-ffprobe", "exec sleep 30");
        let ffprobe = FfprobeProbe::new(binary, Duration::from_millis(300));

        let started = std::time::Instant::now();
        let codec = ffprobe.audio_codec(&fx.dir.path().join("in/clip.mp4")).await;
        assert_eq!(codec, None);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn ffprobe_codec_is_read_from_stdout() {
        let fx = Fixture::new();
        let binary = fake_tool(fx.dir.path(), "fake-ffprobe", "echo aac\nexit 0");
        let ffprobe = FfprobeProbe::new(binary, Duration::from_secs(5));

        assert!(ffprobe.is_available().await);
        let codec = ffprobe.audio_codec(&fx.dir.path().join("in/clip.mp4")).await;
        assert_eq!(codec.as_deref(), Some("aac"));
    }

    #[tokio::test]
    async fn availability_check_runs_the_binary() {
        let fx = Fixture::new();
        let ok = FfmpegTranscoder::new(fake_ffmpeg(fx.dir.path(), "exit 0"), Duration::from_secs(5));
        assert!(ok.is_available().await);
    }
}
