//! Check that the external tools are usable.

use reframe_common::config::AppConfig;
use std::time::Duration;

use reframe_render_engine::{FfmpegTranscoder, FfprobeProbe, Transcoder};

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Reframe System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = FfmpegTranscoder::new(
        config.transcoder.ffmpeg_binary.clone(),
        Duration::from_secs(config.transcoder.timeout_secs),
    );
    let ffmpeg_ok = ffmpeg.is_available().await;
    print_status(ffmpeg_ok, "ffmpeg", &ffmpeg.binary().display().to_string());

    let ffprobe = FfprobeProbe::new(
        config.transcoder.ffprobe_binary.clone(),
        Duration::from_secs(config.transcoder.probe_timeout_secs),
    );
    let ffprobe_ok = ffprobe.is_available().await;
    print_status(ffprobe_ok, "ffprobe", &ffprobe.binary().display().to_string());

    println!(
        "[OK] Output: {}/{}<name>",
        config.output_dir.display(),
        config.output_prefix
    );
    println!(
        "     Codecs: video {}, audio {} (copy preferred: {})",
        config.transcoder.video_codec,
        config.transcoder.audio_codec,
        config.transcoder.prefer_audio_copy
    );

    println!();
    if ffmpeg_ok {
        if !ffprobe_ok && config.transcoder.prefer_audio_copy {
            println!("ffprobe is missing; audio will always be re-encoded.");
        }
        println!("Reframe is ready.");
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "ffmpeg not found at {}",
            config.transcoder.ffmpeg_binary.display()
        ))
    }
}

fn print_status(ok: bool, name: &str, binary: &str) {
    if ok {
        println!("[OK] {name}: {binary}");
    } else {
        println!("[MISSING] {name}: {binary}");
    }
}
