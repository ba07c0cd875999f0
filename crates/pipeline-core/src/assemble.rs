//! Render job assembly.

use std::path::{Path, PathBuf};

use reframe_job_model::{
    Container, EncoderSettings, PipelineSpec, RenderJob, SourceAsset, VideoFilter, VideoPlan,
};

use crate::audio::{select_audio_policy, AudioContext};
use crate::chain::compose_chain;
use crate::composite::{build_composite_graph, composite_inputs};

/// Output path for a source: `<output_dir>/<prefix><file name>`.
pub fn destination_for(source: &SourceAsset, output_dir: &Path, prefix: &str) -> PathBuf {
    output_dir.join(format!("{prefix}{}", source.file_name()))
}

/// Whether the audio policy depends on the source's audio codec.
pub fn needs_audio_probe(spec: &PipelineSpec, encoder: &EncoderSettings) -> bool {
    encoder.prefer_audio_copy && !spec.silence_removal && !spec.video.is_composite()
}

/// Combine the video path and the audio policy into one job.
///
/// `source_audio_codec` is the probed codec of the primary input, if known.
pub fn assemble_render_job(
    spec: &PipelineSpec,
    encoder: &EncoderSettings,
    source_audio_codec: Option<&str>,
    destination: PathBuf,
) -> RenderJob {
    let (inputs, video_filter) = match &spec.video {
        VideoPlan::Chain { crop, zoom, color } => {
            let chain = compose_chain(crop.as_ref(), *zoom, color.as_ref());
            let filter = (!chain.is_empty()).then_some(VideoFilter::Chain(chain));
            (vec![spec.source.path().to_path_buf()], filter)
        }
        VideoPlan::Composite { background } => (
            composite_inputs(background, &spec.source),
            Some(VideoFilter::Graph(build_composite_graph())),
        ),
    };

    let audio = select_audio_policy(
        &AudioContext {
            silence_removal: spec.silence_removal,
            composite: spec.video.is_composite(),
            container: Container::from_path(&destination),
            source_codec: source_audio_codec,
        },
        encoder,
    );

    RenderJob {
        inputs,
        video_filter,
        audio,
        video_codec: encoder.video_codec.clone(),
        destination,
        overwrite: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_job_model::AudioPolicy;

    fn chain_spec(zoom: f64) -> PipelineSpec {
        PipelineSpec {
            source: SourceAsset::new("uploads/clip.mp4").unwrap(),
            video: VideoPlan::Chain {
                crop: None,
                zoom,
                color: None,
            },
            silence_removal: false,
        }
    }

    #[test]
    fn test_destination_uses_prefix() {
        let source = SourceAsset::new("incoming/clip.mov").unwrap();
        assert_eq!(
            destination_for(&source, Path::new("uploads"), "processed_"),
            PathBuf::from("uploads/processed_clip.mov")
        );
    }

    #[test]
    fn test_empty_chain_omits_video_filter() {
        let job = assemble_render_job(
            &chain_spec(1.0),
            &EncoderSettings::default(),
            None,
            PathBuf::from("out/processed_clip.mp4"),
        );
        assert_eq!(job.video_filter, None);
        assert!(!job.to_args().iter().any(|a| a == "-vf"));
    }

    #[test]
    fn test_zoom_produces_chain_filter() {
        let job = assemble_render_job(
            &chain_spec(1.25),
            &EncoderSettings::default(),
            None,
            PathBuf::from("out/processed_clip.mp4"),
        );
        match job.video_filter {
            Some(VideoFilter::Chain(chain)) => {
                assert_eq!(chain.to_string(), "scale=iw*1.25:ih*1.25,crop=iw:ih")
            }
            other => panic!("expected chain, got {other:?}"),
        }
    }

    #[test]
    fn test_pass_through_uses_destination_container() {
        let encoder = EncoderSettings {
            prefer_audio_copy: true,
            ..EncoderSettings::default()
        };
        let spec = chain_spec(1.0);
        assert!(needs_audio_probe(&spec, &encoder));

        let mp4 = assemble_render_job(&spec, &encoder, Some("aac"), PathBuf::from("o/a.mp4"));
        assert_eq!(mp4.audio, AudioPolicy::PassThrough);

        let webm = assemble_render_job(&spec, &encoder, Some("aac"), PathBuf::from("o/a.webm"));
        assert!(!webm.audio.is_pass_through());
    }
}
