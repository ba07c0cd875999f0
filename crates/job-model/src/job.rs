//! Resolved pipelines and executable render jobs.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::request::SourceAsset;
use crate::stage::{ColorAdjust, Extent, FilterChain, FilterGraph, FilterStage, SilenceRemove};

/// Crop rectangle truncated to whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn to_stage(self) -> FilterStage {
        FilterStage::Crop {
            width: Extent::Pixels(self.width),
            height: Extent::Pixels(self.height),
            offset: Some((self.x, self.y)),
        }
    }
}

/// How the video stream is transformed. The two shapes never mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum VideoPlan {
    /// Single-input linear chain.
    Chain {
        crop: Option<CropRect>,
        zoom: f64,
        color: Option<ColorAdjust>,
    },
    /// Chroma-key the primary video over a background plate.
    Composite { background: SourceAsset },
}

impl VideoPlan {
    pub fn is_composite(&self) -> bool {
        matches!(self, VideoPlan::Composite { .. })
    }
}

/// Fully resolved description of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Primary (foreground) video.
    pub source: SourceAsset,
    pub video: VideoPlan,
    pub silence_removal: bool,
}

/// What happens to the audio stream. Exactly one per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum AudioPolicy {
    /// Copy the encoded stream as-is.
    PassThrough,
    /// Decode and re-encode without modification.
    ReEncode { codec: String },
    /// Trim silent spans, then re-encode.
    SilenceRemoval { filter: SilenceRemove, codec: String },
}

impl AudioPolicy {
    /// Value for `-c:a`.
    pub fn codec_arg(&self) -> &str {
        match self {
            AudioPolicy::PassThrough => "copy",
            AudioPolicy::ReEncode { codec } | AudioPolicy::SilenceRemoval { codec, .. } => codec,
        }
    }

    /// Audio filter stage, if any.
    pub fn filter(&self) -> Option<FilterStage> {
        match self {
            AudioPolicy::SilenceRemoval { filter, .. } => {
                Some(FilterStage::SilenceRemove(*filter))
            }
            _ => None,
        }
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, AudioPolicy::PassThrough)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioPolicy::PassThrough => "pass_through",
            AudioPolicy::ReEncode { .. } => "re_encode",
            AudioPolicy::SilenceRemoval { .. } => "silence_removal",
        }
    }
}

/// Video filter argument of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "filter", rename_all = "snake_case")]
pub enum VideoFilter {
    /// Passed with `-vf`.
    Chain(FilterChain),
    /// Passed with `-filter_complex`.
    Graph(FilterGraph),
}

impl VideoFilter {
    pub fn flag(&self) -> &'static str {
        match self {
            VideoFilter::Chain(_) => "-vf",
            VideoFilter::Graph(_) => "-filter_complex",
        }
    }

    pub fn render(&self) -> String {
        match self {
            VideoFilter::Chain(chain) => chain.to_string(),
            VideoFilter::Graph(graph) => graph.to_string(),
        }
    }
}

/// Encoder choices shared by every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub video_codec: String,
    pub audio_codec: String,
    /// Allow audio stream copy when nothing forces a re-encode.
    pub prefer_audio_copy: bool,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            prefer_audio_copy: false,
        }
    }
}

/// Complete instruction set for one ffmpeg invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    /// Input files in `-i` order.
    pub inputs: Vec<PathBuf>,
    /// `None` leaves the video stream unfiltered.
    pub video_filter: Option<VideoFilter>,
    pub audio: AudioPolicy,
    pub video_codec: String,
    pub destination: PathBuf,
    pub overwrite: bool,
}

impl RenderJob {
    /// Ordered ffmpeg argument list (program name excluded).
    ///
    /// Paths are passed through as raw OS strings, byte for byte.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            if self.overwrite { "-y" } else { "-n" }.into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostats".into(),
        ];

        for input in &self.inputs {
            args.push("-i".into());
            args.push(input.as_os_str().to_owned());
        }

        if let Some(filter) = &self.video_filter {
            args.push(filter.flag().into());
            args.push(filter.render().into());
        }

        if let Some(stage) = self.audio.filter() {
            args.push("-af".into());
            args.push(stage.to_string().into());
        }

        args.push("-c:v".into());
        args.push(self.video_codec.clone().into());
        args.push("-c:a".into());
        args.push(self.audio.codec_arg().into());

        args.push(self.destination.as_os_str().to_owned());
        args
    }

    /// Shell-pasteable command line for logs and dry runs. Lossy for paths
    /// that are not valid UTF-8.
    pub fn command_line(&self, program: &Path) -> String {
        std::iter::once(program.as_os_str().to_owned())
            .chain(self.to_args())
            .map(|arg| shell_quote(&arg.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
