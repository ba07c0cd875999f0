//! Typed filter stages and their ffmpeg text rendering.
//!
//! Pipeline logic only ever manipulates these values. The textual ffmpeg
//! syntax is produced by the `Display` impls at the very edge, when a
//! [`RenderJob`](crate::job::RenderJob) is turned into arguments.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One side of a crop rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extent {
    /// Absolute pixel count.
    Pixels(u32),
    /// The width of the stage's input frame (`iw`).
    InputWidth,
    /// The height of the stage's input frame (`ih`).
    InputHeight,
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Pixels(px) => write!(f, "{px}"),
            Extent::InputWidth => f.write_str("iw"),
            Extent::InputHeight => f.write_str("ih"),
        }
    }
}

/// Color adjustments offered as filter presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorAdjust {
    Grayscale,
    Sepia,
    Invert,
    /// Additive brightness shift in `[-1.0, 1.0]`.
    Brightness { delta: f64 },
    /// Saturation multiplier (1.0 = unchanged).
    Saturation { factor: f64 },
}

impl fmt::Display for ColorAdjust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorAdjust::Grayscale => f.write_str("hue=s=0"),
            ColorAdjust::Sepia => f.write_str(
                "colorchannelmixer=.393:.769:.189:0:.349:.686:.168:0:.272:.534:.131",
            ),
            ColorAdjust::Invert => f.write_str("negate"),
            ColorAdjust::Brightness { delta } => write!(f, "eq=brightness={delta}"),
            ColorAdjust::Saturation { factor } => write!(f, "eq=saturation={factor}"),
        }
    }
}

/// Parameters of ffmpeg's `silenceremove` audio filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceRemove {
    /// Silent periods at the start that must be seen before trimming begins.
    pub start_periods: u32,
    pub start_threshold_db: f64,
    pub start_silence_secs: f64,
    /// Negative means trim every qualifying silent span.
    pub stop_periods: i32,
    pub stop_threshold_db: f64,
    pub stop_silence_secs: f64,
}

impl fmt::Display for SilenceRemove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "silenceremove=start_periods={}:start_threshold={}dB:start_silence={}:stop_periods={}:stop_threshold={}dB:stop_silence={}",
            self.start_periods,
            self.start_threshold_db,
            self.start_silence_secs,
            self.stop_periods,
            self.stop_threshold_db,
            self.stop_silence_secs,
        )
    }
}

/// A single filter invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum FilterStage {
    /// Cut a `width`x`height` window, optionally anchored at a pixel offset.
    Crop {
        width: Extent,
        height: Extent,
        offset: Option<(u32, u32)>,
    },
    /// Scale both axes by the same factor.
    Scale { factor: f64 },
    ColorAdjust(ColorAdjust),
    /// Key out `color` (0xRRGGBB) to transparency.
    ChromaKey {
        color: u32,
        similarity: f64,
        blend: f64,
    },
    /// Overlay the second input onto the first.
    Overlay { pixel_format: String },
    SilenceRemove(SilenceRemove),
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStage::Crop {
                width,
                height,
                offset,
            } => {
                write!(f, "crop={width}:{height}")?;
                if let Some((x, y)) = offset {
                    write!(f, ":{x}:{y}")?;
                }
                Ok(())
            }
            FilterStage::Scale { factor } => write!(f, "scale=iw*{factor}:ih*{factor}"),
            FilterStage::ColorAdjust(adjust) => write!(f, "{adjust}"),
            FilterStage::ChromaKey {
                color,
                similarity,
                blend,
            } => write!(f, "chromakey=0x{color:06X}:{similarity}:{blend}"),
            FilterStage::Overlay { pixel_format } => write!(f, "overlay=format={pixel_format}"),
            FilterStage::SilenceRemove(params) => write!(f, "{params}"),
        }
    }
}

/// Linear sequence of single-input stages, joined with `,`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterChain {
    pub stages: Vec<FilterStage>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: FilterStage) {
        self.stages.push(stage);
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }
}

impl From<Vec<FilterStage>> for FilterChain {
    fn from(stages: Vec<FilterStage>) -> Self {
        Self { stages }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

/// Named pad in a filter graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamLabel {
    /// Video stream of the input file at this position (`[N:v]`).
    InputVideo(usize),
    /// Intermediate stream (`[name]`).
    Named(String),
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamLabel::InputVideo(index) => write!(f, "[{index}:v]"),
            StreamLabel::Named(name) => write!(f, "[{name}]"),
        }
    }
}

/// A chain with explicit input and output pads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub inputs: Vec<StreamLabel>,
    pub chain: FilterChain,
    /// Empty for the graph's final, auto-mapped output.
    pub outputs: Vec<StreamLabel>,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.inputs {
            write!(f, "{label}")?;
        }
        write!(f, "{}", self.chain)?;
        for label in &self.outputs {
            write!(f, "{label}")?;
        }
        Ok(())
    }
}

/// Multi-input graph, nodes joined with `;`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterGraph {
    pub nodes: Vec<GraphNode>,
}

impl FilterGraph {
    /// Number of distinct input files the graph reads from.
    pub fn input_count(&self) -> usize {
        let mut seen: Vec<usize> = self
            .nodes
            .iter()
            .flat_map(|node| node.inputs.iter())
            .filter_map(|label| match label {
                StreamLabel::InputVideo(index) => Some(*index),
                StreamLabel::Named(_) => None,
            })
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}
