//! Green-screen compositing graph.
//!
//! Input 0 is the background plate, input 1 the green-screen foreground.
//! The key parameters are fixed and not user-configurable.

use std::path::PathBuf;

use reframe_job_model::{FilterGraph, FilterStage, GraphNode, SourceAsset, StreamLabel};

/// Pure green.
pub const KEY_COLOR: u32 = 0x00FF00;
pub const KEY_SIMILARITY: f64 = 0.3;
pub const KEY_BLEND: f64 = 0.1;
pub const OVERLAY_PIXEL_FORMAT: &str = "yuv420";

pub const BACKGROUND_INPUT: usize = 0;
pub const FOREGROUND_INPUT: usize = 1;

const KEYED_LABEL: &str = "fg";

/// Build `[1:v]chromakey=...[fg];[0:v][fg]overlay=...`.
pub fn build_composite_graph() -> FilterGraph {
    let keyed = StreamLabel::Named(KEYED_LABEL.to_string());

    let key = GraphNode {
        inputs: vec![StreamLabel::InputVideo(FOREGROUND_INPUT)],
        chain: vec![FilterStage::ChromaKey {
            color: KEY_COLOR,
            similarity: KEY_SIMILARITY,
            blend: KEY_BLEND,
        }]
        .into(),
        outputs: vec![keyed.clone()],
    };

    let overlay = GraphNode {
        inputs: vec![StreamLabel::InputVideo(BACKGROUND_INPUT), keyed],
        chain: vec![FilterStage::Overlay {
            pixel_format: OVERLAY_PIXEL_FORMAT.to_string(),
        }]
        .into(),
        outputs: vec![],
    };

    FilterGraph {
        nodes: vec![key, overlay],
    }
}

/// Input list matching the graph's indices.
pub fn composite_inputs(background: &SourceAsset, foreground: &SourceAsset) -> Vec<PathBuf> {
    let mut inputs = vec![PathBuf::new(); 2];
    inputs[BACKGROUND_INPUT] = background.path().to_path_buf();
    inputs[FOREGROUND_INPUT] = foreground.path().to_path_buf();
    inputs
}
