//! Reframe Pipeline Core
//!
//! Turns a transform request into a render job:
//! - **Resolve:** Look up option labels and validate the crop rectangle
//! - **Chain:** Compose crop, zoom, and color stages in their fixed order
//! - **Composite:** Build the two-input chroma-key graph for green-screen mode
//! - **Audio:** Choose pass-through, re-encode, or silence removal
//! - **Assemble:** Combine everything into one [`RenderJob`](reframe_job_model::RenderJob)
//!
//! This crate is pure computation: no I/O, no subprocesses.
//! The same request always yields the same job.

pub mod assemble;
pub mod audio;
pub mod chain;
pub mod composite;
pub mod crop;
pub mod resolve;

pub use assemble::{assemble_render_job, destination_for, needs_audio_probe};
pub use audio::{select_audio_policy, AudioContext};
pub use chain::compose_chain;
pub use composite::build_composite_graph;
pub use crop::resolve_crop;
pub use resolve::build_pipeline_spec;
