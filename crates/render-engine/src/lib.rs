//! Reframe Render Engine
//!
//! The I/O side of Reframe: checks that uploaded sources exist, probes the
//! source audio when needed, runs ffmpeg with a deadline, and writes a
//! report next to each finished output.
//!
//! # Request Flow
//!
//! ```text
//! TransformRequest
//!        │
//!        ├── build_pipeline_spec (crop validation, catalog lookups)
//!        ├── inputs exist?
//!        ├── ffprobe (only when audio copy is possible)
//!        ▼
//!    RenderJob ──► ffmpeg (timeout, kill on drop) ──► uploads/processed_<name>
//!                        │                                     │
//!                        └── failure or cancel:                └── <name>.render.json
//!                            partial output removed
//! ```

pub mod probe;
pub mod report;
pub mod service;
pub mod transcode;

pub use probe::{FfprobeProbe, MediaProbe, NoProbe};
pub use report::RenderReport;
pub use service::{load_registry, RenderOutcome, RenderService, ServiceSettings};
pub use transcode::{FfmpegTranscoder, TranscodeOutput, Transcoder, VERSION_CHECK_TIMEOUT};
