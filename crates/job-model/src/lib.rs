//! Reframe Job Model
//!
//! Defines the data contracts of the transformation pipeline:
//! - **Options:** Catalogs of aspect ratios, color presets, and zoom levels
//! - **Requests:** Raw user choices and the uploaded source assets
//! - **Stages:** Typed filter stages rendered to ffmpeg syntax at the edge
//! - **Jobs:** Resolved pipeline specs and executable render jobs

pub mod job;
pub mod media;
pub mod options;
pub mod request;
pub mod stage;

pub use job::*;
pub use media::*;
pub use options::*;
pub use request::*;
pub use stage::*;
