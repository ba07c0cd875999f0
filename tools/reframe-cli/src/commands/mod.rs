pub mod batch;
pub mod check;
pub mod options;
pub mod plan;
pub mod render;

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_job_model::{CropRegion, SourceAsset, TransformRequest};

/// Request fields shared by `render` and `plan`. Flags mirror the form fields.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Video to transform
    pub video: PathBuf,

    /// Aspect ratio label, e.g. "1:1", "9:16", "Original" [default: 16:9]
    #[arg(long)]
    pub ratio: Option<String>,

    /// Color filter label, e.g. "Grayscale" [default: None]
    #[arg(long)]
    pub filter: Option<String>,

    /// Zoom label, e.g. "Slight Zoom (1.1x)" [default: None]
    #[arg(long)]
    pub zoom: Option<String>,

    /// Key out the green backdrop and composite over --background
    #[arg(long)]
    pub greenscreen: bool,

    /// Background plate for green-screen compositing
    #[arg(long, requires = "greenscreen")]
    pub background: Option<PathBuf>,

    /// Trim silent stretches from the audio
    #[arg(long)]
    pub cutsilence: bool,

    /// Crop rectangle left edge in source pixels
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub crop_x: f64,

    /// Crop rectangle top edge in source pixels
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub crop_y: f64,

    /// Crop rectangle width in source pixels
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub crop_w: f64,

    /// Crop rectangle height in source pixels
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub crop_h: f64,
}

impl RequestArgs {
    pub fn into_request(self) -> ReframeResult<TransformRequest> {
        let mut request = TransformRequest::new(SourceAsset::new(self.video)?).with_crop(
            CropRegion::new(self.crop_x, self.crop_y, self.crop_w, self.crop_h),
        );
        request.ratio = self.ratio;
        request.filter = self.filter;
        request.zoom = self.zoom;
        if self.greenscreen {
            let background = self.background.map(SourceAsset::new).transpose()?;
            request = request.with_green_screen(background);
        }
        request.cut_silence = self.cutsilence;
        Ok(request)
    }
}

/// Structured failure printed on stdout in place of a destination path.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub error: &'static str,
    pub status: u16,
    pub message: String,
}

impl ErrorReport {
    pub fn from_error(err: &ReframeError) -> Self {
        Self {
            error: err.kind(),
            status: err.http_status(),
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", self.error))
    }
}

/// Print the structured report and hand the error back for the exit status.
pub fn report_failure(err: ReframeError) -> anyhow::Error {
    println!("{}", ErrorReport::from_error(&err).to_json());
    err.into()
}
