//! Transform requests as submitted by a user.
//!
//! A [`TransformRequest`] holds raw, unresolved choices: option labels are
//! kept as strings and the crop rectangle is kept in floating point. The
//! pipeline builder turns it into a [`PipelineSpec`](crate::job::PipelineSpec).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use reframe_common::error::{ReframeError, ReframeResult};

/// Form field names understood by [`TransformRequest::from_form`].
pub mod fields {
    pub const VIDEO: &str = "video";
    pub const BACKGROUND: &str = "background";
    pub const RATIO: &str = "ratio";
    pub const FILTER: &str = "filter";
    pub const ZOOM: &str = "zoom";
    pub const GREENSCREEN: &str = "greenscreen";
    pub const CUT_SILENCE: &str = "cutsilence";
    pub const CROP_X: &str = "cropX";
    pub const CROP_Y: &str = "cropY";
    pub const CROP_W: &str = "cropW";
    pub const CROP_H: &str = "cropH";
}

/// A media file handed over by the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct SourceAsset {
    path: PathBuf,
    file_name: String,
}

impl SourceAsset {
    /// Wrap an uploaded file. Fails when the path has no file name.
    pub fn new(path: impl Into<PathBuf>) -> ReframeResult<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if file_name.trim().is_empty() {
            return Err(ReframeError::missing_input(format!(
                "no file name in {:?}",
                path.display().to_string()
            )));
        }
        Ok(Self { path, file_name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl TryFrom<PathBuf> for SourceAsset {
    type Error = ReframeError;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<SourceAsset> for PathBuf {
    fn from(asset: SourceAsset) -> Self {
        asset.path
    }
}

/// Crop rectangle in source-pixel coordinates, before truncation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Everything a user asked for in one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    /// Primary video.
    pub video: SourceAsset,

    /// Background plate; only consulted when `green_screen` is set.
    pub background: Option<SourceAsset>,

    /// Aspect-ratio label (`None` = default).
    pub ratio: Option<String>,

    /// Color-filter label (`None` = default).
    pub filter: Option<String>,

    /// Zoom label (`None` = default).
    pub zoom: Option<String>,

    pub green_screen: bool,

    pub cut_silence: bool,

    pub crop: CropRegion,
}

impl TransformRequest {
    /// A request with every option at its default.
    pub fn new(video: SourceAsset) -> Self {
        Self {
            video,
            background: None,
            ratio: None,
            filter: None,
            zoom: None,
            green_screen: false,
            cut_silence: false,
            crop: CropRegion::default(),
        }
    }

    pub fn with_ratio(mut self, label: impl Into<String>) -> Self {
        self.ratio = Some(label.into());
        self
    }

    pub fn with_filter(mut self, label: impl Into<String>) -> Self {
        self.filter = Some(label.into());
        self
    }

    pub fn with_zoom(mut self, label: impl Into<String>) -> Self {
        self.zoom = Some(label.into());
        self
    }

    pub fn with_crop(mut self, crop: CropRegion) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_green_screen(mut self, background: Option<SourceAsset>) -> Self {
        self.green_screen = true;
        self.background = background;
        self
    }

    pub fn with_cut_silence(mut self) -> Self {
        self.cut_silence = true;
        self
    }

    /// Build a request from submitted form fields.
    ///
    /// File fields carry filesystem paths already resolved by the upload
    /// collaborator. Checkbox fields are set only by the value `"on"` (or
    /// `"true"`). Missing crop fields default to 0; present but non-numeric
    /// ones are rejected.
    pub fn from_form(form: &HashMap<String, String>) -> ReframeResult<Self> {
        let video = match non_empty(form, fields::VIDEO) {
            Some(path) => SourceAsset::new(path)?,
            None => return Err(ReframeError::missing_input("no video uploaded")),
        };

        let green_screen = checkbox(form, fields::GREENSCREEN);
        let background = if green_screen {
            non_empty(form, fields::BACKGROUND)
                .map(SourceAsset::new)
                .transpose()?
        } else {
            None
        };

        Ok(Self {
            video,
            background,
            ratio: non_empty(form, fields::RATIO).map(str::to_string),
            filter: non_empty(form, fields::FILTER).map(str::to_string),
            zoom: non_empty(form, fields::ZOOM).map(str::to_string),
            green_screen,
            cut_silence: checkbox(form, fields::CUT_SILENCE),
            crop: CropRegion {
                x: float_field(form, fields::CROP_X)?,
                y: float_field(form, fields::CROP_Y)?,
                width: float_field(form, fields::CROP_W)?,
                height: float_field(form, fields::CROP_H)?,
            },
        })
    }
}

fn non_empty<'a>(form: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    form.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn checkbox(form: &HashMap<String, String>, key: &str) -> bool {
    matches!(non_empty(form, key), Some("on") | Some("true"))
}

fn float_field(form: &HashMap<String, String>, key: &str) -> ReframeResult<f64> {
    match non_empty(form, key) {
        None => Ok(0.0),
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| ReframeError::invalid_field(key, raw)),
    }
}
