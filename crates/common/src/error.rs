//! Error types shared across Reframe crates.

use std::path::PathBuf;

/// Top-level error type for Reframe operations.
#[derive(Debug, thiserror::Error)]
pub enum ReframeError {
    /// No primary video was supplied, or its file name is empty.
    #[error("Missing input: {message}")]
    MissingInput { message: String },

    /// A request field was present but could not be parsed.
    #[error("Invalid value for field `{field}`: {value:?}")]
    InvalidField { field: String, value: String },

    /// Crop rectangle is unusable while a crop was requested.
    #[error("Invalid crop region {width}x{height}+{x}+{y}: {reason}")]
    InvalidCropRegion {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        reason: String,
    },

    /// The transcoding engine exited unsuccessfully.
    #[error("Transcode failed ({status}): {stderr}")]
    TranscodeFailed { status: String, stderr: String },

    /// The transcoding engine ran past its deadline and was killed.
    #[error("Transcode timed out after {secs}s")]
    TranscodeTimedOut { secs: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Another render is already writing the same output file.
    #[error("Output {path} is already claimed by another render")]
    DestinationConflict { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReframeError.
pub type ReframeResult<T> = Result<T, ReframeError>;

impl ReframeError {
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput {
            message: msg.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn invalid_crop(x: f64, y: f64, width: f64, height: f64, reason: impl Into<String>) -> Self {
        Self::InvalidCropRegion {
            x,
            y,
            width,
            height,
            reason: reason.into(),
        }
    }

    pub fn transcode_failed(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::TranscodeFailed {
            status: status.into(),
            stderr: stderr.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether the request itself was at fault (as opposed to the engine or host).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInput { .. }
                | Self::InvalidField { .. }
                | Self::InvalidCropRegion { .. }
                | Self::FileNotFound { .. }
                | Self::DestinationConflict { .. }
        )
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput { .. } => "missing_input",
            Self::InvalidField { .. } => "invalid_field",
            Self::InvalidCropRegion { .. } => "invalid_crop_region",
            Self::TranscodeFailed { .. } => "transcode_failed",
            Self::TranscodeTimedOut { .. } => "transcode_timed_out",
            Self::Config { .. } => "config",
            Self::FileNotFound { .. } => "file_not_found",
            Self::DestinationConflict { .. } => "destination_conflict",
            Self::Unsupported { .. } => "unsupported",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }

    /// HTTP-equivalent status for the response collaborator.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::DestinationConflict { .. } => 409,
            _ if self.is_client_error() => 400,
            _ => 500,
        }
    }
}
