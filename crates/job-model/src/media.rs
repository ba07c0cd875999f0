//! Output container detection and stream-copy compatibility.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Container format inferred from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mov,
    Matroska,
    WebM,
    Unknown,
}

impl Container {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp4" | "m4v" => Container::Mp4,
            "mov" => Container::Mov,
            "mkv" => Container::Matroska,
            "webm" => Container::WebM,
            _ => Container::Unknown,
        }
    }

    /// Whether an audio stream encoded with `codec` (ffprobe `codec_name`)
    /// can be copied into this container without re-encoding.
    pub fn accepts_audio_copy(self, codec: &str) -> bool {
        let codec = codec.trim().to_ascii_lowercase();
        match self {
            Container::Mp4 | Container::Mov => {
                matches!(codec.as_str(), "aac" | "mp3" | "alac" | "ac3" | "eac3" | "opus")
            }
            Container::WebM => matches!(codec.as_str(), "opus" | "vorbis"),
            Container::Matroska => !codec.is_empty(),
            Container::Unknown => false,
        }
    }
}
