//! Audio policy selection.

use reframe_job_model::{AudioPolicy, Container, EncoderSettings, SilenceRemove};

/// Silence trimming thresholds. Trimming starts after one silent period and
/// then removes every qualifying span.
pub const SILENCE_REMOVE: SilenceRemove = SilenceRemove {
    start_periods: 1,
    start_threshold_db: -35.0,
    start_silence_secs: 0.5,
    stop_periods: -1,
    stop_threshold_db: -35.0,
    stop_silence_secs: 0.5,
};

/// Facts about the job that constrain the audio policy.
#[derive(Debug, Clone, Copy)]
pub struct AudioContext<'a> {
    pub silence_removal: bool,
    /// Compositing reads two inputs, so the audio source is not a single
    /// known stream.
    pub composite: bool,
    /// Output container.
    pub container: Container,
    /// Codec of the primary input's first audio stream, when probed.
    pub source_codec: Option<&'a str>,
}

/// Pick exactly one audio policy.
pub fn select_audio_policy(ctx: &AudioContext<'_>, encoder: &EncoderSettings) -> AudioPolicy {
    if ctx.silence_removal {
        return AudioPolicy::SilenceRemoval {
            filter: SILENCE_REMOVE,
            codec: encoder.audio_codec.clone(),
        };
    }

    let copy_allowed = encoder.prefer_audio_copy
        && !ctx.composite
        && ctx
            .source_codec
            .is_some_and(|codec| ctx.container.accepts_audio_copy(codec));

    if copy_allowed {
        AudioPolicy::PassThrough
    } else {
        AudioPolicy::ReEncode {
            codec: encoder.audio_codec.clone(),
        }
    }
}
