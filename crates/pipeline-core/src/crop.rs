//! Crop resolution.
//!
//! Turns the user's floating-point rectangle into whole-pixel crop
//! parameters. Values are truncated toward zero, never rounded.

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_job_model::{AspectRatioOption, CropRect, CropRegion};

/// Relative deviation from the selected proportion that is worth a log line.
const PROPORTION_TOLERANCE: f64 = 0.02;

/// Resolve the crop for the chosen aspect ratio.
///
/// Returns `Ok(None)` when the ratio keeps the original frame. Frame bounds
/// are not checked here; the engine rejects out-of-frame crops.
pub fn resolve_crop(
    region: &CropRegion,
    ratio: &AspectRatioOption,
) -> ReframeResult<Option<CropRect>> {
    if ratio.keeps_original() {
        return Ok(None);
    }

    let CropRegion {
        x,
        y,
        width,
        height,
    } = *region;
    let invalid = |reason: &str| ReframeError::invalid_crop(x, y, width, height, reason);

    if ![x, y, width, height].iter().all(|v| v.is_finite()) {
        return Err(invalid("coordinates must be finite numbers"));
    }

    if x < 0.0 || y < 0.0 {
        return Err(invalid("offsets must not be negative"));
    }
    let (x_px, y_px, w_px, h_px) = (x.trunc(), y.trunc(), width.trunc(), height.trunc());
    if w_px <= 0.0 || h_px <= 0.0 {
        return Err(invalid("width and height must be positive"));
    }
    let max = u32::MAX as f64;
    if [x_px, y_px, w_px, h_px].iter().any(|v| *v > max) {
        return Err(invalid("coordinates exceed the pixel range"));
    }

    let rect = CropRect {
        x: x_px as u32,
        y: y_px as u32,
        width: w_px as u32,
        height: h_px as u32,
    };

    if let Some((rw, rh)) = ratio.proportion() {
        let expected = rw as f64 / rh as f64;
        let actual = rect.width as f64 / rect.height as f64;
        if ((actual - expected) / expected).abs() > PROPORTION_TOLERANCE {
            tracing::debug!(
                ratio = %ratio.label,
                width = rect.width,
                height = rect.height,
                "Crop rectangle does not match the selected aspect ratio"
            );
        }
    }

    Ok(Some(rect))
}
