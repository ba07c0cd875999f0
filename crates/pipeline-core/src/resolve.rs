//! Request resolution: labels and raw values in, [`PipelineSpec`] out.

use reframe_common::error::ReframeResult;
use reframe_job_model::{OptionRegistry, PipelineSpec, TransformRequest, VideoPlan};

use crate::crop::resolve_crop;

/// Resolve a request against the option catalogs.
///
/// Green-screen mode with a background replaces the whole linear chain;
/// crop, zoom, and color choices are then ignored and the crop rectangle is
/// not validated. Green-screen without a background falls back to the chain.
pub fn build_pipeline_spec(
    request: &TransformRequest,
    registry: &OptionRegistry,
) -> ReframeResult<PipelineSpec> {
    let video = match (request.green_screen, &request.background) {
        (true, Some(background)) => {
            if has_chain_choices(request, registry) {
                tracing::info!(
                    source = %request.video.file_name(),
                    "Crop, zoom, and color options are ignored in green-screen mode"
                );
            }
            VideoPlan::Composite {
                background: background.clone(),
            }
        }
        (green_screen, _) => {
            if green_screen {
                tracing::warn!(
                    source = %request.video.file_name(),
                    "Green-screen requested without a background, using the filter chain"
                );
            }
            let ratio = registry.aspect_ratio(request.ratio.as_deref());
            VideoPlan::Chain {
                crop: resolve_crop(&request.crop, ratio)?,
                zoom: registry.zoom(request.zoom.as_deref()).factor,
                color: registry.filter(request.filter.as_deref()).adjustment.clone(),
            }
        }
    };

    Ok(PipelineSpec {
        source: request.video.clone(),
        video,
        silence_removal: request.cut_silence,
    })
}

fn has_chain_choices(request: &TransformRequest, registry: &OptionRegistry) -> bool {
    registry.zoom(request.zoom.as_deref()).is_zoomed()
        || !registry.filter(request.filter.as_deref()).is_identity()
        || request.crop.width > 0.0
        || request.crop.height > 0.0
}
