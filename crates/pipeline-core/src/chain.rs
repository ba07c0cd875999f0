//! Linear filter chain composition.
//!
//! Stage order is fixed: crop, then zoom, then color. Zoom is expressed
//! relative to the already-cropped frame, and color runs on the final
//! framing only.

use reframe_job_model::{ColorAdjust, CropRect, Extent, FilterChain, FilterStage};

/// Compose the chain for the non-composited path.
///
/// Inactive stages are left out; the result may be empty.
pub fn compose_chain(
    crop: Option<&CropRect>,
    zoom: f64,
    color: Option<&ColorAdjust>,
) -> FilterChain {
    let mut chain = FilterChain::new();

    if let Some(rect) = crop {
        chain.push(rect.to_stage());
    }

    if zoom > 1.0 {
        chain.push(FilterStage::Scale { factor: zoom });
        chain.push(FilterStage::Crop {
            width: Extent::InputWidth,
            height: Extent::InputHeight,
            offset: None,
        });
    }

    if let Some(adjust) = color {
        chain.push(FilterStage::ColorAdjust(adjust.clone()));
    }

    chain
}
