//! List the option catalogs.

use reframe_common::config::AppConfig;
use reframe_job_model::{OptionKind, DEFAULT_FILTER, DEFAULT_RATIO, DEFAULT_ZOOM};
use reframe_render_engine::load_registry;

pub fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let registry = load_registry(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registry)?);
        return Ok(());
    }

    println!("Aspect ratios (--ratio):");
    for option in registry.aspect_ratios() {
        println!(
            "  {:<10} {}{}",
            option.label,
            option.description,
            default_marker(&option.label, DEFAULT_RATIO)
        );
    }

    println!();
    println!("Filters (--filter):");
    for preset in registry.filters() {
        let expression = if preset.is_identity() {
            "-".to_string()
        } else {
            preset.engine_expression()
        };
        println!(
            "  {:<18} {}{}",
            preset.label,
            expression,
            default_marker(&preset.label, DEFAULT_FILTER)
        );
    }

    println!();
    println!("Zoom levels (--zoom):");
    for zoom in registry.zooms() {
        println!(
            "  {:<22} {:.2}x{}",
            zoom.label,
            zoom.factor,
            default_marker(&zoom.label, DEFAULT_ZOOM)
        );
    }

    tracing::debug!(
        ratios = registry.labels(OptionKind::AspectRatio).len(),
        filters = registry.labels(OptionKind::Filter).len(),
        zooms = registry.labels(OptionKind::Zoom).len(),
        "Listed option catalogs"
    );
    Ok(())
}

fn default_marker(label: &str, default: &str) -> &'static str {
    if label == default {
        " (default)"
    } else {
        ""
    }
}
