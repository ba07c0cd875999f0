//! Render every request in a JSON manifest.
//!
//! The manifest is an array of form-field maps, the same fields a web form
//! submits. Relative `video` and `background` paths resolve against the
//! manifest's directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reframe_common::config::AppConfig;
use reframe_common::error::{ReframeError, ReframeResult};
use reframe_job_model::{fields, TransformRequest};
use reframe_render_engine::{RenderOutcome, RenderService};

use super::ErrorReport;

pub async fn run(config: &AppConfig, manifest: PathBuf) -> anyhow::Result<()> {
    let service = Arc::new(RenderService::from_config(config)?);
    let parsed = load_manifest(&manifest)?;
    let total = parsed.len();

    let results = render_all(&service, parsed).await;

    let mut failed = 0;
    for (index, result) in results.iter().enumerate() {
        match result {
            Ok(outcome) => println!("[{index}] {}", outcome.destination.display()),
            Err(err) => {
                failed += 1;
                println!("[{index}] {}", ErrorReport::from_error(err).to_json());
            }
        }
    }

    println!();
    println!("{} rendered, {failed} failed", total - failed);
    if failed > 0 {
        return Err(anyhow::anyhow!("{failed} of {total} requests failed"));
    }
    Ok(())
}

fn load_manifest(path: &Path) -> anyhow::Result<Vec<ReframeResult<TransformRequest>>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read manifest {}: {e}", path.display()))?;
    let forms: Vec<HashMap<String, String>> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid manifest {}: {e}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(forms
        .into_iter()
        .map(|form| TransformRequest::from_form(&resolve_paths(form, base)))
        .collect())
}

fn resolve_paths(mut form: HashMap<String, String>, base: &Path) -> HashMap<String, String> {
    for key in [fields::VIDEO, fields::BACKGROUND] {
        if let Some(value) = form.get_mut(key) {
            let path = PathBuf::from(value.trim());
            if !path.as_os_str().is_empty() && path.is_relative() {
                *value = base.join(path).display().to_string();
            }
        }
    }
    form
}

/// Render the well-formed requests; malformed ones keep their slot.
async fn render_all(
    service: &Arc<RenderService>,
    parsed: Vec<ReframeResult<TransformRequest>>,
) -> Vec<ReframeResult<RenderOutcome>> {
    let mut slots: Vec<Option<ReframeResult<RenderOutcome>>> = Vec::with_capacity(parsed.len());
    let mut requests = Vec::new();
    for entry in parsed {
        match entry {
            Ok(request) => {
                requests.push(request);
                slots.push(None);
            }
            Err(err) => slots.push(Some(Err(err))),
        }
    }

    let mut rendered = service.process_batch(requests).await.into_iter();
    slots
        .into_iter()
        .map(|slot| match slot {
            Some(result) => result,
            None => rendered.next().unwrap_or_else(|| {
                Err(ReframeError::Other(anyhow::anyhow!("batch result missing")))
            }),
        })
        .collect()
}
