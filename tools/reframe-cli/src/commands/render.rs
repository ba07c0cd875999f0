//! Render one video.

use reframe_common::config::AppConfig;
use reframe_job_model::TransformRequest;
use reframe_render_engine::RenderService;

use super::{report_failure, RequestArgs};

pub async fn run(config: &AppConfig, args: RequestArgs, cleanup_inputs: bool) -> anyhow::Result<()> {
    let service = RenderService::from_config(config)?;
    let request = args.into_request().map_err(report_failure)?;

    let outcome = service.process(&request).await.map_err(report_failure)?;
    println!("{}", outcome.destination.display());

    if cleanup_inputs {
        remove_inputs(&request).await;
    }
    Ok(())
}

async fn remove_inputs(request: &TransformRequest) {
    let inputs = std::iter::once(&request.video).chain(request.background.as_ref());
    for asset in inputs {
        match tokio::fs::remove_file(asset.path()).await {
            Ok(()) => tracing::info!(path = %asset.path().display(), "Removed input"),
            Err(err) => tracing::warn!(
                error = %err,
                path = %asset.path().display(),
                "Failed to remove input"
            ),
        }
    }
}
