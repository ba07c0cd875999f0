//! Dry run: show what `render` would execute.

use reframe_common::config::AppConfig;
use reframe_render_engine::RenderService;

use super::{report_failure, RequestArgs};

pub async fn run(config: &AppConfig, args: RequestArgs, json: bool) -> anyhow::Result<()> {
    let service = RenderService::from_config(config)?;
    let request = args.into_request().map_err(report_failure)?;
    let job = service.plan(&request).await.map_err(report_failure)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        println!("{}", job.command_line(&service.settings().engine));
    }
    Ok(())
}
