//! `nodepanel show` — open the details panel for one node.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing::info;

use super::context::{AppContext, NodeSelector};
use crate::config::Config;
use crate::panel::controller::PanelController;

pub struct ShowArgs {
    pub node: NodeSelector,
    pub advanced: bool,
    pub watch: bool,
    pub copy_json: bool,
    pub open: bool,
    pub format: String,
    pub state_file: Option<PathBuf>,
}

pub fn run(config: Config, args: ShowArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(config, args))
}

async fn run_async(config: Config, args: ShowArgs) -> Result<()> {
    let ctx = AppContext::new(config, &args.format, args.state_file.clone())?;
    let target = ctx.target(&args.node).await?;
    if !ctx.commands.show_node_details(target.as_ref()).await {
        return Ok(());
    }

    let controller = &ctx.controller;
    if args.advanced {
        controller
            .handle_message(&json!({"type": "loadAdvancedNodeDetails"}))
            .await;
    }
    if args.open {
        if let Some(target) = controller.current_target().await {
            controller
                .handle_message(&json!({"type": "openExternal", "url": target.node_url}))
                .await;
        }
    }
    if args.copy_json {
        controller
            .handle_message(&json!({"type": "copyNodeJson", "content": ""}))
            .await;
    }

    if args.watch && ctx.config.watch_interval_secs > 0 {
        let interval = Duration::from_secs(ctx.config.watch_interval_secs);
        info!(interval_secs = interval.as_secs(), "watching node");
        let watcher = tokio::spawn(watch(controller.clone(), interval));
        controller
            .register_teardown(Box::new(move || watcher.abort()))
            .await;

        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C, closing panel");
    }

    controller.dispose().await;
    Ok(())
}

/// Post periodic refresh requests until the panel goes away.
async fn watch(controller: Arc<PanelController>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // Skip the first tick, the initial load already ran
    interval.tick().await;
    loop {
        interval.tick().await;
        if !controller.is_open().await {
            break;
        }
        controller
            .handle_message(&json!({"type": "refreshNodeDetails"}))
            .await;
    }
}
