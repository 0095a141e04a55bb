//! `nodepanel offline|online|launch` — node actions.

use anyhow::Result;

use super::context::{AppContext, NodeSelector};
use super::target::NodeAction;
use crate::config::Config;

pub fn run(config: Config, action: NodeAction, node: NodeSelector) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(config, action, node))
}

async fn run_async(config: Config, action: NodeAction, node: NodeSelector) -> Result<()> {
    let ctx = AppContext::new(config, "table", None)?;
    let target = ctx.target(&node).await?;

    match action {
        NodeAction::TakeOffline { reason } => ctx.commands.take_offline(target.as_ref(), reason).await?,
        NodeAction::BringOnline => ctx.commands.bring_online(target.as_ref()).await?,
        NodeAction::LaunchAgent => ctx.commands.launch_agent(target.as_ref()).await?,
    };
    Ok(())
}
