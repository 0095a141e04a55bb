//! `nodepanel nodes` — list the nodes of one environment.

use anyhow::Result;
use colored::Colorize;

use super::context::AppContext;
use crate::config::Config;
use crate::domain::environment::EnvironmentScope;

pub fn run(config: Config, env: &str, scope: EnvironmentScope) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(config, env, scope))
}

async fn run_async(config: Config, env: &str, scope: EnvironmentScope) -> Result<()> {
    let ctx = AppContext::new(config, "table", None)?;
    let environment = ctx.environment(env, scope).await?;
    let nodes = ctx.client.list_nodes(&environment).await?;

    if nodes.is_empty() {
        println!("{} No nodes reported by {}", "::".blue().bold(), environment.id());
        return Ok(());
    }

    println!("{}", format!("Nodes in {}", environment.id()).bold());
    for node in nodes {
        match node.node_url {
            Some(url) => println!("  {} {}", node.label.bold(), url.dimmed()),
            None => println!("  {} {}", node.label.bold(), "(no URL)".yellow()),
        }
    }
    Ok(())
}
