//! `nodepanel environments` — list configured build-server environments.

use anyhow::Result;
use colored::Colorize;

use super::context::AppContext;
use crate::config::Config;
use crate::domain::environment::{EnvironmentScope, EnvironmentStore};

pub fn run(config: Config, scope: Option<EnvironmentScope>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(config, scope))
}

async fn run_async(config: Config, scope: Option<EnvironmentScope>) -> Result<()> {
    let ctx = AppContext::new(config, "table", None)?;
    let scopes = match scope {
        Some(scope) => vec![scope],
        None => vec![EnvironmentScope::Workspace, EnvironmentScope::Global],
    };

    let mut any = false;
    for scope in scopes {
        let environments = ctx.store.get_environments(scope).await?;
        if environments.is_empty() {
            continue;
        }
        any = true;
        println!("{}", format!("{} environments", scope).bold());
        for env in environments {
            let user = if env.username.is_empty() {
                "anonymous".dimmed()
            } else {
                env.username.normal()
            };
            println!("  {} {} ({})", env.id.bold(), env.url.dimmed(), user);
        }
    }

    if !any {
        println!("{} No environments configured", "::".blue().bold());
        println!("   Add entries under `environments` in the config file.");
    }
    Ok(())
}
