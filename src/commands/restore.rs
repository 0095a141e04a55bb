//! `nodepanel restore` — revive a panel from persisted panel state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

use super::context::AppContext;
use crate::config::Config;
use crate::panel::state::is_serialized_state;

pub fn run(config: Config, state_file: PathBuf, format: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(config, state_file, format))
}

async fn run_async(config: Config, state_file: PathBuf, format: &str) -> Result<()> {
    let persisted = read_state(&state_file)?;
    if !persisted.as_ref().is_some_and(is_serialized_state) {
        warn!(path = %state_file.display(), "persisted panel state is incomplete");
    }

    let ctx = AppContext::new(config, format, Some(state_file))?;
    ctx.controller.revive(ctx.host.restored_view(), persisted).await;
    ctx.controller.dispose().await;
    Ok(())
}

/// Unparseable content is handed to the controller as "no state" so the
/// panel shows its restore notice instead of failing the command.
fn read_state(path: &Path) -> Result<Option<Value>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_json::from_str(&content).ok())
}
