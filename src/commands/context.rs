//! Wiring shared by the subcommands: collaborators, host, controller.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use super::target::{CommandTarget, NodeCommands, NodeTreeItem, TargetRecord};
use crate::client::BuildServerClient;
use crate::config::{Config, ConfigEnvironmentStore};
use crate::domain::environment::{find_environment, EnvironmentRef, EnvironmentScope, EnvironmentStore};
use crate::panel::console::ConsoleHost;
use crate::panel::controller::PanelController;

/// How the user picked a node on the command line. Neither field set means
/// nothing was selected.
#[derive(Debug, Clone)]
pub struct NodeSelector {
    pub env: String,
    pub scope: EnvironmentScope,
    pub name: Option<String>,
    pub node_url: Option<String>,
}

pub struct AppContext {
    pub config: Config,
    pub client: Arc<BuildServerClient>,
    pub store: Arc<ConfigEnvironmentStore>,
    pub host: Arc<ConsoleHost>,
    pub controller: Arc<PanelController>,
    pub commands: NodeCommands,
}

impl AppContext {
    pub fn new(config: Config, format: &str, state_file: Option<PathBuf>) -> Result<Self> {
        let client = Arc::new(BuildServerClient::new(config.request_timeout_secs)?);
        let store = Arc::new(ConfigEnvironmentStore::new(config.environments.clone()));
        let host = Arc::new(ConsoleHost::new(format, state_file));
        let controller = Arc::new(PanelController::new(host.clone(), client.clone(), store.clone()));
        let commands = NodeCommands::new(host.clone(), controller.clone(), client.clone(), client.clone());

        Ok(Self {
            config,
            client,
            store,
            host,
            controller,
            commands,
        })
    }

    /// Resolve an environment id, listing the configured ones on a miss.
    pub async fn environment(&self, id: &str, scope: EnvironmentScope) -> Result<EnvironmentRef> {
        if let Some(env) = find_environment(self.store.as_ref(), scope, id).await? {
            return Ok(env);
        }

        let available = self.store.get_environments(scope).await?;
        bail!(
            "environment '{}' not found in {} settings. Available environments: {}",
            id,
            scope,
            if available.is_empty() {
                "(none configured)".to_string()
            } else {
                available.iter().map(|e| e.id.as_str()).collect::<Vec<_>>().join(", ")
            }
        )
    }

    /// Turn a selector into a command target. A node name is looked up in the
    /// environment's node list, the way a tree selection would be; an unknown
    /// name is an error rather than an empty selection.
    pub async fn target(&self, selector: &NodeSelector) -> Result<Option<CommandTarget>> {
        let environment = self.environment(&selector.env, selector.scope).await?;

        if let Some(node_url) = &selector.node_url {
            return Ok(Some(CommandTarget::Record(TargetRecord {
                environment,
                node_url: Some(node_url.clone()),
                label: None,
            })));
        }

        let Some(name) = &selector.name else {
            return Ok(None);
        };
        let nodes = self.client.list_nodes(&environment).await?;
        let item = select_node(nodes, name, environment.id())?;
        Ok(Some(CommandTarget::TreeItem(item)))
    }
}

/// Pick a listed node by name, listing the available ones on a miss.
fn select_node(nodes: Vec<NodeTreeItem>, name: &str, environment_id: &str) -> Result<NodeTreeItem> {
    let available = nodes.iter().map(|n| n.label.clone()).collect::<Vec<_>>();
    match nodes.into_iter().find(|item| item.label == name) {
        Some(item) => Ok(item),
        None => bail!(
            "node '{}' not found in {}. Available nodes: {}",
            name,
            environment_id,
            if available.is_empty() {
                "(none reported)".to_string()
            } else {
                available.join(", ")
            }
        ),
    }
}
