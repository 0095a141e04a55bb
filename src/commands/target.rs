//! Command layer — resolves what a command was invoked on and dispatches it
//! to the panel controller or the node-action service.

use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use crate::domain::capabilities::{classify, CapabilityInput, NodeActionCapabilities};
use crate::domain::environment::EnvironmentRef;
use crate::domain::services::{DetailLevel, FetchMode, FetchOptions, NodeActionService, NodeDataService};
use crate::panel::controller::PanelController;
use crate::panel::host::{NoticeLevel, PanelHost};

/// A node as listed in the nodes tree. Some node kinds have no URL.
#[derive(Debug, Clone)]
pub struct NodeTreeItem {
    pub environment: EnvironmentRef,
    pub label: String,
    pub node_url: Option<String>,
}

/// A target rebuilt outside the tree, e.g. from a restored panel or the CLI.
#[derive(Debug, Clone)]
pub struct TargetRecord {
    pub environment: EnvironmentRef,
    pub node_url: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub enum CommandTarget {
    TreeItem(NodeTreeItem),
    Record(TargetRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub environment: EnvironmentRef,
    pub node_url: String,
    pub label: Option<String>,
}

impl ResolvedNode {
    fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.node_url)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("Select a node to {action}.")]
    NoSelection { action: String },
    #[error("Unable to {action}: {label} has no stable URL.")]
    MissingNodeUrl { action: String, label: String },
}

/// Resolve a command target: it must be present and carry a node URL.
/// `action` only shapes the rejection message.
pub fn resolve_target(target: Option<&CommandTarget>, action: &str) -> Result<ResolvedNode, TargetError> {
    let target = target.ok_or_else(|| TargetError::NoSelection {
        action: action.to_string(),
    })?;

    let (environment, node_url, label) = match target {
        CommandTarget::TreeItem(item) => (&item.environment, item.node_url.as_deref(), Some(item.label.as_str())),
        CommandTarget::Record(record) => (&record.environment, record.node_url.as_deref(), record.label.as_deref()),
    };

    let node_url = node_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| TargetError::MissingNodeUrl {
            action: action.to_string(),
            label: label.unwrap_or("this node").to_string(),
        })?;

    Ok(ResolvedNode {
        environment: environment.clone(),
        node_url: node_url.to_string(),
        label: label.map(str::to_string),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    TakeOffline { reason: Option<String> },
    BringOnline,
    LaunchAgent,
}

impl NodeAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TakeOffline { .. } => "take offline",
            Self::BringOnline => "bring online",
            Self::LaunchAgent => "launch agent",
        }
    }

    fn allowed(&self, caps: &NodeActionCapabilities) -> bool {
        match self {
            Self::TakeOffline { .. } => caps.can_take_offline,
            Self::BringOnline => caps.can_bring_online,
            Self::LaunchAgent => caps.can_launch_agent,
        }
    }
}

pub struct NodeCommands {
    host: Arc<dyn PanelHost>,
    controller: Arc<PanelController>,
    data: Arc<dyn NodeDataService>,
    actions: Arc<dyn NodeActionService>,
}

impl NodeCommands {
    pub fn new(
        host: Arc<dyn PanelHost>,
        controller: Arc<PanelController>,
        data: Arc<dyn NodeDataService>,
        actions: Arc<dyn NodeActionService>,
    ) -> Self {
        Self {
            host,
            controller,
            data,
            actions,
        }
    }

    /// Open (or re-target) the details panel. Returns false if the target was
    /// rejected.
    pub async fn show_node_details(&self, target: Option<&CommandTarget>) -> bool {
        match resolve_target(target, "view details") {
            Ok(node) => {
                self.controller
                    .show(node.environment, &node.node_url, node.label.as_deref())
                    .await;
                true
            }
            Err(e) => {
                self.host.notify(NoticeLevel::Info, &e.to_string());
                false
            }
        }
    }

    pub async fn take_offline(&self, target: Option<&CommandTarget>, reason: Option<String>) -> Result<bool> {
        self.run_action(target, NodeAction::TakeOffline { reason }).await
    }

    pub async fn bring_online(&self, target: Option<&CommandTarget>) -> Result<bool> {
        self.run_action(target, NodeAction::BringOnline).await
    }

    pub async fn launch_agent(&self, target: Option<&CommandTarget>) -> Result<bool> {
        self.run_action(target, NodeAction::LaunchAgent).await
    }

    async fn run_action(&self, target: Option<&CommandTarget>, action: NodeAction) -> Result<bool> {
        let node = match resolve_target(target, action.label()) {
            Ok(node) => node,
            Err(e) => {
                self.host.notify(NoticeLevel::Info, &e.to_string());
                return Ok(false);
            }
        };

        let options = FetchOptions {
            mode: FetchMode::Refresh,
            detail_level: DetailLevel::Basic,
        };
        let snapshot = self
            .data
            .get_node_details(&node.environment, &node.node_url, options)
            .await
            .with_context(|| format!("checking state of {}", node.display_name()))?;
        let caps = classify(CapabilityInput::from(&snapshot.fields));
        if !action.allowed(&caps) {
            self.host.notify(
                NoticeLevel::Warning,
                &format!("Cannot {} {} in its current state.", action.label(), node.display_name()),
            );
            return Ok(false);
        }

        info!(node_url = %node.node_url, action = action.label(), "running node action");
        match &action {
            NodeAction::TakeOffline { reason } => {
                self.actions
                    .take_offline(&node.environment, &node.node_url, reason.as_deref())
                    .await?
            }
            NodeAction::BringOnline => self.actions.bring_online(&node.environment, &node.node_url).await?,
            NodeAction::LaunchAgent => self.actions.launch_agent(&node.environment, &node.node_url).await?,
        }
        self.host.notify(
            NoticeLevel::Info,
            &format!("Requested {} for {}.", action.label(), node.display_name()),
        );

        let showing = self
            .controller
            .current_target()
            .await
            .is_some_and(|t| t.environment.id() == node.environment.id() && t.node_url == node.node_url);
        if showing {
            self.controller.refresh().await;
        }
        Ok(true)
    }
}
