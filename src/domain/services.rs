//! Collaborator contracts for talking to the build server.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::environment::EnvironmentRef;
use super::snapshot::NodeSnapshot;

/// How much of a node to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    Basic,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    #[default]
    Cached,
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchOptions {
    pub mode: FetchMode,
    pub detail_level: DetailLevel,
}

#[async_trait]
pub trait NodeDataService: Send + Sync {
    async fn get_node_details(
        &self,
        environment: &EnvironmentRef,
        node_url: &str,
        options: FetchOptions,
    ) -> Result<NodeSnapshot>;
}

#[async_trait]
pub trait NodeActionService: Send + Sync {
    async fn take_offline(
        &self,
        environment: &EnvironmentRef,
        node_url: &str,
        reason: Option<&str>,
    ) -> Result<()>;

    async fn bring_online(&self, environment: &EnvironmentRef, node_url: &str) -> Result<()>;

    async fn launch_agent(&self, environment: &EnvironmentRef, node_url: &str) -> Result<()>;
}
