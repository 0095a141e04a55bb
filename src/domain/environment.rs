//! Build-server environments and the store that resolves them.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where an environment definition lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentScope {
    #[default]
    Workspace,
    Global,
}

impl fmt::Display for EnvironmentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workspace => f.write_str("workspace"),
            Self::Global => f.write_str("global"),
        }
    }
}

impl FromStr for EnvironmentScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "workspace" => Ok(Self::Workspace),
            "global" => Ok(Self::Global),
            other => bail!("unknown environment scope '{}' (expected workspace or global)", other),
        }
    }
}

/// An environment as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub url: String,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

/// A live, resolved environment bound to the scope it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRef {
    pub scope: EnvironmentScope,
    pub environment: Environment,
}

impl EnvironmentRef {
    pub fn new(scope: EnvironmentScope, environment: Environment) -> Self {
        Self { scope, environment }
    }

    pub fn id(&self) -> &str {
        &self.environment.id
    }
}

#[async_trait]
pub trait EnvironmentStore: Send + Sync {
    async fn get_environments(&self, scope: EnvironmentScope) -> Result<Vec<Environment>>;
}

/// Look up one environment by id within a scope.
pub async fn find_environment(
    store: &dyn EnvironmentStore,
    scope: EnvironmentScope,
    id: &str,
) -> Result<Option<EnvironmentRef>> {
    let environments = store.get_environments(scope).await?;
    Ok(environments
        .into_iter()
        .find(|env| env.id == id)
        .map(|env| EnvironmentRef::new(scope, env)))
}
