//! Panel state codec — the minimal identity persisted so a panel can be
//! restored after the host restarts.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::environment::{find_environment, EnvironmentRef, EnvironmentScope, EnvironmentStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub environment_id: String,
    pub scope: EnvironmentScope,
    pub node_url: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("persisted panel state is not an object")]
    NotAnObject,
    #[error("persisted panel state has no node URL")]
    MissingNodeUrl,
    #[error("persisted panel state has no environment id")]
    MissingEnvironmentId,
    #[error("persisted panel state has an invalid environment scope")]
    InvalidScope,
    #[error("environment '{id}' no longer exists in {scope} settings")]
    EnvironmentNotFound { id: String, scope: EnvironmentScope },
    #[error("failed to read environments: {0}")]
    EnvironmentStore(String),
}

impl PanelState {
    pub fn new(environment: &EnvironmentRef, node_url: &str) -> Self {
        Self {
            environment_id: environment.id().to_string(),
            scope: environment.scope,
            node_url: node_url.to_string(),
        }
    }

    pub fn encode(&self) -> Value {
        json!({
            "environmentId": self.environment_id,
            "scope": self.scope,
            "nodeUrl": self.node_url,
        })
    }

    /// Decode a persisted blob. Any missing or malformed field rejects the
    /// whole blob; a partially populated state is never returned.
    pub fn decode(value: &Value) -> Result<Self, StateError> {
        let obj = value.as_object().ok_or(StateError::NotAnObject)?;

        let node_url = non_empty_str(obj.get("nodeUrl")).ok_or(StateError::MissingNodeUrl)?;
        let environment_id =
            non_empty_str(obj.get("environmentId")).ok_or(StateError::MissingEnvironmentId)?;
        let scope = match obj.get("scope").and_then(Value::as_str) {
            Some("workspace") => EnvironmentScope::Workspace,
            Some("global") => EnvironmentScope::Global,
            _ => return Err(StateError::InvalidScope),
        };

        Ok(Self {
            environment_id: environment_id.to_string(),
            scope,
            node_url: node_url.to_string(),
        })
    }

    /// Re-resolve the persisted environment id against the live store.
    pub async fn resolve(&self, store: &dyn EnvironmentStore) -> Result<EnvironmentRef, StateError> {
        find_environment(store, self.scope, &self.environment_id)
            .await
            .map_err(|e| StateError::EnvironmentStore(format!("{:#}", e)))?
            .ok_or_else(|| StateError::EnvironmentNotFound {
                id: self.environment_id.clone(),
                scope: self.scope,
            })
    }
}

pub fn is_serialized_state(value: &Value) -> bool {
    PanelState::decode(value).is_ok()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
