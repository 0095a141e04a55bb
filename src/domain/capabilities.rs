//! Action eligibility derived from a node's connectivity and launch flags.

use serde::{Deserialize, Serialize};

use super::snapshot::NodeFields;

/// The subset of node flags the classifier looks at. Absent means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityInput {
    pub offline: Option<bool>,
    pub temporarily_offline: Option<bool>,
    pub launch_supported: Option<bool>,
    pub manual_launch_allowed: Option<bool>,
    pub jnlp_agent: Option<bool>,
}

impl From<&NodeFields> for CapabilityInput {
    fn from(fields: &NodeFields) -> Self {
        Self {
            offline: fields.offline,
            temporarily_offline: fields.temporarily_offline,
            launch_supported: fields.launch_supported,
            manual_launch_allowed: fields.manual_launch_allowed,
            jnlp_agent: fields.jnlp_agent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeActionCapabilities {
    pub is_offline: bool,
    pub is_temporarily_offline: bool,
    pub can_take_offline: bool,
    pub can_bring_online: bool,
    pub can_launch_agent: bool,
    pub can_open_agent_instructions: bool,
}

/// Classify which node actions are currently valid.
///
/// Only an explicit `offline: false` enables taking the node offline; an
/// unknown connectivity state leaves it disabled.
pub fn classify(input: CapabilityInput) -> NodeActionCapabilities {
    let is_offline = input.offline == Some(true);
    let is_temporarily_offline = input.temporarily_offline == Some(true);
    let launch_supported = input.launch_supported == Some(true);
    let disconnected = is_offline && !is_temporarily_offline;

    NodeActionCapabilities {
        is_offline,
        is_temporarily_offline,
        can_take_offline: input.offline == Some(false) && !is_temporarily_offline,
        can_bring_online: is_temporarily_offline,
        can_launch_agent: disconnected && launch_supported,
        can_open_agent_instructions: disconnected
            && !launch_supported
            && (input.manual_launch_allowed == Some(true) || input.jnlp_agent == Some(true)),
    }
}
