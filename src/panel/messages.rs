//! Message contracts between the controller and the presentation layer.
//!
//! Payloads arriving from the presentation side are untrusted: they are only
//! turned into typed messages after the guards below accept their shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::view_model::NodeDetailsViewModel;

/// Presentation layer → controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    RefreshNodeDetails,
    LoadAdvancedNodeDetails,
    OpenExternal { url: String },
    CopyNodeJson { content: String },
}

impl InboundMessage {
    /// Parse a raw payload, rejecting anything that is not exactly one of the
    /// known message shapes.
    pub fn parse(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        match obj.get("type")?.as_str()? {
            "refreshNodeDetails" => Some(Self::RefreshNodeDetails),
            "loadAdvancedNodeDetails" => Some(Self::LoadAdvancedNodeDetails),
            "openExternal" => Some(Self::OpenExternal {
                url: obj.get("url")?.as_str()?.to_string(),
            }),
            "copyNodeJson" => Some(Self::CopyNodeJson {
                content: obj.get("content")?.as_str()?.to_string(),
            }),
            _ => None,
        }
    }
}

/// Controller → presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    SetLoading { value: bool },
    UpdateNodeDetails { payload: Box<NodeDetailsViewModel> },
}
