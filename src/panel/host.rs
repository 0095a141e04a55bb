//! Host runtime contracts: the window/webview surface the controller drives.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::messages::OutboundMessage;
use super::state::PanelState;
use crate::domain::view_model::NodeDetailsViewModel;

/// Relative path of the presentation bundle inside the host's asset root.
pub const UI_BUNDLE_PATH: &str = "dist/node-details.js";

/// A full document set on the panel. Each variant carries the identity the
/// host persists so the panel can be revived later.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PanelDocument {
    Loading {
        title: String,
        state: PanelState,
    },
    #[serde(rename_all = "camelCase")]
    Details {
        initial_state: Box<NodeDetailsViewModel>,
        state: PanelState,
        bundle_uri: String,
    },
    RestoreError {
        message: String,
        state: Option<Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// One live panel surface.
pub trait PanelView: Send + Sync {
    fn set_title(&self, title: &str);

    /// Replace the whole document.
    fn set_document(&self, document: PanelDocument);

    /// Deliver a message to the presentation layer. Returns false if the
    /// surface could not accept it.
    fn post_message(&self, message: OutboundMessage) -> bool;

    fn reveal(&self);

    /// Remember the identity the host should hand back on revival.
    fn persist_state(&self, state: &PanelState);

    /// Resolve a path relative to the host's asset root.
    fn asset_uri(&self, relative: &str) -> String;

    /// Close the surface. Must tolerate repeated calls.
    fn dispose(&self);
}

#[async_trait]
pub trait PanelHost: Send + Sync {
    fn create_panel(&self, title: &str) -> Arc<dyn PanelView>;

    async fn open_external(&self, url: &Url) -> Result<()>;

    async fn write_clipboard(&self, text: &str) -> Result<()>;

    fn notify(&self, level: NoticeLevel, message: &str);
}
