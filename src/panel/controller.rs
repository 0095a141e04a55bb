//! Panel lifecycle controller.
//!
//! Owns the single live node-details panel. Every load takes a fresh
//! generation token; a fetch that completes after a newer load has started is
//! dropped without touching the panel. Fetches are never aborted, only
//! ignored.

use std::sync::Arc;

use anyhow::Error;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::host::{NoticeLevel, PanelDocument, PanelHost, PanelView, UI_BUNDLE_PATH};
use super::messages::{InboundMessage, OutboundMessage};
use super::state::PanelState;
use crate::domain::environment::{EnvironmentRef, EnvironmentStore};
use crate::domain::services::{DetailLevel, FetchMode, FetchOptions, NodeDataService};
use crate::domain::snapshot::NodeSnapshot;
use crate::domain::view_model::{build_view_model, NodeDetailsViewModel, TITLE_PREFIX};

pub const RESTORE_HINT: &str = "Reopen the node from the nodes list to view its details.";
pub const COPY_SUCCESS: &str = "Node JSON copied to clipboard.";
pub const COPY_FAILURE: &str = "Failed to copy node JSON";
const UNKNOWN_ERROR: &str = "Unknown error";

/// Released when the panel is disposed, in reverse registration order.
pub type Teardown = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelTarget {
    pub environment: EnvironmentRef,
    pub node_url: String,
}

impl PanelTarget {
    fn state(&self) -> PanelState {
        PanelState::new(&self.environment, &self.node_url)
    }

    fn same_node(&self, other: &PanelTarget) -> bool {
        self.environment.id() == other.environment.id()
            && self.environment.scope == other.environment.scope
            && self.node_url == other.node_url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Loading { token: u64, detail: DetailLevel },
    Rendered { token: u64 },
}

struct PanelSession {
    view: Arc<dyn PanelView>,
    target: Option<PanelTarget>,
    title: String,
    phase: Phase,
    document_rendered: bool,
    snapshot: Option<NodeSnapshot>,
    model: Option<NodeDetailsViewModel>,
    advanced_requested: bool,
    advanced_loaded: bool,
    teardowns: Vec<Teardown>,
}

impl PanelSession {
    fn new(view: Arc<dyn PanelView>, title: String) -> Self {
        let teardown_view = view.clone();
        Self {
            view,
            target: None,
            title,
            phase: Phase::Uninitialized,
            document_rendered: false,
            snapshot: None,
            model: None,
            advanced_requested: false,
            advanced_loaded: false,
            teardowns: vec![Box::new(move || teardown_view.dispose())],
        }
    }

    /// Point the panel at a different node, forgetting everything loaded for
    /// the previous one.
    fn retarget(&mut self, target: PanelTarget) {
        self.snapshot = None;
        self.model = None;
        self.document_rendered = false;
        self.advanced_requested = false;
        self.advanced_loaded = false;
        self.target = Some(target);
    }

    fn last_token(&self) -> Option<u64> {
        match self.phase {
            Phase::Uninitialized => None,
            Phase::Loading { token, .. } | Phase::Rendered { token } => Some(token),
        }
    }

    fn loading_advanced(&self) -> bool {
        matches!(
            self.phase,
            Phase::Loading {
                detail: DetailLevel::Advanced,
                ..
            }
        )
    }
}

struct ControllerState {
    generation: u64,
    panel: Option<PanelSession>,
}

pub struct PanelController {
    host: Arc<dyn PanelHost>,
    data: Arc<dyn NodeDataService>,
    environments: Arc<dyn EnvironmentStore>,
    state: Mutex<ControllerState>,
}

impl PanelController {
    pub fn new(
        host: Arc<dyn PanelHost>,
        data: Arc<dyn NodeDataService>,
        environments: Arc<dyn EnvironmentStore>,
    ) -> Self {
        Self {
            host,
            data,
            environments,
            state: Mutex::new(ControllerState {
                generation: 0,
                panel: None,
            }),
        }
    }

    /// Show the panel for a node, creating it or re-targeting the live one,
    /// then start a load.
    pub async fn show(&self, environment: EnvironmentRef, node_url: &str, label: Option<&str>) {
        let target = PanelTarget {
            environment,
            node_url: node_url.to_string(),
        };
        let title = format!("{}: {}", TITLE_PREFIX, label.unwrap_or(node_url));

        {
            let mut state = self.state.lock().await;
            match state.panel.as_mut() {
                Some(session) => {
                    let same = session.target.as_ref().is_some_and(|t| t.same_node(&target));
                    if !same {
                        info!(node_url = %target.node_url, env = %target.environment.id(), "retargeting node panel");
                        session.retarget(target);
                        session.title = title;
                        session.view.set_title(&session.title);
                    }
                    session.view.reveal();
                }
                None => {
                    info!(node_url = %target.node_url, env = %target.environment.id(), "creating node panel");
                    let view = self.host.create_panel(&title);
                    let mut session = PanelSession::new(view, title);
                    session.target = Some(target);
                    state.panel = Some(session);
                }
            }
        }

        self.load(FetchMode::Cached, None).await;
    }

    /// Adopt a panel the host restored, using its persisted state blob.
    pub async fn revive(&self, view: Arc<dyn PanelView>, persisted: Option<Value>) {
        self.dispose().await;

        let resolved = match persisted.as_ref().map(PanelState::decode) {
            None => Err("no persisted state".to_string()),
            Some(Err(e)) => Err(e.to_string()),
            Some(Ok(panel_state)) => panel_state
                .resolve(self.environments.as_ref())
                .await
                .map(|environment| PanelTarget {
                    environment,
                    node_url: panel_state.node_url,
                })
                .map_err(|e| e.to_string()),
        };

        {
            let mut state = self.state.lock().await;
            match resolved {
                Ok(target) => {
                    info!(node_url = %target.node_url, env = %target.environment.id(), "reviving node panel");
                    let title = format!("{}: {}", TITLE_PREFIX, target.node_url);
                    view.set_title(&title);
                    let mut session = PanelSession::new(view, title);
                    session.target = Some(target);
                    state.panel = Some(session);
                }
                Err(reason) => {
                    warn!(reason = %reason, "unable to restore node panel");
                    view.set_document(PanelDocument::RestoreError {
                        message: format!("Unable to restore node details ({}). {}", reason, RESTORE_HINT),
                        state: persisted,
                    });
                    let title = format!("{}: unavailable", TITLE_PREFIX);
                    view.set_title(&title);
                    state.panel = Some(PanelSession::new(view, title));
                    return;
                }
            }
        }

        self.load(FetchMode::Cached, Some(DetailLevel::Basic)).await;
    }

    pub async fn refresh(&self) {
        self.load(FetchMode::Refresh, None).await;
    }

    /// Request advanced diagnostics. A no-op once they are loaded or while an
    /// advanced load is already in flight.
    pub async fn load_advanced(&self) {
        {
            let mut state = self.state.lock().await;
            let Some(session) = state.panel.as_mut() else {
                return;
            };
            if session.advanced_loaded || session.loading_advanced() {
                debug!("advanced node details already requested");
                return;
            }
            session.advanced_requested = true;
        }

        self.load(FetchMode::Refresh, Some(DetailLevel::Advanced)).await;
    }

    /// Release the panel. Teardown handlers run once, newest first.
    pub async fn dispose(&self) {
        let session = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.panel.take()
        };

        if let Some(mut session) = session {
            info!("disposing node panel");
            while let Some(teardown) = session.teardowns.pop() {
                teardown();
            }
        }
    }

    /// Register a handler released with the panel. Without a live panel it is
    /// released immediately.
    pub async fn register_teardown(&self, teardown: Teardown) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.panel.as_mut() {
            session.teardowns.push(teardown);
            return;
        }
        drop(state);
        teardown();
    }

    /// Route a raw message from the presentation layer.
    pub async fn handle_message(&self, raw: &Value) {
        let Some(message) = InboundMessage::parse(raw) else {
            warn!(message = %raw, "ignoring malformed panel message");
            return;
        };

        match message {
            InboundMessage::RefreshNodeDetails => self.refresh().await,
            InboundMessage::LoadAdvancedNodeDetails => self.load_advanced().await,
            InboundMessage::OpenExternal { url } => self.open_external(&url).await,
            InboundMessage::CopyNodeJson { content } => self.copy_node_json(&content).await,
        }
    }

    pub async fn is_open(&self) -> bool {
        self.state.lock().await.panel.is_some()
    }

    pub async fn current_target(&self) -> Option<PanelTarget> {
        let state = self.state.lock().await;
        state.panel.as_ref().and_then(|s| s.target.clone())
    }

    pub async fn current_model(&self) -> Option<NodeDetailsViewModel> {
        let state = self.state.lock().await;
        state.panel.as_ref().and_then(|s| s.model.clone())
    }

    // ── Loading ────────────────────────────────────────────

    async fn load(&self, mode: FetchMode, detail: Option<DetailLevel>) {
        let (token, target, detail) = {
            let mut state = self.state.lock().await;
            let ControllerState { generation, panel } = &mut *state;
            let Some(session) = panel.as_mut() else {
                return;
            };
            let Some(target) = session.target.clone() else {
                debug!("panel has no target, skipping load");
                return;
            };

            *generation += 1;
            let token = *generation;
            debug!(token, previous = ?session.last_token(), "starting node panel load");
            let detail = detail.unwrap_or(if session.advanced_requested {
                DetailLevel::Advanced
            } else {
                DetailLevel::Basic
            });
            session.phase = Phase::Loading { token, detail };

            if session.document_rendered {
                session.view.post_message(OutboundMessage::SetLoading { value: true });
            } else {
                session.view.set_document(PanelDocument::Loading {
                    title: session.title.clone(),
                    state: target.state(),
                });
            }
            (token, target, detail)
        };

        debug!(token, node_url = %target.node_url, detail = ?detail, "loading node details");
        let options = FetchOptions {
            mode,
            detail_level: detail,
        };
        let result = self
            .data
            .get_node_details(&target.environment, &target.node_url, options)
            .await;

        let mut state = self.state.lock().await;
        if state.generation != token {
            debug!(token, current = state.generation, "dropping stale node details");
            return;
        }
        let Some(session) = state.panel.as_mut() else {
            return;
        };
        apply_result(session, token, &target, detail, result);
    }

    // ── Outbound actions ───────────────────────────────────

    async fn open_external(&self, raw: &str) {
        let url = match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                debug!(url = %raw, "ignoring external link");
                return;
            }
        };

        if let Err(e) = self.host.open_external(&url).await {
            warn!(url = %url, error = %e, "failed to open external link");
        }
    }

    async fn copy_node_json(&self, content: &str) {
        let text = if content.trim().is_empty() {
            self.current_model()
                .await
                .map(|model| model.raw_json)
                .unwrap_or_default()
        } else {
            content.to_string()
        };

        match self.host.write_clipboard(&text).await {
            Ok(()) => self.host.notify(NoticeLevel::Info, COPY_SUCCESS),
            Err(e) => {
                warn!(error = %e, "failed to copy node JSON");
                let detail = e.to_string();
                let message = match detail.trim() {
                    "" => format!("{}.", COPY_FAILURE),
                    detail => format!("{}: {}", COPY_FAILURE, detail),
                };
                self.host.notify(NoticeLevel::Error, &message);
            }
        }
    }
}

/// Fold a completed fetch into the session and render it. A failure keeps the
/// last good snapshot and adds the error to the model.
fn apply_result(
    session: &mut PanelSession,
    token: u64,
    target: &PanelTarget,
    detail: DetailLevel,
    result: anyhow::Result<NodeSnapshot>,
) {
    let errors = match result {
        Ok(snapshot) => {
            session.snapshot = Some(snapshot);
            if detail == DetailLevel::Advanced {
                session.advanced_loaded = true;
            }
            session.view.persist_state(&target.state());
            Vec::new()
        }
        Err(e) => {
            warn!(node_url = %target.node_url, error = %e, "failed to load node details");
            vec![format_fetch_error(&e)]
        }
    };

    let now = Utc::now();
    let model = build_view_model(
        session.snapshot.as_ref(),
        &errors,
        now,
        Some(&target.node_url),
        session.advanced_loaded,
        now.timestamp_millis(),
    );

    if session.snapshot.is_some() && model.title != session.title {
        session.title = model.title.clone();
        session.view.set_title(&session.title);
    }

    let pushed = session.document_rendered
        && session.view.post_message(OutboundMessage::UpdateNodeDetails {
            payload: Box::new(model.clone()),
        });
    if pushed {
        session.view.post_message(OutboundMessage::SetLoading { value: false });
    } else {
        session.view.set_document(PanelDocument::Details {
            initial_state: Box::new(model.clone()),
            state: target.state(),
            bundle_uri: session.view.asset_uri(UI_BUNDLE_PATH),
        });
        session.document_rendered = true;
    }

    session.model = Some(model);
    session.phase = Phase::Rendered { token };
}

pub fn format_fetch_error(err: &Error) -> String {
    let message = format!("{:#}", err);
    match message.trim() {
        "" => UNKNOWN_ERROR.to_string(),
        trimmed => trimmed.to_string(),
    }
}
