//! In-memory host, view, and collaborators for controller and command tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::oneshot;
use url::Url;

use super::host::{NoticeLevel, PanelDocument, PanelHost, PanelView};
use super::messages::OutboundMessage;
use super::state::PanelState;
use crate::domain::environment::{Environment, EnvironmentRef, EnvironmentScope, EnvironmentStore};
use crate::domain::services::{FetchOptions, NodeActionService, NodeDataService};
use crate::domain::snapshot::NodeSnapshot;
use crate::domain::view_model::NodeDetailsViewModel;

pub fn environment_ref(id: &str) -> EnvironmentRef {
    EnvironmentRef::new(
        EnvironmentScope::Global,
        Environment {
            id: id.to_string(),
            url: "https://ci.example.com".to_string(),
            username: "admin".to_string(),
            token: None,
        },
    )
}

pub fn node_json(display_name: &str) -> NodeSnapshot {
    NodeSnapshot::from_value(json!({
        "displayName": display_name,
        "offline": false,
        "temporarilyOffline": false,
        "idle": false,
        "numExecutors": 1,
        "launchSupported": true,
        "executors": [{"number": 0, "idle": true, "progress": -1}]
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Title(String),
    Document(PanelDocument),
    Message(OutboundMessage),
    Reveal,
    State(PanelState),
    Dispose,
}

#[derive(Default)]
pub struct FakeView {
    events: Mutex<Vec<ViewEvent>>,
    refuse_messages: AtomicBool,
}

impl FakeView {
    /// Make `post_message` report failure, as a view whose webview is gone.
    pub fn refuse_messages(&self) {
        self.refuse_messages.store(true, Ordering::SeqCst);
    }

    fn record(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn documents(&self) -> Vec<PanelDocument> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Document(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn last_details(&self) -> Option<NodeDetailsViewModel> {
        self.documents().into_iter().rev().find_map(|d| match d {
            PanelDocument::Details { initial_state, .. } => Some(*initial_state),
            _ => None,
        })
    }

    pub fn last_state(&self) -> Option<PanelState> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::State(s) => Some(s),
            _ => None,
        })
    }

    pub fn title(&self) -> String {
        self.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                ViewEvent::Title(t) => Some(t),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn dispose_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ViewEvent::Dispose))
            .count()
    }
}

impl PanelView for FakeView {
    fn set_title(&self, title: &str) {
        self.record(ViewEvent::Title(title.to_string()));
    }

    fn set_document(&self, document: PanelDocument) {
        self.record(ViewEvent::Document(document));
    }

    fn post_message(&self, message: OutboundMessage) -> bool {
        if self.refuse_messages.load(Ordering::SeqCst) {
            return false;
        }
        self.record(ViewEvent::Message(message));
        true
    }

    fn reveal(&self) {
        self.record(ViewEvent::Reveal);
    }

    fn persist_state(&self, state: &PanelState) {
        self.record(ViewEvent::State(state.clone()));
    }

    fn asset_uri(&self, relative: &str) -> String {
        format!("test-assets://{}", relative)
    }

    fn dispose(&self) {
        self.record(ViewEvent::Dispose);
    }
}

#[derive(Default)]
pub struct FakeHost {
    views: Mutex<Vec<Arc<FakeView>>>,
    opened: Mutex<Vec<String>>,
    clipboard: Mutex<Vec<String>>,
    clipboard_error: Mutex<Option<String>>,
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl FakeHost {
    pub fn panels_created(&self) -> usize {
        self.views.lock().unwrap().len()
    }

    pub fn view(&self, index: usize) -> Arc<FakeView> {
        self.views.lock().unwrap()[index].clone()
    }

    /// A view the host restored on its own, not created through the controller.
    pub fn detached_view(&self) -> Arc<FakeView> {
        Arc::new(FakeView::default())
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn clipboard(&self) -> Vec<String> {
        self.clipboard.lock().unwrap().clone()
    }

    pub fn fail_clipboard(&self, message: &str) {
        *self.clipboard_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl PanelHost for FakeHost {
    fn create_panel(&self, title: &str) -> Arc<dyn PanelView> {
        let view = Arc::new(FakeView::default());
        view.set_title(title);
        self.views.lock().unwrap().push(view.clone());
        view
    }

    async fn open_external(&self, url: &Url) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn write_clipboard(&self, text: &str) -> Result<()> {
        if let Some(message) = self.clipboard_error.lock().unwrap().clone() {
            return Err(anyhow!(message));
        }
        self.clipboard.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().unwrap().push((level, message.to_string()));
    }
}

enum Reply {
    Ready(Result<NodeSnapshot>),
    Later(oneshot::Receiver<Result<NodeSnapshot>>),
}

/// Data service answering fetches from a queue, in call order.
#[derive(Default)]
pub struct FakeData {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, FetchOptions)>>,
}

impl FakeData {
    pub fn respond(&self, result: Result<NodeSnapshot>) {
        self.replies.lock().unwrap().push_back(Reply::Ready(result));
    }

    /// Queue a reply that completes only when the returned sender fires.
    pub fn respond_later(&self) -> oneshot::Sender<Result<NodeSnapshot>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Reply::Later(rx));
        tx
    }

    pub fn calls(&self) -> Vec<(String, FetchOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeDataService for FakeData {
    async fn get_node_details(
        &self,
        _environment: &EnvironmentRef,
        node_url: &str,
        options: FetchOptions,
    ) -> Result<NodeSnapshot> {
        self.calls.lock().unwrap().push((node_url.to_string(), options));
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Ready(result)) => result,
            Some(Reply::Later(rx)) => rx.await.unwrap_or_else(|_| Err(anyhow!("reply dropped"))),
            None => Err(anyhow!("no reply queued for {}", node_url)),
        }
    }
}

#[derive(Default)]
pub struct FakeActions {
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl FakeActions {
    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, action: &'static str, node_url: &str) {
        self.calls.lock().unwrap().push((action, node_url.to_string()));
    }
}

#[async_trait]
impl NodeActionService for FakeActions {
    async fn take_offline(&self, _environment: &EnvironmentRef, node_url: &str, _reason: Option<&str>) -> Result<()> {
        self.record("take_offline", node_url);
        Ok(())
    }

    async fn bring_online(&self, _environment: &EnvironmentRef, node_url: &str) -> Result<()> {
        self.record("bring_online", node_url);
        Ok(())
    }

    async fn launch_agent(&self, _environment: &EnvironmentRef, node_url: &str) -> Result<()> {
        self.record("launch_agent", node_url);
        Ok(())
    }
}

pub struct FixedEnvironments {
    environments: Vec<Environment>,
}

impl FixedEnvironments {
    pub fn new(environments: Vec<Environment>) -> Self {
        Self { environments }
    }
}

#[async_trait]
impl EnvironmentStore for FixedEnvironments {
    async fn get_environments(&self, scope: EnvironmentScope) -> Result<Vec<Environment>> {
        match scope {
            EnvironmentScope::Global => Ok(self.environments.clone()),
            EnvironmentScope::Workspace => Ok(Vec::new()),
        }
    }
}
