//! Typed HTTP client for the build server's node API.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Url};
use serde::Deserialize;
use tracing::debug;

use crate::commands::target::NodeTreeItem;
use crate::domain::environment::EnvironmentRef;
use crate::domain::services::{DetailLevel, FetchMode, FetchOptions, NodeActionService, NodeDataService};
use crate::domain::snapshot::NodeSnapshot;

pub struct BuildServerClient {
    http: Client,
}

impl BuildServerClient {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("nodepanel/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self { http })
    }

    /// List the environment's nodes as tree items.
    pub async fn list_nodes(&self, environment: &EnvironmentRef) -> Result<Vec<NodeTreeItem>> {
        let base = environment_base(&environment.environment.url)?;
        let mut url = base.join("computer/api/json").context("building computer list URL")?;
        url.query_pairs_mut().append_pair("depth", "0");
        debug!(url = %url, "GET node list");

        let resp = self
            .authorize(self.http.get(url.clone()), environment)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;

        if !resp.status().is_success() {
            bail!("{} returned {}", url, resp.status());
        }

        let set: ComputerSet = resp
            .json()
            .await
            .with_context(|| format!("parsing response from {}", url))?;

        Ok(set
            .computer
            .iter()
            .map(|node| tree_item(environment, &base, node))
            .collect())
    }

    // ── Internal helpers ───────────────────────────────────

    fn authorize(&self, request: RequestBuilder, environment: &EnvironmentRef) -> RequestBuilder {
        let env = &environment.environment;
        match &env.token {
            Some(token) => request.basic_auth(&env.username, Some(token)),
            None => request,
        }
    }

    async fn post(&self, environment: &EnvironmentRef, url: Url) -> Result<()> {
        debug!(url = %url, "POST");
        let resp = self
            .authorize(self.http.post(url.clone()), environment)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;

        if !resp.status().is_success() {
            bail!("{} returned {}", url, resp.status());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ComputerSet {
    #[serde(default)]
    computer: Vec<NodeSnapshot>,
}

const BUILT_IN_CLASSES: [&str; 2] = ["hudson.model.Hudson$MasterComputer", "jenkins.model.Jenkins$MasterComputer"];

fn environment_base(url: &str) -> Result<Url> {
    Url::parse(&format!("{}/", url.trim_end_matches('/')))
        .with_context(|| format!("invalid environment URL '{}'", url))
}

/// Node URLs are derived from the node name; the built-in node lives at a
/// fixed path. A node without a name has no URL.
fn tree_item(environment: &EnvironmentRef, base: &Url, node: &NodeSnapshot) -> NodeTreeItem {
    let name = node
        .fields
        .display_name
        .as_deref()
        .or(node.fields.name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let built_in = node
        .raw()
        .get("_class")
        .and_then(|c| c.as_str())
        .is_some_and(|c| BUILT_IN_CLASSES.contains(&c));

    let node_url = match (built_in, name) {
        (true, _) => Some("(built-in)"),
        (false, Some(name)) => Some(name),
        (false, None) => None,
    }
    .and_then(|segment| {
        let mut url = base.join("computer/").ok()?;
        url.path_segments_mut().ok()?.pop_if_empty().push(segment).push("");
        Some(url.to_string())
    });

    NodeTreeItem {
        environment: environment.clone(),
        label: name.unwrap_or("(unnamed node)").to_string(),
        node_url,
    }
}

/// `api/json` endpoint for a node, deeper for advanced diagnostics.
pub fn node_api_url(node_url: &str, detail: DetailLevel) -> Result<Url> {
    let depth = match detail {
        DetailLevel::Basic => "1",
        DetailLevel::Advanced => "2",
    };
    let mut url = node_endpoint(node_url, "api/json")?;
    url.query_pairs_mut().append_pair("depth", depth);
    Ok(url)
}

fn node_endpoint(node_url: &str, path: &str) -> Result<Url> {
    let base = format!("{}/", node_url.trim_end_matches('/'));
    let base = Url::parse(&base).with_context(|| format!("invalid node URL '{}'", node_url))?;
    base.join(path)
        .with_context(|| format!("building {} URL for {}", path, node_url))
}

#[async_trait]
impl NodeDataService for BuildServerClient {
    async fn get_node_details(
        &self,
        environment: &EnvironmentRef,
        node_url: &str,
        options: FetchOptions,
    ) -> Result<NodeSnapshot> {
        let url = node_api_url(node_url, options.detail_level)?;
        debug!(url = %url, detail = ?options.detail_level, "GET node details");

        let mut request = self.authorize(self.http.get(url.clone()), environment);
        if options.mode == FetchMode::Refresh {
            request = request.header(header::CACHE_CONTROL, "no-cache");
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;

        if !resp.status().is_success() {
            bail!("{} returned {}", url, resp.status());
        }

        resp.json()
            .await
            .with_context(|| format!("parsing response from {}", url))
    }
}

#[async_trait]
impl NodeActionService for BuildServerClient {
    async fn take_offline(
        &self,
        environment: &EnvironmentRef,
        node_url: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut url = node_endpoint(node_url, "toggleOffline")?;
        url.query_pairs_mut()
            .append_pair("offlineMessage", reason.unwrap_or_default());
        self.post(environment, url).await
    }

    async fn bring_online(&self, environment: &EnvironmentRef, node_url: &str) -> Result<()> {
        self.post(environment, node_endpoint(node_url, "toggleOffline")?).await
    }

    async fn launch_agent(&self, environment: &EnvironmentRef, node_url: &str) -> Result<()> {
        self.post(environment, node_endpoint(node_url, "launchSlaveAgent")?).await
    }
}
