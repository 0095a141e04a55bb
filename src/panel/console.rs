//! Terminal host — renders panel documents and messages to stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use super::host::{NoticeLevel, PanelDocument, PanelHost, PanelView};
use super::messages::OutboundMessage;
use super::state::PanelState;
use crate::domain::view_model::{ExecutorView, MonitorEntry, NodeDetailsViewModel, StatusClass};

#[derive(Debug, Clone)]
pub struct ConsoleHost {
    json: bool,
    state_file: Option<PathBuf>,
}

impl ConsoleHost {
    pub fn new(format: &str, state_file: Option<PathBuf>) -> Self {
        Self {
            json: format == "json",
            state_file,
        }
    }

    /// A view for a panel the terminal "restored" from a state file.
    pub fn restored_view(&self) -> Arc<dyn PanelView> {
        Arc::new(ConsoleView {
            json: self.json,
            state_file: self.state_file.clone(),
        })
    }
}

#[async_trait]
impl PanelHost for ConsoleHost {
    fn create_panel(&self, title: &str) -> Arc<dyn PanelView> {
        let view = self.restored_view();
        view.set_title(title);
        view
    }

    async fn open_external(&self, url: &Url) -> Result<()> {
        println!("{} {}", ">>".blue().bold(), url);
        Ok(())
    }

    async fn write_clipboard(&self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        let prefix = match level {
            NoticeLevel::Info => "::".blue().bold(),
            NoticeLevel::Warning => "!!".yellow().bold(),
            NoticeLevel::Error => "!!".red().bold(),
        };
        eprintln!("{} {}", prefix, message);
    }
}

struct ConsoleView {
    json: bool,
    state_file: Option<PathBuf>,
}

impl ConsoleView {
    fn print_json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!(error = %e, "failed to serialize panel output"),
        }
    }

    fn write_state(&self, path: &Path, state: &PanelState) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&state.encode()).context("serializing panel state")?;
        std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

impl PanelView for ConsoleView {
    fn set_title(&self, title: &str) {
        if !self.json {
            println!("{}", title.bold());
        }
    }

    fn set_document(&self, document: PanelDocument) {
        if self.json {
            self.print_json(&document);
            return;
        }
        match document {
            PanelDocument::Loading { title, .. } => println!("   {} ({})", "loading".dimmed(), title),
            PanelDocument::Details { initial_state, .. } => print_details(&initial_state),
            PanelDocument::RestoreError { message, .. } => println!("{} {}", "!!".red().bold(), message),
        }
    }

    fn post_message(&self, message: OutboundMessage) -> bool {
        if self.json {
            self.print_json(&message);
            return true;
        }
        if let OutboundMessage::UpdateNodeDetails { payload } = message {
            print_details(&payload);
        }
        true
    }

    fn reveal(&self) {}

    fn persist_state(&self, state: &PanelState) {
        let Some(path) = &self.state_file else {
            return;
        };
        if let Err(e) = self.write_state(path, state) {
            warn!(error = %e, "failed to persist panel state");
        }
    }

    fn asset_uri(&self, relative: &str) -> String {
        relative.to_string()
    }

    fn dispose(&self) {
        info!("console panel closed");
    }
}

fn print_details(model: &NodeDetailsViewModel) {
    let status = match model.status_class {
        StatusClass::Online | StatusClass::Idle => model.status_label.green().bold(),
        StatusClass::Temporary => model.status_label.yellow().bold(),
        StatusClass::Offline => model.status_label.red().bold(),
        StatusClass::Unknown => model.status_label.dimmed(),
    };

    println!();
    println!("{} [{}]", model.display_name.bold(), status);
    if let Some(url) = &model.url {
        println!("  url:         {}", url.dimmed());
    }
    if let Some(description) = &model.description {
        println!("  description: {}", description);
    }
    println!("  activity:    {}", model.idle_label);
    println!("  executors:   {}", model.executors_label);
    if let Some(reason) = &model.offline_reason {
        println!("  offline:     {}", reason);
    }
    if !model.labels.is_empty() {
        println!("  labels:      {}", model.labels.join(", "));
    }

    let caps = &model.capabilities;
    let actions: Vec<&str> = [
        (caps.can_take_offline, "take offline"),
        (caps.can_bring_online, "bring online"),
        (caps.can_launch_agent, "launch agent"),
        (caps.can_open_agent_instructions, "agent instructions"),
    ]
    .into_iter()
    .filter_map(|(enabled, name)| enabled.then_some(name))
    .collect();
    if !actions.is_empty() {
        println!("  actions:     {}", actions.join(", "));
    }

    print_executors("Executors", &model.executors);
    print_executors("One-off executors", &model.one_off_executors);
    print_entries("Monitors", &model.monitors);
    print_entries("Load statistics", &model.load_statistics);

    for error in &model.errors {
        println!("{} {}", "!!".red().bold(), error);
    }
    println!("  {}", format!("updated {}", model.updated_at).dimmed());
}

fn print_executors(heading: &str, executors: &[ExecutorView]) {
    if executors.is_empty() {
        return;
    }
    println!("  {}:", heading);
    for executor in executors {
        let mut line = format!("    {:<10} {}", executor.id, executor.status_label);
        if let Some(work) = &executor.work_label {
            line.push_str(&format!("  {}", work));
        }
        if let Some(progress) = executor.progress_percent {
            line.push_str(&format!("  {}%", progress));
        }
        if let Some(duration) = &executor.work_duration_label {
            line.push_str(&format!("  ({})", duration));
        }
        println!("{}", line);
    }
}

fn print_entries(heading: &str, entries: &[MonitorEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("  {}:", heading);
    for entry in entries {
        println!("    {:<24} {}", entry.label, entry.summary);
    }
}
