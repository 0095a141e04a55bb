//! View-model builder — turns a raw node snapshot into a renderable model.
//!
//! Every derived field is resolved from an explicit, ordered list of
//! candidates; the first non-empty candidate wins. The builder is pure: the
//! current time is an input, and a model is always produced, even without a
//! snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::capabilities::{classify, CapabilityInput, NodeActionCapabilities};
use super::snapshot::{Executor, NodeFields, NodeSnapshot, WorkItem};

pub const NOT_AVAILABLE: &str = "Not available";
pub const ESTIMATE_PREFIX: &str = "Est.";
pub const TITLE_PREFIX: &str = "Node Details";

const SUMMARY_TEXT_KEYS: [&str; 5] = ["message", "status", "state", "description", "name"];
const SUMMARY_NUMBER_KEYS: [&str; 3] = ["size", "count", "total"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Online,
    Idle,
    Temporary,
    Offline,
    Unknown,
}

impl StatusClass {
    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Idle => "Idle",
            Self::Temporary => "Temporarily offline",
            Self::Offline => "Offline",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetailsViewModel {
    pub title: String,
    pub display_name: String,
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub status_label: String,
    pub status_class: StatusClass,
    pub capabilities: NodeActionCapabilities,
    pub idle_label: String,
    pub executors_label: String,
    pub offline_reason: Option<String>,
    pub labels: Vec<String>,
    pub executors: Vec<ExecutorView>,
    pub one_off_executors: Vec<ExecutorView>,
    pub monitors: Vec<MonitorEntry>,
    pub load_statistics: Vec<MonitorEntry>,
    pub raw_json: String,
    pub errors: Vec<String>,
    pub updated_at: String,
    pub advanced_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorView {
    pub id: String,
    pub is_idle: bool,
    pub status_label: String,
    pub work_label: Option<String>,
    pub work_url: Option<String>,
    pub progress_percent: Option<u8>,
    pub work_duration_ms: Option<u64>,
    pub work_duration_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorEntry {
    pub key: String,
    pub label: String,
    pub summary: String,
}

/// Build the complete view model.
///
/// Without a snapshot the result is an "unknown" shell that only carries the
/// errors and the fallback URL.
pub fn build_view_model(
    snapshot: Option<&NodeSnapshot>,
    errors: &[String],
    updated_at: DateTime<Utc>,
    fallback_url: Option<&str>,
    advanced_loaded: bool,
    now_ms: i64,
) -> NodeDetailsViewModel {
    let fields = snapshot.map(|s| &s.fields);
    let empty = NodeFields::default();
    let f = fields.unwrap_or(&empty);

    let url = first_non_empty([f.url.as_deref(), fallback_url]);
    let url_tail = url.as_deref().and_then(last_path_segment);
    let display_name = first_non_empty([
        f.display_name.as_deref(),
        f.name.as_deref(),
        url_tail.as_deref(),
    ])
    .unwrap_or_else(|| "Node".to_string());
    let name = first_non_empty([f.name.as_deref(), Some(display_name.as_str())])
        .unwrap_or_default();

    let status_class = classify_status(fields);
    let capabilities = match fields {
        Some(fields) => classify(CapabilityInput::from(fields)),
        None => NodeActionCapabilities::default(),
    };

    let executors = build_executors(&f.executors, "Executor", now_ms);
    let one_off_executors = build_executors(&f.one_off_executors, "One-off", now_ms);

    NodeDetailsViewModel {
        title: format!("{}: {}", TITLE_PREFIX, display_name),
        executors_label: executors_summary(f.num_executors, &executors),
        display_name,
        name,
        url,
        description: first_non_empty([f.description.as_deref()]),
        status_label: status_class.label().to_string(),
        status_class,
        capabilities,
        idle_label: idle_summary(fields.and_then(|f| f.idle)),
        offline_reason: offline_reason(f),
        labels: labels(f),
        executors,
        one_off_executors,
        monitors: build_entries(f.monitor_data.as_ref()),
        load_statistics: build_entries(f.load_statistics.as_ref()),
        raw_json: snapshot.map(NodeSnapshot::raw_json).unwrap_or_default(),
        errors: errors.to_vec(),
        updated_at: updated_at.to_rfc3339(),
        advanced_loaded,
    }
}

/// First match wins.
pub fn classify_status(fields: Option<&NodeFields>) -> StatusClass {
    let Some(f) = fields else {
        return StatusClass::Unknown;
    };
    let offline = f.offline == Some(true);
    if offline && f.temporarily_offline == Some(true) {
        StatusClass::Temporary
    } else if offline {
        StatusClass::Offline
    } else if f.idle == Some(true) {
        StatusClass::Idle
    } else if f.offline == Some(false) {
        StatusClass::Online
    } else {
        StatusClass::Unknown
    }
}

pub fn offline_reason(fields: &NodeFields) -> Option<String> {
    let cause = fields.offline_cause.as_ref();
    first_non_empty([
        fields.offline_cause_reason.as_deref(),
        cause.and_then(|c| c.description.as_deref()),
        cause.and_then(|c| c.short_description.as_deref()),
    ])
}

fn idle_summary(idle: Option<bool>) -> String {
    match idle {
        Some(true) => "Idle",
        Some(false) => "Busy",
        None => "Unknown",
    }
    .to_string()
}

fn executors_summary(num_executors: Option<f64>, executors: &[ExecutorView]) -> String {
    let total = num_executors
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as usize)
        .unwrap_or(executors.len());
    if total == 0 {
        return "No executors".to_string();
    }
    let busy = executors.iter().filter(|e| !e.is_idle).count();
    format!("{} busy / {} total", busy, total)
}

fn labels(fields: &NodeFields) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for label in &fields.assigned_labels {
        if let Some(name) = first_non_empty([label.name.as_deref()]) {
            if !labels.contains(&name) {
                labels.push(name);
            }
        }
    }
    labels
}

// ── Executors ──────────────────────────────────────────────

fn build_executors(executors: &[Executor], fallback_prefix: &str, now_ms: i64) -> Vec<ExecutorView> {
    executors
        .iter()
        .enumerate()
        .map(|(index, executor)| build_executor(executor, index, fallback_prefix, now_ms))
        .collect()
}

fn build_executor(executor: &Executor, index: usize, fallback_prefix: &str, now_ms: i64) -> ExecutorView {
    let work = executor.current_executable.as_ref();
    let is_idle = work.is_none() && executor.idle != Some(false);
    let duration = work.and_then(|w| work_duration(w, now_ms));

    ExecutorView {
        id: executor
            .number
            .and_then(format_number_label)
            .unwrap_or_else(|| format!("{} {}", fallback_prefix, index + 1)),
        is_idle,
        status_label: if is_idle { "Idle" } else { "Busy" }.to_string(),
        work_label: work.and_then(work_label),
        work_url: work.and_then(|w| first_non_empty([w.url.as_deref()])),
        progress_percent: executor.progress.and_then(progress_percent),
        work_duration_ms: duration.as_ref().map(|d| d.ms),
        work_duration_label: duration.map(|d| d.label()),
    }
}

pub fn work_label(work: &WorkItem) -> Option<String> {
    let number = work.number.and_then(format_number_label);
    let label = first_non_empty([
        work.full_display_name.as_deref(),
        work.display_name.as_deref(),
        number.as_deref(),
        work.url.as_deref(),
    ])?;
    match first_non_empty([work.result.as_deref()]) {
        Some(result) => Some(format!("{} ({})", label, result)),
        None => Some(label),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkDuration {
    pub ms: u64,
    pub estimated: bool,
}

impl WorkDuration {
    pub fn label(&self) -> String {
        if self.estimated {
            format!("{} {}", ESTIMATE_PREFIX, format_duration(self.ms))
        } else {
            format_duration(self.ms)
        }
    }
}

/// Recorded duration, then elapsed time while building, then the estimate.
pub fn work_duration(work: &WorkItem, now_ms: i64) -> Option<WorkDuration> {
    let building = work.building == Some(true);

    if let Some(duration) = work.duration.filter(|d| d.is_finite() && *d >= 0.0) {
        if duration > 0.0 || !building {
            return Some(WorkDuration {
                ms: duration as u64,
                estimated: false,
            });
        }
    }

    if building {
        if let Some(started) = work.timestamp.filter(|t| t.is_finite() && *t >= 0.0) {
            let elapsed = (now_ms as f64 - started).max(0.0);
            return Some(WorkDuration {
                ms: elapsed as u64,
                estimated: false,
            });
        }
    }

    work.estimated_duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| WorkDuration {
            ms: d as u64,
            estimated: true,
        })
}

pub fn progress_percent(progress: f64) -> Option<u8> {
    progress
        .is_finite()
        .then(|| progress.clamp(0.0, 100.0).floor() as u8)
}

pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

// ── Monitors ───────────────────────────────────────────────

fn build_entries(data: Option<&Map<String, Value>>) -> Vec<MonitorEntry> {
    let Some(data) = data else {
        return Vec::new();
    };
    data.iter()
        .map(|(key, value)| MonitorEntry {
            key: key.clone(),
            label: monitor_label(key),
            summary: summarize_value(value),
        })
        .collect()
}

/// `hudson.node_monitors.SwapSpaceMonitor` becomes `Swap Space`.
pub fn monitor_label(key: &str) -> String {
    let segment = key.rsplit('.').next().unwrap_or(key);
    let stem = match segment.strip_suffix("Monitor") {
        Some(stem) if !stem.is_empty() => stem,
        _ => segment,
    };

    let mut label = String::with_capacity(stem.len() + 4);
    let mut prev_lower = false;
    for ch in stem.chars() {
        if ch == '_' {
            label.push(' ');
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            label.push(' ');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        label.push(ch);
    }

    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => key.to_string(),
    }
}

pub fn summarize_value(value: &Value) -> String {
    match value {
        Value::Null => NOT_AVAILABLE.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => "Empty list".to_string(),
        Value::Array(items) => format!("{} items", items.len()),
        Value::Object(map) => summarize_object(map),
    }
}

fn summarize_object(map: &Map<String, Value>) -> String {
    let text = SUMMARY_TEXT_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str).and_then(non_empty));
    if let Some(text) = text {
        return text;
    }

    let number = SUMMARY_NUMBER_KEYS.iter().find_map(|key| match map.get(*key) {
        Some(Value::Number(n)) => Some(format_number(n)),
        _ => None,
    });
    if let Some(number) = number {
        return number;
    }

    if map.is_empty() {
        "Empty object".to_string()
    } else {
        format!("{} fields", map.len())
    }
}

// ── Helpers ────────────────────────────────────────────────

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// First candidate that is present and non-blank, trimmed.
pub fn first_non_empty<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates.into_iter().flatten().find_map(non_empty)
}

fn last_path_segment(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(non_empty)
}

fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn format_number_label(n: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 {
        Some(format!("#{}", n as i64))
    } else {
        Some(format!("#{}", n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn snapshot(value: Value) -> NodeSnapshot {
        NodeSnapshot::from_value(value)
    }

    fn build(snapshot: Option<&NodeSnapshot>) -> NodeDetailsViewModel {
        let updated_at = DateTime::from_timestamp_millis(NOW).unwrap();
        build_view_model(snapshot, &[], updated_at, Some("https://ci/computer/agent-1/"), false, NOW)
    }

    fn work(value: Value) -> WorkItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_snapshot_renders_unknown_shell() {
        let errors = vec!["connection refused".to_string()];
        let updated_at = DateTime::from_timestamp_millis(NOW).unwrap();
        let model = build_view_model(None, &errors, updated_at, Some("https://ci/computer/agent-1/"), false, NOW);

        assert_eq!(model.status_class, StatusClass::Unknown);
        assert!(model.executors.is_empty());
        assert!(model.one_off_executors.is_empty());
        assert_eq!(model.raw_json, "");
        assert_eq!(model.errors, errors);
        assert_eq!(model.url.as_deref(), Some("https://ci/computer/agent-1/"));
        assert_eq!(model.display_name, "agent-1");
        assert_eq!(model.capabilities, NodeActionCapabilities::default());
    }

    #[test]
    fn status_classification_first_match_wins() {
        let cases = [
            (json!({"offline": true, "temporarilyOffline": true, "idle": true}), StatusClass::Temporary),
            (json!({"offline": true, "idle": true}), StatusClass::Offline),
            (json!({"offline": false, "idle": true}), StatusClass::Idle),
            (json!({"idle": true}), StatusClass::Idle),
            (json!({"offline": false, "idle": false}), StatusClass::Online),
            (json!({"idle": false}), StatusClass::Unknown),
        ];
        for (raw, expected) in cases {
            let snap = snapshot(raw.clone());
            assert_eq!(build(Some(&snap)).status_class, expected, "{raw}");
        }
    }

    #[test]
    fn temporarily_offline_node_can_be_brought_online() {
        let snap = snapshot(json!({"displayName": "agent-1", "offline": true, "temporarilyOffline": true}));
        let model = build(Some(&snap));
        assert_eq!(model.status_class, StatusClass::Temporary);
        assert_eq!(model.status_label, "Temporarily offline");
        assert!(model.capabilities.can_bring_online);
        assert!(!model.capabilities.can_take_offline);
    }

    #[test]
    fn offline_reason_prefers_explicit_reason() {
        let snap = snapshot(json!({
            "offlineCauseReason": "   ",
            "offlineCause": {"description": " disk full ", "shortDescription": "disk"}
        }));
        assert_eq!(build(Some(&snap)).offline_reason.as_deref(), Some("disk full"));

        let snap = snapshot(json!({"offlineCause": {"shortDescription": "disk"}}));
        assert_eq!(build(Some(&snap)).offline_reason.as_deref(), Some("disk"));

        let snap = snapshot(json!({"offlineCauseReason": "", "offlineCause": null}));
        assert_eq!(build(Some(&snap)).offline_reason, None);
    }

    #[test]
    fn building_work_uses_elapsed_time() {
        let item = work(json!({"building": true, "timestamp": NOW - 5000}));
        let duration = work_duration(&item, NOW).unwrap();
        assert_eq!(duration.ms, 5000);
        assert!(!duration.label().starts_with(ESTIMATE_PREFIX));
    }

    #[test]
    fn zero_duration_while_building_falls_through_to_elapsed() {
        let item = work(json!({"building": true, "duration": 0, "timestamp": NOW - 1500}));
        assert_eq!(work_duration(&item, NOW).unwrap().ms, 1500);

        let item = work(json!({"building": true, "timestamp": NOW + 10_000}));
        assert_eq!(work_duration(&item, NOW).unwrap().ms, 0);
    }

    #[test]
    fn estimate_is_labelled() {
        let item = work(json!({"building": false, "estimatedDuration": 120000}));
        let duration = work_duration(&item, NOW).unwrap();
        assert_eq!(duration.ms, 120_000);
        assert!(duration.estimated);
        assert_eq!(duration.label(), "Est. 2m 0s");
    }

    #[test]
    fn finished_work_reports_recorded_duration() {
        let item = work(json!({"building": false, "duration": 0, "estimatedDuration": 9000}));
        assert_eq!(work_duration(&item, NOW), Some(WorkDuration { ms: 0, estimated: false }));

        let item = work(json!({"building": true, "duration": -1, "timestamp": -5}));
        assert_eq!(work_duration(&item, NOW), None);
    }

    #[test]
    fn executor_entries() {
        let snap = snapshot(json!({
            "offline": false,
            "numExecutors": 3,
            "executors": [
                {"number": 0, "idle": true, "progress": -1},
                {"number": 1, "idle": false, "progress": 250.7, "currentExecutable": {
                    "fullDisplayName": "app #12", "number": 12, "result": "SUCCESS",
                    "building": true, "timestamp": NOW - 5000, "url": "https://ci/job/app/12/"
                }},
                {"progress": 42.9, "currentExecutable": {"number": 7}}
            ]
        }));
        let model = build(Some(&snap));

        assert_eq!(model.executors_label, "2 busy / 3 total");
        let ids: Vec<_> = model.executors.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["#0", "#1", "Executor 3"]);

        assert!(model.executors[0].is_idle);
        assert_eq!(model.executors[0].progress_percent, Some(0));
        assert_eq!(model.executors[0].work_label, None);

        let busy = &model.executors[1];
        assert!(!busy.is_idle);
        assert_eq!(busy.work_label.as_deref(), Some("app #12 (SUCCESS)"));
        assert_eq!(busy.progress_percent, Some(100));
        assert_eq!(busy.work_duration_ms, Some(5000));
        assert_eq!(busy.work_duration_label.as_deref(), Some("5s"));
        assert_eq!(busy.work_url.as_deref(), Some("https://ci/job/app/12/"));

        assert_eq!(model.executors[2].work_label.as_deref(), Some("#7"));
        assert_eq!(model.executors[2].progress_percent, Some(42));
    }

    #[test]
    fn malformed_executors_keep_their_position() {
        let node = snapshot(json!({
            "offline": false,
            "executors": [{"number": 0}, "garbage", {"idle": true}]
        }));
        let ids: Vec<_> = build(Some(&node)).executors.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, ["#0", "Executor 2", "Executor 3"]);
    }

    #[test]
    fn explicitly_busy_executor_without_work_is_not_idle() {
        let snap = snapshot(json!({"executors": [{"number": 0, "idle": false}, {"number": 1}]}));
        let model = build(Some(&snap));
        assert!(!model.executors[0].is_idle);
        assert!(model.executors[1].is_idle);
    }

    #[test]
    fn monitor_summaries() {
        let cases = [
            (json!(null), NOT_AVAILABLE),
            (json!("ok"), "ok"),
            (json!(true), "true"),
            (json!(12.0), "12"),
            (json!([]), "Empty list"),
            (json!([1, 2]), "2 items"),
            (json!({}), "Empty object"),
            (json!({"status": "  ", "state": "healthy"}), "healthy"),
            (json!({"message": 3, "size": 1024}), "1024"),
            (json!({"count": "x", "total": 7.5}), "7.5"),
            (json!({"a": 1, "b": 2}), "2 fields"),
        ];
        for (value, expected) in cases {
            assert_eq!(summarize_value(&value), expected, "{value}");
        }
    }

    #[test]
    fn monitor_entries_per_key() {
        let snap = snapshot(json!({
            "monitorData": {
                "hudson.node_monitors.SwapSpaceMonitor": {"availableSwapSpace": 1, "totalSwapSpace": 2},
                "hudson.node_monitors.ArchitectureMonitor": "Linux (amd64)",
                "hudson.node_monitors.ClockMonitor": null
            }
        }));
        let model = build(Some(&snap));
        assert_eq!(model.monitors.len(), 3);

        let arch = model
            .monitors
            .iter()
            .find(|m| m.key == "hudson.node_monitors.ArchitectureMonitor")
            .unwrap();
        assert_eq!(arch.label, "Architecture");
        assert_eq!(arch.summary, "Linux (amd64)");

        let clock = model.monitors.iter().find(|m| m.label == "Clock").unwrap();
        assert_eq!(clock.summary, NOT_AVAILABLE);
    }

    #[test]
    fn monitor_labels() {
        assert_eq!(monitor_label("hudson.node_monitors.SwapSpaceMonitor"), "Swap Space");
        assert_eq!(monitor_label("busyExecutors"), "Busy Executors");
        assert_eq!(monitor_label("Monitor"), "Monitor");
        assert_eq!(monitor_label("disk_space"), "Disk space");
    }

    #[test]
    fn identity_and_labels() {
        let snap = snapshot(json!({
            "displayName": " ",
            "name": "agent-1",
            "description": "  ",
            "assignedLabels": [{"name": "linux"}, {"name": "docker"}, {"name": "linux"}, {}]
        }));
        let model = build(Some(&snap));
        assert_eq!(model.display_name, "agent-1");
        assert_eq!(model.title, "Node Details: agent-1");
        assert_eq!(model.description, None);
        assert_eq!(model.labels, ["linux", "docker"]);
        assert_eq!(model.idle_label, "Unknown");
        assert_eq!(model.executors_label, "No executors");
    }

    #[test]
    fn raw_json_is_pretty_printed() {
        let snap = snapshot(json!({"displayName": "agent-1"}));
        let model = build(Some(&snap));
        assert_eq!(model.raw_json, "{\n  \"displayName\": \"agent-1\"\n}");
    }

    #[test]
    fn durations_are_human_readable() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(5_999), "5s");
        assert_eq!(format_duration(125_000), "2m 5s");
        assert_eq!(format_duration(3_720_000), "1h 2m");
    }
}
