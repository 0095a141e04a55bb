//! Node snapshot — raw attributes of one build-server node at a point in time.
//!
//! Upstream JSON is sparse and not always well-typed, so every field is parsed
//! leniently: a value of the wrong shape reads as absent instead of failing the
//! whole snapshot. The original document is kept verbatim for the raw-JSON view.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// A single fetch of a node's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    raw: Value,
    pub fields: NodeFields,
}

impl NodeSnapshot {
    pub fn from_value(raw: Value) -> Self {
        let fields = serde_json::from_value(raw.clone()).unwrap_or_default();
        Self { raw, fields }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Pretty-printed original document.
    pub fn raw_json(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_default()
    }
}

impl Serialize for NodeSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeFields {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,

    #[serde(deserialize_with = "lenient")]
    pub offline: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub temporarily_offline: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub idle: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    pub num_executors: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub busy_executors: Option<f64>,

    #[serde(deserialize_with = "lenient")]
    pub launch_supported: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub manual_launch_allowed: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub jnlp_agent: Option<bool>,

    #[serde(deserialize_with = "lenient_vec")]
    pub assigned_labels: Vec<AssignedLabel>,
    #[serde(deserialize_with = "lenient_vec")]
    pub executors: Vec<Executor>,
    #[serde(deserialize_with = "lenient_vec")]
    pub one_off_executors: Vec<Executor>,

    #[serde(deserialize_with = "lenient")]
    pub monitor_data: Option<Map<String, Value>>,
    #[serde(deserialize_with = "lenient")]
    pub load_statistics: Option<Map<String, Value>>,

    #[serde(deserialize_with = "lenient")]
    pub offline_cause_reason: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub offline_cause: Option<OfflineCause>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssignedLabel {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfflineCause {
    #[serde(deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub short_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Executor {
    #[serde(deserialize_with = "lenient")]
    pub number: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub idle: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub progress: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub current_executable: Option<WorkItem>,
}

/// The build (or other executable) an executor is working on.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkItem {
    #[serde(deserialize_with = "lenient")]
    pub number: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub full_display_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub result: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub building: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub estimated_duration: Option<f64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// One element per raw entry; a malformed entry reads as an empty one so
/// positions stay aligned with the upstream list.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}
