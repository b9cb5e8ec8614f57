// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::BTreeMap, fmt};

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tabled::Tabled;

/// An open key-value record. The service documents what goes in these, but
/// nothing guarantees it, so the client passes them through untouched.
pub(crate) type Mapping = serde_json::Map<String, Value>;

/// Outcome reported when a capture is finished.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TestStatus {
    Pass,
    Fail,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Pass => f.write_str("pass"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

/// Lifecycle state as reported by the service. The client never checks
/// whether a transition is legal; it only reflects what it was told.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CaptureState {
    Idle,
    Started,
    Recording,
    Stopped,
    Finished(Option<TestStatus>),
    Other(String),
}

impl CaptureState {
    fn from_wire(state: Option<&str>, test_status: Option<&str>) -> Self {
        match state {
            None | Some("idle") => Self::Idle,
            Some("started") => Self::Started,
            Some("recording") => Self::Recording,
            Some("stopped") => Self::Stopped,
            Some("finished") => Self::Finished(match test_status {
                Some("pass") => Some(TestStatus::Pass),
                Some("fail") => Some(TestStatus::Fail),
                _ => None,
            }),
            Some(other) => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Idle => f.write_str("idle"),
            Self::Started => f.write_str("started"),
            Self::Recording => f.write_str("recording"),
            Self::Stopped => f.write_str("stopped"),
            Self::Finished(None) => f.write_str("finished"),
            Self::Finished(Some(outcome)) => write!(f, "finished/{outcome}"),
            Self::Other(ref state) => f.write_str(state),
        }
    }
}

/// Accepts an object, a list or null. Lists are keyed by each element's
/// `id` when it has one, otherwise by position.
fn open_record<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Mapping, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let key = item
                    .get("id")
                    .and_then(Value::as_str)
                    .map_or_else(|| index.to_string(), str::to_owned);
                (key, item)
            })
            .collect(),
        Value::Null => Mapping::new(),
        other => Mapping::from_iter([("value".to_owned(), other)]),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCaptureStatus {
    state: Option<String>,
    test_status: Option<String>,
    #[serde(flatten)]
    rest: Mapping,
}

/// The body of the service root.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceRoot {
    #[serde(default, deserialize_with = "open_record")]
    info: Mapping,
    #[serde(default, deserialize_with = "open_record")]
    defaults: Mapping,
    #[serde(default, deserialize_with = "nullable")]
    capture_status: WireCaptureStatus,
    #[serde(default, deserialize_with = "open_record")]
    uploads: Mapping,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One snapshot of the service, rebuilt from scratch on every fetch.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "ServiceRoot")]
pub(crate) struct CaptureStatus {
    pub(crate) state: CaptureState,
    /// Everything else the service said about the current capture (feature,
    /// scenario, id, folder, timings, ...).
    pub(crate) capture: Mapping,
    pub(crate) uploads: Mapping,
    pub(crate) info: Mapping,
    pub(crate) defaults: Mapping,
}

impl From<ServiceRoot> for CaptureStatus {
    fn from(value: ServiceRoot) -> Self {
        let WireCaptureStatus {
            state,
            test_status,
            mut rest,
        } = value.capture_status;

        // Keep the outcome visible alongside the other capture fields.
        if let Some(ref test_status) = test_status {
            let _ = rest.insert("testStatus".to_owned(), test_status.clone().into());
        }

        Self {
            state: CaptureState::from_wire(state.as_deref(), test_status.as_deref()),
            capture: rest,
            uploads: value.uploads,
            info: value.info,
            defaults: value.defaults,
        }
    }
}

fn as_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Body of `POST /captures/start`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptureStartParams {
    pub(crate) categories: BTreeMap<String, String>,
    pub(crate) feature: String,
    pub(crate) scenario: String,
    #[serde(serialize_with = "as_flag")]
    pub(crate) record: bool,
    #[serde(serialize_with = "as_flag", skip_serializing_if = "is_false")]
    pub(crate) force: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) meta: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
}

/// Body of `POST /captures/finish`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptureFinishParams {
    pub(crate) test_status: TestStatus,
}

/// One row of `GET /captures`.
#[derive(Clone, Debug, Deserialize, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptureSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "ID", display_with = "format_text")]
    pub(crate) id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Feature", display_with = "format_text")]
    pub(crate) feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Scenario", display_with = "format_text")]
    pub(crate) scenario: Option<String>,
    #[serde(default)]
    #[tabled(rename = "Started", display_with = "format_value")]
    pub(crate) started: Value,
    #[serde(default)]
    #[tabled(rename = "Finished", display_with = "format_value")]
    pub(crate) finished: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Result", display_with = "format_text")]
    pub(crate) test_status: Option<String>,
    #[serde(flatten)]
    #[tabled(skip)]
    pub(crate) rest: Mapping,
}

/// One entry of the upload queue, as returned by `GET /captures/upload`.
#[derive(Clone, Debug, Deserialize, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "ID", display_with = "format_text")]
    pub(crate) id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "State", display_with = "format_text")]
    pub(crate) state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Transferred", display_with = "format_count")]
    pub(crate) transferred: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Total", display_with = "format_count")]
    pub(crate) total: Option<u64>,
    #[serde(default)]
    #[tabled(rename = "Finished", display_with = "format_value")]
    pub(crate) finished: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Error", display_with = "format_text")]
    pub(crate) error_message: Option<String>,
    #[serde(flatten)]
    #[tabled(skip)]
    pub(crate) rest: Mapping,
}

fn format_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

// LINT: tabled hands each field over by reference.
#[allow(clippy::trivially_copy_pass_by_ref)]
fn format_count(value: &Option<u64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}

/// Renders an open value for a table cell: strings bare, null as nothing.
pub(crate) fn format_value(value: &Value) -> String {
    match *value {
        Value::Null => String::new(),
        Value::String(ref s) => s.clone(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}
