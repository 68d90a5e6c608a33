//! Persisted layout record stored under [`crate::LAYOUT_RESTORER_KEY`].
//!
//! Every widget reference is a name string. Deserialization is field-tolerant: a malformed field
//! falls back to its default (with a warning) instead of failing the whole record, and an area
//! node with an unrecognized `type` tag decodes as [`AreaData::Unknown`].

use std::collections::BTreeMap;

use lab_widgets::PanelState;
use leptos::logging;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Split direction of a dock split node.
pub enum Orientation {
    /// Children side by side.
    #[default]
    Horizontal,
    /// Children stacked.
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
/// Persisted dock arrangement node.
pub enum AreaData {
    /// Leaf tab group.
    TabArea {
        /// Selected tab index.
        #[serde(rename = "currentIndex", default, deserialize_with = "lenient")]
        current_index: usize,
        /// Widget names in tab order.
        #[serde(default, deserialize_with = "lenient_names")]
        widgets: Vec<String>,
    },
    /// Internal split node.
    SplitArea {
        /// Split direction.
        #[serde(default, deserialize_with = "lenient")]
        orientation: Orientation,
        /// Relative child sizes.
        #[serde(default, deserialize_with = "lenient")]
        sizes: Vec<f64>,
        /// Child nodes.
        #[serde(default, deserialize_with = "lenient_children")]
        children: Vec<AreaData>,
    },
    /// Node whose type tag is not recognized, or that could not be decoded at all.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Persisted main area.
pub struct MainAreaData {
    /// Name of the current widget.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub current: Option<String>,
    /// Dock arrangement.
    #[serde(default, deserialize_with = "lenient")]
    pub dock: Option<AreaData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Persisted down area.
pub struct DownAreaData {
    /// Name of the selected tab.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub current: Option<String>,
    /// Relative height.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub size: Option<f64>,
    /// Tab names in order.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_names"
    )]
    pub widgets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Persisted left or right side area.
pub struct SideAreaData {
    /// `true` when no panel was expanded.
    #[serde(default, deserialize_with = "lenient")]
    pub collapsed: bool,
    /// `false` when the side bar was hidden; absent means visible.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub visible: Option<bool>,
    /// Name of the expanded panel.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub current: Option<String>,
    /// Panel names in order.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_names"
    )]
    pub widgets: Option<Vec<String>>,
    /// Split/accordion state keyed by widget id.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub widget_states: Option<BTreeMap<String, PanelState>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Persisted top area.
pub struct TopAreaData {
    /// Whether the top area shows in single-document mode.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub simple_visibility: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Complete persisted layout record.
pub struct LayoutData {
    /// Main area.
    #[serde(default, deserialize_with = "lenient")]
    pub main: Option<MainAreaData>,
    /// Down area.
    #[serde(default, deserialize_with = "lenient")]
    pub down: Option<DownAreaData>,
    /// Left side area.
    #[serde(default, deserialize_with = "lenient")]
    pub left: Option<SideAreaData>,
    /// Right side area.
    #[serde(default, deserialize_with = "lenient")]
    pub right: Option<SideAreaData>,
    /// Relative widths of the left, main, and right columns.
    #[serde(default, deserialize_with = "lenient")]
    pub relative_sizes: Option<Vec<f64>>,
    /// Top area.
    #[serde(default, deserialize_with = "lenient")]
    pub top: Option<TopAreaData>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            logging::warn!("ignoring malformed layout field: {err}");
            Ok(T::default())
        }
    }
}

fn names_from(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    _ => None,
                })
                .collect(),
        ),
        Value::Null => None,
        other => {
            logging::warn!("ignoring malformed widget name list: {other}");
            None
        }
    }
}

fn lenient_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(names_from(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_optional_names<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(names_from(Value::deserialize(deserializer)?))
}

fn lenient_children<'de, D>(deserializer: D) -> Result<Vec<AreaData>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        logging::warn!("ignoring malformed split children");
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or(AreaData::Unknown))
        .collect())
}
