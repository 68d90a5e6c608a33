//! Shell areas, per-widget placement options, and the user-customized layout.

use std::{collections::BTreeMap, str::FromStr};

use lab_restorer::LayoutMode;
use leptos::logging;
use serde::{Deserialize, Serialize};

use crate::shell::ShellError;

/// Rank given to widgets added without one.
pub const DEFAULT_RANK: u32 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Region of the shell a widget can be placed in.
pub enum Area {
    /// Dock area holding documents and activities.
    Main,
    /// Strip above everything else.
    Header,
    /// Top bar.
    Top,
    /// Menu bar container.
    Menu,
    /// Left side bar.
    Left,
    /// Right side bar.
    Right,
    /// Status bar.
    Bottom,
    /// Tabbed panel below the main area.
    Down,
}

impl Area {
    /// Every area, in layout order.
    pub const ALL: [Self; 8] = [
        Self::Main,
        Self::Header,
        Self::Top,
        Self::Menu,
        Self::Left,
        Self::Right,
        Self::Bottom,
        Self::Down,
    ];

    /// Stable token used in settings and commands.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Header => "header",
            Self::Top => "top",
            Self::Menu => "menu",
            Self::Left => "left",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Down => "down",
        }
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Area {
    type Err = ShellError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|area| area.token() == value)
            .ok_or_else(|| {
                logging::warn!("invalid shell area `{value}`");
                ShellError::InvalidArea(value.to_string())
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Where the main dock area inserts a widget relative to its reference.
pub enum InsertMode {
    /// New tab after the reference.
    #[default]
    TabAfter,
    /// New tab before the reference.
    TabBefore,
    /// New tab group above the reference's group.
    SplitTop,
    /// New tab group left of the reference's group.
    SplitLeft,
    /// New tab group right of the reference's group.
    SplitRight,
    /// New tab group below the reference's group.
    SplitBottom,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Options accompanying [`crate::LabShell::add`].
pub struct AddOptions {
    /// Ordering within ranked areas; lower ranks come first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Whether the widget is activated after insertion. Defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activate: Option<bool>,
    /// Main area insert mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<InsertMode>,
    /// Id of the main area widget to insert relative to.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Widget kind used to remember user placement across sessions.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl AddOptions {
    /// Options carrying only a rank.
    pub fn ranked(rank: u32) -> Self {
        Self {
            rank: Some(rank),
            ..Self::default()
        }
    }

    /// Options carrying only a kind.
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Returns these options with every field set in `overrides` replaced.
    pub fn merged(&self, overrides: &AddOptions) -> Self {
        Self {
            rank: overrides.rank.or(self.rank),
            activate: overrides.activate.or(self.activate),
            mode: overrides.mode.or(self.mode),
            reference: overrides
                .reference
                .clone()
                .or_else(|| self.reference.clone()),
            kind: overrides.kind.clone().or_else(|| self.kind.clone()),
        }
    }

    pub(crate) fn rank_or_default(&self) -> u32 {
        self.rank.unwrap_or(DEFAULT_RANK)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// User-chosen placement for a widget kind.
pub struct AreaPlacement {
    /// Area overriding the one requested by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,
    /// Options merged over the caller's options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<AddOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Per-mode placement overrides keyed by widget kind (or id).
pub struct UserLayout {
    /// Placements used in single-document mode.
    #[serde(rename = "single-document", default)]
    pub single_document: BTreeMap<String, AreaPlacement>,
    /// Placements used in multiple-document mode.
    #[serde(rename = "multiple-document", default)]
    pub multiple_document: BTreeMap<String, AreaPlacement>,
}

impl UserLayout {
    /// Placements for `mode`.
    pub fn placements(&self, mode: LayoutMode) -> &BTreeMap<String, AreaPlacement> {
        match mode {
            LayoutMode::SingleDocument => &self.single_document,
            LayoutMode::MultipleDocument => &self.multiple_document,
        }
    }

    /// Mutable placements for `mode`.
    pub fn placements_mut(&mut self, mode: LayoutMode) -> &mut BTreeMap<String, AreaPlacement> {
        match mode {
            LayoutMode::SingleDocument => &mut self.single_document,
            LayoutMode::MultipleDocument => &mut self.multiple_document,
        }
    }

    /// Placement recorded for `key` in `mode`.
    pub fn placement(&self, mode: LayoutMode, key: &str) -> Option<&AreaPlacement> {
        self.placements(mode).get(key)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn area_parses_tokens_and_rejects_unknown() {
        assert_eq!("down".parse::<Area>(), Ok(Area::Down));
        assert_eq!(
            "sideways".parse::<Area>(),
            Err(ShellError::InvalidArea("sideways".to_string()))
        );
        for area in Area::ALL {
            assert_eq!(area.token().parse::<Area>(), Ok(area));
        }
    }

    #[test]
    fn merged_options_prefer_overrides() {
        let base = AddOptions {
            rank: Some(100),
            activate: Some(true),
            mode: Some(InsertMode::TabAfter),
            reference: Some("a".to_string()),
            kind: Some("Notebook".to_string()),
        };
        let overrides = AddOptions {
            mode: Some(InsertMode::SplitRight),
            activate: Some(false),
            ..AddOptions::default()
        };

        assert_eq!(
            base.merged(&overrides),
            AddOptions {
                mode: Some(InsertMode::SplitRight),
                activate: Some(false),
                ..base.clone()
            }
        );
    }

    #[test]
    fn user_layout_reads_settings_shape() {
        let layout: UserLayout = serde_json::from_value(json!({
            "multiple-document": {
                "Terminal": {"area": "down", "options": {"rank": 10}},
                "Debugger": {"area": "right"}
            }
        }))
        .expect("parse");

        assert!(layout.single_document.is_empty());
        assert_eq!(
            layout.placement(LayoutMode::MultipleDocument, "Terminal"),
            Some(&AreaPlacement {
                area: Some(Area::Down),
                options: Some(AddOptions::ranked(10)),
            })
        );
        assert_eq!(layout.placement(LayoutMode::SingleDocument, "Terminal"), None);
    }
}
