//! Live (rehydrated) layout descriptions exchanged between the shell and the restorer.

use std::collections::BTreeMap;

use lab_widgets::{PanelState, Widget};
use serde::{Deserialize, Serialize};

use crate::data::Orientation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Display mode of the main work area.
pub enum LayoutMode {
    /// One widget fills the main area.
    SingleDocument,
    /// Widgets are tiled and tabbed.
    #[default]
    MultipleDocument,
}

impl LayoutMode {
    /// Returns the stable token used in settings and persisted data.
    pub const fn token(self) -> &'static str {
        match self {
            Self::SingleDocument => "single-document",
            Self::MultipleDocument => "multiple-document",
        }
    }
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Recursive arrangement of the main dock area.
pub enum AreaConfig {
    /// Leaf tab group.
    TabArea {
        /// Tabs in display order.
        widgets: Vec<Widget>,
        /// Selected tab.
        current_index: usize,
    },
    /// Internal split node.
    SplitArea {
        /// Direction children are laid out in.
        orientation: Orientation,
        /// Child arrangements.
        children: Vec<AreaConfig>,
        /// Relative sizes, index-aligned with `children`.
        sizes: Vec<f64>,
    },
}

impl AreaConfig {
    /// Creates a tab group selecting its first widget.
    pub fn tabs(widgets: Vec<Widget>) -> Self {
        Self::TabArea {
            widgets,
            current_index: 0,
        }
    }

    /// Every widget in depth-first order.
    pub fn widgets(&self) -> Vec<Widget> {
        let mut out = Vec::new();
        self.collect_widgets(&mut out);
        out
    }

    fn collect_widgets(&self, out: &mut Vec<Widget>) {
        match self {
            Self::TabArea { widgets, .. } => out.extend(widgets.iter().cloned()),
            Self::SplitArea { children, .. } => {
                for child in children {
                    child.collect_widgets(out);
                }
            }
        }
    }

    /// Widgets selected in each tab group, depth-first.
    pub fn selected_widgets(&self) -> Vec<Widget> {
        match self {
            Self::TabArea {
                widgets,
                current_index,
            } => widgets.get(*current_index).cloned().into_iter().collect(),
            Self::SplitArea { children, .. } => {
                children.iter().flat_map(AreaConfig::selected_widgets).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Rehydrated main area.
pub struct MainArea {
    /// Widget to activate after restoring.
    pub current_widget: Option<Widget>,
    /// Dock arrangement, when one was persisted.
    pub dock: Option<AreaConfig>,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Rehydrated down (bottom tabbed) area.
pub struct DownArea {
    /// Selected tab.
    pub current_widget: Option<Widget>,
    /// Relative height of the area; `0.0` hides it.
    pub size: f64,
    /// Tabs in display order; `None` when not persisted.
    pub widgets: Option<Vec<Widget>>,
}

#[derive(Debug, Clone, PartialEq)]
/// Rehydrated left or right side area.
pub struct SideArea {
    /// `true` when no panel is expanded.
    pub collapsed: bool,
    /// Expanded panel.
    pub current_widget: Option<Widget>,
    /// `false` when the user hid the whole side bar.
    pub visible: bool,
    /// Panels in display order; `None` when not persisted.
    pub widgets: Option<Vec<Widget>>,
    /// Split/accordion state per widget id.
    pub widget_states: BTreeMap<String, PanelState>,
}

impl Default for SideArea {
    fn default() -> Self {
        Self {
            collapsed: true,
            current_widget: None,
            visible: true,
            widgets: None,
            widget_states: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Rehydrated top area.
pub struct TopArea {
    /// Whether the top area shows in single-document mode.
    pub simple_visibility: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Complete shell layout as produced by [`crate::LayoutRestorer::fetch`] and consumed by
/// [`crate::LayoutRestorer::save`].
pub struct ShellLayout {
    /// `true` when nothing was persisted (or the stored record was unusable).
    pub fresh: bool,
    /// Main dock area.
    pub main_area: Option<MainArea>,
    /// Down area.
    pub down_area: Option<DownArea>,
    /// Left side area.
    pub left_area: Option<SideArea>,
    /// Right side area.
    pub right_area: Option<SideArea>,
    /// Top area.
    pub top_area: Option<TopArea>,
    /// Relative widths of the left, main, and right columns.
    pub relative_sizes: Option<Vec<f64>>,
}

impl ShellLayout {
    /// Layout returned when nothing usable was persisted.
    pub fn blank() -> Self {
        Self {
            fresh: true,
            ..Self::default()
        }
    }
}
