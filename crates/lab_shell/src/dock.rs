//! Main dock area model and its tree transition helpers.
//!
//! The dock arrangement is an [`AreaConfig`] tree. Every mutation leaves it normalized: no empty
//! tab groups, no split with fewer than two children, and every selected index in range.

use lab_restorer::{AreaConfig, LayoutMode, Orientation};
use lab_widgets::Widget;

use crate::area::InsertMode;

#[derive(Debug, Clone, Default)]
/// Dock panel state. In single-document mode the tree is a single tab group.
pub struct DockPanel {
    root: Option<AreaConfig>,
    mode: LayoutMode,
}

impl DockPanel {
    /// Current display mode.
    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    /// Switches display mode. Entering single-document mode flattens the tree into one tab group
    /// selecting `current`; the caller owns any snapshot of the previous arrangement.
    pub fn set_mode(&mut self, mode: LayoutMode, current: Option<&Widget>) {
        self.mode = mode;
        if mode == LayoutMode::SingleDocument {
            let widgets = self.widgets();
            let current_index = current
                .and_then(|current| widgets.iter().position(|w| w == current))
                .unwrap_or(0);
            self.root = (!widgets.is_empty()).then_some(AreaConfig::TabArea {
                widgets,
                current_index,
            });
        }
    }

    /// Inserts `widget` relative to `reference` (or the first tab group). A widget already in the
    /// dock is moved. Split modes degrade to tab insertion in single-document mode.
    pub fn add_widget(&mut self, widget: &Widget, mode: InsertMode, reference: Option<&Widget>) {
        self.remove_widget(widget);
        let reference = reference.filter(|reference| *reference != widget);
        let Some(mut root) = self.root.take() else {
            self.root = Some(AreaConfig::tabs(vec![widget.clone()]));
            return;
        };
        let path = reference
            .and_then(|reference| group_path(&root, reference))
            .or_else(|| first_group_path(&root));
        let Some(path) = path else {
            self.root = Some(AreaConfig::tabs(vec![widget.clone()]));
            return;
        };

        let mode = match self.mode {
            LayoutMode::SingleDocument => InsertMode::TabAfter,
            LayoutMode::MultipleDocument => mode,
        };
        match mode {
            InsertMode::TabAfter => insert_tab(&mut root, &path, widget, reference, true),
            InsertMode::TabBefore => insert_tab(&mut root, &path, widget, reference, false),
            InsertMode::SplitTop => split(&mut root, &path, Orientation::Vertical, true, widget),
            InsertMode::SplitBottom => {
                split(&mut root, &path, Orientation::Vertical, false, widget)
            }
            InsertMode::SplitLeft => split(&mut root, &path, Orientation::Horizontal, true, widget),
            InsertMode::SplitRight => {
                split(&mut root, &path, Orientation::Horizontal, false, widget)
            }
        }
        self.root = Some(root);
    }

    /// Removes `widget`, dropping emptied groups. Returns `false` when it was not docked.
    pub fn remove_widget(&mut self, widget: &Widget) -> bool {
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        let Some(path) = group_path(root, widget) else {
            return false;
        };
        if let Some(AreaConfig::TabArea {
            widgets,
            current_index,
        }) = node_at_mut(root, &path)
        {
            if let Some(index) = widgets.iter().position(|w| w == widget) {
                widgets.remove(index);
                if index < *current_index {
                    *current_index -= 1;
                }
            }
        }
        self.root = self.root.take().and_then(prune);
        true
    }

    /// Selects `widget` in its tab group. Returns `false` when it is not docked.
    pub fn activate_widget(&mut self, widget: &Widget) -> bool {
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        let Some(path) = group_path(root, widget) else {
            return false;
        };
        match node_at_mut(root, &path) {
            Some(AreaConfig::TabArea {
                widgets,
                current_index,
            }) => match widgets.iter().position(|w| w == widget) {
                Some(index) => {
                    *current_index = index;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Returns `true` when `widget` is docked.
    pub fn contains(&self, widget: &Widget) -> bool {
        self.root
            .as_ref()
            .is_some_and(|root| group_path(root, widget).is_some())
    }

    /// Finds a docked widget by id.
    pub fn find_by_id(&self, id: &str) -> Option<Widget> {
        self.widgets().into_iter().find(|widget| widget.id() == id)
    }

    /// Docked widgets, depth-first.
    pub fn widgets(&self) -> Vec<Widget> {
        self.root
            .as_ref()
            .map(AreaConfig::widgets)
            .unwrap_or_default()
    }

    /// Selected widget of each tab group, depth-first.
    pub fn selected_widgets(&self) -> Vec<Widget> {
        self.root
            .as_ref()
            .map(AreaConfig::selected_widgets)
            .unwrap_or_default()
    }

    /// Returns `true` when nothing is docked.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Snapshot of the current arrangement.
    pub fn save_layout(&self) -> Option<AreaConfig> {
        self.root.clone()
    }

    /// Replaces the arrangement with `config`.
    ///
    /// Disposed widgets and repeated occurrences are dropped. Returns the previously docked
    /// widgets that `config` does not place, which are no longer docked.
    pub fn restore_layout(&mut self, config: AreaConfig) -> Vec<Widget> {
        let previous = self.widgets();
        let mut seen: Vec<Widget> = Vec::new();
        self.root = normalize_area(config, |widget| {
            if widget.is_disposed() || seen.contains(widget) {
                return false;
            }
            seen.push(widget.clone());
            true
        });
        if self.mode == LayoutMode::SingleDocument {
            let current = self.selected_widgets().into_iter().next();
            self.set_mode(LayoutMode::SingleDocument, current.as_ref());
        }
        previous
            .into_iter()
            .filter(|widget| !self.contains(widget))
            .collect()
    }
}

/// Drops every widget rejected by `keep`, then normalizes the tree.
///
/// A tab group keeps its selected widget selected when it survives; otherwise the index is
/// clamped to the last remaining tab.
pub fn normalize_area(
    config: AreaConfig,
    mut keep: impl FnMut(&Widget) -> bool,
) -> Option<AreaConfig> {
    prune(retain_widgets(config, &mut keep))
}

fn retain_widgets(node: AreaConfig, keep: &mut dyn FnMut(&Widget) -> bool) -> AreaConfig {
    match node {
        AreaConfig::TabArea {
            widgets,
            current_index,
        } => {
            let selected = widgets.get(current_index).cloned();
            let widgets = widgets
                .into_iter()
                .filter(|widget| keep(widget))
                .collect::<Vec<_>>();
            let current_index = selected
                .and_then(|selected| widgets.iter().position(|w| *w == selected))
                .unwrap_or(current_index);
            AreaConfig::TabArea {
                widgets,
                current_index,
            }
        }
        AreaConfig::SplitArea {
            orientation,
            children,
            sizes,
        } => AreaConfig::SplitArea {
            orientation,
            children: children
                .into_iter()
                .map(|child| retain_widgets(child, keep))
                .collect(),
            sizes,
        },
    }
}

fn prune(node: AreaConfig) -> Option<AreaConfig> {
    match node {
        AreaConfig::TabArea {
            widgets,
            current_index,
        } => {
            let last = widgets.len().checked_sub(1)?;
            Some(AreaConfig::TabArea {
                widgets,
                current_index: current_index.min(last),
            })
        }
        AreaConfig::SplitArea {
            orientation,
            children,
            sizes,
        } => {
            let count = children.len();
            let mut kept = Vec::with_capacity(count);
            let mut kept_sizes = Vec::with_capacity(count);
            for (index, child) in children.into_iter().enumerate() {
                if let Some(child) = prune(child) {
                    kept_sizes.push(sizes.get(index).copied().unwrap_or(1.0 / count as f64));
                    kept.push(child);
                }
            }
            match kept.len() {
                0 => None,
                1 => kept.pop(),
                _ => Some(AreaConfig::SplitArea {
                    orientation,
                    children: kept,
                    sizes: kept_sizes,
                }),
            }
        }
    }
}

fn group_path(node: &AreaConfig, widget: &Widget) -> Option<Vec<usize>> {
    match node {
        AreaConfig::TabArea { widgets, .. } => widgets.contains(widget).then(Vec::new),
        AreaConfig::SplitArea { children, .. } => {
            children.iter().enumerate().find_map(|(index, child)| {
                let mut path = group_path(child, widget)?;
                path.insert(0, index);
                Some(path)
            })
        }
    }
}

fn first_group_path(node: &AreaConfig) -> Option<Vec<usize>> {
    match node {
        AreaConfig::TabArea { .. } => Some(Vec::new()),
        AreaConfig::SplitArea { children, .. } => {
            children.iter().enumerate().find_map(|(index, child)| {
                let mut path = first_group_path(child)?;
                path.insert(0, index);
                Some(path)
            })
        }
    }
}

fn node_at_mut<'a>(node: &'a mut AreaConfig, path: &[usize]) -> Option<&'a mut AreaConfig> {
    match path.split_first() {
        None => Some(node),
        Some((index, rest)) => match node {
            AreaConfig::SplitArea { children, .. } => node_at_mut(children.get_mut(*index)?, rest),
            AreaConfig::TabArea { .. } => None,
        },
    }
}

fn insert_tab(
    root: &mut AreaConfig,
    path: &[usize],
    widget: &Widget,
    reference: Option<&Widget>,
    after: bool,
) {
    let Some(AreaConfig::TabArea {
        widgets,
        current_index,
    }) = node_at_mut(root, path)
    else {
        return;
    };
    let position = reference
        .and_then(|reference| widgets.iter().position(|w| w == reference))
        .map(|index| if after { index + 1 } else { index })
        .unwrap_or(if after { widgets.len() } else { 0 });
    let had_selection = !widgets.is_empty();
    widgets.insert(position, widget.clone());
    if had_selection && position <= *current_index {
        *current_index += 1;
    }
}

fn split(
    root: &mut AreaConfig,
    path: &[usize],
    orientation: Orientation,
    before: bool,
    widget: &Widget,
) {
    let group = AreaConfig::tabs(vec![widget.clone()]);
    let Some((index, parent_path)) = path.split_last() else {
        wrap(root, orientation, before, group);
        return;
    };
    let Some(AreaConfig::SplitArea {
        orientation: parent_orientation,
        children,
        sizes,
    }) = node_at_mut(root, parent_path)
    else {
        return;
    };
    if *parent_orientation == orientation {
        let at = if before { *index } else { index + 1 };
        children.insert(at, group);
        *sizes = vec![1.0 / children.len() as f64; children.len()];
    } else if let Some(target) = children.get_mut(*index) {
        wrap(target, orientation, before, group);
    }
}

fn wrap(target: &mut AreaConfig, orientation: Orientation, before: bool, group: AreaConfig) {
    let existing = std::mem::replace(target, AreaConfig::tabs(Vec::new()));
    let children = if before {
        vec![group, existing]
    } else {
        vec![existing, group]
    };
    *target = AreaConfig::SplitArea {
        orientation,
        children,
        sizes: vec![0.5, 0.5],
    };
}
