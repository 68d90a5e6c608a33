//! Conversion between live layout descriptions and the persisted name-based schema.
//!
//! Dehydration replaces every widget with its registered name and silently drops widgets that
//! have none. Rehydration resolves names through [`NamedWidgets`], filtering names that no
//! longer resolve. Neither direction fails: corrupt input degrades to `None`, empty lists, or
//! default flags.

use std::collections::BTreeMap;

use lab_widgets::Widget;
use leptos::logging;

use crate::{
    data::{AreaData, DownAreaData, LayoutData, MainAreaData, SideAreaData, TopAreaData},
    layout::{AreaConfig, DownArea, MainArea, ShellLayout, SideArea, TopArea},
    named::NamedWidgets,
};

fn names_of(widgets: &[Widget], names: &NamedWidgets) -> Vec<String> {
    widgets
        .iter()
        .filter_map(|widget| names.name_of(widget))
        .collect()
}

fn resolve_all(persisted: &[String], names: &NamedWidgets) -> Vec<Widget> {
    persisted.iter().filter_map(|name| names.get(name)).collect()
}

fn resolve(name: Option<&String>, names: &NamedWidgets) -> Option<Widget> {
    name.and_then(|name| names.get(name))
}

/// Converts a live dock arrangement to its persisted form.
pub fn serialize_area(area: &AreaConfig, names: &NamedWidgets) -> AreaData {
    match area {
        AreaConfig::TabArea {
            widgets,
            current_index,
        } => AreaData::TabArea {
            current_index: *current_index,
            widgets: names_of(widgets, names),
        },
        AreaConfig::SplitArea {
            orientation,
            children,
            sizes,
        } => AreaData::SplitArea {
            orientation: *orientation,
            sizes: sizes.clone(),
            children: children
                .iter()
                .map(|child| serialize_area(child, names))
                .collect(),
        },
    }
}

/// Converts a persisted dock arrangement back to live widgets.
///
/// Returns `None` (with a warning) for nodes of unknown type. Split nodes keep their surviving
/// children; a tab group whose selected index no longer fits its filtered widgets selects the
/// first tab.
pub fn deserialize_area(area: &AreaData, names: &NamedWidgets) -> Option<AreaConfig> {
    match area {
        AreaData::TabArea {
            current_index,
            widgets,
        } => {
            let widgets = resolve_all(widgets, names);
            let current_index = if *current_index < widgets.len() {
                *current_index
            } else {
                0
            };
            Some(AreaConfig::TabArea {
                widgets,
                current_index,
            })
        }
        AreaData::SplitArea {
            orientation,
            sizes,
            children,
        } => Some(AreaConfig::SplitArea {
            orientation: *orientation,
            children: children
                .iter()
                .filter_map(|child| deserialize_area(child, names))
                .collect(),
            sizes: sizes.clone(),
        }),
        AreaData::Unknown => {
            logging::warn!("dropping layout area of unknown type");
            None
        }
    }
}

/// Persisted form of the main area.
pub fn dehydrate_main(area: &MainArea, names: &NamedWidgets) -> MainAreaData {
    MainAreaData {
        current: area
            .current_widget
            .as_ref()
            .and_then(|widget| names.name_of(widget)),
        dock: area.dock.as_ref().map(|dock| serialize_area(dock, names)),
    }
}

/// Live main area for persisted data; `None` when nothing was persisted.
pub fn rehydrate_main(area: Option<&MainAreaData>, names: &NamedWidgets) -> Option<MainArea> {
    let area = area?;
    Some(MainArea {
        current_widget: resolve(area.current.as_ref(), names),
        dock: area
            .dock
            .as_ref()
            .and_then(|dock| deserialize_area(dock, names)),
    })
}

/// Persisted form of the down area.
pub fn dehydrate_down(area: &DownArea, names: &NamedWidgets) -> DownAreaData {
    DownAreaData {
        current: area
            .current_widget
            .as_ref()
            .and_then(|widget| names.name_of(widget)),
        size: Some(area.size),
        widgets: area
            .widgets
            .as_ref()
            .map(|widgets| names_of(widgets, names)),
    }
}

/// Live down area for persisted data. Missing data yields an empty, zero-height area.
pub fn rehydrate_down(area: Option<&DownAreaData>, names: &NamedWidgets) -> DownArea {
    let Some(area) = area else {
        return DownArea::default();
    };
    DownArea {
        current_widget: resolve(area.current.as_ref(), names),
        size: area.size.unwrap_or(0.0),
        widgets: area
            .widgets
            .as_ref()
            .map(|widgets| resolve_all(widgets, names)),
    }
}

/// Persisted form of a side area.
pub fn dehydrate_side(area: &SideArea, names: &NamedWidgets) -> SideAreaData {
    SideAreaData {
        collapsed: area.collapsed,
        visible: Some(area.visible),
        current: area
            .current_widget
            .as_ref()
            .and_then(|widget| names.name_of(widget)),
        widgets: area
            .widgets
            .as_ref()
            .map(|widgets| names_of(widgets, names)),
        widget_states: (!area.widget_states.is_empty()).then(|| area.widget_states.clone()),
    }
}

/// Live side area for persisted data. Missing data yields a collapsed, visible area.
pub fn rehydrate_side(area: Option<&SideAreaData>, names: &NamedWidgets) -> SideArea {
    let Some(area) = area else {
        return SideArea::default();
    };
    SideArea {
        collapsed: area.collapsed,
        current_widget: resolve(area.current.as_ref(), names),
        visible: area.visible.unwrap_or(true),
        widgets: area
            .widgets
            .as_ref()
            .map(|widgets| resolve_all(widgets, names)),
        widget_states: area.widget_states.clone().unwrap_or_else(BTreeMap::new),
    }
}

/// Persisted form of the whole shell layout.
pub fn dehydrate_layout(layout: &ShellLayout, names: &NamedWidgets) -> LayoutData {
    LayoutData {
        main: layout
            .main_area
            .as_ref()
            .map(|area| dehydrate_main(area, names)),
        down: layout
            .down_area
            .as_ref()
            .map(|area| dehydrate_down(area, names)),
        left: layout
            .left_area
            .as_ref()
            .map(|area| dehydrate_side(area, names)),
        right: layout
            .right_area
            .as_ref()
            .map(|area| dehydrate_side(area, names)),
        relative_sizes: layout.relative_sizes.clone(),
        top: Some(TopAreaData {
            simple_visibility: layout
                .top_area
                .and_then(|top| top.simple_visibility),
        }),
    }
}

/// Live shell layout for a persisted record. The result is never `fresh`.
pub fn rehydrate_layout(data: &LayoutData, names: &NamedWidgets) -> ShellLayout {
    ShellLayout {
        fresh: false,
        main_area: rehydrate_main(data.main.as_ref(), names),
        down_area: Some(rehydrate_down(data.down.as_ref(), names)),
        left_area: Some(rehydrate_side(data.left.as_ref(), names)),
        right_area: Some(rehydrate_side(data.right.as_ref(), names)),
        top_area: data.top.map(|top| TopArea {
            simple_visibility: top.simple_visibility,
        }),
        relative_sizes: data.relative_sizes.clone(),
    }
}
