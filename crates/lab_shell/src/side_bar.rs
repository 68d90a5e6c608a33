//! Left and right side bars: a ranked list of panels with at most one expanded.

use std::collections::BTreeMap;

use lab_restorer::SideArea;
use lab_widgets::Widget;

use crate::ranked::RankedPanel;

#[derive(Debug, Clone, Default)]
/// Side bar state. The expanded panel is `current`; no current panel means collapsed.
pub struct SideBarHandler {
    panel: RankedPanel,
    current: Option<Widget>,
    last_current: Option<Widget>,
    hidden_by_user: bool,
}

impl SideBarHandler {
    /// Adds a panel at `rank`. Adding does not expand it.
    pub fn add_widget(&mut self, widget: &Widget, rank: u32) {
        self.panel.add_widget(widget, rank);
    }

    /// Removes a panel, collapsing the bar when it was expanded.
    pub fn remove_widget(&mut self, widget: &Widget) -> bool {
        if self.current.as_ref() == Some(widget) {
            self.current = None;
        }
        if self.last_current.as_ref() == Some(widget) {
            self.last_current = None;
        }
        self.panel.remove_widget(widget)
    }

    /// Returns `true` when the panel is in this side bar.
    pub fn contains(&self, widget: &Widget) -> bool {
        self.panel.contains(widget)
    }

    /// Returns `true` when a panel with `id` is in this side bar.
    pub fn has(&self, id: &str) -> bool {
        self.panel.find_by_id(id).is_some()
    }

    /// Expands the panel with `id`. Returns `false` when it is not in this side bar.
    pub fn activate(&mut self, id: &str) -> bool {
        let Some(widget) = self.panel.find_by_id(id) else {
            return false;
        };
        self.current = Some(widget);
        true
    }

    /// Collapses the expanded panel, remembering it for [`Self::expand`].
    pub fn collapse(&mut self) {
        if let Some(current) = self.current.take() {
            self.last_current = Some(current);
        }
    }

    /// Expands the last expanded panel, or the first one.
    pub fn expand(&mut self) {
        let previous = self
            .last_current
            .clone()
            .filter(|widget| self.panel.contains(widget))
            .or_else(|| self.panel.widgets().into_iter().next());
        if let Some(previous) = previous {
            self.current = Some(previous);
        }
    }

    /// Hides the whole side bar at the user's request.
    pub fn hide(&mut self) {
        self.hidden_by_user = true;
    }

    /// Shows a side bar hidden by [`Self::hide`].
    pub fn show(&mut self) {
        self.hidden_by_user = false;
    }

    /// Returns `true` when no panel is expanded.
    pub fn is_collapsed(&self) -> bool {
        self.current.is_none()
    }

    /// Returns `true` unless the user hid the side bar.
    pub fn is_visible(&self) -> bool {
        !self.hidden_by_user
    }

    /// Expanded panel.
    pub fn current_widget(&self) -> Option<Widget> {
        self.current.clone()
    }

    /// Panels in rank order.
    pub fn widgets(&self) -> Vec<Widget> {
        self.panel.widgets()
    }

    /// Live description of this side bar for persistence.
    pub fn dehydrate(&self) -> SideArea {
        let widgets = self.panel.widgets();
        let widget_states = widgets
            .iter()
            .filter_map(|widget| {
                widget
                    .panel_state()
                    .map(|state| (widget.id().to_string(), state))
            })
            .collect::<BTreeMap<_, _>>();
        SideArea {
            collapsed: self.is_collapsed(),
            current_widget: self.current.clone(),
            visible: self.is_visible(),
            widgets: Some(widgets),
            widget_states,
        }
    }

    /// Applies a restored description: expands its current panel, then collapses or hides as
    /// recorded and hands each panel its saved split state.
    pub fn rehydrate(&mut self, area: &SideArea) {
        if let Some(current) = &area.current_widget {
            self.activate(current.id());
        }
        if area.collapsed {
            self.collapse();
        }
        if !area.visible {
            self.hide();
        }
        for widget in self.panel.widgets() {
            if let Some(state) = area.widget_states.get(widget.id()) {
                widget.set_panel_state(Some(state.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use lab_widgets::PanelState;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn collapse_then_expand_restores_last_panel() {
        let mut side = SideBarHandler::default();
        let files = Widget::new("filebrowser");
        let running = Widget::new("running");
        side.add_widget(&files, 100);
        side.add_widget(&running, 200);
        assert!(side.is_collapsed());

        assert!(side.activate("running"));
        side.collapse();
        assert!(side.is_collapsed());
        side.expand();
        assert_eq!(side.current_widget(), Some(running.clone()));

        side.remove_widget(&running);
        assert!(side.is_collapsed());
        side.expand();
        assert_eq!(side.current_widget(), Some(files));
    }

    #[test]
    fn dehydrate_and_rehydrate_round_trip_flags_and_states() {
        let mut side = SideBarHandler::default();
        let toc = Widget::new("toc");
        side.add_widget(&toc, 400);
        side.activate("toc");
        side.hide();
        toc.set_panel_state(Some(PanelState {
            sizes: Some(vec![0.3, 0.7]),
            expansion_states: None,
        }));

        let area = side.dehydrate();
        assert!(!area.collapsed);
        assert!(!area.visible);
        assert_eq!(area.current_widget, Some(toc.clone()));

        toc.set_panel_state(None);
        let mut restored = SideBarHandler::default();
        restored.add_widget(&toc, 400);
        restored.rehydrate(&area);

        assert_eq!(restored.current_widget(), Some(toc.clone()));
        assert!(!restored.is_visible());
        assert_eq!(
            toc.panel_state().and_then(|state| state.sizes),
            Some(vec![0.3, 0.7])
        );
    }

    #[test]
    fn rehydrating_collapsed_area_keeps_panel_for_expand() {
        let mut side = SideBarHandler::default();
        let files = Widget::new("filebrowser");
        let running = Widget::new("running");
        side.add_widget(&files, 100);
        side.add_widget(&running, 200);

        side.rehydrate(&SideArea {
            collapsed: true,
            current_widget: Some(running.clone()),
            ..SideArea::default()
        });

        assert!(side.is_collapsed());
        side.expand();
        assert_eq!(side.current_widget(), Some(running));
    }
}
