//! Tabbed panel below the main area.

use lab_restorer::DownArea;
use lab_widgets::Widget;

#[derive(Debug, Clone, Default)]
/// Down panel state. `size` is the panel's share of the vertical split.
pub struct DownPanel {
    widgets: Vec<Widget>,
    current: Option<Widget>,
    size: f64,
}

impl DownPanel {
    /// Appends a tab. A widget already present keeps its position.
    pub fn add_widget(&mut self, widget: &Widget) {
        if !self.contains(widget) {
            self.widgets.push(widget.clone());
        }
        if self.current.is_none() {
            self.current = Some(widget.clone());
        }
    }

    /// Removes a tab, selecting its neighbour when it was selected.
    pub fn remove_widget(&mut self, widget: &Widget) -> bool {
        let Some(index) = self.widgets.iter().position(|w| w == widget) else {
            return false;
        };
        self.widgets.remove(index);
        if self.current.as_ref() == Some(widget) {
            let neighbour = index.min(self.widgets.len().saturating_sub(1));
            self.current = self.widgets.get(neighbour).cloned();
        }
        true
    }

    /// Selects the tab with `id`. Returns `false` when absent.
    pub fn select(&mut self, id: &str) -> bool {
        let Some(widget) = self.widgets.iter().find(|w| w.id() == id).cloned() else {
            return false;
        };
        self.current = Some(widget);
        true
    }

    /// Returns `true` when the tab is present.
    pub fn contains(&self, widget: &Widget) -> bool {
        self.widgets.iter().any(|w| w == widget)
    }

    /// Selected tab.
    pub fn current_widget(&self) -> Option<Widget> {
        self.current.clone()
    }

    /// Tabs in display order.
    pub fn widgets(&self) -> Vec<Widget> {
        self.widgets.clone()
    }

    /// Share of the vertical split.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Sets the share of the vertical split, clamped to `0.0..=1.0`.
    pub fn set_size(&mut self, size: f64) {
        self.size = size.clamp(0.0, 1.0);
    }

    /// Live description for persistence.
    pub fn dehydrate(&self) -> DownArea {
        DownArea {
            current_widget: self.current.clone(),
            size: self.size,
            widgets: Some(self.widgets.clone()),
        }
    }

    /// Applies a restored description: appends missing tabs, selects the saved tab, and applies
    /// a non-zero size.
    pub fn rehydrate(&mut self, area: &DownArea) {
        for widget in area.widgets.iter().flatten() {
            self.add_widget(widget);
        }
        if let Some(current) = &area.current_widget {
            self.select(current.id());
        }
        if area.size > 0.0 {
            self.set_size(area.size);
        }
    }
}
