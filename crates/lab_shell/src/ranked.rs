//! Rank-ordered widget lists backing the header, top, menu, bottom, and side areas.

use lab_widgets::Widget;

#[derive(Debug, Clone)]
struct RankedItem {
    widget: Widget,
    rank: u32,
}

#[derive(Debug, Clone, Default)]
/// Widgets ordered by ascending rank; equal ranks keep insertion order.
pub struct RankedPanel {
    items: Vec<RankedItem>,
}

impl RankedPanel {
    /// Inserts `widget` after every item of equal or lower rank. A widget already present is
    /// moved to its new rank.
    pub fn add_widget(&mut self, widget: &Widget, rank: u32) {
        self.remove_widget(widget);
        let index = self.items.partition_point(|item| item.rank <= rank);
        self.items.insert(
            index,
            RankedItem {
                widget: widget.clone(),
                rank,
            },
        );
    }

    /// Removes `widget`. Returns `false` when it was absent.
    pub fn remove_widget(&mut self, widget: &Widget) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.widget != widget);
        self.items.len() != before
    }

    /// Returns `true` when `widget` is present.
    pub fn contains(&self, widget: &Widget) -> bool {
        self.items.iter().any(|item| &item.widget == widget)
    }

    /// Finds a widget by id.
    pub fn find_by_id(&self, id: &str) -> Option<Widget> {
        self.items
            .iter()
            .find(|item| item.widget.id() == id)
            .map(|item| item.widget.clone())
    }

    /// Widgets in rank order.
    pub fn widgets(&self) -> Vec<Widget> {
        self.items.iter().map(|item| item.widget.clone()).collect()
    }

    /// Returns `true` when the panel holds no widgets.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ids(panel: &RankedPanel) -> Vec<String> {
        panel
            .widgets()
            .iter()
            .map(|widget| widget.id().to_string())
            .collect()
    }

    #[test]
    fn equal_ranks_keep_insertion_order() {
        let mut panel = RankedPanel::default();
        panel.add_widget(&Widget::new("late"), 900);
        panel.add_widget(&Widget::new("first"), 100);
        panel.add_widget(&Widget::new("second"), 100);

        assert_eq!(ids(&panel), vec!["first", "second", "late"]);
    }

    #[test]
    fn re_adding_moves_to_new_rank() {
        let mut panel = RankedPanel::default();
        let a = Widget::new("a");
        panel.add_widget(&a, 10);
        panel.add_widget(&Widget::new("b"), 20);
        panel.add_widget(&a, 30);

        assert_eq!(ids(&panel), vec!["b", "a"]);
        assert!(panel.remove_widget(&a));
        assert!(!panel.contains(&a));
        assert_eq!(panel.find_by_id("b").map(|w| w.id().to_string()), Some("b".to_string()));
    }
}
