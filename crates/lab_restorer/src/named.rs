//! Name-to-widget registry used to rehydrate persisted widget references.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use lab_widgets::{SlotId, WeakWidget, Widget};

#[derive(Default)]
struct NamedInner {
    by_name: HashMap<String, WeakWidget>,
    names: HashMap<String, String>,
    subscriptions: HashMap<String, (WeakWidget, SlotId)>,
}

impl NamedInner {
    fn forget_widget(&mut self, widget_id: &str) {
        if let Some(name) = self.names.remove(widget_id) {
            self.by_name.remove(&name);
        }
        self.subscriptions.remove(widget_id);
    }
}

/// Registry mapping stable names to live widgets.
///
/// Entries hold weak handles only; widget lifetime stays with the shell and trackers. A widget is
/// registered under at most one name and each name points at one widget. Disposal evicts the
/// entry through the widget's lifecycle channel.
#[derive(Clone, Default)]
pub struct NamedWidgets {
    inner: Rc<RefCell<NamedInner>>,
}

impl NamedWidgets {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `widget` under `name`, replacing any previous name of the widget and any previous
    /// owner of the name. Disposed widgets are ignored.
    pub fn add(&self, widget: &Widget, name: impl Into<String>) {
        if widget.is_disposed() {
            return;
        }
        let name = name.into();
        let widget_id = widget.id().to_string();
        let mut inner = self.inner.borrow_mut();

        if let Some(previous) = inner.names.get(&widget_id).cloned() {
            if previous != name {
                inner.by_name.remove(&previous);
            }
        }

        let displaced = inner
            .by_name
            .get(&name)
            .and_then(WeakWidget::upgrade)
            .filter(|owner| owner != widget);
        if let Some(owner) = displaced {
            inner.names.remove(owner.id());
            if let Some((_, slot)) = inner.subscriptions.remove(owner.id()) {
                owner.disposed().disconnect(slot);
            }
        }

        inner.by_name.insert(name.clone(), widget.downgrade());
        inner.names.insert(widget_id.clone(), name);

        let subscribed = inner
            .subscriptions
            .get(&widget_id)
            .and_then(|(weak, _)| weak.upgrade())
            .is_some_and(|subscribed| &subscribed == widget);
        if !subscribed {
            let registry: Weak<RefCell<NamedInner>> = Rc::downgrade(&self.inner);
            let slot = widget.disposed().connect(move |disposed: &Widget| {
                if let Some(inner) = registry.upgrade() {
                    inner.borrow_mut().forget_widget(disposed.id());
                }
            });
            inner
                .subscriptions
                .insert(widget_id, (widget.downgrade(), slot));
        }
    }

    /// Returns the live widget registered under `name`.
    pub fn get(&self, name: &str) -> Option<Widget> {
        self.inner
            .borrow()
            .by_name
            .get(name)
            .and_then(WeakWidget::upgrade)
            .filter(|widget| !widget.is_disposed())
    }

    /// Returns `true` when `name` resolves to a live widget.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the name `widget` is registered under.
    pub fn name_of(&self, widget: &Widget) -> Option<String> {
        let inner = self.inner.borrow();
        let name = inner.names.get(widget.id())?;
        let owner = inner.by_name.get(name).and_then(WeakWidget::upgrade)?;
        (&owner == widget).then(|| name.clone())
    }

    /// Removes the entry for `widget`, if any.
    pub fn remove(&self, widget: &Widget) {
        let mut inner = self.inner.borrow_mut();
        if let Some((_, slot)) = inner.subscriptions.get(widget.id()).cloned() {
            widget.disposed().disconnect(slot);
        }
        inner.forget_widget(widget.id());
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.inner.borrow().by_name.len()
    }

    /// Returns `true` when no names are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().by_name.is_empty()
    }
}

impl std::fmt::Debug for NamedWidgets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        let mut names = inner.by_name.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("NamedWidgets").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn re_adding_under_new_name_moves_the_mapping() {
        let names = NamedWidgets::new();
        let widget = Widget::new("w1");

        names.add(&widget, "notebook:a");
        names.add(&widget, "notebook:b");

        assert_eq!(names.len(), 1);
        assert!(names.get("notebook:a").is_none());
        assert_eq!(names.get("notebook:b"), Some(widget.clone()));
        assert_eq!(names.name_of(&widget), Some("notebook:b".to_string()));
        assert_eq!(widget.disposed().slot_count(), 1);
    }

    #[test]
    fn disposal_evicts_entry() {
        let names = NamedWidgets::new();
        let widget = Widget::new("w1");
        names.add(&widget, "notebook:a");

        widget.dispose();

        assert!(names.is_empty());
        assert!(names.get("notebook:a").is_none());
        assert_eq!(names.name_of(&widget), None);
    }

    #[test]
    fn name_taken_by_another_widget_is_reassigned() {
        let names = NamedWidgets::new();
        let first = Widget::new("w1");
        let second = Widget::new("w2");

        names.add(&first, "console:1");
        names.add(&second, "console:1");

        assert_eq!(names.get("console:1"), Some(second.clone()));
        assert_eq!(names.name_of(&first), None);
        assert_eq!(first.disposed().slot_count(), 0);

        first.dispose();
        assert_eq!(names.get("console:1"), Some(second));
    }

    #[test]
    fn registry_does_not_keep_widgets_alive() {
        let names = NamedWidgets::new();
        let widget = Widget::new("w1");
        names.add(&widget, "terminal:1");
        drop(widget);
        assert!(names.get("terminal:1").is_none());
    }

    #[test]
    fn disposed_widgets_are_not_registered() {
        let names = NamedWidgets::new();
        let widget = Widget::new("w1");
        widget.dispose();
        names.add(&widget, "terminal:1");
        assert!(names.is_empty());
    }

    #[test]
    fn remove_drops_entry_and_subscription() {
        let names = NamedWidgets::new();
        let widget = Widget::new("w1");
        names.add(&widget, "terminal:1");
        names.remove(&widget);
        assert!(names.is_empty());
        assert_eq!(widget.disposed().slot_count(), 0);
    }
}
