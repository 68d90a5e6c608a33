//! Opaque widget handles tracked by the shell and the layout restorer.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    rc::{Rc, Weak},
};

use serde::{Deserialize, Serialize};

use crate::signal::Signal;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Layout state of a split or accordion panel hosted in a side area.
pub struct PanelState {
    /// Relative sizes of the panel sections.
    #[serde(default)]
    pub sizes: Option<Vec<f64>>,
    /// Expanded flag per accordion section.
    #[serde(default)]
    pub expansion_states: Option<Vec<bool>>,
}

struct WidgetInner {
    id: String,
    label: RefCell<String>,
    class_names: RefCell<BTreeSet<String>>,
    panel_state: RefCell<Option<PanelState>>,
    disposed: Cell<bool>,
    disposed_signal: Signal<Widget>,
}

/// Cloneable handle to a UI panel. Equality is handle identity, not id equality.
///
/// The handle carries no rendering state. Lifetime is owned by whoever holds strong handles;
/// registries that should not extend it keep a [`WeakWidget`] instead.
#[derive(Clone)]
pub struct Widget {
    inner: Rc<WidgetInner>,
}

impl Widget {
    /// Creates a widget with the given DOM-unique id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            inner: Rc::new(WidgetInner {
                label: RefCell::new(id.clone()),
                id,
                class_names: RefCell::new(BTreeSet::new()),
                panel_state: RefCell::new(None),
                disposed: Cell::new(false),
                disposed_signal: Signal::new(),
            }),
        }
    }

    /// Sets the title label and returns the widget, for construction chains.
    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.set_label(label);
        self
    }

    /// Stable id of the widget.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Title label shown on tabs and side bar entries.
    pub fn label(&self) -> String {
        self.inner.label.borrow().clone()
    }

    /// Replaces the title label.
    pub fn set_label(&self, label: impl Into<String>) {
        *self.inner.label.borrow_mut() = label.into();
    }

    /// Adds a class name. Returns `false` when it was already present.
    pub fn add_class(&self, name: &str) -> bool {
        self.inner.class_names.borrow_mut().insert(name.to_string())
    }

    /// Removes a class name. Returns `false` when it was absent.
    pub fn remove_class(&self, name: &str) -> bool {
        self.inner.class_names.borrow_mut().remove(name)
    }

    /// Returns `true` when the class name is present.
    pub fn has_class(&self, name: &str) -> bool {
        self.inner.class_names.borrow().contains(name)
    }

    /// Split/accordion state, for widgets hosting a multi-section layout.
    pub fn panel_state(&self) -> Option<PanelState> {
        self.inner.panel_state.borrow().clone()
    }

    /// Replaces the split/accordion state.
    pub fn set_panel_state(&self, state: Option<PanelState>) {
        *self.inner.panel_state.borrow_mut() = state;
    }

    /// Disposes the widget and notifies [`Widget::disposed`] slots exactly once.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.disposed_signal.emit(self);
        self.inner.disposed_signal.disconnect_all();
    }

    /// Returns `true` once [`Widget::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Lifecycle channel fired when the widget is disposed.
    pub fn disposed(&self) -> &Signal<Widget> {
        &self.inner.disposed_signal
    }

    /// Returns a non-owning handle.
    pub fn downgrade(&self) -> WeakWidget {
        WeakWidget {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl PartialEq for Widget {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Widget {}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("id", &self.inner.id)
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

#[derive(Clone, Default)]
/// Non-owning widget handle.
pub struct WeakWidget {
    inner: Weak<WidgetInner>,
}

impl WeakWidget {
    /// Returns the live widget, or `None` once every strong handle is gone.
    pub fn upgrade(&self) -> Option<Widget> {
        self.inner.upgrade().map(|inner| Widget { inner })
    }
}

impl std::fmt::Debug for WeakWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(widget) => write!(f, "WeakWidget({})", widget.id()),
            None => f.write_str("WeakWidget(<dropped>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_fires_once_and_clears_slots() {
        let widget = Widget::new("w1");
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        widget
            .disposed()
            .connect(move |w: &Widget| {
                assert!(w.is_disposed());
                counter.set(counter.get() + 1);
            });

        widget.dispose();
        widget.dispose();
        assert_eq!(hits.get(), 1);
        assert_eq!(widget.disposed().slot_count(), 0);
    }

    #[test]
    fn equality_is_handle_identity() {
        let a = Widget::new("same");
        let b = Widget::new("same");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn weak_handle_does_not_keep_widget_alive() {
        let widget = Widget::new("w");
        let weak = widget.downgrade();
        assert_eq!(weak.upgrade(), Some(widget.clone()));
        drop(widget);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn class_names_toggle() {
        let widget = Widget::new("w").with_label("Notebook");
        assert_eq!(widget.label(), "Notebook");
        assert!(widget.add_class("jp-mod-current"));
        assert!(!widget.add_class("jp-mod-current"));
        assert!(widget.has_class("jp-mod-current"));
        assert!(widget.remove_class("jp-mod-current"));
        assert!(!widget.has_class("jp-mod-current"));
    }

    #[test]
    fn panel_state_serializes_camel_case() {
        let state = PanelState {
            sizes: Some(vec![0.5, 0.5]),
            expansion_states: Some(vec![true, false]),
        };
        let value = serde_json::to_value(&state).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"sizes": [0.5, 0.5], "expansionStates": [true, false]})
        );
    }
}
