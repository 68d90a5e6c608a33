//! Single-threaded notification channel with connect/disconnect semantics.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Handle returned by [`Signal::connect`], used to disconnect the slot later.
pub struct SlotId(u64);

type Slot<T> = Rc<dyn Fn(&T)>;

struct SignalInner<T> {
    next_id: Cell<u64>,
    slots: RefCell<Vec<(SlotId, Slot<T>)>>,
}

/// Notification channel carrying `&T` to every connected slot, in connection order.
///
/// Clones share the same slot list. Slots may connect or disconnect (including themselves)
/// while an emission is in progress: a slot disconnected mid-emission is not invoked, and a
/// slot connected mid-emission only sees the next emission.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(SignalInner {
                next_id: Cell::new(1),
                slots: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slot_count())
            .finish()
    }
}

impl<T> Signal<T> {
    /// Creates a signal with no slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects `slot` and returns its handle.
    pub fn connect(&self, slot: impl Fn(&T) + 'static) -> SlotId {
        let id = SlotId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.slots.borrow_mut().push((id, Rc::new(slot)));
        id
    }

    /// Disconnects a slot. Returns `false` when it was not connected.
    pub fn disconnect(&self, id: SlotId) -> bool {
        let mut slots = self.inner.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    /// Disconnects every slot.
    pub fn disconnect_all(&self) {
        self.inner.slots.borrow_mut().clear();
    }

    /// Number of connected slots.
    pub fn slot_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    /// Invokes every connected slot with `args`.
    pub fn emit(&self, args: &T) {
        let ids = self
            .inner
            .slots
            .borrow()
            .iter()
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();

        for id in ids {
            let slot = self
                .inner
                .slots
                .borrow()
                .iter()
                .find(|(slot_id, _)| *slot_id == id)
                .map(|(_, slot)| slot.clone());
            if let Some(slot) = slot {
                slot(args);
            }
        }
    }
}
