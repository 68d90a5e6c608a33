//! One-shot readiness gates shared between restoration participants.

use futures::{
    channel::oneshot,
    future::{self, LocalBoxFuture, Shared},
    FutureExt,
};

/// Cloneable future that completes once its [`GateTrigger`] opens (or is dropped).
pub type Gate = Shared<LocalBoxFuture<'static, ()>>;

#[derive(Debug)]
/// Opening side of a [`Gate`].
pub struct GateTrigger {
    sender: oneshot::Sender<()>,
}

impl GateTrigger {
    /// Opens the gate, waking every waiter.
    pub fn open(self) {
        let _ = self.sender.send(());
    }
}

/// Creates a closed gate and its trigger.
///
/// Dropping the trigger without calling [`GateTrigger::open`] also opens the gate, so waiters are
/// never stranded by a dropped owner.
pub fn gate() -> (GateTrigger, Gate) {
    let (sender, receiver) = oneshot::channel::<()>();
    let gate = receiver.map(|_| ()).boxed_local().shared();
    (GateTrigger { sender }, gate)
}

/// Returns a gate that is already open.
pub fn opened_gate() -> Gate {
    future::ready(()).boxed_local().shared()
}

/// Returns `true` when `gate` has completed, without blocking.
pub fn is_open(gate: &Gate) -> bool {
    gate.clone().now_or_never().is_some()
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn gate_opens_once_triggered() {
        let (trigger, gate) = gate();
        assert!(!is_open(&gate));
        trigger.open();
        assert!(is_open(&gate));
        block_on(gate.clone());
    }

    #[test]
    fn dropped_trigger_opens_gate() {
        let (trigger, gate) = gate();
        drop(trigger);
        assert!(is_open(&gate));
    }

    #[test]
    fn opened_gate_is_ready() {
        assert!(is_open(&opened_gate()));
    }
}
