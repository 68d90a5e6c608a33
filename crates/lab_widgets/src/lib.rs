//! Shared contract types between the lab shell, the layout restorer, and widget-owning plugins.
//!
//! Widgets are opaque handles: the shell and restorer only track their identity, move them
//! between containers, and observe their disposal. Plugins group widgets in restorable trackers
//! that know how to re-create each widget through a registered command.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod commands;
pub mod gate;
pub mod signal;
pub mod tracker;
pub mod widget;

pub use commands::{CommandError, CommandFuture, CommandRegistry, Commands};
pub use gate::{gate, is_open, opened_gate, Gate, GateTrigger};
pub use signal::{Signal, SlotId};
pub use tracker::{
    ArgsFn, NameFn, RestorableTracker, RestoreOptions, TrackerError, TrackerFuture, WidgetTracker,
};
pub use widget::{PanelState, WeakWidget, Widget};
