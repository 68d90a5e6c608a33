//! Shell layout composition for the lab application.
//!
//! The [`LabShell`] arranges widgets in named areas: a dock-style main area with tab groups and
//! splits, ranked side bars, a tabbed down panel, and header/top/menu/bottom strips. It restores
//! the persisted layout through a [`lab_restorer::LayoutRestorer`] and saves it again after every
//! burst of layout changes. [`LabContext`] wires the shell, restorer, command registry, and state
//! connector together for an application session.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod area;
pub mod context;
pub mod dock;
pub mod down;
pub mod ranked;
pub mod save_queue;
pub mod shell;
pub mod side_bar;

pub use area::{AddOptions, Area, AreaPlacement, InsertMode, UserLayout, DEFAULT_RANK};
pub use context::{LabContext, USER_LAYOUT_KEY};
pub use shell::{LabShell, ShellError, DEFAULT_RELATIVE_SIZES};
