//! Layout restoration for the lab shell.
//!
//! Widgets are not serializable, so persisted layouts refer to them by name. [`NamedWidgets`]
//! maps names back to live widgets, the [`serializer`] converts live area descriptions to the
//! persisted [`data`] schema and back, and [`LayoutRestorer`] decides when every restorable
//! tracker has finished re-creating its widgets before the shell consumes the layout.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod data;
pub mod layout;
pub mod named;
pub mod restorer;
pub mod serializer;

pub use data::{
    AreaData, DownAreaData, LayoutData, MainAreaData, Orientation, SideAreaData, TopAreaData,
};
pub use layout::{AreaConfig, DownArea, LayoutMode, MainArea, ShellLayout, SideArea, TopArea};
pub use named::NamedWidgets;
pub use restorer::{
    LayoutRestorer, RestoreRequest, RestorerError, RestorerOptions, TrackerRestore,
    LAYOUT_RESTORER_KEY,
};
