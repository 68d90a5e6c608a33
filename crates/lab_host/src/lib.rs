//! Typed host-domain contracts for persisted shell state.
//!
//! This crate is the storage boundary for the lab shell. It exposes the key-value
//! [`StateConnector`] contract used by the layout restorer and restorable widget trackers, plus
//! in-memory and no-op adapters for tests and unsupported targets. Concrete browser or desktop
//! adapters implement the trait outside this workspace.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod connector;

pub use connector::{
    fetch_state_with, namespaced_id, save_state_with, MemoryStateConnector, NoopStateConnector,
    StateConnector, StateConnectorFuture, StateList,
};
