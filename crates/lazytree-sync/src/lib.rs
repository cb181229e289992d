//! # lazytree sync
//!
//! The shadow tree behind a lazy tree model, and the pass that keeps it in
//! step with a mutable [`Source`](lazytree_source::Source).
//!
//! ## Overview
//!
//! - [`NodeCache`] is a generational arena mirroring the part of the
//!   source hierarchy a consumer has actually looked at. Children are
//!   materialized on first demand; presence can be probed without loading.
//! - [`reconcile`] walks every materialized level against the live source
//!   and emits balanced remove/insert brackets to an [`Observer`].
//! - Addresses handed to consumers carry a generation-checked [`NodeId`],
//!   so a destroyed node never resolves again.
//!
//! ## Event flow
//!
//! ```text
//! source mutated
//!   -> reconcile(root)
//!        RemoveBegin(parent, rows)  // cache still holds the rows
//!        RemoveEnd(parent, rows)    // rows gone, positions renumbered
//!        InsertBegin(parent, rows)
//!        InsertEnd(parent, rows)    // fresh unloaded nodes in place
//!   -> recurse into loaded children
//! ```
//!
//! [`NodeId`]: lazytree_core::NodeId

pub mod address;
pub mod cache;
pub mod diff;
pub mod error;
pub mod observer;

pub use address::DEFAULT_MAX_ANCESTOR_DEPTH;
pub use cache::{CacheSnapshot, Node, NodeCache};
pub use diff::{reconcile, ReconcileStats};
pub use error::{Result, SyncError};
pub use observer::{NoopObserver, Observer, ObserverSet};
