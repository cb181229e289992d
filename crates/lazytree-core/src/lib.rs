//! # Lazytree Core
//!
//! Pure value types shared by every lazytree crate: arena keys, consumer
//! addresses, payload roles, and structural change events.
//!
//! This crate contains no source access and no tree logic. It is the
//! vocabulary the cache, the diff engine, and the consumer speak.
//!
//! ## Key Types
//!
//! - [`NodeId`] - Generational key of a cached node
//! - [`Address`] - Stable handle a consumer holds for a cached node
//! - [`Role`] - Selector for payload retrieval
//! - [`ModelEvent`] - Bracketed insert/remove notifications and full refresh
//! - [`RowRange`] - Inclusive range of sibling positions

pub mod error;
pub mod event;
pub mod types;

pub use error::{CoreError, Result};
pub use event::{ModelEvent, RowRange};
pub use types::{Address, NodeId, Role};
