//! # lazytree
//!
//! A lazily materialized tree model over a mutable hierarchical source.
//!
//! ## Overview
//!
//! A consumer (typically a tree view) asks the model for rows one level
//! at a time. The model mirrors only what was asked for in a shadow tree
//! and keeps that mirror in line with the source through incremental
//! reconciliation:
//!
//! - **Lazy**: children are materialized the first time they are counted.
//! - **Identity-preserving**: an item that stays in place keeps its node,
//!   its address and its materialized subtree across passes.
//! - **Bracketed**: every structural change reaches observers as a
//!   begin/end pair around the actual mutation.
//! - **Coalesced**: nested update windows and repeated queue requests
//!   collapse into one pass.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::rc::Rc;
//!
//! use lazytree::{Address, ManualScheduler, MemorySource, Role, TreeModel};
//!
//! let source = MemorySource::new();
//! let docs = source.push(None, "docs").unwrap();
//! source.push(Some(docs), "readme").unwrap();
//!
//! let scheduler = ManualScheduler::new();
//! let model = TreeModel::new(source, Rc::new(scheduler.clone()));
//!
//! let docs_row = model.index(0, Address::Root).unwrap();
//! assert_eq!(model.row_count(docs_row), 1);
//!
//! // Mutate, then let the model catch up on the next turn.
//! model.source().push(None, "src").unwrap();
//! model.queue_update();
//! scheduler.run_pending();
//! assert_eq!(model.data(docs_row, Role::Display), "docs");
//! ```
//!
//! ## Re-exports
//!
//! - `lazytree::core` - value types (addresses, events, roles)
//! - `lazytree::source` - the `Source` trait and `MemorySource`
//! - `lazytree::sync` - shadow-tree cache and reconciliation

pub mod coalescer;
pub mod config;
pub mod error;
pub mod model;
pub mod scheduler;

// Re-export component crates
pub use lazytree_core as core;
pub use lazytree_source as source;
pub use lazytree_sync as sync;

// Re-export main types for convenience
pub use coalescer::UpdateCoalescer;
pub use config::ModelConfig;
pub use error::{ModelError, Result, ScheduleError};
pub use model::TreeModel;
pub use scheduler::{LocalScheduler, ManualScheduler, Scheduler, Task, TaskHandle};

// Re-export commonly used component types
pub use lazytree_core::{Address, ModelEvent, NodeId, Role, RowRange};
pub use lazytree_source::{ItemId, MemorySource, Source, SourceExt, UpdateSink};
pub use lazytree_sync::{CacheSnapshot, NodeCache, Observer, ReconcileStats};
