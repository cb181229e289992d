//! # Lazytree Source
//!
//! The capability set a lazytree model consumes from the externally-owned
//! hierarchy, expressed as the [`Source`] trait, plus [`MemorySource`], an
//! in-memory mutable hierarchy for tests, benchmarks and demos.
//!
//! ## Key Types
//!
//! - [`Source`] - Synchronous queries over the live hierarchy
//! - [`SourceExt`] - Convenience helpers built on [`Source`]
//! - [`UpdateSink`] - Handle a source uses to open mutation windows on the model
//! - [`MemorySource`] - In-memory implementation with mutation methods
//!
//! ## Design Notes
//!
//! - **Total queries**: Every query returns a value; "absent" is `None` or a
//!   default, never an error.
//! - **Opaque identity**: Items are tokens compared with `Eq`. The model never
//!   inspects them beyond equality.
//! - **Top level**: The source's top-level collection is queried with
//!   `parent = None`.
//! - **No reentry**: A source must not call into the model from inside a
//!   query; mutation windows are opened from outside a reconciliation pass.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, SourceError};
pub use memory::{ItemId, MemorySource};
pub use traits::{Source, SourceExt, UpdateSink};
