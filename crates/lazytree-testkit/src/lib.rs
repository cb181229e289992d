//! # lazytree testkit
//!
//! Testing utilities for lazytree.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Scenario vectors**: named source edits with the exact ranges a
//!   reconciliation pass must emit for them
//! - **Generators**: Proptest strategies for source mutations and outlines
//! - **Fixtures**: Outline-built sources, a recording observer, a cyclic
//!   source wrapper and seeded random trees
//!
//! ## Scenario Vectors
//!
//! ```rust
//! use lazytree_testkit::vectors::verify_all_scenarios;
//!
//! for (name, matches, _) in verify_all_scenarios() {
//!     assert!(matches, "{}", name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use lazytree_testkit::generators::{apply_all, mutations};
//!
//! proptest! {
//!     #[test]
//!     fn cache_follows_source(ops in mutations(32)) {
//!         let fixture = TestFixture::flat(&["a", "b"]);
//!         let mut cache = fixture.loaded_cache();
//!         apply_all(&fixture.source, &ops);
//!         // reconcile and compare...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use lazytree_testkit::fixtures::{Outline, TestFixture};
//!
//! let fixture = TestFixture::from_outline(&[Outline::node("a", vec![Outline::leaf("a1")])]);
//! assert_eq!(fixture.live_labels(Some("a")), vec!["a1"]);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, random_tree, EventLog, Outline, SelfParent, TestFixture};
pub use generators::{apply, apply_all, mutation, mutations, Mutation};
pub use vectors::{all_scenarios, run_scenario, verify_all_scenarios, RangeRecord, Scenario};
