//! # paramstore-core
//!
//! Hierarchical runtime-configuration store. Parameters live in a tree of
//! groups and leaves, persisted as YAML, updated either one path at a time or
//! by merging a partial tree, with read-only protection and reload listeners.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use paramstore_core::{SettingsStore, StoreConfig};
//!
//! let store = SettingsStore::open(StoreConfig::new("/tmp/settings.yaml").with_version("1.0"));
//!
//! // Listeners run on load and merge, not on single-path writes.
//! store.subscribe(Arc::new(|s: &SettingsStore| {
//!     println!("timeout now {}", s.grpc_timeout());
//! }), true);
//!
//! store.set("global/grpc_timeout", 20.0)?;
//! store.apply("sysmon:\n  CPU:\n    load_warn_level: 0.8\n")?;
//! ```
//!
//! ## Module Overview
//!
//! - [`tree`]: `ParameterTree`, `Node`, `Scalar`, path lookup/mutation and the
//!   built-in default tree
//! - [`codec`]: YAML encode/decode, file load with default fallback, save
//! - [`merge`]: read-only aware merge driven by the live tree's shape
//! - [`notify`]: ordered, identity de-duplicated reload listeners
//! - [`store`]: `SettingsStore`, tying the above together under one lock
//! - [`error`]: `StoreError`

pub mod codec;
pub mod error;
pub mod merge;
pub mod notify;
pub mod store;
pub mod tree;

pub use error::StoreError;
pub use merge::{merge_trees, merge_value, MergeReport, RetainReason, Retained};
pub use notify::{Listener, NotificationHub};
pub use store::{RuntimeConfig, SettingsStore, StoreConfig};
pub use tree::{Group, LeafMeta, Node, ParamPath, ParameterTree, PathError, Scalar};
