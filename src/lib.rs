//! Treeserve - filesystem aggregation tree over lstat dumps
//!
//! Ingests the gzip-compressed, tab-separated output of a parallel
//! filesystem walker and builds a compact in-memory tree mirroring the
//! scanned hierarchy. Every node carries rolled-up statistics (inode
//! counts, byte totals, age-weighted storage costs) broken down by
//! group x user x file category, queryable as depth-bounded JSON slices.
//!
//! The write path is [`builder::TreeBuilder`]; the read path is
//! [`tree::Tree::to_json`]. Between them sits a single forward-only
//! lifecycle: ingest, finalize, serve.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod classify;
pub mod datum;
pub mod error;
pub mod indexed_map;
pub mod intern;
pub mod tree;
pub mod watchdog;

// Re-export main types
pub use builder::{BuildStats, TreeBuilder};
pub use datum::Datum;
pub use error::{Error, Result};
pub use indexed_map::IndexedMap;
pub use intern::{KeyId, StringInterner};
pub use tree::{NodeId, Tree, TreeNode};
