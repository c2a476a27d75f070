//! Aggregation of traversal observations into layout trees.
//!
//! This module transforms a stream of observations into:
//! - A type-topology histogram (class histogram drill-down)
//! - A retained-footprint tree (heap tree drill-down)
//! - Walk totals

pub mod deduplicator;
pub mod layout;
pub mod path_builder;
pub mod perm_tree;
pub mod stats;
pub mod tree_builder;
pub mod trie;

// Re-export main types and functions
pub use deduplicator::{load_deduplicator, parse_deduplicator, DeduplicationConfig, HistogramDeduplicator};
pub use layout::{HeapLayout, HeapLayoutBuilder, HeapStats, Observation};
pub use path_builder::{PathBuilder, PathId, Symbol};
pub use perm_tree::{NodeRef, PermId, PermTree};
pub use stats::{percent, ArrayUsage, StatsAccumulator};
pub use tree_builder::{build_tree, Gathering, Pivot, TreePolicy};
pub use trie::{NodeContext, PrefixTrie};
