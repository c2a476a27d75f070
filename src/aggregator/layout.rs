//! Observation intake and the finished layout.
//!
//! [`HeapLayoutBuilder`] accepts one [`Observation`] per visited instance,
//! interns its path and folds its stats into both pivot tries. `build`
//! consumes the builder and freezes the tries into a [`HeapLayout`].

use log::{debug, info};
use std::collections::HashMap;

use super::deduplicator::HistogramDeduplicator;
use super::path_builder::{PathBuilder, PathId, Symbol};
use super::perm_tree::PermTree;
use super::stats::{ArrayUsage, StatsAccumulator};
use super::tree_builder::{build_tree, Gathering, Pivot};
use super::trie::{NodeId, PrefixTrie};
use crate::utils::error::AggregationError;

/// One visited instance, as reported by the walker
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    /// Path of the referring instance, `None` for a traversal root
    pub parent: Option<PathId>,

    /// Field name or array index label; ignored for roots
    pub label: &'a str,

    pub type_name: &'a str,

    pub is_array_index: bool,

    /// Measured size in bytes, a multiple of the size alignment
    pub size: u64,

    /// Capacity and occupancy, for array instances
    pub array: Option<ArrayUsage>,
}

impl<'a> Observation<'a> {
    /// Observation of a traversal root
    pub fn root(type_name: &'a str, size: u64) -> Self {
        Self {
            parent: None,
            label: "",
            type_name,
            is_array_index: false,
            size,
            array: None,
        }
    }

    /// Observation reached through field `label` of `parent`
    pub fn field(parent: PathId, label: &'a str, type_name: &'a str, size: u64) -> Self {
        Self {
            parent: Some(parent),
            label,
            type_name,
            is_array_index: false,
            size,
            array: None,
        }
    }

    /// Observation reached through an array slot of `parent`
    pub fn element(parent: PathId, label: &'a str, type_name: &'a str, size: u64) -> Self {
        Self {
            parent: Some(parent),
            label,
            type_name,
            is_array_index: true,
            size,
            array: None,
        }
    }

    pub fn with_array(mut self, length: u64, used: u64) -> Self {
        self.array = Some(ArrayUsage::new(length, used));
        self
    }
}

/// Totals of every record seen, independent of the tries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    total_count: u64,
    total_size: u64,
}

impl HeapStats {
    pub fn add_record(&mut self, size: u64) {
        self.total_count = self.total_count.saturating_add(1);
        self.total_size = self.total_size.saturating_add(size);
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

struct PivotTrie {
    pivot: Pivot,
    trie: PrefixTrie<Symbol, Gathering>,
    // Skips the symbol-by-symbol descent for paths already seen
    shortcut: HashMap<PathId, NodeId>,
}

impl PivotTrie {
    fn new(pivot: Pivot) -> Self {
        Self {
            pivot,
            trie: PrefixTrie::new(),
            shortcut: HashMap::new(),
        }
    }

    fn gather(
        &mut self,
        paths: &PathBuilder,
        path: PathId,
        stats: &StatsAccumulator,
    ) -> Result<(), AggregationError> {
        let node = match self.shortcut.get(&path) {
            Some(&node) => node,
            None => {
                let key = self.pivot.key(paths, path)?;
                let node = self.trie.compute_if_absent(&key, || Gathering::new(path))?;
                self.shortcut.insert(path, node);
                node
            }
        };

        let gathering = self
            .trie
            .value_mut(node)
            .ok_or_else(|| AggregationError::invalid("trie node without a value"))?;
        gathering.stats.add(stats)
    }
}

/// Accumulating phase of a layout
///
/// **Public** - main entry point of the aggregator
///
/// # Example
/// ```ignore
/// let mut builder = HeapLayoutBuilder::new(HistogramDeduplicator::with_defaults());
/// let list = builder.add_observation(Observation::root("java.util.ArrayList", 24))?;
/// builder.add_observation(Observation::field(list, "elementData", "[Ljava.lang.Object;", 56).with_array(10, 10))?;
/// let layout = builder.build()?;
/// ```
pub struct HeapLayoutBuilder {
    paths: PathBuilder,
    class_histogram: PivotTrie,
    heap_tree: PivotTrie,
    stats: HeapStats,
    roots: Vec<String>,
    description: Option<String>,
}

impl HeapLayoutBuilder {
    pub fn new(dedup: HistogramDeduplicator) -> Self {
        Self {
            paths: PathBuilder::new(dedup),
            class_histogram: PivotTrie::new(Pivot::TypeTopology),
            heap_tree: PivotTrie::new(Pivot::RetainedFootprint),
            stats: HeapStats::default(),
            roots: Vec::new(),
            description: None,
        }
    }

    /// Override the description derived from the root types
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Fold one observation into both pivots
    ///
    /// # Returns
    /// The path of the observed instance, to pass as `parent` for its
    /// children
    ///
    /// # Errors
    /// * `AggregationError::InvalidArgument` - If the parent handle is
    ///   unknown or the size is misaligned
    /// * `AggregationError::CapacityOverflow` - If a count or size field
    ///   overflows
    pub fn add_observation(&mut self, observation: Observation<'_>) -> Result<PathId, AggregationError> {
        let stats = StatsAccumulator::single(observation.size, observation.array)?;
        let path = match observation.parent {
            Some(parent) => self.paths.extend(
                parent,
                observation.label,
                observation.type_name,
                observation.is_array_index,
            )?,
            None => {
                self.roots.push(observation.type_name.to_string());
                self.paths.root(observation.type_name)?
            }
        };

        self.class_histogram.gather(&self.paths, path, &stats)?;
        self.heap_tree.gather(&self.paths, path, &stats)?;
        self.stats.add_record(observation.size);
        Ok(path)
    }

    /// Interned path, for inspection
    pub fn paths(&self) -> &PathBuilder {
        &self.paths
    }

    /// Freeze both pivots
    ///
    /// # Errors
    /// * `AggregationError::CapacityOverflow` - If a rollup overflows
    pub fn build(self) -> Result<HeapLayout, AggregationError> {
        info!(
            "Building layout from {} records over {} paths",
            self.stats.total_count(),
            self.paths.path_count()
        );
        debug!(
            "Trie sizes: class histogram {}, heap tree {}",
            self.class_histogram.trie.node_count(),
            self.heap_tree.trie.node_count()
        );

        let class_histogram = build_tree(
            &self.class_histogram.trie,
            &self.paths,
            Pivot::TypeTopology,
            Pivot::TypeTopology.policy(),
        )?;
        let heap_tree = build_tree(
            &self.heap_tree.trie,
            &self.paths,
            Pivot::RetainedFootprint,
            Pivot::RetainedFootprint.policy(),
        )?;

        let description = self
            .description
            .unwrap_or_else(|| self.roots.join(", "));

        Ok(HeapLayout {
            description,
            class_histogram,
            heap_tree,
            stats: self.stats,
        })
    }
}

/// Frozen result of one build
#[derive(Debug, Clone)]
pub struct HeapLayout {
    description: String,
    class_histogram: PermTree,
    heap_tree: PermTree,
    stats: HeapStats,
}

impl HeapLayout {
    /// Comma-separated descriptions of the traversal roots
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Type-topology pivot
    pub fn class_histogram(&self) -> &PermTree {
        &self.class_histogram
    }

    /// Retained-footprint pivot
    pub fn heap_tree(&self) -> &PermTree {
        &self.heap_tree
    }

    pub fn total_count(&self) -> u64 {
        self.stats.total_count()
    }

    pub fn total_size(&self) -> u64 {
        self.stats.total_size()
    }

    pub fn to_stats(&self) -> HeapStats {
        self.stats
    }
}
