//! Output JSON schema definitions for layout profiles.
//!
//! This module defines the structure of JSON files we write to disk.
//! Schema is versioned to allow future evolution.

use serde::{Deserialize, Serialize};

use crate::aggregator::{HeapLayout, NodeRef, PermTree};
use crate::utils::config::SCHEMA_VERSION;

/// Top-level profile structure written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutProfile {
    /// Schema version for compatibility checking
    pub version: String,

    /// Roots the layout was built from
    pub description: String,

    /// Number of records seen
    pub total_count: u64,

    /// Sum of all record sizes
    pub total_size: u64,

    /// Top-level rows of the class histogram
    pub footprint: Vec<ProfileRow>,

    /// Type-topology tree, flattened in display order
    pub class_histogram: Vec<ProfileRow>,

    /// Retained-footprint tree, flattened in display order
    pub heap_tree: Vec<ProfileRow>,

    /// Timestamp when profile was generated
    pub generated_at: String,
}

/// One report row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub depth: usize,

    pub label: String,

    /// Name of a folded type row
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prefix: Option<String>,

    pub count: u64,
    pub size: u64,
    pub average: u64,
    pub total_count: u64,
    pub total_size: u64,

    /// `None` when the parent total is zero
    pub parent_count_percentage: Option<f64>,
    pub parent_size_percentage: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub array: Option<ArrayRow>,
}

/// Occupancy of array rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayRow {
    pub length: u64,
    pub used: u64,
    pub use_percentage: Option<f64>,
}

impl ProfileRow {
    fn from_node(node: NodeRef<'_>, depth: usize) -> Self {
        Self {
            depth,
            label: node.label(),
            prefix: node.prefix().map(str::to_string),
            count: node.count(),
            size: node.size(),
            average: node.average(),
            total_count: node.total_count(),
            total_size: node.total_size(),
            parent_count_percentage: finite(node.parent_count_percentage()),
            parent_size_percentage: finite(node.parent_size_percentage()),
            array: node.array_usage().map(|usage| ArrayRow {
                length: usage.length,
                used: usage.used,
                use_percentage: finite(node.use_percentage()),
            }),
        }
    }
}

/// Convert a finished layout to its JSON profile
///
/// **Public** - used by the analyze command
pub fn to_profile(layout: &HeapLayout) -> LayoutProfile {
    let mut footprint = Vec::new();
    layout
        .class_histogram()
        .walk(1, Some(1), -1, |node, depth| footprint.push(ProfileRow::from_node(node, depth)));

    LayoutProfile {
        version: SCHEMA_VERSION.to_string(),
        description: layout.description().to_string(),
        total_count: layout.total_count(),
        total_size: layout.total_size(),
        footprint,
        class_histogram: flatten(layout.class_histogram()),
        heap_tree: flatten(layout.heap_tree()),
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn flatten(tree: &PermTree) -> Vec<ProfileRow> {
    let mut rows = Vec::with_capacity(tree.len());
    tree.walk(0, None, 0, |node, depth| rows.push(ProfileRow::from_node(node, depth)));
    rows
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
