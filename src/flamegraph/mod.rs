//! Flamegraph generation using the inferno library.
//!
//! This module converts the heap tree into collapsed stacks and renders
//! them as an interactive SVG, one box per field path, sized by bytes.

pub mod generator;

// Re-export main types
pub use generator::{collapse_tree, generate_flamegraph, CollapsedStack, FlamegraphConfig};
