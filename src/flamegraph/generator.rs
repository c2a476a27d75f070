//! SVG flamegraph generation from the retained-footprint tree.
//!
//! The heap tree is flattened into collapsed stacks (`frame;frame;... weight`)
//! and handed to inferno. A frame weighs the bytes gathered at its own row,
//! so each box is as wide as the retained size below it.

use crate::aggregator::{NodeRef, PermId, PermTree};
use crate::utils::error::FlamegraphError;
use inferno::flamegraph::{self, Options};
use log::{debug, info};

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub count_name: String,
    /// Boxes narrower than this many pixels are omitted
    pub min_width: f64,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Heap Footprint".to_string(),
            count_name: "bytes".to_string(),
            min_width: 0.1,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_min_width(mut self, min_width: f64) -> Self {
        self.min_width = min_width;
        self
    }
}

/// One line of collapsed-stack input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedStack {
    /// Frames joined by `;`, outermost first
    pub stack: String,
    /// Bytes gathered at the innermost frame
    pub weight: u64,
}

impl CollapsedStack {
    /// Render in the `frames weight` line format
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Flatten a heap tree into collapsed stacks
///
/// The synthetic root is not a frame. Rows that only sum their children
/// weigh 0 and produce no line of their own; their frame still shows up in
/// the stacks of their descendants.
pub fn collapse_tree(tree: &PermTree) -> Vec<CollapsedStack> {
    let mut stacks = Vec::new();
    let mut pending: Vec<(PermId, String)> = tree
        .root()
        .children()
        .map(|child| (child.id(), frame_name(&child)))
        .collect();

    while let Some((id, stack)) = pending.pop() {
        let node = tree.node(id);

        let weight = if node.is_synthetic() { 0 } else { node.size() };
        if weight > 0 {
            stacks.push(CollapsedStack {
                stack: stack.clone(),
                weight,
            });
        }

        for child in node.children() {
            pending.push((child.id(), format!("{};{}", stack, frame_name(&child))));
        }
    }

    debug!("Collapsed heap tree into {} stacks", stacks.len());
    stacks
}

/// Generate an SVG flamegraph from a heap tree
///
/// # Errors
/// * `FlamegraphError::EmptyTree` - No row carries a non-zero size
/// * `FlamegraphError::RenderFailed` - inferno failed to render
pub fn generate_flamegraph(
    tree: &PermTree,
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    let stacks = collapse_tree(tree);
    if stacks.is_empty() {
        return Err(FlamegraphError::EmptyTree);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flamegraph with {} stacks", stacks.len());

    let mut options = Options::default();
    options.title = config.title;
    options.count_name = config.count_name;
    options.min_width = config.min_width;

    let lines: Vec<String> = stacks.iter().map(CollapsedStack::to_line).collect();
    let mut svg = Vec::new();
    flamegraph::from_lines(&mut options, lines.iter().map(String::as_str), &mut svg)
        .map_err(|e| FlamegraphError::RenderFailed(e.to_string()))?;

    info!("Flamegraph generated successfully ({} bytes)", svg.len());
    Ok(String::from_utf8_lossy(&svg).into_owned())
}

// `;` separates frames and a trailing space-number is the weight.
fn frame_name(node: &NodeRef<'_>) -> String {
    let name = match node.prefix() {
        Some(prefix) if !prefix.is_empty() => format!("{} {}", prefix, node.label()),
        _ => node.label(),
    };
    name.replace(';', "")
}
