//! Frozen presentation tree.
//!
//! A [`PermTree`] is produced once per pivot and never changes afterwards.
//! Nodes sit in an arena: children are owned index lists, and the parent
//! index exists only for percentage-of-parent.

use super::stats::{pack, pack_size, percent, ArrayUsage, StatsAccumulator};
use crate::utils::config::{ELISION_MARKER, SIZE_SHIFT};
use crate::utils::error::AggregationError;

/// Handle of a presentation node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermId(usize);

#[derive(Debug, Clone)]
pub struct PermNode {
    name: String,
    owner: Option<String>,
    prefix: Option<String>,
    parent: Option<PermId>,
    children: Vec<PermId>,
    stats: StatsAccumulator,
    retained_count: u32,
    retained_size_units: u32,
    elided: bool,
    synthetic: bool,
}

impl PermNode {
    /// Row named `name`, optionally qualified by the simple name of its owner
    pub fn new(name: impl Into<String>, owner: Option<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.filter(|o| !o.is_empty()),
            prefix: None,
            parent: None,
            children: Vec::new(),
            stats: StatsAccumulator::new(),
            retained_count: 0,
            retained_size_units: 0,
            elided: false,
            synthetic: false,
        }
    }

    /// Mark as the row of a terminal path
    pub fn elided(mut self) -> Self {
        self.elided = true;
        self
    }

    /// Display label, `Owner.field` for qualified rows
    pub fn label(&self) -> String {
        let mut label = match &self.owner {
            Some(owner) => format!("{}.{}", owner, self.name),
            None => self.name.clone(),
        };
        if self.elided {
            label.push_str(ELISION_MARKER);
        }
        label
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn add(&mut self, stats: &StatsAccumulator) -> Result<(), AggregationError> {
        self.stats.add(stats)
    }

    pub fn set_synthetic(&mut self, synthetic: bool) {
        self.synthetic = synthetic;
    }

    pub fn clear_array_info(&mut self) {
        self.stats.clear_array_info();
    }

    pub fn stats(&self) -> &StatsAccumulator {
        &self.stats
    }

    pub fn retained_count(&self) -> u64 {
        self.retained_count as u64
    }

    pub fn retained_size(&self) -> u64 {
        (self.retained_size_units as u64) << SIZE_SHIFT
    }

    pub fn set_retained_count(&mut self, count: u64) -> Result<(), AggregationError> {
        self.retained_count = pack("retained count", count)?;
        Ok(())
    }

    pub fn set_retained_size(&mut self, size: u64) -> Result<(), AggregationError> {
        self.retained_size_units = pack_size("retained size", size)?;
        Ok(())
    }

    pub fn total_count(&self) -> u64 {
        self.stats.count() + self.retained_count()
    }

    pub fn total_size(&self) -> u64 {
        self.stats.size() + self.retained_size()
    }
}

/// Immutable tree of presentation rows
#[derive(Debug, Clone)]
pub struct PermTree {
    nodes: Vec<PermNode>,
    root: PermId,
    max_depth: usize,
}

impl PermTree {
    /// Freeze `nodes` rooted at `root`
    pub(crate) fn new(nodes: Vec<PermNode>, root: PermId, max_depth: usize) -> Self {
        Self {
            nodes,
            root,
            max_depth,
        }
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: PermId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Deepest trie depth seen while building; bounds any traversal stack
    ///
    /// The root sits at depth 0 and its children at depth 1, so a walk
    /// holding one entry per level needs `max_depth() + 1` slots.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of rows, folded rows excluded
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk, largest child first
    ///
    /// `visit` receives each node at a depth in `min_depth..=max_depth`
    /// (unbounded when `max_depth` is `None`), together with that depth
    /// shifted by `depth_offset`.
    pub fn walk<F>(&self, min_depth: usize, max_depth: Option<usize>, depth_offset: isize, mut visit: F)
    where
        F: FnMut(NodeRef<'_>, usize),
    {
        let mut stack: Vec<(usize, PermId)> = Vec::with_capacity(self.max_depth + 1);
        stack.push((0, self.root));

        while let Some((depth, id)) = stack.pop() {
            if depth >= min_depth {
                let shifted = (depth as isize + depth_offset).max(0) as usize;
                visit(self.node(id), shifted);
            }

            if max_depth.map_or(true, |max| depth < max) {
                for &child in &self.nodes[id.0].children {
                    stack.push((depth + 1, child));
                }
            }
        }
    }
}

/// Read-only view of one row
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a PermTree,
    id: PermId,
}

impl<'a> NodeRef<'a> {
    fn inner(&self) -> &'a PermNode {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> PermId {
        self.id
    }

    pub fn label(&self) -> String {
        self.inner().label()
    }

    /// Name of the type row folded into this one, if any
    pub fn prefix(&self) -> Option<&'a str> {
        self.inner().prefix.as_deref()
    }

    pub fn is_elided(&self) -> bool {
        self.inner().elided
    }

    /// Whether the row only sums its children
    pub fn is_synthetic(&self) -> bool {
        self.inner().synthetic
    }

    pub fn count(&self) -> u64 {
        self.inner().stats.count()
    }

    pub fn size(&self) -> u64 {
        self.inner().stats.size()
    }

    pub fn average(&self) -> u64 {
        self.inner().stats.average()
    }

    pub fn retained_count(&self) -> u64 {
        self.inner().retained_count()
    }

    pub fn retained_size(&self) -> u64 {
        self.inner().retained_size()
    }

    pub fn total_count(&self) -> u64 {
        self.inner().total_count()
    }

    pub fn total_size(&self) -> u64 {
        self.inner().total_size()
    }

    pub fn array_usage(&self) -> Option<ArrayUsage> {
        self.inner().stats.array_usage()
    }

    pub fn use_percentage(&self) -> f64 {
        self.inner().stats.use_percentage()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.inner().parent.map(|id| self.tree.node(id))
    }

    pub fn parent_count_percentage(&self) -> f64 {
        match self.parent() {
            Some(parent) => percent(self.total_count(), parent.total_count()),
            None => 100.0,
        }
    }

    pub fn parent_size_percentage(&self) -> f64 {
        match self.parent() {
            Some(parent) => percent(self.total_size(), parent.total_size()),
            None => 100.0,
        }
    }

    /// Children in ascending order; consumers read them back to front
    pub fn children(&self) -> impl DoubleEndedIterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.inner().children.iter().map(move |&id| tree.node(id))
    }

    pub fn child_count(&self) -> usize {
        self.inner().children.len()
    }
}

/// Arena under construction, frozen into a [`PermTree`]
#[derive(Debug, Default)]
pub(crate) struct PermArena {
    nodes: Vec<PermNode>,
}

impl PermArena {
    pub(crate) fn push(&mut self, node: PermNode) -> PermId {
        self.nodes.push(node);
        PermId(self.nodes.len() - 1)
    }

    pub(crate) fn get(&self, id: PermId) -> &PermNode {
        &self.nodes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: PermId) -> &mut PermNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn set_prefix(&mut self, id: PermId, prefix: String) {
        self.nodes[id.0].prefix = Some(prefix);
    }

    pub(crate) fn set_children(&mut self, parent: PermId, children: Vec<PermId>) {
        for &child in &children {
            self.nodes[child.0].parent = Some(parent);
        }
        self.nodes[parent.0].children = children;
    }

    pub(crate) fn freeze(self, root: PermId, max_depth: usize) -> PermTree {
        PermTree::new(self.nodes, root, max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, count: u64, size: u64) -> PermNode {
        let mut node = PermNode::new(name, None);
        let mut stats = StatsAccumulator::new();
        stats.set_count(count).unwrap();
        stats.set_size(size).unwrap();
        node.add(&stats).unwrap();
        node
    }

    fn sample() -> PermTree {
        let mut arena = PermArena::default();
        let small = arena.push(row("small", 1, 8));
        let large = arena.push(row("large", 3, 24));
        let root = arena.push(row("root", 4, 32));
        arena.set_children(root, vec![small, large]);
        arena.freeze(root, 1)
    }

    #[test]
    fn test_label_qualification_and_elision() {
        let qualified = PermNode::new("next", Some("Node".to_string()));
        assert_eq!(qualified.label(), "Node.next");

        let unqualified = PermNode::new("[i]", Some(String::new()));
        assert_eq!(unqualified.label(), "[i]");

        let elided = PermNode::new("java.io.FileDescriptor", None).elided();
        assert_eq!(elided.label(), "java.io.FileDescriptor (...)");
    }

    #[test]
    fn test_parent_percentages() {
        let tree = sample();
        let root = tree.root();
        assert_eq!(root.parent_count_percentage(), 100.0);

        let large = root.children().next_back().unwrap();
        assert_eq!(large.label(), "large");
        assert_eq!(large.parent_count_percentage(), 75.0);
        assert_eq!(large.parent_size_percentage(), 75.0);
    }

    #[test]
    fn test_walk_visits_largest_child_first() {
        let tree = sample();
        let mut seen = Vec::new();
        tree.walk(0, None, 0, |node, depth| seen.push((node.label(), depth)));
        assert_eq!(
            seen,
            vec![
                ("root".to_string(), 0),
                ("large".to_string(), 1),
                ("small".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_walk_depth_window() {
        let tree = sample();
        let mut seen = Vec::new();
        tree.walk(1, Some(1), -1, |node, depth| seen.push((node.label(), depth)));
        assert_eq!(
            seen,
            vec![("large".to_string(), 0), ("small".to_string(), 0)]
        );
    }

    #[test]
    fn test_retained_overflow() {
        let mut node = PermNode::new("x", None);
        assert!(node.set_retained_count(u32::MAX as u64 + 1).is_err());
        node.set_retained_size(64).unwrap();
        assert_eq!(node.total_size(), 64);
    }
}
