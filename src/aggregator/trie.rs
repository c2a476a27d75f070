//! Multi-way prefix trie over path symbols.
//!
//! Nodes live in one arena and are created lazily, one per distinct key
//! prefix. Each node allocates its child map on first use. Traversal runs on
//! an explicit stack so deep keys never touch the call stack.

use std::collections::HashMap;
use std::hash::Hash;

use crate::utils::error::AggregationError;

/// Handle of a trie node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct TrieNode<K, V> {
    element: Option<K>,
    parent: Option<NodeId>,
    children: Option<HashMap<K, NodeId>>,
    value: Option<V>,
}

impl<K, V> TrieNode<K, V> {
    fn new(element: Option<K>, parent: Option<NodeId>) -> Self {
        Self {
            element,
            parent,
            children: None,
            value: None,
        }
    }
}

/// Position of a node during traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContext {
    pub node: NodeId,
    /// 0 for the root, 1 for its children
    pub depth: usize,
    pub parent: Option<NodeId>,
}

#[derive(Debug)]
pub struct PrefixTrie<K, V> {
    nodes: Vec<TrieNode<K, V>>,
}

impl<K, V> Default for PrefixTrie<K, V>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PrefixTrie<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new(None, None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Locate the node for `key`, creating it and its value on first use
    ///
    /// `factory` runs at most once per distinct key.
    ///
    /// # Errors
    /// * `AggregationError::InvalidArgument` - If `key` is empty
    pub fn compute_if_absent<F>(&mut self, key: &[K], factory: F) -> Result<NodeId, AggregationError>
    where
        F: FnOnce() -> V,
    {
        if key.is_empty() {
            return Err(AggregationError::invalid("zero-length trie key"));
        }

        let mut current = self.root();
        for element in key {
            current = self.child_or_insert(current, element);
        }

        let node = &mut self.nodes[current.0];
        if node.value.is_none() {
            node.value = Some(factory());
        }
        Ok(current)
    }

    fn child_or_insert(&mut self, parent: NodeId, element: &K) -> NodeId {
        if let Some(&child) = self.nodes[parent.0]
            .children
            .as_ref()
            .and_then(|children| children.get(element))
        {
            return child;
        }

        let child = NodeId(self.nodes.len());
        self.nodes.push(TrieNode::new(Some(element.clone()), Some(parent)));
        self.nodes[parent.0]
            .children
            .get_or_insert_with(|| HashMap::with_capacity(1))
            .insert(element.clone(), child);
        child
    }

    /// Node for `key`, without inserting
    pub fn node_for(&self, key: &[K]) -> Result<Option<NodeId>, AggregationError> {
        if key.is_empty() {
            return Err(AggregationError::invalid("zero-length trie key"));
        }

        let mut current = self.root();
        for element in key {
            match self.nodes[current.0]
                .children
                .as_ref()
                .and_then(|children| children.get(element))
            {
                Some(&child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Value stored for `key`, without inserting
    pub fn get(&self, key: &[K]) -> Result<Option<&V>, AggregationError> {
        Ok(self
            .node_for(key)?
            .and_then(|node| self.nodes[node.0].value.as_ref()))
    }

    pub fn value(&self, node: NodeId) -> Option<&V> {
        self.nodes.get(node.0).and_then(|n| n.value.as_ref())
    }

    pub fn value_mut(&mut self, node: NodeId) -> Option<&mut V> {
        self.nodes.get_mut(node.0).and_then(|n| n.value.as_mut())
    }

    /// Key element that leads into `node`, `None` for the root
    pub fn element(&self, node: NodeId) -> Option<&K> {
        self.nodes.get(node.0).and_then(|n| n.element.as_ref())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(node.0)
            .and_then(|n| n.children.as_ref())
            .into_iter()
            .flat_map(|children| children.values().copied())
    }

    pub fn child_count(&self, node: NodeId) -> usize {
        self.nodes
            .get(node.0)
            .and_then(|n| n.children.as_ref())
            .map_or(0, HashMap::len)
    }

    /// Number of nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth-first walk from the root
    ///
    /// `pre_order` sees a node before any of its descendants, `post_order`
    /// after all of them. Both see the root.
    ///
    /// # Returns
    /// Deepest depth visited, counting the root as 0 and its children as 1
    ///
    /// # Errors
    /// The first error returned by a callback; the walk stops there.
    pub fn traverse<E>(
        &self,
        mut pre_order: Option<&mut dyn FnMut(&NodeContext) -> Result<(), E>>,
        post_order: &mut dyn FnMut(&NodeContext) -> Result<(), E>,
    ) -> Result<usize, E> {
        let mut max_depth = 0;
        let mut stack: Vec<(NodeContext, Vec<NodeId>)> = Vec::new();

        let root = NodeContext {
            node: self.root(),
            depth: 0,
            parent: None,
        };
        if let Some(pre) = pre_order.as_mut() {
            pre(&root)?;
        }
        stack.push((root, self.children(root.node).collect()));

        while let Some((context, pending)) = stack.last_mut() {
            match pending.pop() {
                Some(child) => {
                    let child_context = NodeContext {
                        node: child,
                        depth: context.depth + 1,
                        parent: Some(context.node),
                    };
                    max_depth = max_depth.max(child_context.depth);
                    if let Some(pre) = pre_order.as_mut() {
                        pre(&child_context)?;
                    }
                    stack.push((child_context, self.children(child).collect()));
                }
                None => {
                    let context = *context;
                    stack.pop();
                    post_order(&context)?;
                }
            }
        }

        Ok(max_depth)
    }
}
