//! Freeze a populated trie into a presentation tree.
//!
//! One post-order pass per pivot. Each trie node becomes a row, or is
//! folded into its only child when it is a type row without stats of its
//! own. Children are sorted ascending and rolled up into retained totals.
//!
//! In the type-topology pivot the rollup only carries weight where a root
//! type is also reached through a field: that is the one case where a row
//! with records of its own has descendants. Everywhere else its retained
//! part stays zero and a row's total equals its count.

use log::debug;
use std::collections::HashMap;

use super::path_builder::{PathBuilder, PathId, Symbol, TypeId};
use super::perm_tree::{PermArena, PermId, PermNode, PermTree};
use super::stats::StatsAccumulator;
use super::trie::{NodeContext, NodeId, PrefixTrie};
use crate::utils::config::TOTAL_LABEL;
use crate::utils::error::AggregationError;

/// Accumulator stored in the tries, with the path that created it
#[derive(Debug, Clone)]
pub struct Gathering {
    pub path: PathId,
    pub stats: StatsAccumulator,
}

impl Gathering {
    pub fn new(path: PathId) -> Self {
        Self {
            path,
            stats: StatsAccumulator::new(),
        }
    }
}

/// Grouping applied to the observation stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pivot {
    /// Class histogram: keyed by the reversed type chain
    TypeTopology,
    /// Heap tree: keyed by the full labeled path
    RetainedFootprint,
}

impl Pivot {
    /// Trie key of `path` under this pivot
    pub fn key(&self, paths: &PathBuilder, path: PathId) -> Result<Vec<Symbol>, AggregationError> {
        match self {
            Pivot::TypeTopology => paths.type_pivot_key(path),
            Pivot::RetainedFootprint => paths.label_pivot_key(path),
        }
    }

    /// Both pivots fold and roll up; the root total then covers every record
    pub fn policy(&self) -> TreePolicy {
        TreePolicy {
            merge_single_field_row_into_class: true,
            aggregate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreePolicy {
    /// Fold an empty type row with one child into that child
    pub merge_single_field_row_into_class: bool,
    /// Roll children up into retained count and size
    pub aggregate: bool,
}

/// Convert `trie` into a [`PermTree`]
///
/// **Public** - called by `HeapLayoutBuilder::build` once per pivot
///
/// # Errors
/// * `AggregationError::CapacityOverflow` - If a row or rollup exceeds
///   the packed range
pub fn build_tree(
    trie: &PrefixTrie<Symbol, Gathering>,
    paths: &PathBuilder,
    pivot: Pivot,
    policy: TreePolicy,
) -> Result<PermTree, AggregationError> {
    let mut converter = Converter {
        trie,
        paths,
        pivot,
        policy,
        arena: PermArena::default(),
        rows: HashMap::with_capacity(trie.node_count()),
        root: None,
    };

    let max_depth = trie.traverse(None, &mut |ctx: &NodeContext| converter.convert(ctx))?;

    let root = converter
        .root
        .ok_or_else(|| AggregationError::invalid("trie traversal never reached the root"))?;
    debug!(
        "{:?} tree: {} trie nodes, max depth {}",
        pivot,
        trie.node_count(),
        max_depth
    );
    Ok(converter.arena.freeze(root, max_depth))
}

struct Converter<'a> {
    trie: &'a PrefixTrie<Symbol, Gathering>,
    paths: &'a PathBuilder,
    pivot: Pivot,
    policy: TreePolicy,
    arena: PermArena,
    rows: HashMap<NodeId, PermId>,
    root: Option<PermId>,
}

impl Converter<'_> {
    fn convert(&mut self, ctx: &NodeContext) -> Result<(), AggregationError> {
        let trie = self.trie;
        let element = trie.element(ctx.node).copied();
        let gathering = trie.value(ctx.node);
        let is_root = element.is_none();
        let is_type = matches!(element, Some(Symbol::Type(_)));
        let is_empty_row = gathering.map_or(true, |g| g.stats.is_empty());

        let name = match element {
            None => TOTAL_LABEL.to_string(),
            Some(Symbol::Type(type_id)) => self.paths.type_name(type_id).to_string(),
            Some(Symbol::Label(label)) => self.paths.label_name(label).to_string(),
        };

        let fold = self.policy.merge_single_field_row_into_class
            && ctx.depth > 1
            && is_type
            && is_empty_row
            && self.trie.child_count(ctx.node) == 1;

        let row = if fold {
            let only_child = self
                .trie
                .children(ctx.node)
                .next()
                .ok_or_else(|| AggregationError::invalid("folded row lost its child"))?;
            let row = self.row_of(only_child)?;
            let prefix = match self.pivot {
                Pivot::RetainedFootprint => name,
                Pivot::TypeTopology => self
                    .enclosing_type(ctx)
                    .map(|t| self.paths.type_name(t).to_string())
                    .unwrap_or_default(),
            };
            self.arena.set_prefix(row, prefix);
            row
        } else {
            self.regular_row(ctx, name, is_root, is_type, is_empty_row)?
        };

        self.rows.insert(ctx.node, row);
        if is_root {
            self.root = Some(row);
        }
        Ok(())
    }

    fn regular_row(
        &mut self,
        ctx: &NodeContext,
        name: String,
        is_root: bool,
        is_type: bool,
        is_empty_row: bool,
    ) -> Result<PermId, AggregationError> {
        let trie = self.trie;
        let gathering = trie.value(ctx.node);
        let terminal = match gathering {
            Some(g) => self.paths.is_terminal(g.path)?,
            None => false,
        };
        let owner = if is_root || is_type {
            None
        } else {
            self.owner_name(ctx, gathering)?
        };

        let mut node = PermNode::new(name, owner);
        if terminal {
            node = node.elided();
        }

        let children = self.sorted_children(ctx.node)?;

        match gathering {
            Some(g) if !is_empty_row => node.add(&g.stats)?,
            _ => {
                for &child in &children {
                    let stats = *self.arena.get(child).stats();
                    node.add(&stats)?;
                }
                node.set_synthetic(true);
                if is_root {
                    node.clear_array_info();
                }
            }
        }

        if self.policy.aggregate && !children.is_empty() {
            let mut retained_count: u64 = 0;
            let mut retained_size: u64 = 0;
            for &child in &children {
                let child = self.arena.get(child);
                let (count, size) = if is_empty_row {
                    (child.retained_count(), child.retained_size())
                } else {
                    (child.total_count(), child.total_size())
                };
                retained_count = checked_sum("retained count", retained_count, count)?;
                retained_size = checked_sum("retained size", retained_size, size)?;
            }
            node.set_retained_count(retained_count)?;
            node.set_retained_size(retained_size)?;
        }

        let id = self.arena.push(node);
        self.arena.set_children(id, children);
        Ok(id)
    }

    fn sorted_children(&self, node: NodeId) -> Result<Vec<PermId>, AggregationError> {
        let mut keyed = Vec::with_capacity(self.trie.child_count(node));
        for child in self.trie.children(node) {
            let id = self.row_of(child)?;
            let row = self.arena.get(id);
            keyed.push((
                row.total_size(),
                row.stats().size(),
                row.stats().count(),
                row.label(),
                self.prefix_of(id),
                id,
            ));
        }
        keyed.sort();
        Ok(keyed.into_iter().map(|(.., id)| id).collect())
    }

    fn prefix_of(&self, id: PermId) -> Option<String> {
        self.arena.get(id).prefix().map(str::to_string)
    }

    fn row_of(&self, node: NodeId) -> Result<PermId, AggregationError> {
        self.rows
            .get(&node)
            .copied()
            .ok_or_else(|| AggregationError::invalid("child converted after its parent"))
    }

    /// Nearest type key above `ctx`: the parent, or else the grandparent
    fn enclosing_type(&self, ctx: &NodeContext) -> Option<TypeId> {
        let parent = ctx.parent?;
        match self.trie.element(parent) {
            Some(Symbol::Type(type_id)) => Some(*type_id),
            _ => {
                let grandparent = self.trie.parent(parent)?;
                match self.trie.element(grandparent) {
                    Some(Symbol::Type(type_id)) => Some(*type_id),
                    _ => None,
                }
            }
        }
    }

    fn owner_name(
        &self,
        ctx: &NodeContext,
        gathering: Option<&Gathering>,
    ) -> Result<Option<String>, AggregationError> {
        let owner = match self.pivot {
            Pivot::TypeTopology => self.enclosing_type(ctx),
            Pivot::RetainedFootprint => match gathering {
                Some(g) => {
                    let symbols = self.paths.symbols(g.path)?;
                    match symbols.len().checked_sub(3).map(|i| symbols[i]) {
                        Some(Symbol::Type(type_id)) => Some(type_id),
                        _ => None,
                    }
                }
                None => None,
            },
        };

        Ok(owner.map(|type_id| {
            if self.paths.is_array(type_id) {
                String::new()
            } else {
                self.paths.simple_type_name(type_id).to_string()
            }
        }))
    }
}

fn checked_sum(field: &'static str, acc: u64, value: u64) -> Result<u64, AggregationError> {
    acc.checked_add(value).ok_or_else(|| {
        AggregationError::overflow(field, acc as u128 + value as u128, u64::MAX as u128)
    })
}
