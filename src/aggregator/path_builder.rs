//! Interned traversal paths.
//!
//! A path alternates type and label symbols, `type, label, type, ..., type`,
//! and always has an odd length. Paths are created only through
//! [`PathBuilder::extend`], which folds merged sibling fields, collapses
//! periodic repeats and memoizes every outcome per parent. Equal extensions
//! of the same parent therefore always yield the same [`PathId`].

use log::debug;
use std::collections::HashMap;

use super::deduplicator::HistogramDeduplicator;
use crate::utils::error::AggregationError;

/// Handle of an interned path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(u32);

/// Handle of an interned type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

/// Handle of an interned label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(u32);

/// One element of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Type(TypeId),
    Label(LabelId),
}

impl Symbol {
    pub fn is_type(&self) -> bool {
        matches!(self, Symbol::Type(_))
    }
}

#[derive(Debug)]
struct TypeInfo {
    name: String,
    simple_name: String,
    is_array: bool,
    terminal: bool,
    merged: HashMap<LabelId, LabelId>,
}

#[derive(Debug)]
struct LabelInfo {
    name: String,
    merged: bool,
}

#[derive(Debug)]
struct PathNode {
    symbols: Box<[Symbol]>,
    parent: Option<PathId>,
    terminal: bool,
}

type ExtensionKey = (PathId, LabelId, TypeId, bool);

/// Builds and interns paths for one layout build
///
/// **Public** - owned by `HeapLayoutBuilder`
#[derive(Debug)]
pub struct PathBuilder {
    dedup: HistogramDeduplicator,
    types: Vec<TypeInfo>,
    type_ids: HashMap<String, TypeId>,
    labels: Vec<LabelInfo>,
    label_ids: HashMap<String, LabelId>,
    paths: Vec<PathNode>,
    roots: HashMap<TypeId, PathId>,
    extensions: HashMap<ExtensionKey, PathId>,
}

impl PathBuilder {
    pub fn new(dedup: HistogramDeduplicator) -> Self {
        Self {
            dedup,
            types: Vec::new(),
            type_ids: HashMap::new(),
            labels: Vec::new(),
            label_ids: HashMap::new(),
            paths: Vec::new(),
            roots: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Single-symbol path of a traversal root, interned per type
    pub fn root(&mut self, type_name: &str) -> Result<PathId, AggregationError> {
        let type_id = self.intern_type(type_name)?;
        if let Some(&path) = self.roots.get(&type_id) {
            return Ok(path);
        }

        let terminal = self.types[type_id.0 as usize].terminal;
        let path = self.push_path(vec![Symbol::Type(type_id)], None, terminal)?;
        self.roots.insert(type_id, path);
        Ok(path)
    }

    /// Path reached from `parent` through `label` to an instance of `type_name`
    ///
    /// **Public** - called once per non-root observation
    ///
    /// # Arguments
    /// * `parent` - Path of the referring instance
    /// * `label` - Field name, or the array index label
    /// * `type_name` - Type of the referenced instance
    /// * `is_array_index` - Whether the reference is an array slot
    ///
    /// # Returns
    /// Either `parent` itself (terminal parent, merged sibling field), an
    /// earlier ancestor (periodic repeat) or a new child path
    ///
    /// # Errors
    /// * `AggregationError::InvalidArgument` - If `parent` is not a path of
    ///   this builder
    pub fn extend(
        &mut self,
        parent: PathId,
        label: &str,
        type_name: &str,
        is_array_index: bool,
    ) -> Result<PathId, AggregationError> {
        let parent_node = self.node(parent)?;
        if parent_node.terminal {
            return Ok(parent);
        }
        let parent_type = self.last_type(parent)?;

        let type_id = self.intern_type(type_name)?;
        let raw_label = self.intern_label(label)?;
        let label_id = if is_array_index {
            raw_label
        } else {
            self.types[parent_type.0 as usize]
                .merged
                .get(&raw_label)
                .copied()
                .unwrap_or(raw_label)
        };

        let key = (parent, label_id, type_id, is_array_index);
        if let Some(&path) = self.extensions.get(&key) {
            return Ok(path);
        }

        let path = self.resolve_extension(parent, parent_type, label_id, type_id, is_array_index)?;
        self.extensions.insert(key, path);
        Ok(path)
    }

    fn resolve_extension(
        &mut self,
        parent: PathId,
        parent_type: TypeId,
        label: LabelId,
        type_id: TypeId,
        is_array_index: bool,
    ) -> Result<PathId, AggregationError> {
        let terminal = self.types[type_id.0 as usize].terminal;
        if terminal {
            debug!("terminal symbol {}", self.type_name(type_id));
        }

        if parent_type == type_id && self.labels[label.0 as usize].merged {
            debug!(
                "merging tail ({}, {})",
                self.label_name(label),
                self.type_name(type_id)
            );
            return Ok(parent);
        }

        let parent_symbols = &self.paths[parent.0 as usize].symbols;
        let mut child = Vec::with_capacity(parent_symbols.len() + 2);
        child.extend_from_slice(parent_symbols);
        child.push(Symbol::Label(label));
        child.push(Symbol::Type(type_id));

        if !terminal && !is_array_index && parent_symbols.len() > 3 {
            if let Some(ancestor) = self.find_repeat(parent, &child, label, type_id) {
                return Ok(ancestor);
            }
        }

        self.push_path(child, Some(parent), terminal)
    }

    // Largest block first; the nearest ancestor of matching length wins.
    fn find_repeat(
        &self,
        parent: PathId,
        child: &[Symbol],
        label: LabelId,
        type_id: TypeId,
    ) -> Option<PathId> {
        let end = child.len();
        let mut test_len = (end - 1) / 4 * 2;
        while test_len > 0 {
            let split = end - test_len;
            let start = split - test_len;
            if child[split - 2] == Symbol::Label(label)
                && child[split - 1] == Symbol::Type(type_id)
                && child[start..split] == child[split..end]
            {
                let mut cursor = Some(parent);
                while let Some(id) = cursor {
                    let node = &self.paths[id.0 as usize];
                    if node.symbols.len() == split {
                        debug!("deduplicating block of {} symbols", test_len);
                        return Some(id);
                    }
                    cursor = node.parent;
                }
            }
            test_len -= 2;
        }
        None
    }

    fn push_path(
        &mut self,
        symbols: Vec<Symbol>,
        parent: Option<PathId>,
        terminal: bool,
    ) -> Result<PathId, AggregationError> {
        let id = next_id(self.paths.len(), "paths")?;
        self.paths.push(PathNode {
            symbols: symbols.into_boxed_slice(),
            parent,
            terminal,
        });
        Ok(PathId(id))
    }

    fn intern_type(&mut self, name: &str) -> Result<TypeId, AggregationError> {
        if let Some(&id) = self.type_ids.get(name) {
            return Ok(id);
        }

        let id = TypeId(next_id(self.types.len(), "types")?);
        let table: Vec<(String, String)> = self
            .dedup
            .merged_fields_of(name)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(field, merged)| (field.clone(), merged.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut merged = HashMap::with_capacity(table.len());
        for (field, merged_label) in table {
            let field = self.intern_label(&field)?;
            let merged_label = self.intern_label(&merged_label)?;
            merged.insert(field, merged_label);
        }

        self.types.push(TypeInfo {
            name: name.to_string(),
            simple_name: simple_name(name).to_string(),
            is_array: is_array_type(name),
            terminal: self.dedup.is_terminal(name),
            merged,
        });
        self.type_ids.insert(name.to_string(), id);
        Ok(id)
    }

    fn intern_label(&mut self, name: &str) -> Result<LabelId, AggregationError> {
        if let Some(&id) = self.label_ids.get(name) {
            return Ok(id);
        }

        let id = LabelId(next_id(self.labels.len(), "labels")?);
        self.labels.push(LabelInfo {
            name: name.to_string(),
            merged: self.dedup.is_field_merged(name),
        });
        self.label_ids.insert(name.to_string(), id);
        Ok(id)
    }

    fn node(&self, path: PathId) -> Result<&PathNode, AggregationError> {
        self.paths
            .get(path.0 as usize)
            .ok_or_else(|| AggregationError::invalid(format!("unknown path handle {}", path.0)))
    }

    fn last_type(&self, path: PathId) -> Result<TypeId, AggregationError> {
        match self.node(path)?.symbols.last() {
            Some(Symbol::Type(type_id)) => Ok(*type_id),
            _ => Err(AggregationError::invalid(format!(
                "path {} does not end on a type",
                path.0
            ))),
        }
    }

    /// Symbols of `path` in traversal order
    pub fn symbols(&self, path: PathId) -> Result<&[Symbol], AggregationError> {
        Ok(&self.node(path)?.symbols)
    }

    pub fn len(&self, path: PathId) -> Result<usize, AggregationError> {
        Ok(self.node(path)?.symbols.len())
    }

    pub fn is_terminal(&self, path: PathId) -> Result<bool, AggregationError> {
        Ok(self.node(path)?.terminal)
    }

    pub fn parent(&self, path: PathId) -> Result<Option<PathId>, AggregationError> {
        Ok(self.node(path)?.parent)
    }

    /// Number of distinct paths interned so far
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Reversed path with pairs swapped after the head: `[A,x,B]` -> `[B,A,x]`
    pub fn type_pivot_key(&self, path: PathId) -> Result<Vec<Symbol>, AggregationError> {
        let mut key: Vec<Symbol> = self.node(path)?.symbols.iter().rev().copied().collect();
        swap_pairs(&mut key);
        Ok(key)
    }

    /// Path with pairs swapped after the head: `[A,x,B,y,C]` -> `[A,B,x,C,y]`
    pub fn label_pivot_key(&self, path: PathId) -> Result<Vec<Symbol>, AggregationError> {
        let mut key = self.node(path)?.symbols.to_vec();
        swap_pairs(&mut key);
        Ok(key)
    }

    pub fn type_name(&self, type_id: TypeId) -> &str {
        &self.types[type_id.0 as usize].name
    }

    /// Type name without package or enclosing types
    pub fn simple_type_name(&self, type_id: TypeId) -> &str {
        &self.types[type_id.0 as usize].simple_name
    }

    pub fn is_array(&self, type_id: TypeId) -> bool {
        self.types[type_id.0 as usize].is_array
    }

    pub fn label_name(&self, label: LabelId) -> &str {
        &self.labels[label.0 as usize].name
    }
}

fn swap_pairs(key: &mut [Symbol]) {
    for pair in key[1..].chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

fn next_id(len: usize, table: &'static str) -> Result<u32, AggregationError> {
    u32::try_from(len).map_err(|_| {
        AggregationError::overflow(table, len as u128, u32::MAX as u128)
    })
}

/// Text after the last package and nesting separator
pub fn simple_name(type_name: &str) -> &str {
    let unqualified = type_name.rsplit('.').next().unwrap_or(type_name);
    unqualified.rsplit('$').next().unwrap_or(unqualified)
}

/// JVM descriptors (`[B`) and source-style names (`byte[]`) both count
pub fn is_array_type(type_name: &str) -> bool {
    type_name.starts_with('[') || type_name.ends_with("[]")
}
