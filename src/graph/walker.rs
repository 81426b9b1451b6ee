//! GraphWalker - visits every tensor reachable from a root exactly once

use std::collections::HashSet;

use log::{debug, trace};
use serde::Serialize;

use crate::error::{Error, Result};

use super::node::{Node, NodeId, NodeKind};
use super::path::NodePath;
use super::tensor::TensorLike;

/// Identities already seen during one walk.
///
/// Create one per top-level walk. Passing the same set to several walks
/// makes later walks skip everything the earlier ones reached.
#[derive(Debug, Default)]
pub struct VisitedSet {
    ids: HashSet<NodeId>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `id` was already present.
    pub fn insert(&mut self, id: NodeId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Callback for tensor leaves - receives the path and the tensor.
pub trait TensorVisitor {
    fn visit_tensor(&mut self, path: &NodePath, tensor: &dyn TensorLike) -> Result<()>;
}

impl<F> TensorVisitor for F
where
    F: FnMut(&NodePath, &dyn TensorLike) -> Result<()>,
{
    fn visit_tensor(&mut self, path: &NodePath, tensor: &dyn TensorLike) -> Result<()> {
        self(path, tensor)
    }
}

/// Counters for a finished walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Distinct identities visited.
    pub nodes: usize,
    pub tensors: usize,
    /// Times a node was reached again through another path.
    pub aliases_skipped: usize,
    pub opaque: usize,
}

/// Depth-first walker over heterogeneous object graphs.
///
/// Dispatch order per node: seen-before check, mark, then tensor, mapping,
/// sequence, attributes, opaque. Tensors are terminal. The visited set is
/// the only termination guard; there is no depth limit, so a pathologically
/// deep chain can exhaust the stack.
pub struct GraphWalker<'a, V: TensorVisitor + ?Sized> {
    visited: &'a mut VisitedSet,
    visitor: &'a mut V,
    stats: WalkStats,
}

impl<'a, V: TensorVisitor + ?Sized> GraphWalker<'a, V> {
    pub fn new(visited: &'a mut VisitedSet, visitor: &'a mut V) -> Self {
        Self {
            visited,
            visitor,
            stats: WalkStats::default(),
        }
    }

    /// Walk `root` with a fresh visited set, labeling it `label`.
    pub fn walk<N: Node>(root: &N, label: &str, visitor: &'a mut V) -> Result<WalkStats> {
        let mut visited = VisitedSet::new();
        let stats = GraphWalker::new(&mut visited, visitor).run(root, &NodePath::root(label))?;
        debug!(
            "walked '{}': {} nodes, {} tensors, {} aliases skipped",
            label, stats.nodes, stats.tensors, stats.aliases_skipped
        );
        Ok(stats)
    }

    /// Walk `root` from `path`, consuming the walker.
    pub fn run<N: Node>(mut self, root: &N, path: &NodePath) -> Result<WalkStats> {
        self.visit(root, path)?;
        Ok(self.stats)
    }

    fn visit<N: Node>(&mut self, node: &N, path: &NodePath) -> Result<()> {
        if let Some(id) = node.identity() {
            if !self.visited.insert(id) {
                trace!("skipping {}: already visited", path);
                self.stats.aliases_skipped += 1;
                return Ok(());
            }
            self.stats.nodes += 1;
        }

        let kind = node
            .classify()
            .map_err(|e| Error::traversal(path.as_str(), e.to_string()))?;

        match kind {
            NodeKind::Tensor(tensor) => {
                self.stats.tensors += 1;
                self.visitor.visit_tensor(path, &tensor)?;
            }
            NodeKind::Mapping(entries) => {
                for (key, value) in &entries {
                    self.visit(value, &path.key(key))?;
                }
            }
            NodeKind::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.visit(item, &path.index(i))?;
                }
            }
            NodeKind::Attributes(attrs) => {
                for (name, value) in &attrs {
                    self.visit(value, &path.attr(name))?;
                }
            }
            NodeKind::Opaque => {
                self.stats.opaque += 1;
            }
        }
        Ok(())
    }
}

/// Walk `root` with a fresh visited set and call `visitor` at every tensor.
pub fn walk<N, V>(root: &N, label: &str, visitor: &mut V) -> Result<WalkStats>
where
    N: Node,
    V: TensorVisitor + ?Sized,
{
    GraphWalker::walk(root, label, visitor)
}
