//! Object graph model and traversal
//!
//! This module provides the pieces needed to find tensors inside arbitrary
//! model/optimizer structures:
//!
//! - `Node` / `NodeKind`: the capability a value exposes to be walked
//! - `Value`: a ready-made dynamic graph (dicts, lists, sets, objects)
//! - `GraphWalker`: identity-guarded depth-first traversal
//! - `Snapshot`: JSON loader producing `Value` graphs

mod node;
mod path;
mod snapshot;
mod tensor;
mod value;
mod walker;

pub use node::{Key, Node, NodeId, NodeKind};
pub use path::NodePath;
pub use snapshot::{KeySpec, ObjectSpec, Snapshot, TensorSpec, ValueSpec, load_graph};
pub use tensor::{Device, Tensor, TensorLike, format_grad_fn, format_shape};
pub use value::{Dict, Object, Value};
pub use walker::{GraphWalker, TensorVisitor, VisitedSet, WalkStats, walk};
