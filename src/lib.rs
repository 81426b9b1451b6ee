//! gradwalk - find the tensors hiding in your model graph

pub mod error;
pub mod graph;
pub mod mode;
pub mod output;
pub mod probe;
pub mod scan;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{Error, NodeError, Result};
pub use graph::{
    GraphWalker, Key, Node, NodeId, NodeKind, NodePath, Snapshot, Tensor, TensorLike,
    TensorVisitor, Value, VisitedSet, WalkStats, load_graph, walk,
};
pub use mode::set_dropout_train_only;
pub use output::{OutputConfig, Report, print_json, save_debug_info};
pub use probe::{CopyError, DeepCopy, ProbeFailure, probe_deep_copy};
pub use scan::{Issue, TensorRecord, collect, collect_issues, dump_tensors, print_non_leaf};
