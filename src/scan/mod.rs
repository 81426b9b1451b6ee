//! Tensor scans over object graphs
//!
//! Each scan is a [`GraphWalker`](crate::graph::GraphWalker) run with a
//! different visitor:
//!
//! - `print_non_leaf` - one line per non-leaf tensor
//! - `collect_issues` - non-leaf tensors as `(path, description)` issues
//! - `dump_tensors` - one line per tensor with every flag
//! - `collect` - records for tensors matching any predicate

mod record;
mod visitors;

use termcolor::WriteColor;

use crate::error::Result;
use crate::graph::{Node, TensorLike, walk};

pub use record::{Issue, TensorRecord};
pub use visitors::{IssueCollector, NonLeafPrinter, RecordCollector, TensorDumper};

/// Print every non-leaf tensor reachable from `root`. Returns how many were found.
pub fn print_non_leaf<N: Node, W: WriteColor>(root: &N, label: &str, out: W) -> Result<usize> {
    let mut printer = NonLeafPrinter::new(out);
    walk(root, label, &mut printer)?;
    Ok(printer.found())
}

/// Collect every non-leaf tensor reachable from `root` as an issue.
pub fn collect_issues<N: Node>(root: &N, label: &str) -> Result<Vec<Issue>> {
    let mut collector = IssueCollector::new();
    walk(root, label, &mut collector)?;
    Ok(collector.into_issues())
}

/// Print every tensor reachable from `root`. Returns the number printed.
pub fn dump_tensors<N: Node, W: WriteColor>(root: &N, label: &str, out: W) -> Result<usize> {
    let mut dumper = TensorDumper::new(out);
    walk(root, label, &mut dumper)?;
    Ok(dumper.count())
}

/// Records for every tensor reachable from `root` that satisfies `predicate`.
pub fn collect<N, P>(root: &N, label: &str, predicate: P) -> Result<Vec<TensorRecord>>
where
    N: Node,
    P: FnMut(&dyn TensorLike) -> bool,
{
    let mut collector = RecordCollector::new(predicate);
    walk(root, label, &mut collector)?;
    Ok(collector.into_records())
}
