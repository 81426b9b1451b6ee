//! Visitors for the three kinds of tensor scan

use termcolor::WriteColor;

use crate::error::Result;
use crate::graph::{NodePath, TensorLike, TensorVisitor};
use crate::output::{write_dump_line, write_non_leaf_line};

use super::record::{Issue, TensorRecord};

/// Prints a line for every non-leaf tensor.
pub struct NonLeafPrinter<W> {
    out: W,
    found: usize,
}

impl<W: WriteColor> NonLeafPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out, found: 0 }
    }

    pub fn found(&self) -> usize {
        self.found
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: WriteColor> TensorVisitor for NonLeafPrinter<W> {
    fn visit_tensor(&mut self, path: &NodePath, tensor: &dyn TensorLike) -> Result<()> {
        let record = TensorRecord::capture(path, tensor)?;
        if record.is_leaf {
            return Ok(());
        }
        write_non_leaf_line(&mut self.out, &record)?;
        self.found += 1;
        Ok(())
    }
}

/// Collects deep-copy hazards: every non-leaf tensor as an [`Issue`].
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: Vec<Issue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

impl TensorVisitor for IssueCollector {
    fn visit_tensor(&mut self, path: &NodePath, tensor: &dyn TensorLike) -> Result<()> {
        let record = TensorRecord::capture(path, tensor)?;
        if !record.is_leaf {
            self.issues.push(record.to_issue());
        }
        Ok(())
    }
}

/// Prints every tensor with all of its flags.
pub struct TensorDumper<W> {
    out: W,
    count: usize,
}

impl<W: WriteColor> TensorDumper<W> {
    pub fn new(out: W) -> Self {
        Self { out, count: 0 }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: WriteColor> TensorVisitor for TensorDumper<W> {
    fn visit_tensor(&mut self, path: &NodePath, tensor: &dyn TensorLike) -> Result<()> {
        let record = TensorRecord::capture(path, tensor)?;
        write_dump_line(&mut self.out, &record)?;
        self.count += 1;
        Ok(())
    }
}

/// Captures a record for every tensor matching a predicate.
pub struct RecordCollector<P> {
    predicate: P,
    records: Vec<TensorRecord>,
}

impl<P> RecordCollector<P>
where
    P: FnMut(&dyn TensorLike) -> bool,
{
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            records: Vec::new(),
        }
    }

    pub fn into_records(self) -> Vec<TensorRecord> {
        self.records
    }
}

impl<P> TensorVisitor for RecordCollector<P>
where
    P: FnMut(&dyn TensorLike) -> bool,
{
    fn visit_tensor(&mut self, path: &NodePath, tensor: &dyn TensorLike) -> Result<()> {
        let record = TensorRecord::capture(path, tensor)?;
        if (self.predicate)(tensor) {
            self.records.push(record);
        }
        Ok(())
    }
}
