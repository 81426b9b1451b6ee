//! Report aggregation: full tensor dump plus deep-copy hazards, as one text file

use std::io;
use std::path::Path;

use log::info;
use serde::Serialize;
use termcolor::{NoColor, WriteColor};

use crate::error::Result;
use crate::graph::Node;
use crate::probe::ProbeFailure;
use crate::scan::{Issue, TensorRecord, collect, collect_issues};

use super::console::{write_dump_line, write_header, write_issue_line, write_probe_failure};

pub const TENSORS_HEADER: &str = "all tensors";
pub const ISSUES_HEADER: &str = "tensors that may break deep copy";
pub const PROBE_HEADER: &str = "deep copy probe";
pub const NO_ISSUES_LINE: &str = "no problematic tensors found.";
pub const NO_PROBE_FAILURES_LINE: &str = "every module deep-copies cleanly.";

/// Everything a debug report says about one graph.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub label: String,
    pub tensors: Vec<TensorRecord>,
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<Vec<ProbeFailure>>,
}

impl Report {
    /// Dump every tensor under `root` and collect the non-leaf ones as issues.
    pub fn build<N: Node>(root: &N, label: &str) -> Result<Self> {
        let tensors = collect(root, label, |_| true)?;
        let issues = collect_issues(root, label)?;
        Ok(Self {
            label: label.to_string(),
            tensors,
            issues,
            probe: None,
        })
    }

    /// Append deep-copy probe results as a third section.
    pub fn with_probe(mut self, failures: Vec<ProbeFailure>) -> Self {
        self.probe = Some(failures);
        self
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty() || self.probe.as_ref().is_some_and(|p| !p.is_empty())
    }

    pub fn render<W: WriteColor + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write_header(out, TENSORS_HEADER)?;
        for record in &self.tensors {
            write_dump_line(out, record)?;
        }

        writeln!(out)?;
        write_header(out, ISSUES_HEADER)?;
        if self.issues.is_empty() {
            writeln!(out, "{}", NO_ISSUES_LINE)?;
        } else {
            for issue in &self.issues {
                write_issue_line(out, issue)?;
            }
        }

        if let Some(failures) = &self.probe {
            writeln!(out)?;
            write_header(out, PROBE_HEADER)?;
            if failures.is_empty() {
                writeln!(out, "{}", NO_PROBE_FAILURES_LINE)?;
            }
            for failure in failures {
                write_probe_failure(out, failure)?;
            }
        }
        Ok(())
    }

    /// Plain-text rendering.
    pub fn to_text(&self) -> String {
        let mut out = NoColor::new(Vec::new());
        // Writing into a Vec cannot fail.
        let _ = self.render(&mut out);
        String::from_utf8_lossy(&out.into_inner()).into_owned()
    }

    /// Write the plain-text report as UTF-8.
    pub fn write_to(&self, filename: &Path) -> Result<()> {
        std::fs::write(filename, self.to_text())?;
        info!(
            "wrote report for '{}' to {} ({} tensors, {} issues)",
            self.label,
            filename.display(),
            self.tensors.len(),
            self.issues.len()
        );
        Ok(())
    }
}

/// Build a report for `root` and write it to `filename`.
pub fn save_debug_info<N: Node>(root: &N, label: &str, filename: &Path) -> Result<Report> {
    let report = Report::build(root, label)?;
    report.write_to(filename)?;
    Ok(report)
}
