//! Scan output formatting
//!
//! - `config` - Output configuration types
//! - `console` - Line writers for colored terminals and plain buffers
//! - `json` - JSON output
//! - `report` - Report aggregation into a text file

mod config;
mod console;
mod json;
mod report;

pub use config::OutputConfig;
pub use console::{
    stdout_stream, write_dump_line, write_header, write_issue_line, write_non_leaf_line,
    write_probe_failure,
};
pub use json::print_json;
pub use report::{
    ISSUES_HEADER, NO_ISSUES_LINE, NO_PROBE_FAILURES_LINE, PROBE_HEADER, Report, TENSORS_HEADER,
    save_debug_info,
};
