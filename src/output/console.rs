//! Line writers shared by console output and report files
//!
//! Every writer takes a `WriteColor`, so the same code renders colored
//! lines to a terminal and plain lines into a `NoColor` buffer.

use std::io;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::probe::ProbeFailure;
use crate::scan::{Issue, TensorRecord};

use super::config::OutputConfig;

/// Stdout stream honoring the configured color choice.
pub fn stdout_stream(config: &OutputConfig) -> StandardStream {
    let choice = if config.use_color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

fn write_colored<W: WriteColor + ?Sized>(
    out: &mut W,
    text: &str,
    color: Color,
    bold: bool,
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold))?;
    write!(out, "{}", text)?;
    out.reset()
}

/// `--- title ---`
pub fn write_header<W: WriteColor + ?Sized>(out: &mut W, title: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "--- {} ---", title)?;
    out.reset()?;
    writeln!(out)
}

pub fn write_dump_line<W: WriteColor + ?Sized>(
    out: &mut W,
    record: &TensorRecord,
) -> io::Result<()> {
    write_colored(out, &record.path, Color::Cyan, false)?;
    write!(out, " : ")?;
    if record.is_leaf {
        write!(out, "{}", record.dump_fields())?;
    } else {
        write_colored(out, &record.dump_fields(), Color::Yellow, false)?;
    }
    writeln!(out)
}

pub fn write_non_leaf_line<W: WriteColor + ?Sized>(
    out: &mut W,
    record: &TensorRecord,
) -> io::Result<()> {
    write_colored(out, "non-leaf tensor", Color::Red, true)?;
    write!(out, " at ")?;
    write_colored(out, &record.path, Color::Cyan, false)?;
    writeln!(out, ": {}", record.non_leaf_fields())
}

pub fn write_issue_line<W: WriteColor + ?Sized>(out: &mut W, issue: &Issue) -> io::Result<()> {
    write!(out, "Path: ")?;
    write_colored(out, &issue.path, Color::Cyan, false)?;
    writeln!(out, " -> {}", issue.description)
}

pub fn write_probe_failure<W: WriteColor + ?Sized>(
    out: &mut W,
    failure: &ProbeFailure,
) -> io::Result<()> {
    write!(out, "Error in module: ")?;
    write_colored(out, &failure.path, Color::Cyan, false)?;
    writeln!(out)?;
    write!(out, "  Error type: ")?;
    write_colored(out, &failure.kind, Color::Red, true)?;
    writeln!(out)?;
    writeln!(out, "  Error message: {}", failure.message)
}

#[cfg(test)]
mod tests {
    use termcolor::{Buffer, NoColor};

    use super::*;
    use crate::graph::{NodePath, Tensor};

    fn record(path: &str, tensor: &Tensor) -> TensorRecord {
        TensorRecord::capture(&NodePath::root(path), tensor).unwrap()
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut NoColor<Vec<u8>>) -> io::Result<()>,
    {
        let mut out = NoColor::new(Vec::new());
        f(&mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn test_plain_lines_match_record_text() {
        let leaf = record("obj.w", &Tensor::parameter(vec![2]));
        let hot = record("obj.h", &Tensor::computed(vec![2], "TanhBackward0"));

        assert_eq!(
            render(|o| write_dump_line(o, &leaf)),
            format!("{}\n", leaf.dump_line())
        );
        assert_eq!(
            render(|o| write_dump_line(o, &hot)),
            format!("{}\n", hot.dump_line())
        );
        assert_eq!(
            render(|o| write_non_leaf_line(o, &hot)),
            format!("{}\n", hot.non_leaf_line())
        );
        let issue = hot.to_issue();
        assert_eq!(
            render(|o| write_issue_line(o, &issue)),
            format!("{}\n", issue.line())
        );
        assert_eq!(render(|o| write_header(o, "x")), "--- x ---\n");
    }

    #[test]
    fn test_colored_output_contains_escape_codes() {
        let hot = record("obj.h", &Tensor::computed(vec![2], "TanhBackward0"));
        let mut buf = Buffer::ansi();
        write_non_leaf_line(&mut buf, &hot).unwrap();
        let text = String::from_utf8(buf.into_inner()).unwrap();
        assert!(text.contains("\x1b["));
        assert!(text.contains("obj.h"));
    }
}
