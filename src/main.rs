//! CLI entry point for gradwalk

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use gradwalk::output::{stdout_stream, write_issue_line, write_probe_failure};
use gradwalk::{
    OutputConfig, Report, Value, collect, collect_issues, dump_tensors, load_graph,
    print_json, print_non_leaf, probe_deep_copy, set_dropout_train_only,
};
use log::info;

/// Color output mode
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // Respect NO_COLOR environment variable (https://no-color.org/)
            if std::env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if std::env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            std::io::stdout().is_terminal()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "gradwalk")]
#[command(about = "Find non-leaf tensors and deep-copy hazards in a model graph snapshot")]
#[command(version)]
struct Args {
    /// JSON snapshot of the object graph
    snapshot: PathBuf,

    /// Print only non-leaf tensors
    #[arg(long = "non-leaf", conflicts_with_all = ["issues", "probe"])]
    non_leaf: bool,

    /// List tensors that would break a deep copy
    #[arg(long = "issues", conflicts_with = "probe")]
    issues: bool,

    /// Try deep-copying the root module and localize failures
    #[arg(long = "probe")]
    probe: bool,

    /// Write a full report (all tensors + issues) to FILE
    #[arg(short = 'o', long = "report", value_name = "FILE")]
    report: Option<PathBuf>,

    /// Label for the root in printed paths
    #[arg(short = 'l', long = "label", default_value = "obj")]
    label: String,

    /// Put modules in eval mode but keep dropout layers training before scanning
    #[arg(long = "dropout-train-only")]
    dropout_train_only: bool,

    /// Output in JSON format
    #[arg(long = "json")]
    json: bool,

    /// Control color output: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    color: ColorMode,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    let config = OutputConfig {
        use_color: should_use_color(args.color),
        label: args.label.clone(),
        json: args.json,
    };

    let root = load_graph(&args.snapshot).unwrap_or_else(|e| {
        eprintln!(
            "gradwalk: cannot load '{}': {}",
            args.snapshot.display(),
            e
        );
        process::exit(1);
    });

    if let Err(e) = run(&args, &config, &root) {
        eprintln!("gradwalk: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args, config: &OutputConfig, root: &Value) -> gradwalk::Result<()> {
    if args.dropout_train_only {
        let enabled = set_dropout_train_only(root, &config.label)?;
        info!("{} dropout modules left in training mode", enabled);
    }

    if let Some(ref path) = args.report {
        let mut report = Report::build(root, &config.label)?;
        if args.probe {
            report = report.with_probe(probe_deep_copy(root, &config.label)?);
        }
        report.write_to(path)?;
        eprintln!("gradwalk: debug info written to '{}'", path.display());
        return Ok(());
    }

    if args.probe {
        let failures = probe_deep_copy(root, &config.label)?;
        if config.json {
            print_json(&failures)?;
        } else {
            let mut out = stdout_stream(config);
            for failure in &failures {
                write_probe_failure(&mut out, failure)?;
            }
        }
        return Ok(());
    }

    if args.issues {
        let issues = collect_issues(root, &config.label)?;
        if config.json {
            print_json(&issues)?;
        } else {
            let mut out = stdout_stream(config);
            for issue in &issues {
                write_issue_line(&mut out, issue)?;
            }
        }
        return Ok(());
    }

    if config.json {
        let records = if args.non_leaf {
            collect(root, &config.label, |t| !t.is_leaf())?
        } else {
            collect(root, &config.label, |_| true)?
        };
        print_json(&records)?;
    } else if args.non_leaf {
        print_non_leaf(root, &config.label, stdout_stream(config))?;
    } else {
        dump_tensors(root, &config.label, stdout_stream(config))?;
    }
    Ok(())
}
