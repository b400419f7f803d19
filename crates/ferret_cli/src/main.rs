//! # Commands
//!
//! - `ferret detect` - Scan git history for committed secrets
//! - `ferret protect` - Scan uncommitted changes before they reach history
//! - `ferret scan` - Scan a directory tree without consulting git

mod git;
mod report;
mod ui;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use ferret_core::prelude::*;
use ferret_core::CONFIG_FILENAME;
use tracing::{info, warn};

use crate::report::ReportFormat;

#[derive(Debug, Parser)]
#[command(
    name = "ferret",
    version,
    about = "ferret digs credentials and API tokens out of source trees and git history",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan git history for committed secrets.
    #[command(visible_alias = "d")]
    Detect(DetectArgs),

    /// Scan uncommitted changes before they reach history.
    #[command(visible_alias = "p")]
    Protect(ProtectArgs),

    /// Scan a directory tree without consulting git.
    #[command(visible_alias = "s")]
    Scan(ScanArgs),
}

/// Flags shared by every scanning command.
#[derive(Debug, Args)]
struct CommonArgs {
    /// Repository or directory to scan.
    #[arg(short, long, default_value = ".")]
    source: PathBuf,

    /// Rule config file (defaults to `<source>/.ferret.toml`, falling
    /// back to the built-in rules).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a findings report to this path.
    #[arg(short, long)]
    report_path: Option<PathBuf>,

    /// Report format.
    #[arg(short = 'f', long, value_enum, default_value_t)]
    report_format: ReportFormat,

    /// Log each finding as it is discovered.
    #[arg(short, long)]
    verbose: bool,

    /// Replace secrets with placeholders in all output.
    #[arg(long)]
    redact: bool,

    /// Exit code when leaks are found.
    #[arg(long, default_value_t = 1)]
    exit_code: i32,

    /// Skip files larger than this many bytes.
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Number of scanning threads (defaults to the logical CPU count).
    #[arg(long)]
    threads: Option<usize>,
}

/// Arguments for `ferret detect`.
#[derive(Debug, Args)]
struct DetectArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Extra `git log` options, replacing the default
    /// `--full-history --all`.
    #[arg(long)]
    log_opts: Option<String>,
}

/// Arguments for `ferret protect`.
#[derive(Debug, Args)]
struct ProtectArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Scan the staged index instead of the working tree.
    #[arg(long)]
    staged: bool,
}

/// Arguments for `ferret scan`.
#[derive(Debug, Args)]
struct ScanArgs {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            ui::print_error(&format!("{err:#}"));
            std::process::exit(ui::exit::ERROR);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(command: Command) -> anyhow::Result<i32> {
    let common = match &command {
        Command::Detect(args) => &args.common,
        Command::Protect(args) => &args.common,
        Command::Scan(args) => &args.common,
    };

    let config = load_config(common)?;
    let detector = Detector::new(config)
        .with_verbose(common.verbose)
        .with_redact(common.redact)
        .with_threads(common.threads)
        .with_max_file_size(common.max_file_size);

    let started = Instant::now();
    let scan = match &command {
        Command::Detect(args) => {
            let source = git::GitSource::history(&common.source, args.log_opts.clone());
            detector.detect_stream(source.fragments()?)?
        }
        Command::Protect(args) => {
            let source = if args.staged {
                git::GitSource::staged(&common.source)
            } else {
                git::GitSource::working_tree(&common.source)
            };
            detector.detect_stream(source.fragments()?)?
        }
        Command::Scan(_) => detector.detect_files(&common.source)?,
    };

    info!("scan completed in {:.2?}", started.elapsed());
    if scan.is_cancelled() {
        warn!("scan cancelled; findings are partial");
    }
    if scan.findings.is_empty() {
        info!("no leaks found");
    } else {
        warn!("leaks found: {}", scan.findings.len());
    }

    if let Some(path) = &common.report_path {
        let file = File::create(path).with_context(|| format!("creating report '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        report::write(&scan.findings, detector.config(), common.report_format, &mut writer)
            .context("writing report")?;
        writer.flush().context("flushing report")?;
    }

    Ok(if scan.findings.is_empty() { 0 } else { common.exit_code })
}

/// Resolves the rule set: an explicit `--config`, then the conventional
/// `<source>/.ferret.toml`, then the embedded catalog.
fn load_config(common: &CommonArgs) -> anyhow::Result<Config> {
    if let Some(path) = &common.config {
        return Config::load(path).with_context(|| format!("loading config '{}'", path.display()));
    }

    let conventional = common.source.join(CONFIG_FILENAME);
    if conventional.is_file() {
        return Config::load(&conventional).with_context(|| format!("loading config '{}'", conventional.display()));
    }

    Config::builtin().context("compiling built-in rules")
}
