use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use deduper_core::dedupe::{self, pretty_byte_count, DedupeOptions, DedupeReport, Strategy};
use deduper_core::generate::{self, GenerateOptions};
use deduper_core::localize::{FluentLoc, Messages};
use deduper_core::path_safety::PathPolicy;
use deduper_core::progress::Progress;
use deduper_core::show::show_signature;
use deduper_core::verify::{self, MismatchReason, VerifyOptions, VerifyReport};
use deduper_core::walk::PathFilter;
use deduper_core::Format;

#[derive(Parser)]
#[command(name = "deduper", version, about = "Compute and verify file signatures for a directory tree")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args, Clone, Copy, Debug)]
struct ProgressFlag {
    /// Echo each "<signature> <path>" pair as it is produced
    #[arg(long, overrides_with = "no_progress")]
    progress: bool,
    /// Do not echo progress (default)
    #[arg(long, overrides_with = "progress")]
    no_progress: bool,
}

impl ProgressFlag {
    fn enabled(self) -> bool {
        self.progress && !self.no_progress
    }
}

#[derive(Args, Clone, Copy, Debug)]
struct DryRunFlag {
    /// Report what would be deleted (default)
    #[arg(long, overrides_with = "no_dry_run")]
    dry_run: bool,
    /// Delete duplicates chosen by the strategy
    #[arg(long, overrides_with = "dry_run")]
    no_dry_run: bool,
}

impl DryRunFlag {
    fn enabled(self) -> bool {
        self.dry_run || !self.no_dry_run
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Write a signature list for every regular file under STARTDIR
    Generate {
        list_file: PathBuf,
        start_dir: PathBuf,
        #[arg(long, default_value_t = Format::default())]
        format: Format,
        #[command(flatten)]
        progress: ProgressFlag,
        /// Only list files matching this glob (repeatable)
        #[arg(long)]
        include: Vec<String>,
        /// Skip files matching this glob (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },
    /// Check the tree under STARTDIR against a signature list
    Verify {
        list_file: PathBuf,
        start_dir: PathBuf,
        #[command(flatten)]
        progress: ProgressFlag,
        /// Follow symlinks that stay inside STARTDIR
        #[arg(long)]
        follow_symlinks: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print signatures (never with size) for the given files
    Show {
        #[arg(required = true)]
        filenames: Vec<PathBuf>,
        #[arg(long, default_value_t = Format::default())]
        format: Format,
    },
    /// Find duplicate files under ROOTDIR
    Dupes {
        root_dir: PathBuf,
        #[arg(long, default_value_t = Strategy::default())]
        strategy: Strategy,
        #[command(flatten)]
        dry_run: DryRunFlag,
        /// Allow running on shallow directories such as / or $HOME
        #[arg(long)]
        force: bool,
        /// Compare every duplicate group byte-for-byte before acting on it
        #[arg(long)]
        debug: bool,
        /// Only consider files matching this glob (repeatable)
        #[arg(long)]
        include: Vec<String>,
        /// Ignore files matching this glob (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let loc = FluentLoc::builtin("en-GB");

    let start = Local::now();
    info!("run started at {}", start);
    let ok = match cli.cmd {
        Cmd::Generate { list_file, start_dir, format, progress, include, exclude } => {
            generate(&loc, &list_file, &start_dir, format, progress.enabled(), &include, &exclude)?
        }
        Cmd::Verify { list_file, start_dir, progress, follow_symlinks, json } => {
            let policy = PathPolicy { follow_symlinks };
            verify(&loc, &list_file, &start_dir, progress.enabled(), policy, json)?
        }
        Cmd::Show { filenames, format } => show(&filenames, format)?,
        Cmd::Dupes { root_dir, strategy, dry_run, force, debug, include, exclude, json } => {
            let opts = DedupeOptions {
                strategy,
                dry_run: dry_run.enabled(),
                filter: PathFilter::new(&include, &exclude)?,
                verify_groups: debug,
            };
            dupes(&loc, &root_dir, &opts, force, json)?
        }
    };
    let end = Local::now();
    info!("run finished at {}, elapsed {} ms", end, (end - start).num_milliseconds());

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn generate(
    loc: &impl Messages,
    list_file: &Path,
    start_dir: &Path,
    format: Format,
    show_progress: bool,
    include: &[String],
    exclude: &[String],
) -> Result<bool> {
    let opts = GenerateOptions { format, filter: PathFilter::new(include, exclude)? };
    let mut prog = Progress::new(show_progress);
    let report = generate::generate(list_file, start_dir, &opts, &mut prog)
        .with_context(|| format!("generate {} from {}", list_file.display(), start_dir.display()))?;
    eprintln!(
        "{}",
        loc.msg(
            "generate-done",
            &[
                ("files", report.files.to_string().as_str()),
                ("bytes", pretty_byte_count(report.total_bytes).as_str()),
                ("list", list_file.display().to_string().as_str()),
                ("format", report.format.name()),
            ],
        )
    );
    Ok(true)
}

fn verify(
    loc: &impl Messages,
    list_file: &Path,
    start_dir: &Path,
    show_progress: bool,
    policy: PathPolicy,
    json: bool,
) -> Result<bool> {
    let mut prog = Progress::new(show_progress);
    let report = verify::verify(list_file, start_dir, &VerifyOptions { policy }, &mut prog)
        .with_context(|| format!("verify {} against {}", start_dir.display(), list_file.display()))?;

    for m in &report.mismatches {
        eprintln!("{}", mismatch_line(loc, &m.rel_path, &m.reason));
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", summary_line(loc, &report));
    }
    Ok(report.is_ok())
}

fn mismatch_line(loc: &impl Messages, path: &str, reason: &MismatchReason) -> String {
    match reason {
        MismatchReason::Changed { expected, actual } => loc.msg(
            "mismatch-changed",
            &[("path", path), ("expected", expected.as_str()), ("actual", actual.as_str())],
        ),
        MismatchReason::Unreadable { message } => {
            loc.msg("mismatch-unreadable", &[("path", path), ("message", message.as_str())])
        }
        MismatchReason::UnsafePath { message } => {
            loc.msg("mismatch-unsafe", &[("path", path), ("message", message.as_str())])
        }
    }
}

fn summary_line(loc: &impl Messages, report: &VerifyReport) -> String {
    let matched = report.matched.to_string();
    let mismatched = report.mismatched.to_string();
    let format = report.format.name();
    if report.is_ok() {
        loc.msg("verify-ok", &[("matched", matched.as_str()), ("format", format)])
    } else {
        loc.msg(
            "verify-failure",
            &[("mismatched", mismatched.as_str()), ("matched", matched.as_str()), ("format", format)],
        )
    }
}

fn show(filenames: &[PathBuf], format: Format) -> Result<bool> {
    for p in filenames {
        let sig = show_signature(p, format).with_context(|| format!("show {}", p.display()))?;
        println!("{} {}", sig, p.display());
    }
    Ok(true)
}

fn dupes(
    loc: &impl Messages,
    root_dir: &Path,
    opts: &DedupeOptions,
    force: bool,
    json: bool,
) -> Result<bool> {
    let root = std::fs::canonicalize(root_dir)
        .with_context(|| format!("stat {}", root_dir.display()))?;
    if !force && !dedupe::is_safe_dir(&root) {
        bail!(loc.msg("unsafe-dir", &[("dir", root.display().to_string().as_str())]));
    }
    let report = dedupe::find_duplicates(&root, opts)
        .with_context(|| format!("find duplicates under {}", root.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_dupes(loc, &report);
    }
    Ok(true)
}

fn print_dupes(loc: &impl Messages, report: &DedupeReport) {
    let join = |paths: &[PathBuf]| {
        if paths.is_empty() {
            "(empty)".to_string()
        } else {
            paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
        }
    };
    println!(
        "{}",
        loc.msg(
            "dupes-candidates",
            &[
                ("size", report.size_candidates.to_string().as_str()),
                ("partial", report.partial_candidates.to_string().as_str()),
            ],
        )
    );
    for g in &report.groups {
        println!(
            "{}",
            loc.msg(
                "dupes-group",
                &[
                    ("signature", g.signature.as_str()),
                    ("keep", join(&g.keep).as_str()),
                    ("remove", join(&g.remove).as_str()),
                ],
            )
        );
    }
    println!(
        "{}",
        loc.msg(
            "dupes-summary",
            &[
                ("files", report.duplicate_files.to_string().as_str()),
                ("bytes", pretty_byte_count(report.duplicate_bytes).as_str()),
            ],
        )
    );
    let code = if report.dry_run { "dupes-would-remove" } else { "dupes-removed" };
    println!(
        "{}",
        loc.msg(
            code,
            &[
                ("strategy", report.strategy.name()),
                ("files", report.removed.len().to_string().as_str()),
                ("bytes", pretty_byte_count(report.bytes_freed).as_str()),
            ],
        )
    );
}
