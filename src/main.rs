use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use comick_merger::input::MIN_MERGE_INPUTS;
use comick_merger::{
    telemetry, verify_merge, ConflictReport, EntryCompression, InputList, MergeOptions, Merger,
    Progress, RenameMode,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

/// Conflicts printed before the rest are summarized
const CONFLICT_PREVIEW: usize = 10;

#[derive(Parser, Debug)]
#[command(
    name = "comick-merger",
    version,
    about = "Merge multiple CBZ (Comic Book Zip) files into one",
    after_help = "Examples:
  # Merge with prefixes (default)
  comick-merger chapter1.cbz chapter2.cbz chapter3.cbz -o complete.cbz

  # Merge using folders instead of prefixes
  comick-merger *.cbz -o complete.cbz --folders

  # Check for conflicts without merging
  comick-merger *.cbz --check-only"
)]
struct Cli {
    /// CBZ files to merge, in order. Directories add the archives inside them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output CBZ file path
    #[arg(short, long, default_value = "merged.cbz")]
    output: PathBuf,

    /// Use folders (00/, 01/) instead of prefixes (00_, 01_)
    #[arg(long)]
    folders: bool,

    /// Only check for conflicts, don't merge
    #[arg(long)]
    check_only: bool,

    /// Print the conflict report as JSON
    #[arg(long)]
    json: bool,

    /// How entries are stored in the output
    #[arg(long, value_enum, default_value_t = Compression::Deflated)]
    compression: Compression,

    /// Stamp every entry with the merge time instead of its original time
    #[arg(long)]
    touch: bool,

    /// Re-read the output and compare every entry against its source
    #[arg(long)]
    verify: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Compression {
    Deflated,
    Stored,
    Preserve,
}

impl From<Compression> for EntryCompression {
    fn from(value: Compression) -> Self {
        match value {
            Compression::Deflated => EntryCompression::Deflated,
            Compression::Stored => EntryCompression::Stored,
            Compression::Preserve => EntryCompression::Preserve,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose, cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n[ERROR] Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();

    let inputs = collect_inputs(&cli.inputs)?;
    if inputs.len() < MIN_MERGE_INPUTS {
        bail!("Need at least 2 CBZ files to merge");
    }

    println!("Loading {} CBZ files...", inputs.len());
    let merger = Merger::new(inputs.paths()).context("Failed to load input archives")?;

    let conflicts = merger.detect_conflicts();
    merger.log_conflicts(&conflicts);
    let report = ConflictReport::new(&merger, &conflicts);
    if cli.json {
        println!(
            "{}",
            report.to_json().context("Failed to serialize conflict report")?
        );
    } else {
        println!("{}", report.render_summary(CONFLICT_PREVIEW));
    }

    if cli.check_only {
        return Ok(());
    }

    let mode = if cli.folders {
        RenameMode::Namespace
    } else {
        RenameMode::Prefix
    };
    let options = MergeOptions::new()
        .compression(cli.compression.into())
        .preserve_timestamps(!cli.touch);

    println!("Merging using {}...", mode);
    let summary = merger
        .merge_with_options(&cli.output, mode, &options, |progress| {
            if let Progress::ArchiveStarted { .. } = progress {
                println!("  {}", progress);
            }
        })
        .with_context(|| format!("Failed to merge into {}", cli.output.display()))?;

    if cli.verify {
        let check = verify_merge(&merger, &cli.output, mode).context("Failed to verify output")?;
        if !check.is_ok() {
            bail!(
                "Verification failed: {} missing, {} mismatched, {} unexpected entries",
                check.missing.len(),
                check.mismatched.len(),
                check.unexpected.len()
            );
        }
        println!("[OK] Verified {} entries", check.checked);
    }

    println!(
        "\n[OK] Success! Merged {} entries from {} CBZ files into: {} [{:.2}s]",
        summary.entries,
        summary.archives,
        summary.output.display(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Expand directories and keep the caller's order for explicit files
fn collect_inputs(raw: &[PathBuf]) -> Result<InputList> {
    let mut inputs = InputList::new();

    for path in raw {
        if path.is_dir() {
            let added = inputs
                .add_dir(path)
                .with_context(|| format!("Failed to scan directory {}", path.display()))?;
            if added == 0 {
                eprintln!("Warning: no CBZ files found in {}", path.display());
            }
            continue;
        }

        if !path.exists() {
            bail!("File not found: {}", path.display());
        }
        if !inputs.add_file(path.clone()) {
            eprintln!("Warning: skipping duplicate {}", path.display());
        }
    }

    Ok(inputs)
}
