//! mdata CLI
//!
//! Command-line tool for merging DIVA mod data tables (pv_db / str_array)
//! and fixing chart text files.

use clap::{Parser, Subcommand};
use mdata_core::{
    fix_chart_file, read_lossy, scan_inputs, split_full_key, ClassifiedLine, Classifier,
    LineEnding, LineShape, MergeOutcome, MergePlan, MergeReport, ScanOptions, ScanResult,
    DEFAULT_LANGUAGE,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const RULE_WIDTH: usize = 65;

#[derive(Parser)]
#[command(name = "mdata")]
#[command(about = "DIVA mod data merger", long_about = None)]
#[command(version)]
struct Cli {
    /// Log per-file progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge every input file under the roots into one output file
    Merge {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Line shape of the inputs (pv or str-array)
        #[arg(short, long)]
        shape: LineShape,

        /// Output file (defaults to mdata_pv_db.txt / mod_str_array.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Default language whose explicit prefix is stripped ("" to disable)
        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        lang: String,

        /// Write CRLF line endings
        #[arg(long)]
        crlf: bool,

        /// Scan subdirectories too
        #[arg(long)]
        recursive: bool,

        /// Also write a JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a merge described by a plan file
    Run {
        /// Path to plan file (JSON)
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Create a plan file template
    CreatePlan {
        /// Output path for the plan file
        #[arg(short, long)]
        output: PathBuf,

        /// Line shape of the inputs (pv or str-array)
        #[arg(short, long)]
        shape: LineShape,

        /// Root directories to include
        #[arg(short, long)]
        root: Vec<PathBuf>,
    },

    /// List the files a merge would read
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Line shape of the inputs (pv or str-array)
        #[arg(short, long)]
        shape: LineShape,

        /// Scan subdirectories too
        #[arg(long)]
        recursive: bool,
    },

    /// Show how each line of a file is classified
    Classify {
        /// File to classify
        #[arg(short, long)]
        file: PathBuf,

        /// Line shape of the file (pv or str-array)
        #[arg(short, long)]
        shape: LineShape,

        /// Default language whose explicit prefix is stripped
        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        lang: String,
    },

    /// Drop sustain tails and W-note flags from a chart text file
    FixChart {
        /// Chart file to read
        #[arg(short, long, default_value = "input.txt")]
        input: PathBuf,

        /// Where to write the fixed chart
        #[arg(short, long, default_value = "output.txt")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> mdata_core::Result<()> {
    match command {
        Commands::Merge {
            root,
            shape,
            output,
            lang,
            crlf,
            recursive,
            report,
            json,
        } => {
            let mut plan = MergePlan::new(root, shape);
            plan.output = output;
            plan.default_language = lang;
            plan.line_ending = if crlf { LineEnding::Crlf } else { LineEnding::Lf };
            plan.recursive = recursive;
            plan.report = report;
            cmd_merge(&plan, json)
        }
        Commands::Run { plan } => cmd_run(&plan),
        Commands::CreatePlan { output, shape, root } => cmd_create_plan(&output, shape, root),
        Commands::Scan {
            root,
            shape,
            recursive,
        } => cmd_scan(&root, shape, recursive),
        Commands::Classify { file, shape, lang } => cmd_classify(&file, shape, &lang),
        Commands::FixChart { input, output } => cmd_fix_chart(&input, &output),
    }
}

fn cmd_merge(plan: &MergePlan, json: bool) -> mdata_core::Result<()> {
    let output = plan.output_path();
    let (scan, outcome) = plan.execute()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        return Ok(());
    }

    print_file_table(&scan, &outcome);
    print_summary(&outcome.report);

    println!("Wrote {}", output.display());
    if let Some(report) = &plan.report {
        println!("Report saved to {}", report.display());
    }

    Ok(())
}

fn cmd_run(plan_path: &Path) -> mdata_core::Result<()> {
    let plan = MergePlan::load(plan_path)?;

    println!("Running plan {}", plan_path.display());
    println!("Shape: {}", plan.shape);
    println!("Roots: {:?}", plan.roots);
    println!();

    cmd_merge(&plan, false)
}

fn cmd_create_plan(output: &Path, shape: LineShape, roots: Vec<PathBuf>) -> mdata_core::Result<()> {
    let roots = if roots.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        roots
    };

    let mut plan = MergePlan::new(roots, shape);
    plan.output = Some(PathBuf::from(shape.default_output()));

    plan.save(output)?;
    println!("Created plan file: {}", output.display());
    println!();
    println!("Edit the file to configure your merge, then run:");
    println!("  mdata run --plan {}", output.display());

    Ok(())
}

fn cmd_scan(roots: &[PathBuf], shape: LineShape, recursive: bool) -> mdata_core::Result<()> {
    let options = ScanOptions {
        recursive,
        exclude: Some(PathBuf::from(shape.default_output())),
    };
    let result = scan_inputs(roots, shape, &options)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();

    println!("Input files ({}), in merge order:", result.files.len());
    for (i, path) in result.files.iter().enumerate() {
        println!("  {}. {}", i + 1, path.display());
    }

    if !result.excluded.is_empty() {
        println!();
        println!("Excluded outputs:");
        for path in &result.excluded {
            println!("  {}", path.display());
        }
    }

    Ok(())
}

fn cmd_classify(file: &Path, shape: LineShape, lang: &str) -> mdata_core::Result<()> {
    let classifier = Classifier::new(shape, lang)?;
    let content = read_lossy(file)?;

    let mut key_lines = 0;
    let mut pending_lines = 0;

    for (i, line) in content.lines().enumerate() {
        match classifier.classify(line) {
            ClassifiedLine::Key(key) => {
                key_lines += 1;
                let (group, entry) = split_full_key(&key.full_key);
                let group = if group.is_root() { "<root>" } else { group.as_str() };
                println!("{:>5} KEY  {} / {}\t{}", i + 1, group, entry, key.payload);
            }
            ClassifiedLine::Pending(text) => {
                pending_lines += 1;
                println!("{:>5} ...  {}", i + 1, text);
            }
        }
    }

    println!();
    println!("{} key lines, {} pending lines", key_lines, pending_lines);

    Ok(())
}

fn cmd_fix_chart(input: &Path, output: &Path) -> mdata_core::Result<()> {
    let report = fix_chart_file(input, output)?;

    println!("Read {} lines from {}", report.lines_read, input.display());
    println!("  {} Target lines rewritten", report.targets_rewritten);
    println!("  {} sustain heads converted to holds", report.holds_converted);
    println!("  {} sustain tails dropped", report.tails_dropped);
    println!("Done! Chart fixed and saved to {}", output.display());

    Ok(())
}

fn print_file_table(scan: &ScanResult, outcome: &MergeOutcome) {
    let report = &outcome.report;

    println!("Found files: {}", scan.files.len());
    println!("{}", "-".repeat(RULE_WIDTH));
    match report.shape {
        LineShape::PvRecord => {
            println!("{:<25} | {:<11} | RANGE (Min - Max)", "FILENAME", "SONGS (IDs)")
        }
        LineShape::StrArray => println!("{:<25} | {:<11} | CATEGORIES", "FILENAME", "ITEMS"),
    }
    println!("{}", "-".repeat(RULE_WIDTH));

    for file in &report.files {
        let detail = match report.shape {
            LineShape::PvRecord => file.range_label(),
            LineShape::StrArray => file.categories_label(22),
        };
        println!("{:<25} | {:<11} | {}", display_name(&file.path), file.entries, detail);
    }

    for failed in &report.failed {
        println!("{:<25} | FAILED: {}", display_name(&failed.path), failed.error);
    }
}

fn print_summary(report: &MergeReport) {
    println!("{}", "-".repeat(RULE_WIDTH));
    println!("STATISTICS:");
    println!("Total items found (sum): {}", report.total_found);
    println!("Total unique items saved: {}", report.total_unique);

    let duplicates = report.duplicates();
    if duplicates > 0 {
        println!(
            "NOTE: {} items were duplicates across files (overwritten).",
            duplicates
        );
    }
    if report.orphan_lines > 0 {
        println!(
            "NOTE: {} trailing comment lines kept at the end of the output.",
            report.orphan_lines
        );
    }
    println!("{}", "-".repeat(RULE_WIDTH));
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
