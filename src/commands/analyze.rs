//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Loads deduplication tables
//! 2. Reads the observation stream
//! 3. Builds the class histogram and heap tree
//! 4. Prints the requested reports
//! 5. Generates the flamegraph
//! 6. Writes output files

use crate::aggregator::{load_deduplicator, HeapLayout, HistogramDeduplicator};
use crate::flamegraph::{generate_flamegraph, FlamegraphConfig};
use crate::output::{write_profile, write_svg};
use crate::parser::{build_layout, read_observations, to_profile};
use crate::report::{write_class_histogram, write_footprint, write_heap_tree};
use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

/// Which text reports go to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportKind {
    /// Top-level type summary
    Footprint,
    /// Class histogram drill-down
    Histogram,
    /// Heap tree drill-down
    Tree,
    /// All three reports
    #[default]
    All,
    /// No text output
    None,
}

impl ReportKind {
    fn footprint(self) -> bool {
        matches!(self, ReportKind::Footprint | ReportKind::All)
    }

    fn histogram(self) -> bool {
        matches!(self, ReportKind::Histogram | ReportKind::All)
    }

    fn tree(self) -> bool {
        matches!(self, ReportKind::Tree | ReportKind::All)
    }
}

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Observation stream (JSON array or JSON Lines)
    pub input: PathBuf,

    /// Deduplication tables (TOML); built-in defaults when absent
    pub config: Option<PathBuf>,

    /// Output path for JSON profile (optional)
    pub output_json: Option<PathBuf>,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Flamegraph configuration
    pub flamegraph_config: Option<FlamegraphConfig>,

    /// Reports printed to stdout
    pub report: ReportKind,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            config: None,
            output_json: None,
            output_svg: None,
            flamegraph_config: None,
            report: ReportKind::All,
        }
    }
}

/// Execute the analyze command, printing reports to stdout
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Deduplication TOML errors
/// * Observation parsing and aggregation errors
/// * File write errors
pub fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute_analyze_to(args, &mut out).map(|_| ())
}

/// Execute the analyze command with reports written to `out`
///
/// # Example
/// ```ignore
/// let args = AnalyzeArgs {
///     input: PathBuf::from("walk.jsonl"),
///     report: ReportKind::Footprint,
///     ..Default::default()
/// };
///
/// let mut buf = Vec::new();
/// execute_analyze_to(args, &mut buf)?;
/// ```
pub fn execute_analyze_to<W: Write + ?Sized>(args: AnalyzeArgs, out: &mut W) -> Result<HeapLayout> {
    let start_time = Instant::now();

    info!("Starting analysis of: {}", args.input.display());

    // Step 1: Deduplication tables
    info!("Step 1/6: Loading deduplication tables...");
    let dedup = match &args.config {
        Some(path) => load_deduplicator(path)
            .with_context(|| format!("Failed to load deduplication tables from {}", path.display()))?,
        None => HistogramDeduplicator::with_defaults(),
    };
    debug!(
        "{} terminal types, {} types with merged fields",
        dedup.terminal_type_count(),
        dedup.merged_type_count()
    );

    // Step 2: Read observations
    info!("Step 2/6: Reading observations...");
    let records = read_observations(&args.input)
        .with_context(|| format!("Failed to read observations from {}", args.input.display()))?;
    debug!("Read {} records", records.len());

    // Step 3: Build layout
    info!("Step 3/6: Building class histogram and heap tree...");
    let layout = build_layout(&records, dedup).context("Failed to build heap layout")?;

    // Step 4: Reports
    if args.report == ReportKind::None {
        info!("Step 4/6: Skipping reports (not requested)");
    } else {
        info!("Step 4/6: Printing reports...");
        print_reports(&layout, args.report, out).context("Failed to print reports")?;
    }

    // Step 5: Flamegraph
    let svg_content = if args.output_svg.is_some() {
        info!("Step 5/6: Generating flamegraph...");
        let svg = generate_flamegraph(layout.heap_tree(), args.flamegraph_config.as_ref())
            .context("Failed to generate flamegraph")?;
        Some(svg)
    } else {
        info!("Step 5/6: Skipping flamegraph generation (not requested)");
        None
    };

    // Step 6: Outputs
    info!("Step 6/6: Writing output files...");

    if let Some(json_path) = &args.output_json {
        let profile = to_profile(&layout);
        write_profile(&profile, json_path).context("Failed to write profile JSON")?;
        info!("✓ Profile written to: {}", json_path.display());
    }

    if let (Some(svg), Some(svg_path)) = (svg_content, &args.output_svg) {
        write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
        info!("✓ Flamegraph written to: {}", svg_path.display());
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(layout)
}

fn print_reports<W: Write + ?Sized>(layout: &HeapLayout, report: ReportKind, out: &mut W) -> io::Result<()> {
    if report.footprint() {
        write_footprint(layout, out)?;
        writeln!(out)?;
    }
    if report.histogram() {
        write_class_histogram(layout, out)?;
        writeln!(out)?;
    }
    if report.tree() {
        write_heap_tree(layout, out)?;
    }
    out.flush()
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Input path cannot be empty");
    }

    if !args.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    if let Some(config) = &args.config {
        if !config.is_file() {
            anyhow::bail!("Deduplication config does not exist: {}", config.display());
        }
    }

    if args.output_json.is_some() && args.output_json == args.output_svg {
        anyhow::bail!("JSON and SVG outputs must not share a path");
    }

    Ok(())
}
