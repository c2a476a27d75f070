//! Heap Footprint CLI
//!
//! Builds class histograms and retained-footprint trees from recorded
//! object graph traversals.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use heap_footprint::commands::{
    display_schema, display_version, execute_analyze, validate_args, validate_profile_file,
    AnalyzeArgs, ReportKind,
};
use heap_footprint::flamegraph::FlamegraphConfig;

/// Heap Footprint - where the bytes of an object graph live
#[derive(Parser, Debug)]
#[command(name = "heap-footprint")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze an observation stream
    Analyze {
        /// Observation stream (JSON array or JSON Lines)
        #[arg(short, long)]
        input: PathBuf,

        /// Deduplication tables (TOML)
        #[arg(short, long, env = "HEAP_FOOTPRINT_CONFIG")]
        config: Option<PathBuf>,

        /// Output path for JSON profile (optional)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output path for SVG flamegraph (optional)
        #[arg(short, long)]
        flamegraph: Option<PathBuf>,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Reports to print
        #[arg(short, long, value_enum, default_value_t = ReportKind::All)]
        report: ReportKind,
    },

    /// Validate a profile JSON file
    Validate {
        /// Path to profile JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            input,
            config,
            output,
            flamegraph,
            title,
            report,
        } => {
            let fg_config = flamegraph.as_ref().map(|_| match title {
                Some(title) => FlamegraphConfig::new().with_title(title),
                None => FlamegraphConfig::new(),
            });

            let args = AnalyzeArgs {
                input,
                config,
                output_json: output,
                output_svg: flamegraph,
                flamegraph_config: fg_config,
                report,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Validate { file } => {
            validate_profile_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
