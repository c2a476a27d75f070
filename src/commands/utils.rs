use crate::output::read_profile;
use crate::report::format::human_readable_bytes;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate a profile JSON file
pub fn validate_profile_file(file_path: impl AsRef<Path>) -> Result<()> {
    let file_path = file_path.as_ref();
    println!("Validating profile: {}", file_path.display());

    let profile = read_profile(file_path)
        .with_context(|| format!("Invalid profile: {}", file_path.display()))?;

    if profile.version != SCHEMA_VERSION {
        anyhow::bail!(
            "Unsupported schema version {} (expected {})",
            profile.version,
            SCHEMA_VERSION
        );
    }

    println!("✓ Valid profile JSON");
    println!("  Version: {}", profile.version);
    println!("  Roots: {}", profile.description);
    println!("  Records: {}", profile.total_count);
    println!("  Total Size: {}", human_readable_bytes(profile.total_size));
    println!("  Top-level Types: {}", profile.footprint.len());
    println!("  Heap Tree Rows: {}", profile.heap_tree.len());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Heap Footprint Profile Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string            - Schema version (e.g., '1.0.0')");
        println!("  description: string        - Traversal roots");
        println!("  total_count: number        - Records seen");
        println!("  total_size: number         - Bytes seen");
        println!("  footprint: array           - Top-level class histogram rows");
        println!("  class_histogram: array     - Type-topology rows, display order");
        println!("  heap_tree: array           - Retained-footprint rows, display order");
        println!("    depth: number            - Indentation level");
        println!("    label: string            - Row name");
        println!("    prefix: string?          - Folded type name");
        println!("    count, size: number      - Gathered at this row");
        println!("    average: number          - size / count");
        println!("    total_count, total_size  - Retained by this row");
        println!("    parent_*_percentage      - Share of the parent total (null if undefined)");
        println!("    array: object?           - length, used, use_percentage");
        println!("  generated_at: string       - ISO 8601 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Heap Footprint v{}", env!("CARGO_PKG_VERSION"));
    println!("Profile Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Type-topology histograms and retained-footprint trees from object graph traversals.");
}
