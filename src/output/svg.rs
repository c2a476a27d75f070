//! SVG flamegraph output writer.

use super::json::{create_parent_dirs, validate_path};
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write SVG content to a file
///
/// **Public** - main entry point for SVG output
///
/// # Arguments
/// * `svg_content` - SVG document from the flamegraph generator
/// * `output_path` - Destination; missing parent directories are created
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::InvalidPath` - Path is invalid
///
/// # Example
/// ```ignore
/// let svg = generate_flamegraph(layout.heap_tree(), None)?;
/// write_svg(&svg, "layout.svg")?;
/// ```
pub fn write_svg(svg_content: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing SVG to: {}", output_path.display());

    validate_path(output_path)?;
    if output_path.extension().map_or(true, |ext| ext != "svg") {
        debug!("File does not have .svg extension: {}", output_path.display());
    }
    create_parent_dirs(output_path)?;

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(svg_content.as_bytes())?;
    writer.flush()?;

    info!(
        "SVG written successfully ({} bytes, {:.2} KB)",
        svg_content.len(),
        svg_content.len() as f64 / 1024.0
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const VALID_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"/>"#;

    #[test]
    fn test_write_svg() {
        let temp_file = NamedTempFile::new().unwrap();
        write_svg(VALID_SVG, temp_file.path()).unwrap();
        let written = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(written, VALID_SVG);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/flamegraph.svg");

        write_svg(VALID_SVG, &nested_path).unwrap();

        assert!(nested_path.exists());
    }

    #[test]
    fn test_directory_path_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(write_svg(VALID_SVG, temp_dir.path()).is_err());
    }
}
