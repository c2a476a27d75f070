//! JSON layout profile writer and reader.

use crate::parser::schema::LayoutProfile;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a layout profile to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `profile` - Profile to write
/// * `output_path` - Destination; missing parent directories are created
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path is empty, a directory, or its parent
///   cannot be created
///
/// # Example
/// ```ignore
/// let profile = to_profile(&layout);
/// write_profile(&profile, "layout.json")?;
/// ```
pub fn write_profile(profile: &LayoutProfile, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing profile to: {}", output_path.display());

    validate_path(output_path)?;
    create_parent_dirs(output_path)?;

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, profile)?;
    writer.flush()?;

    info!(
        "Profile written successfully ({} heap tree rows, {} bytes)",
        profile.heap_tree.len(),
        file_size(output_path)
    );

    Ok(())
}

/// Read a layout profile from a JSON file
///
/// **Public** - used by the validate command and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - File cannot be opened
/// * `OutputError::SerializationFailed` - JSON does not match the schema
pub fn read_profile(input_path: impl AsRef<Path>) -> Result<LayoutProfile, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading profile from: {}", input_path.display());

    let file = File::open(input_path)?;
    let profile: LayoutProfile = serde_json::from_reader(BufReader::new(file))?;

    debug!(
        "Profile loaded: version {}, {} records",
        profile.version, profile.total_count
    );

    Ok(profile)
}

/// Check that `path` can be written as a file
///
/// **Public** - shared with the SVG writer
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

pub(crate) fn create_parent_dirs(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
