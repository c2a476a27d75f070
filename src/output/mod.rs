//! Output writers for layout profiles and flamegraphs.
//!
//! This module handles writing data to disk in various formats:
//! - JSON layout profiles
//! - SVG flamegraphs

pub mod json;
pub mod svg;

// Re-export main functions
pub use json::{read_profile, validate_path, write_profile};
pub use svg::write_svg;
