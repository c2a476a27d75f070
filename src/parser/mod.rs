//! Observation parsing and schema definitions.
//!
//! This module handles:
//! - Parsing recorded traversals (JSON array or JSON Lines)
//! - Replaying them into a layout builder
//! - Defining output schema

pub mod observations;
pub mod schema;

// Re-export main types
pub use observations::{
    build_layout, describe_roots, feed_observations, parse_observations, read_observations,
    ObservationRecord,
};
pub use schema::{to_profile, ArrayRow, LayoutProfile, ProfileRow};
