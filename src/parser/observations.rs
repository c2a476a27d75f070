//! Observation stream parser.
//!
//! Reads recorded traversals, one record per visited instance, either as a
//! JSON array or as JSON Lines, and replays them into a layout builder.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::aggregator::{HeapLayout, HeapLayoutBuilder, HistogramDeduplicator, Observation, PathId};
use crate::utils::config::ARRAY_INDEX_LABEL;
use crate::utils::error::ParseError;

/// One visited instance as recorded by a walker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Unique within one stream
    pub id: u64,

    /// Id of the referring instance; absent for traversal roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,

    /// Field name; array slots default to `[i]`
    #[serde(default)]
    pub label: String,

    #[serde(rename = "type", alias = "type_name")]
    pub type_name: String,

    #[serde(default)]
    pub array_index: bool,

    pub size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_used: Option<u64>,
}

impl ObservationRecord {
    fn label(&self) -> &str {
        if self.array_index && self.label.is_empty() {
            ARRAY_INDEX_LABEL
        } else {
            &self.label
        }
    }
}

/// Parse an observation stream
///
/// **Public** - main entry point for parsing
///
/// # Arguments
/// * `input` - A JSON array of records, or one JSON record per line
///
/// # Errors
/// * `ParseError::JsonError` - If the array form is malformed
/// * `ParseError::InvalidFormat` - If a JSON Lines record is malformed
pub fn parse_observations(input: &str) -> Result<Vec<ObservationRecord>, ParseError> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        let records: Vec<ObservationRecord> = serde_json::from_str(trimmed)?;
        debug!("Parsed {} records from JSON array", records.len());
        return Ok(records);
    }

    let mut records = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|e| {
            ParseError::InvalidFormat(format!("line {}: {}", index + 1, e))
        })?;
        records.push(record);
    }

    debug!("Parsed {} records from JSON Lines", records.len());
    Ok(records)
}

/// Read and parse an observation file
pub fn read_observations(path: impl AsRef<Path>) -> Result<Vec<ObservationRecord>, ParseError> {
    let path = path.as_ref();
    info!("Reading observations from: {}", path.display());
    let contents = fs::read_to_string(path)?;
    parse_observations(&contents)
}

/// Replay `records` into `builder`
///
/// Parents must precede their children.
///
/// # Returns
/// Number of records fed
///
/// # Errors
/// * `ParseError::DuplicateId` - If an id repeats
/// * `ParseError::UnknownParent` - If a parent id was not seen before
/// * `ParseError::InvalidFormat` - If `array_used` comes without `array_length`
/// * `ParseError::Aggregation` - If the builder rejects a record
pub fn feed_observations(
    builder: &mut HeapLayoutBuilder,
    records: &[ObservationRecord],
) -> Result<usize, ParseError> {
    let mut paths: HashMap<u64, PathId> = HashMap::with_capacity(records.len());

    for record in records {
        if paths.contains_key(&record.id) {
            return Err(ParseError::DuplicateId(record.id));
        }

        let parent = match record.parent {
            Some(parent) => Some(*paths.get(&parent).ok_or(ParseError::UnknownParent {
                id: record.id,
                parent,
            })?),
            None => None,
        };

        let array = match (record.array_length, record.array_used) {
            (Some(length), used) => Some((length, used.unwrap_or(0))),
            (None, Some(_)) => {
                return Err(ParseError::InvalidFormat(format!(
                    "record {} has array_used without array_length",
                    record.id
                )))
            }
            (None, None) => None,
        };

        let mut observation = Observation {
            parent,
            label: record.label(),
            type_name: &record.type_name,
            is_array_index: record.array_index,
            size: record.size,
            array: None,
        };
        if let Some((length, used)) = array {
            observation = observation.with_array(length, used);
        }

        let path = builder
            .add_observation(observation)
            .map_err(|source| ParseError::Aggregation {
                id: record.id,
                source,
            })?;
        paths.insert(record.id, path);
    }

    debug!("Fed {} records into the layout builder", records.len());
    Ok(records.len())
}

/// `type@id` for every root record, comma separated
pub fn describe_roots(records: &[ObservationRecord]) -> String {
    records
        .iter()
        .filter(|r| r.parent.is_none())
        .map(|r| format!("{}@{:x}", r.type_name, r.id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse, replay and freeze in one go
///
/// # Example
/// ```ignore
/// let records = read_observations("walk.jsonl")?;
/// let layout = build_layout(&records, HistogramDeduplicator::with_defaults())?;
/// ```
pub fn build_layout(
    records: &[ObservationRecord],
    dedup: HistogramDeduplicator,
) -> Result<HeapLayout, ParseError> {
    let mut builder = HeapLayoutBuilder::new(dedup);
    builder.set_description(describe_roots(records));
    feed_observations(&mut builder, records)?;
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let records = parse_observations(
            r#"[{"id": 1, "type": "A", "size": 16},
                {"id": 2, "parent": 1, "label": "x", "type_name": "B", "size": 8}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].parent, Some(1));
        assert_eq!(records[1].type_name, "B");
    }

    #[test]
    fn test_parse_json_lines_skips_blank_lines() {
        let records = parse_observations(
            "{\"id\": 1, \"type\": \"A\", \"size\": 16}\n\n{\"id\": 2, \"parent\": 1, \"array_index\": true, \"type\": \"B\", \"size\": 8}\n",
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].label(), "[i]");
    }

    #[test]
    fn test_bad_json_line_reports_line_number() {
        let err = parse_observations("{\"id\": 1, \"type\": \"A\", \"size\": 16}\n{oops}\n").unwrap_err();
        match err {
            ParseError::InvalidFormat(message) => assert!(message.starts_with("line 2")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_describe_roots() {
        let records = parse_observations(
            r#"[{"id": 255, "type": "A", "size": 16},
                {"id": 2, "parent": 255, "label": "x", "type": "B", "size": 8},
                {"id": 16, "type": "C", "size": 8}]"#,
        )
        .unwrap();
        assert_eq!(describe_roots(&records), "A@ff, C@10");
    }
}
