//! Terminal types and merged sibling fields.
//!
//! The deduplicator decides where a path stops growing and which fields of a
//! type share one path segment. It is built once, from the defaults in
//! [`crate::utils::config`] or from a TOML file, and never changes after.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::utils::config::{DEFAULT_MERGED_FIELDS, DEFAULT_TERMINAL_TYPES};
use crate::utils::error::ConfigError;

/// Lookup tables consulted while building paths
///
/// **Public** - handed to `HeapLayoutBuilder::new`
#[derive(Debug, Clone, Default)]
pub struct HistogramDeduplicator {
    terminal_types: HashSet<String>,
    merged_fields: HashMap<String, HashMap<String, String>>,
    merged_names: HashSet<String>,
}

impl HistogramDeduplicator {
    /// Deduplicator with no terminal types and no merged fields
    pub fn empty() -> Self {
        Self::default()
    }

    /// Deduplicator preloaded with the JDK collection tables
    pub fn with_defaults() -> Self {
        let mut dedup = Self::empty()
            .with_terminal_types(DEFAULT_TERMINAL_TYPES.iter().copied());
        for (type_name, fields) in DEFAULT_MERGED_FIELDS {
            dedup = dedup.with_merged_fields(type_name, fields.iter().copied());
        }
        dedup
    }

    /// Add types at which paths stop growing
    pub fn with_terminal_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terminal_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Map fields of `type_name` onto merged labels
    ///
    /// # Example
    /// ```ignore
    /// let dedup = HistogramDeduplicator::empty()
    ///     .with_merged_fields("Node", [("prev", "prev/next"), ("next", "prev/next")]);
    /// ```
    pub fn with_merged_fields<I, F, M>(mut self, type_name: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (F, M)>,
        F: Into<String>,
        M: Into<String>,
    {
        let table = self.merged_fields.entry(type_name.to_string()).or_default();
        for (field, merged) in fields {
            let field = field.into();
            let merged = merged.into();
            self.merged_names.insert(field.clone());
            self.merged_names.insert(merged.clone());
            table.insert(field, merged);
        }
        self
    }

    /// Merged label for `field` of `type_name`, if one is configured
    pub fn merged_field(&self, type_name: &str, field: &str) -> Option<&str> {
        self.merged_fields
            .get(type_name)
            .and_then(|table| table.get(field))
            .map(String::as_str)
    }

    /// Merged fields configured for `type_name`
    pub fn merged_fields_of(&self, type_name: &str) -> Option<&HashMap<String, String>> {
        self.merged_fields.get(type_name)
    }

    /// Whether `name` is a raw or merged field name of any type
    pub fn is_field_merged(&self, name: &str) -> bool {
        self.merged_names.contains(name)
    }

    pub fn is_terminal(&self, type_name: &str) -> bool {
        self.terminal_types.contains(type_name)
    }

    pub fn terminal_type_count(&self) -> usize {
        self.terminal_types.len()
    }

    pub fn merged_type_count(&self) -> usize {
        self.merged_fields.len()
    }
}

/// Deduplication tables as written in TOML
///
/// ```toml
/// replace_defaults = false
/// terminal_types = ["com.example.Connection"]
///
/// [merged_fields."com.example.Node"]
/// prev = "prev/next"
/// next = "prev/next"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeduplicationConfig {
    /// Start from empty tables instead of the built-in ones
    #[serde(default)]
    pub replace_defaults: bool,

    #[serde(default)]
    pub terminal_types: Vec<String>,

    /// Type name -> (field -> merged label)
    #[serde(default)]
    pub merged_fields: BTreeMap<String, BTreeMap<String, String>>,
}

impl DeduplicationConfig {
    /// Turn the parsed tables into a deduplicator
    ///
    /// # Errors
    /// * `ConfigError::InvalidTable` - If a type, field or merged label is blank
    pub fn into_deduplicator(self) -> Result<HistogramDeduplicator, ConfigError> {
        let mut dedup = if self.replace_defaults {
            HistogramDeduplicator::empty()
        } else {
            HistogramDeduplicator::with_defaults()
        };

        if let Some(blank) = self.terminal_types.iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidTable(format!(
                "blank terminal type {:?}",
                blank
            )));
        }
        dedup = dedup.with_terminal_types(self.terminal_types);

        for (type_name, fields) in self.merged_fields {
            if type_name.trim().is_empty() {
                return Err(ConfigError::InvalidTable(
                    "merged_fields entry with a blank type name".to_string(),
                ));
            }
            for (field, merged) in &fields {
                if field.is_empty() || merged.is_empty() {
                    return Err(ConfigError::InvalidTable(format!(
                        "blank field mapping in {}",
                        type_name
                    )));
                }
            }
            dedup = dedup.with_merged_fields(&type_name, fields);
        }

        debug!(
            "Deduplicator: {} terminal types, {} types with merged fields",
            dedup.terminal_type_count(),
            dedup.merged_type_count()
        );

        Ok(dedup)
    }
}

/// Load deduplication tables from a TOML file
///
/// **Public** - used by the analyze command
///
/// # Arguments
/// * `path` - Path to the TOML configuration file
///
/// # Errors
/// * `ConfigError::IoError` - If the file cannot be read
/// * `ConfigError::TomlError` - If the TOML is invalid
/// * `ConfigError::InvalidTable` - If an entry is blank
///
/// # Example
/// ```ignore
/// let dedup = load_deduplicator("dedup.toml")?;
/// ```
pub fn load_deduplicator(path: impl AsRef<Path>) -> Result<HistogramDeduplicator, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_deduplicator(&contents)
}

/// Parse deduplication tables from TOML text
pub fn parse_deduplicator(contents: &str) -> Result<HistogramDeduplicator, ConfigError> {
    let config: DeduplicationConfig = toml::from_str(contents)?;
    config.into_deduplicator()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_linked_list() {
        let dedup = HistogramDeduplicator::with_defaults();
        assert_eq!(
            dedup.merged_field("java.util.LinkedList", "first"),
            Some("first/last")
        );
        assert_eq!(
            dedup.merged_field("java.util.LinkedList$Node", "next"),
            Some("prev/next")
        );
        assert!(dedup.is_field_merged("prev/next"));
        assert!(dedup.is_field_merged("left"));
        assert!(!dedup.is_field_merged("item"));
        assert!(dedup.is_terminal("java.io.FileDescriptor"));
    }

    #[test]
    fn test_unknown_type_has_no_merged_field() {
        let dedup = HistogramDeduplicator::with_defaults();
        assert_eq!(dedup.merged_field("java.lang.String", "value"), None);
    }

    #[test]
    fn test_toml_merges_over_defaults() {
        let dedup = parse_deduplicator(
            r#"
terminal_types = ["com.example.Socket"]

[merged_fields."com.example.Node"]
prev = "prev/next"
next = "prev/next"
"#,
        )
        .unwrap();

        assert!(dedup.is_terminal("com.example.Socket"));
        assert!(dedup.is_terminal("java.io.FileDescriptor"));
        assert_eq!(dedup.merged_field("com.example.Node", "prev"), Some("prev/next"));
        assert!(dedup.merged_fields_of("java.util.LinkedList").is_some());
    }

    #[test]
    fn test_toml_can_replace_defaults() {
        let dedup = parse_deduplicator("replace_defaults = true\n").unwrap();
        assert_eq!(dedup.terminal_type_count(), 0);
        assert_eq!(dedup.merged_type_count(), 0);
    }

    #[test]
    fn test_blank_merged_label_is_rejected() {
        let result = parse_deduplicator(
            r#"
[merged_fields."com.example.Node"]
prev = ""
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidTable(_))));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let result = parse_deduplicator("terminal_types = 3");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }
}
