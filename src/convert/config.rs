//! YAML configuration for the convert command.

use super::ConvertOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options that can be kept in a `--config` file. Every field is optional;
/// flags given on the command line win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertFileConfig {
    /// Target schema; all tables are created in it
    pub schema: Option<String>,
    /// Write the header comment
    pub header: Option<bool>,
    /// Use IF NOT EXISTS on CREATE TABLE / CREATE INDEX
    pub if_not_exists: Option<bool>,
    /// Add FK columns missing from their table as BIGINT
    pub add_missing_fk_columns: Option<bool>,
    /// Extra words to treat as reserved (always quoted)
    pub extra_reserved_words: Vec<String>,
}

impl ConvertFileConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ConvertFileConfig = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Layer the file values under `options`.
    pub fn apply_to(&self, options: &mut ConvertOptions) {
        if options.schema.is_none() {
            options.schema = self.schema.clone();
        }
        if let Some(header) = self.header {
            options.header = header;
        }
        if let Some(if_not_exists) = self.if_not_exists {
            options.if_not_exists = if_not_exists;
        }
        if let Some(add) = self.add_missing_fk_columns {
            options.add_missing_fk_columns = add;
        }
        options
            .extra_reserved_words
            .extend(self.extra_reserved_words.iter().cloned());
    }
}
