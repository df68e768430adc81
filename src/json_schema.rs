//! JSON Schema generation for CLI output types.
//!
//! Every command with `--json` output has a schema here. Schemas are printed
//! by the `schema` subcommand.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// Returns all JSON schemas for commands that support --json output.
/// Uses BTreeMap for deterministic ordering (important for diffable output).
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    schemas.insert(
        "convert",
        schema_for!(crate::cmd::convert::ConvertJsonOutput),
    );
    schemas.insert(
        "convert-multi",
        schema_for!(crate::cmd::convert::MultiConvertJsonOutput),
    );
    schemas.insert(
        "extract",
        schema_for!(crate::cmd::extract::ExtractJsonOutput),
    );
    schemas.insert(
        "extract-multi",
        schema_for!(crate::cmd::extract::MultiExtractJsonOutput),
    );

    schemas
}

/// Generate a single schema by command name.
pub fn get_schema(command: &str) -> Option<Schema> {
    all_schemas().remove(command)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
