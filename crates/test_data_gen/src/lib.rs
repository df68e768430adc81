//! Test data generator for ddl-convert.
//!
//! Generates deterministic mysqldump-style files with forward-referencing
//! foreign keys, names that need quoting in PostgreSQL and interleaved
//! INSERT data.
//!
//! # Example
//!
//! ```rust
//! use test_data_gen::{DumpConfig, DumpGenerator};
//!
//! let mut gen = DumpGenerator::new(DumpConfig {
//!     seed: 42,
//!     tables: 10,
//!     ..Default::default()
//! });
//! let sql = gen.render_to_string();
//! assert!(sql.contains("CREATE TABLE `t_000`"));
//! ```

pub mod generator;
pub mod schema;

pub use generator::{random_schema, DumpConfig, DumpGenerator, Scale};
pub use schema::{Column, FkAction, ForeignKey, Index, IndexKind, Schema, SqlType, Table};
