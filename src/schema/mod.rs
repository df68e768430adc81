//! Intermediate representation of the DDL being converted.
//!
//! This module provides:
//! - Data models for tables, columns, constraints and indexes
//! - The MySQL DDL extractor that builds them ([`ddl`])
//! - Identifier quoting for PostgreSQL output ([`QuotingResolver`])

mod ddl;
mod ident;
pub mod scan;

pub use ddl::*;
pub use ident::*;

use smallvec::SmallVec;
use std::fmt;

/// A single identifier, stored unquoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    name: String,
    requires_quoting: bool,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let requires_quoting = needs_quoting(&name);
        Self {
            name,
            requires_quoting,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quoting requirement from the built-in rules alone.
    pub fn requires_quoting(&self) -> bool {
        self.requires_quoting
    }

    /// Case-folded form used for lookups.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requires_quoting {
            write!(f, "\"{}\"", self.name.replace('"', "\"\""))
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Column lists are almost always one or two names long.
pub type ColumnList = SmallVec<[Identifier; 2]>;

/// `name` or `schema.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub schema: Option<Identifier>,
    pub name: Identifier,
}

impl QualifiedName {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.map(Identifier::new),
            name: Identifier::new(name),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self::new(None, name)
    }

    /// Lookup key; ignores the qualifier.
    pub fn key(&self) -> String {
        self.name.key()
    }

    /// Re-home the name in `schema`. `None` keeps the name as it is.
    pub fn in_schema(&self, schema: Option<&Identifier>) -> QualifiedName {
        match schema {
            Some(s) => QualifiedName {
                schema: Some(s.clone()),
                name: self.name.clone(),
            },
            None => self.clone(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.{}", schema, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// A column type as written: `varchar(255)`, `double precision`,
/// `timestamp(3) with time zone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataType {
    pub name: String,
    pub params: Option<String>,
    pub suffix: Option<String>,
}

impl DataType {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
            suffix: None,
        }
    }

    /// Lower-case form with whitespace removed from the parameters, e.g. `int(11)`.
    pub fn canonical(&self) -> String {
        let mut s = self.name.to_lowercase();
        if let Some(params) = &self.params {
            s.push('(');
            s.extend(params.chars().filter(|c| !c.is_whitespace()));
            s.push(')');
        }
        s
    }

    /// First word of the type name, lower-cased.
    pub fn base(&self) -> String {
        self.name
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.base().as_str(),
            "tinyint"
                | "smallint"
                | "mediumint"
                | "int"
                | "integer"
                | "bigint"
                | "int2"
                | "int4"
                | "int8"
                | "serial"
                | "bigserial"
                | "smallserial"
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(
                self.base().as_str(),
                "decimal" | "numeric" | "dec" | "fixed" | "float" | "double" | "real" | "money"
            )
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.base().as_str(), "boolean" | "bool")
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(params) = &self.params {
            write!(f, "({})", params)?;
        }
        if let Some(suffix) = &self.suffix {
            write!(f, " {}", suffix)?;
        }
        Ok(())
    }
}

/// Column attributes after the type, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnModifier {
    NotNull,
    Null,
    Default(String),
    AutoIncrement,
    /// Anything else, kept verbatim (`PRIMARY KEY`, `UNIQUE`, `CHECK (...)`).
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: Identifier,
    pub data_type: DataType,
    pub unsigned: bool,
    pub modifiers: Vec<ColumnModifier>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: Identifier::new(name),
            data_type,
            unsigned: false,
            modifiers: Vec::new(),
        }
    }

    pub fn is_auto_increment(&self) -> bool {
        self.modifiers.contains(&ColumnModifier::AutoIncrement)
    }

    pub fn default_value(&self) -> Option<&str> {
        self.modifiers.iter().find_map(|m| match m {
            ColumnModifier::Default(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn set_default(&mut self, value: String) {
        for m in &mut self.modifiers {
            if let ColumnModifier::Default(v) = m {
                *v = value;
                return;
            }
        }
        self.modifiers.push(ColumnModifier::Default(value));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: Identifier,
    pub columns: ColumnList,
    pub referenced_table: QualifiedName,
    pub referenced_columns: ColumnList,
    /// Referential actions as written, e.g. `ON DELETE CASCADE`.
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey {
        name: Option<Identifier>,
        columns: ColumnList,
    },
    Unique {
        name: Option<Identifier>,
        columns: ColumnList,
    },
    ForeignKey(ForeignKey),
    Check {
        name: Option<Identifier>,
        expression: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Regular,
    Unique,
    /// No portable PostgreSQL equivalent.
    FullText,
    /// No portable PostgreSQL equivalent.
    Spatial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: Identifier,
    /// `ASC` or `DESC` when written.
    pub order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: Identifier,
    pub table: QualifiedName,
    pub kind: IndexKind,
    pub columns: Vec<IndexColumn>,
    /// Access method, e.g. `hash`. `BTREE` is the default and never stored.
    pub method: Option<String>,
}

/// One CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    pub name: QualifiedName,
    pub temporary: bool,
    pub columns: Vec<ColumnDefinition>,
    pub constraints: Vec<Constraint>,
    pub indexes: Vec<IndexDef>,
    /// Body clauses that could not be classified, passed through verbatim.
    pub raw_elements: Vec<String>,
    /// Table options left after rewriting, passed through verbatim.
    pub tail: Option<String>,
    pub line: usize,
}

impl TableBlock {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            temporary: false,
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            raw_elements: Vec::new(),
            tail: None,
            line: 0,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.name.name().eq_ignore_ascii_case(name))
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::ForeignKey(fk) => Some(fk),
            _ => None,
        })
    }
}

/// A foreign key pulled out of its table, emitted after every table exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredForeignKey {
    pub owner: QualifiedName,
    pub foreign_key: ForeignKey,
}

/// Lower-case a list of names into a generated-name fragment: `a_b`.
pub(crate) fn name_fragment<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(|n| {
            n.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_lowercase()
                    } else {
                        '_'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("_")
}
