//! MySQL DDL extraction.
//!
//! Statements arrive already lexically rewritten (table options and column
//! attributes PostgreSQL cannot use are gone). The extractor scans them
//! clause by clause with quote and parenthesis balancing and builds the
//! intermediate representation. Clauses it cannot classify are kept
//! verbatim and reported, never dropped.

use super::scan::{find_matching_paren, find_unquoted, skip_quoted, split_top_level, top_level_words, Cursor};
use super::{
    name_fragment, ColumnDefinition, ColumnList, ColumnModifier, Constraint, DataType, ForeignKey,
    Identifier, IndexColumn, IndexDef, IndexKind, QualifiedName, TableBlock,
};
use crate::convert::{ConvertWarning, WarningCollector};
use crate::rewrite::types::remap_column;
use once_cell::sync::Lazy;
use regex::Regex;

/// Type names recognized at the start of a column definition (sorted).
const TYPE_KEYWORDS: &[&str] = &[
    "bigint",
    "bigserial",
    "binary",
    "bit",
    "blob",
    "bool",
    "boolean",
    "bytea",
    "char",
    "character",
    "cidr",
    "date",
    "datetime",
    "dec",
    "decimal",
    "double",
    "enum",
    "fixed",
    "float",
    "geometry",
    "geometrycollection",
    "inet",
    "int",
    "int2",
    "int4",
    "int8",
    "integer",
    "interval",
    "json",
    "jsonb",
    "linestring",
    "longblob",
    "longtext",
    "macaddr",
    "mediumblob",
    "mediumint",
    "mediumtext",
    "money",
    "multilinestring",
    "multipoint",
    "multipolygon",
    "nchar",
    "numeric",
    "nvarchar",
    "point",
    "polygon",
    "real",
    "serial",
    "set",
    "smallint",
    "smallserial",
    "text",
    "time",
    "timestamp",
    "timestamptz",
    "timetz",
    "tinyblob",
    "tinyint",
    "tinytext",
    "uuid",
    "varbinary",
    "varchar",
    "xml",
    "year",
];

/// Words that may directly follow a column type (sorted).
const MODIFIER_KEYWORDS: &[&str] = &[
    "as",
    "ascii",
    "auto_increment",
    "binary",
    "character",
    "charset",
    "check",
    "collate",
    "comment",
    "constraint",
    "default",
    "generated",
    "invisible",
    "key",
    "not",
    "null",
    "on",
    "precision",
    "primary",
    "references",
    "signed",
    "srid",
    "stored",
    "unicode",
    "unique",
    "unsigned",
    "varying",
    "virtual",
    "visible",
    "with",
    "without",
    "zerofill",
];

static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").unwrap());

pub fn is_type_keyword(word: &str) -> bool {
    TYPE_KEYWORDS
        .binary_search(&word.to_ascii_lowercase().as_str())
        .is_ok()
}

fn is_modifier_keyword(word: &str) -> bool {
    MODIFIER_KEYWORDS
        .binary_search(&word.to_ascii_lowercase().as_str())
        .is_ok()
}

/// Word text before any attached parameter group: `varchar(10)` → `varchar`.
fn word_base(word: &str) -> &str {
    word.split('(').next().unwrap_or(word)
}

/// `REFERENCES table (cols) [ON DELETE ...] [ON UPDATE ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct References {
    pub table: QualifiedName,
    pub columns: ColumnList,
    pub actions: Vec<String>,
}

/// One action of an ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterAction {
    AddColumn(ColumnDefinition),
    AddConstraint(Constraint),
    AddIndex(IndexDef),
    /// Not parsed; text-mode rewriting applies.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTable {
    pub table: QualifiedName,
    pub actions: Vec<AlterAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub temporary: bool,
    pub if_exists: bool,
    pub tables: Vec<QualifiedName>,
    /// Trailing `CASCADE` or `RESTRICT`.
    pub behavior: Option<String>,
}

enum BodyClause {
    Constraint(Constraint),
    Index(IndexDef),
}

/// Parse a table name that may be quoted, qualified, or (in hand-edited
/// dumps) several bare words with spaces.
pub fn parse_table_name(text: &str) -> Option<QualifiedName> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut cur = Cursor::new(text);
    if let Some(name) = cur.qualified_name() {
        if cur.is_eof() {
            return Some(name);
        }
    }

    if text.contains(['`', '"', '\'', '(', ')', ',']) {
        return None;
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words
        .iter()
        .any(|w| ["AS", "LIKE", "SELECT"].iter().any(|k| w.eq_ignore_ascii_case(k)))
    {
        return None;
    }
    let joined = words.join(" ");
    match joined.split_once('.') {
        Some((schema, name)) => Some(QualifiedName::new(
            Some(schema.trim().to_string()),
            name.trim().to_string(),
        )),
        None => Some(QualifiedName::unqualified(joined)),
    }
}

/// Builds the intermediate representation from rewritten statements,
/// reporting anything it had to leave alone.
pub struct Extractor<'w> {
    warnings: &'w mut WarningCollector,
    line: usize,
}

impl<'w> Extractor<'w> {
    pub fn new(warnings: &'w mut WarningCollector) -> Self {
        Self { warnings, line: 0 }
    }

    /// Source line used in warnings for the statements that follow.
    pub fn at_line(&mut self, line: usize) -> &mut Self {
        self.line = line;
        self
    }

    fn ambiguity(&mut self, reason: &str, fragment: &str) {
        self.warnings
            .add(ConvertWarning::ambiguity(self.line, reason, fragment));
    }

    /// `CREATE [TEMPORARY] TABLE [IF NOT EXISTS] name (body) [options]`
    ///
    /// Returns `None` when the statement has no parseable body (for example
    /// `CREATE TABLE ... LIKE` or `... AS SELECT`).
    pub fn create_table(&mut self, sql: &str) -> Option<TableBlock> {
        let text = sql.trim().trim_end_matches(';').trim_end();
        let mut cur = Cursor::new(text);
        if !cur.eat_keyword("CREATE") {
            return None;
        }
        let temporary = cur.eat_keyword("TEMPORARY");
        if !cur.eat_keyword("TABLE") {
            return None;
        }
        cur.eat_keywords(&["IF", "NOT", "EXISTS"]);

        let name_start = cur.pos();
        let open = find_unquoted(text, name_start, b'(')?;
        let name = parse_table_name(&text[name_start..open])?;
        let close = find_matching_paren(text, open)?;

        let mut table = TableBlock::new(name);
        table.temporary = temporary;
        table.line = self.line;

        for clause in split_top_level(&text[open + 1..close], b',') {
            self.body_clause(&mut table, clause);
        }

        let tail = text[close + 1..].trim();
        if !tail.is_empty() {
            self.ambiguity("unrecognized table option", tail);
            table.tail = Some(tail.to_string());
        }
        Some(table)
    }

    fn body_clause(&mut self, table: &mut TableBlock, clause: &str) {
        match self.constraint_clause(&table.name, clause) {
            Some(BodyClause::Constraint(constraint)) => {
                table.constraints.push(constraint);
                return;
            }
            Some(BodyClause::Index(index)) => {
                table.indexes.push(index);
                return;
            }
            None => {}
        }

        match self.column(&table.name, clause) {
            Some((column, reference)) => {
                if let Some(reference) = reference {
                    let columns: ColumnList = std::iter::once(column.name.clone()).collect();
                    let fk = foreign_key(&table.name, None, columns, reference);
                    table.constraints.push(Constraint::ForeignKey(fk));
                }
                table.columns.push(column);
            }
            None => {
                self.ambiguity("unrecognized table element", clause);
                table.raw_elements.push(clause.to_string());
            }
        }
    }

    /// Key, index and constraint clauses. `None` if the clause is not one.
    fn constraint_clause(&mut self, table: &QualifiedName, clause: &str) -> Option<BodyClause> {
        let mut cur = Cursor::new(clause);
        let mut name = None;

        if cur.eat_keyword("CONSTRAINT") {
            let unnamed = ["PRIMARY", "UNIQUE", "FOREIGN", "CHECK"]
                .iter()
                .any(|kw| cur.peek_keyword(kw));
            if !unnamed {
                name = Some(cur.identifier()?);
            }
        }

        if cur.eat_keywords(&["PRIMARY", "KEY"]) {
            index_method(&mut cur);
            let parts = self.key_parts(table, cur.paren_group()?)?;
            index_options(&mut cur)?;
            return Some(BodyClause::Constraint(Constraint::PrimaryKey {
                name: name.map(Identifier::new),
                columns: parts.into_iter().map(|p| p.name).collect(),
            }));
        }

        if cur.eat_keyword("UNIQUE") {
            let _ = cur.eat_keyword("KEY") || cur.eat_keyword("INDEX");
            let index_name = optional_index_name(&mut cur);
            index_method(&mut cur);
            let parts = self.key_parts(table, cur.paren_group()?)?;
            index_options(&mut cur)?;
            return Some(BodyClause::Constraint(Constraint::Unique {
                name: name.or(index_name).map(Identifier::new),
                columns: parts.into_iter().map(|p| p.name).collect(),
            }));
        }

        if cur.eat_keywords(&["FOREIGN", "KEY"]) {
            let index_name = optional_index_name(&mut cur);
            let columns = self
                .key_parts(table, cur.paren_group()?)?
                .into_iter()
                .map(|p| p.name)
                .collect();
            let reference = self.references(table, &mut cur)?;
            if !cur.is_eof() {
                return None;
            }
            let fk = foreign_key(table, name.or(index_name), columns, reference);
            return Some(BodyClause::Constraint(Constraint::ForeignKey(fk)));
        }

        if cur.eat_keyword("CHECK") {
            let expression = cur.paren_group()?.trim().to_string();
            cur.eat_keyword("NOT");
            cur.eat_keyword("ENFORCED");
            if !cur.is_eof() {
                return None;
            }
            return Some(BodyClause::Constraint(Constraint::Check {
                name: name.map(Identifier::new),
                expression,
            }));
        }

        if name.is_some() {
            return None;
        }

        let kind = if cur.eat_keyword("FULLTEXT") {
            IndexKind::FullText
        } else if cur.eat_keyword("SPATIAL") {
            IndexKind::Spatial
        } else if cur.peek_keyword("KEY") || cur.peek_keyword("INDEX") {
            IndexKind::Regular
        } else {
            return None;
        };
        let _ = cur.eat_keyword("KEY") || cur.eat_keyword("INDEX");
        let index_name = optional_index_name(&mut cur);
        let method = index_method(&mut cur);
        let columns = self.key_parts(table, cur.paren_group()?)?;
        let method = index_options(&mut cur)?.or(method);

        let name = index_name.unwrap_or_else(|| {
            format!(
                "{}_{}_idx",
                name_fragment([table.name.name()]),
                name_fragment(columns.iter().map(|c| c.name.name()))
            )
        });
        Some(BodyClause::Index(IndexDef {
            name: Identifier::new(name),
            table: table.clone(),
            kind,
            columns,
            method,
        }))
    }

    /// Index or constraint column list. Prefix lengths are dropped with a
    /// warning. Expression key parts are not supported.
    fn key_parts(&mut self, table: &QualifiedName, inner: &str) -> Option<Vec<IndexColumn>> {
        let mut parts = Vec::new();

        for item in split_top_level(inner, b',') {
            if item.starts_with('(') {
                return None;
            }

            let mut body = item.trim_end();
            let mut order = None;
            if !body.ends_with(['`', '"']) {
                if let Some((head, last)) = body.rsplit_once(char::is_whitespace) {
                    if last.eq_ignore_ascii_case("ASC") || last.eq_ignore_ascii_case("DESC") {
                        order = Some(last.to_ascii_uppercase());
                        body = head.trim_end();
                    }
                }
            }

            let mut prefix_length = false;
            if body.ends_with(')') {
                let open = body.rfind('(')?;
                let inside = body[open + 1..body.len() - 1].trim();
                if inside.is_empty() || !inside.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                body = body[..open].trim_end();
                prefix_length = true;
            }

            let mut cur = Cursor::new(body);
            let name = match cur.peek()? {
                b'`' | b'"' => {
                    let name = cur.identifier()?;
                    if !cur.is_eof() {
                        return None;
                    }
                    name
                }
                _ => {
                    if body.contains(['(', ')', '\'', '`', '"']) {
                        return None;
                    }
                    body.split_whitespace().collect::<Vec<_>>().join(" ")
                }
            };

            if prefix_length {
                self.warnings.add(ConvertWarning::LossyConversion {
                    from_type: "index prefix length".to_string(),
                    to_type: "full column".to_string(),
                    table: Some(table.name.name().to_string()),
                    column: Some(name.clone()),
                });
            }
            parts.push(IndexColumn {
                name: Identifier::new(name),
                order,
            });
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts)
        }
    }

    fn references(&mut self, table: &QualifiedName, cur: &mut Cursor<'_>) -> Option<References> {
        if !cur.eat_keyword("REFERENCES") {
            return None;
        }
        let target = cur.qualified_name()?;
        let columns = self
            .key_parts(table, cur.paren_group()?)?
            .into_iter()
            .map(|p| p.name)
            .collect();

        let mut actions = Vec::new();
        loop {
            if cur.eat_keyword("MATCH") {
                cur.word()?;
            } else if cur.eat_keywords(&["ON", "DELETE"]) {
                actions.push(format!("ON DELETE {}", referential_action(cur)?));
            } else if cur.eat_keywords(&["ON", "UPDATE"]) {
                actions.push(format!("ON UPDATE {}", referential_action(cur)?));
            } else {
                break;
            }
        }

        Some(References {
            table: target,
            columns,
            actions,
        })
    }

    /// Parse one column definition and remap its type.
    pub fn column(
        &mut self,
        table: &QualifiedName,
        clause: &str,
    ) -> Option<(ColumnDefinition, Option<References>)> {
        let (name, type_start) = split_column_name(clause)?;
        let mut cur = Cursor::new(&clause[type_start..]);
        let data_type = parse_data_type(&mut cur)?;
        let mut column = ColumnDefinition::new(name, data_type);

        loop {
            if cur.eat_keyword("UNSIGNED") || cur.eat_keyword("ZEROFILL") {
                column.unsigned = true;
            } else if !cur.eat_keyword("SIGNED") {
                break;
            }
        }

        let reference = self.column_modifiers(table, &mut cur, &mut column)?;

        let base = column.data_type.base();
        if base == "enum" || base == "set" {
            self.warnings.add(ConvertWarning::UnsupportedFeature {
                feature: format!("{} column type", base.to_uppercase()),
                suggestion: Some("kept as written; use a CHECK constraint or a lookup table".into()),
            });
        }

        let remap = remap_column(&mut column);
        if remap.dropped_auto_increment {
            self.warnings.add(ConvertWarning::UnsupportedFeature {
                feature: format!("AUTO_INCREMENT on {} column", base.to_uppercase()),
                suggestion: Some("keyword dropped; add a sequence by hand".into()),
            });
        }
        if remap.dropped_unsigned {
            self.warnings.add(ConvertWarning::LossyConversion {
                from_type: "UNSIGNED".to_string(),
                to_type: "signed".to_string(),
                table: Some(table.name.name().to_string()),
                column: Some(column.name.name().to_string()),
            });
        }

        Some((column, reference))
    }

    fn column_modifiers(
        &mut self,
        table: &QualifiedName,
        cur: &mut Cursor<'_>,
        column: &mut ColumnDefinition,
    ) -> Option<Option<References>> {
        let mut reference = None;
        let mut raw: Vec<&str> = Vec::new();

        fn flush(raw: &mut Vec<&str>, column: &mut ColumnDefinition) {
            if !raw.is_empty() {
                column.modifiers.push(ColumnModifier::Raw(raw.join(" ")));
                raw.clear();
            }
        }

        while !cur.is_eof() {
            let modifier = if cur.eat_keywords(&["NOT", "NULL"]) {
                ColumnModifier::NotNull
            } else if cur.eat_keyword("NULL") {
                ColumnModifier::Null
            } else if cur.eat_keyword("DEFAULT") {
                ColumnModifier::Default(default_expression(cur)?)
            } else if cur.eat_keyword("AUTO_INCREMENT") {
                ColumnModifier::AutoIncrement
            } else if cur.peek_keyword("REFERENCES") {
                reference = Some(self.references(table, cur)?);
                continue;
            } else if cur.eat_keyword("UNIQUE") {
                cur.eat_keyword("KEY");
                raw.push("UNIQUE");
                continue;
            } else {
                raw.push(cur.token()?);
                continue;
            };
            flush(&mut raw, column);
            column.modifiers.push(modifier);
        }
        flush(&mut raw, column);

        Some(reference)
    }

    /// `CREATE [UNIQUE|FULLTEXT|SPATIAL] INDEX [IF NOT EXISTS] name [USING m] ON table [USING m] (cols)`
    pub fn create_index(&mut self, sql: &str) -> Option<IndexDef> {
        let text = sql.trim().trim_end_matches(';').trim_end();
        let mut cur = Cursor::new(text);
        if !cur.eat_keyword("CREATE") {
            return None;
        }
        let kind = if cur.eat_keyword("UNIQUE") {
            IndexKind::Unique
        } else if cur.eat_keyword("FULLTEXT") {
            IndexKind::FullText
        } else if cur.eat_keyword("SPATIAL") {
            IndexKind::Spatial
        } else {
            IndexKind::Regular
        };
        if !cur.eat_keyword("INDEX") {
            return None;
        }
        cur.eat_keyword("CONCURRENTLY");
        cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
        let name = cur.identifier()?;
        let mut method = index_method(&mut cur);
        if !cur.eat_keyword("ON") {
            return None;
        }
        cur.eat_keyword("ONLY");
        let table = cur.qualified_name()?;
        method = index_method(&mut cur).or(method);
        let columns = self.key_parts(&table, cur.paren_group()?)?;
        method = index_options(&mut cur)?.or(method);

        Some(IndexDef {
            name: Identifier::new(name),
            table,
            kind,
            columns,
            method,
        })
    }

    /// `ALTER TABLE name action, action, ...`
    pub fn alter_table(&mut self, sql: &str) -> Option<AlterTable> {
        let text = sql.trim().trim_end_matches(';').trim_end();
        let mut cur = Cursor::new(text);
        if !cur.eat_keyword("ALTER") {
            return None;
        }
        cur.eat_keyword("IGNORE");
        if !cur.eat_keyword("TABLE") {
            return None;
        }
        cur.eat_keywords(&["IF", "EXISTS"]);
        cur.eat_keyword("ONLY");
        let table = cur.qualified_name()?;

        let mut actions = Vec::new();
        for action in split_top_level(cur.rest(), b',') {
            actions.push(self.alter_action(&table, action));
        }
        Some(AlterTable { table, actions })
    }

    fn alter_action(&mut self, table: &QualifiedName, action: &str) -> AlterAction {
        let mut cur = Cursor::new(action);
        if !cur.eat_keyword("ADD") {
            return AlterAction::Raw(action.to_string());
        }

        let rest = cur.rest();
        match self.constraint_clause(table, rest) {
            Some(BodyClause::Constraint(c)) => return AlterAction::AddConstraint(c),
            Some(BodyClause::Index(i)) => return AlterAction::AddIndex(i),
            None => {}
        }

        cur.eat_keyword("COLUMN");
        cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
        if cur.peek() == Some(b'(') {
            return AlterAction::Raw(action.to_string());
        }
        match self.column(table, cur.rest()) {
            Some((column, None)) => AlterAction::AddColumn(column),
            _ => AlterAction::Raw(action.to_string()),
        }
    }

    /// `DROP [TEMPORARY] TABLE [IF EXISTS] a, b [CASCADE|RESTRICT]`
    pub fn drop_table(&mut self, sql: &str) -> Option<DropTable> {
        let text = sql.trim().trim_end_matches(';').trim_end();
        let mut cur = Cursor::new(text);
        if !cur.eat_keyword("DROP") {
            return None;
        }
        let temporary = cur.eat_keyword("TEMPORARY");
        if !cur.eat_keyword("TABLE") {
            return None;
        }
        let if_exists = cur.eat_keywords(&["IF", "EXISTS"]);

        let mut names: Vec<&str> = split_top_level(cur.rest(), b',');
        let mut behavior = None;
        if let Some(last) = names.last_mut() {
            let current: &str = last;
            if let Some((head, tail)) = current.rsplit_once(char::is_whitespace) {
                if tail.eq_ignore_ascii_case("CASCADE") || tail.eq_ignore_ascii_case("RESTRICT") {
                    behavior = Some(tail.to_ascii_uppercase());
                    *last = head.trim_end();
                }
            }
        }

        let tables = names
            .into_iter()
            .map(parse_table_name)
            .collect::<Option<Vec<_>>>()?;
        if tables.is_empty() {
            return None;
        }
        Some(DropTable {
            temporary,
            if_exists,
            tables,
            behavior,
        })
    }
}

fn foreign_key(
    table: &QualifiedName,
    name: Option<String>,
    columns: ColumnList,
    reference: References,
) -> ForeignKey {
    let name = name.unwrap_or_else(|| {
        format!(
            "{}_{}_fkey",
            name_fragment([table.name.name()]),
            name_fragment(columns.iter().map(|c| c.name()))
        )
    });
    ForeignKey {
        name: Identifier::new(name),
        columns,
        referenced_table: reference.table,
        referenced_columns: reference.columns,
        actions: reference.actions,
    }
}

fn optional_index_name(cur: &mut Cursor<'_>) -> Option<String> {
    if cur.peek() == Some(b'(') || cur.peek_keyword("USING") {
        None
    } else {
        cur.identifier()
    }
}

/// `USING BTREE|HASH|...`; B-tree is the default and reported as `None`.
fn index_method(cur: &mut Cursor<'_>) -> Option<String> {
    if !cur.eat_keyword("USING") {
        return None;
    }
    let method = cur.word()?.to_ascii_lowercase();
    if method == "btree" {
        None
    } else {
        Some(method)
    }
}

/// Trailing index options. Returns `None` if anything unrecognized remains,
/// otherwise the access method if one was given.
fn index_options(cur: &mut Cursor<'_>) -> Option<Option<String>> {
    let mut method = None;
    loop {
        if cur.peek_keyword("USING") {
            method = index_method(cur).or(method);
        } else if cur.eat_keyword("VISIBLE") || cur.eat_keyword("INVISIBLE") {
            continue;
        } else if cur.is_eof() {
            return Some(method);
        } else {
            return None;
        }
    }
}

fn referential_action(cur: &mut Cursor<'_>) -> Option<&'static str> {
    if cur.eat_keyword("CASCADE") {
        Some("CASCADE")
    } else if cur.eat_keyword("RESTRICT") {
        Some("RESTRICT")
    } else if cur.eat_keywords(&["SET", "NULL"]) {
        Some("SET NULL")
    } else if cur.eat_keywords(&["SET", "DEFAULT"]) {
        Some("SET DEFAULT")
    } else if cur.eat_keywords(&["NO", "ACTION"]) {
        Some("NO ACTION")
    } else {
        None
    }
}

/// Split a column clause into its name and the byte offset where the type
/// starts. Unquoted names may span several words: the type is the first
/// recognized type keyword (after the first word) that is followed by a
/// modifier keyword, a parameter group, or nothing.
fn split_column_name(clause: &str) -> Option<(String, usize)> {
    let mut cur = Cursor::new(clause);
    if matches!(cur.peek()?, b'`' | b'"') {
        let name = cur.identifier()?;
        return Some((name, cur.pos()));
    }

    let words = top_level_words(clause);
    if words.len() < 2 {
        return None;
    }
    let text = |i: usize| &clause[words[i].0..words[i].1];
    let is_type = |i: usize| is_type_keyword(word_base(text(i)));
    let type_shaped = |i: usize| {
        i + 1 >= words.len() || {
            let next = text(i + 1);
            next.starts_with('(') || is_modifier_keyword(word_base(next))
        }
    };

    let p = (1..words.len())
        .find(|&i| is_type(i) && type_shaped(i))
        .or_else(|| (1..words.len()).find(|&i| is_type(i)))?;

    let name = clause[..words[p].0]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if name.contains(['(', ')', '\'']) {
        return None;
    }
    Some((name, words[p].0))
}

fn parse_data_type(cur: &mut Cursor<'_>) -> Option<DataType> {
    let word = cur.word()?;
    let lower = word.to_ascii_lowercase();
    if !is_type_keyword(&lower) {
        return None;
    }

    let mut name = word.to_string();
    let tail = match lower.as_str() {
        "double" => cur.keyword("PRECISION"),
        "character" | "char" | "bit" => cur.keyword("VARYING"),
        _ => None,
    };
    if let Some(tail) = tail {
        name = format!("{} {}", name, tail);
    }

    let params = if cur.peek() == Some(b'(') {
        Some(cur.paren_group()?.trim().to_string())
    } else {
        None
    };

    let suffix = if matches!(lower.as_str(), "timestamp" | "time") {
        if cur.eat_keywords(&["WITH", "TIME", "ZONE"]) {
            Some("with time zone".to_string())
        } else if cur.eat_keywords(&["WITHOUT", "TIME", "ZONE"]) {
            Some("without time zone".to_string())
        } else {
            None
        }
    } else {
        None
    };

    Some(DataType {
        name,
        params,
        suffix,
    })
}

/// The expression after `DEFAULT`.
fn default_expression(cur: &mut Cursor<'_>) -> Option<String> {
    let first = cur.peek()?;
    let rest = cur.rest();
    let bytes = rest.as_bytes();

    if first == b'"' {
        // MySQL string in double quotes; PostgreSQL would read an identifier.
        let token = cur.token()?;
        let inner = &token[1..token.len().saturating_sub(1).max(1)];
        let inner = inner.replace("\"\"", "\"").replace("\\\"", "\"");
        return Some(format!("'{}'", inner.replace('\'', "''")));
    }
    if matches!(first, b'+' | b'-' | b'.') || first.is_ascii_digit() {
        if let Some(m) = RE_NUMBER.find(rest) {
            return Some(cur.take(m.end()).to_string());
        }
    }
    if bytes.len() > 1 && matches!(first, b'b' | b'B' | b'x' | b'X') && bytes[1] == b'\'' {
        let end = skip_quoted(bytes, 1);
        return Some(cur.take(end).to_string());
    }
    cur.token().map(str::to_string)
}
