//! Output assembly.
//!
//! Renders the intermediate representation as PostgreSQL DDL in a fixed
//! order: schema preamble, table group (tables and everything else that
//! keeps its source position), index group, foreign key group.

use crate::convert::{ConvertWarning, WarningCollector};
use crate::schema::{
    AlterAction, ColumnDefinition, ColumnModifier, Constraint, DeferredForeignKey, DropTable, Identifier,
    IndexDef, IndexKind, QualifiedName, QuotingResolver, TableBlock,
};
use ahash::AHashSet;
use std::fmt::Write as _;

/// Comment lines this tool writes itself; skipped when output is converted again.
pub const HEADER: &str = "-- Converted by ddl-convert (MySQL → PostgreSQL)";
pub const INDEX_SECTION: &str = "-- Indexes";
pub const FOREIGN_KEY_SECTION: &str = "-- Foreign keys (added after all tables exist)";

/// Prefix of the comment that stands in for an index PostgreSQL cannot build.
pub const REVIEW_INDEX_PREFIX: &str = "-- Review: no PostgreSQL equivalent for ";

/// One item of the table group, in source order.
#[derive(Debug, Clone)]
pub enum Element {
    Comment(String),
    Table(TableBlock),
    Drop(DropTable),
    /// ALTER TABLE with the actions that were not deferred. Raw actions are
    /// already rewritten.
    Alter {
        table: QualifiedName,
        actions: Vec<AlterAction>,
    },
    /// Statement passed through after text-mode rewriting.
    Raw(String),
}

/// Everything the assembler renders.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub elements: Vec<Element>,
    pub indexes: Vec<IndexDef>,
    pub foreign_keys: Vec<DeferredForeignKey>,
}

/// Rendered output plus the generated statements on their own.
#[derive(Debug, Clone, Default)]
pub struct Assembled {
    pub sql: String,
    pub index_statements: Vec<String>,
    pub foreign_key_statements: Vec<String>,
}

pub struct Assembler<'r> {
    resolver: &'r QuotingResolver,
    schema: Option<Identifier>,
    header: bool,
    if_not_exists: bool,
}

impl<'r> Assembler<'r> {
    pub fn new(resolver: &'r QuotingResolver) -> Self {
        Self {
            resolver,
            schema: None,
            header: true,
            if_not_exists: true,
        }
    }

    /// Qualify every table with `schema` and emit the schema preamble.
    pub fn with_schema(mut self, schema: Option<&str>) -> Self {
        self.schema = schema.filter(|s| !s.is_empty()).map(Identifier::new);
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn with_if_not_exists(mut self, if_not_exists: bool) -> Self {
        self.if_not_exists = if_not_exists;
        self
    }

    pub fn assemble(&self, mut doc: Document, warnings: &mut WarningCollector) -> Assembled {
        self.rename_collisions(&mut doc, warnings);

        let mut out = Assembled::default();
        let mut sql = String::new();

        if self.header {
            sql.push_str(HEADER);
            sql.push_str("\n\n");
        }

        if let Some(schema) = &self.schema {
            let schema = self.resolver.render(schema);
            let _ = writeln!(sql, "CREATE SCHEMA IF NOT EXISTS {};", schema);
            let _ = writeln!(sql, "SET search_path TO {}, public;", schema);
            sql.push('\n');
        }

        for element in &doc.elements {
            match element {
                Element::Comment(text) => {
                    sql.push_str(text);
                    sql.push('\n');
                }
                Element::Table(table) => {
                    sql.push_str(&self.render_table(table));
                    sql.push_str("\n\n");
                }
                Element::Drop(drop) => {
                    sql.push_str(&self.render_drop(drop));
                    sql.push_str("\n\n");
                }
                Element::Alter { table, actions } => {
                    sql.push_str(&self.render_alter(table, actions));
                    sql.push_str("\n\n");
                }
                Element::Raw(text) => {
                    sql.push_str(text);
                    sql.push_str("\n\n");
                }
            }
        }

        if !doc.indexes.is_empty() {
            sql.push_str(INDEX_SECTION);
            sql.push('\n');
            for index in &doc.indexes {
                let statement = self.render_index(index);
                match index.kind {
                    IndexKind::FullText | IndexKind::Spatial => {
                        warnings.add(ConvertWarning::UnsupportedFeature {
                            feature: format!("{} index", kind_keyword(index.kind)),
                            suggestion: Some(
                                "left as a comment; consider a GIN or GiST index".into(),
                            ),
                        });
                        sql.push_str(REVIEW_INDEX_PREFIX);
                        sql.push_str(&statement);
                    }
                    IndexKind::Regular | IndexKind::Unique => {
                        sql.push_str(&statement);
                        out.index_statements.push(statement);
                    }
                }
                sql.push('\n');
            }
            sql.push('\n');
        }

        if !doc.foreign_keys.is_empty() {
            sql.push_str(FOREIGN_KEY_SECTION);
            sql.push('\n');
            for deferred in &doc.foreign_keys {
                let statement = self.render_foreign_key(deferred);
                sql.push_str(&statement);
                sql.push('\n');
                out.foreign_key_statements.push(statement);
            }
            sql.push('\n');
        }

        let trimmed = sql.trim_end_matches('\n').len();
        sql.truncate(trimmed);
        sql.push('\n');
        out.sql = sql;
        out
    }

    fn table_name(&self, name: &QualifiedName) -> String {
        self.resolver
            .render_qualified(&name.in_schema(self.schema.as_ref()))
    }

    fn if_not_exists(&self) -> &'static str {
        if self.if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        }
    }

    /// Raw text with delimiters normalized and the table's own irregular
    /// names quoted.
    fn fragment(&self, text: &str, declared: &[&Identifier]) -> String {
        let normalized = self.resolver.normalize_delimiters(text);
        self.resolver.resolve_fragment(&normalized, declared)
    }

    pub fn render_table(&self, table: &TableBlock) -> String {
        let declared: Vec<&Identifier> = table.columns.iter().map(|c| &c.name).collect();
        let mut elements: Vec<String> = Vec::new();

        for column in &table.columns {
            elements.push(self.render_column(column, &declared));
        }
        for constraint in &table.constraints {
            if let Some(rendered) = self.render_constraint(constraint, &declared) {
                elements.push(rendered);
            }
        }
        for raw in &table.raw_elements {
            elements.push(self.fragment(raw, &declared));
        }

        let mut sql = format!(
            "CREATE {}TABLE {}{} (",
            if table.temporary { "TEMPORARY " } else { "" },
            self.if_not_exists(),
            self.table_name(&table.name)
        );
        if elements.is_empty() {
            sql.push(')');
        } else {
            sql.push('\n');
            sql.push_str(
                &elements
                    .iter()
                    .map(|e| format!("  {}", e))
                    .collect::<Vec<_>>()
                    .join(",\n"),
            );
            sql.push_str("\n)");
        }
        if let Some(tail) = &table.tail {
            sql.push(' ');
            sql.push_str(&self.fragment(tail, &declared));
        }
        sql.push(';');
        sql
    }

    pub fn render_column(&self, column: &ColumnDefinition, declared: &[&Identifier]) -> String {
        let mut sql = format!("{} {}", self.resolver.render(&column.name), column.data_type);
        for modifier in &column.modifiers {
            match modifier {
                ColumnModifier::NotNull => sql.push_str(" NOT NULL"),
                ColumnModifier::Null => sql.push_str(" NULL"),
                ColumnModifier::Default(value) => {
                    sql.push_str(" DEFAULT ");
                    sql.push_str(value);
                }
                ColumnModifier::AutoIncrement => {}
                ColumnModifier::Raw(text) => {
                    sql.push(' ');
                    sql.push_str(&self.fragment(text, declared));
                }
            }
        }
        sql
    }

    fn render_constraint(&self, constraint: &Constraint, declared: &[&Identifier]) -> Option<String> {
        let named = |name: &Option<Identifier>| match name {
            Some(n) => format!("CONSTRAINT {} ", self.resolver.render(n)),
            None => String::new(),
        };
        match constraint {
            Constraint::PrimaryKey { name, columns } => Some(format!(
                "{}PRIMARY KEY ({})",
                named(name),
                self.resolver.render_list(columns)
            )),
            Constraint::Unique { name, columns } => Some(format!(
                "{}UNIQUE ({})",
                named(name),
                self.resolver.render_list(columns)
            )),
            Constraint::Check { name, expression } => Some(format!(
                "{}CHECK ({})",
                named(name),
                self.fragment(expression, declared)
            )),
            // Deferred by the planner.
            Constraint::ForeignKey(_) => None,
        }
    }

    pub fn render_index(&self, index: &IndexDef) -> String {
        let columns = index
            .columns
            .iter()
            .map(|c| match &c.order {
                Some(order) => format!("{} {}", self.resolver.render(&c.name), order),
                None => self.resolver.render(&c.name).into_owned(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let table = self.table_name(&index.table);
        let target = match &index.method {
            Some(method) => format!("{} USING {} ({})", table, method, columns),
            None => format!("{}({})", table, columns),
        };
        let kind = match index.kind {
            IndexKind::Regular => String::new(),
            other => format!("{} ", kind_keyword(other)),
        };
        format!(
            "CREATE {}INDEX {}{} ON {};",
            kind,
            self.if_not_exists(),
            self.resolver.render(&index.name),
            target
        )
    }

    pub fn render_foreign_key(&self, deferred: &DeferredForeignKey) -> String {
        let fk = &deferred.foreign_key;
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.table_name(&deferred.owner),
            self.resolver.render(&fk.name),
            self.resolver.render_list(&fk.columns),
            self.table_name(&fk.referenced_table),
            self.resolver.render_list(&fk.referenced_columns)
        );
        for action in &fk.actions {
            sql.push(' ');
            sql.push_str(action);
        }
        sql.push(';');
        sql
    }

    pub fn render_alter(&self, table: &QualifiedName, actions: &[AlterAction]) -> String {
        let actions = actions
            .iter()
            .filter_map(|action| match action {
                AlterAction::AddColumn(column) => Some(format!(
                    "ADD COLUMN {}",
                    self.render_column(column, &[&column.name])
                )),
                AlterAction::AddConstraint(constraint) => self
                    .render_constraint(constraint, &[])
                    .map(|c| format!("ADD {}", c)),
                // Indexes are moved to the index group.
                AlterAction::AddIndex(_) => None,
                AlterAction::Raw(text) => Some(text.clone()),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("ALTER TABLE {} {};", self.table_name(table), actions)
    }

    pub fn render_drop(&self, drop: &DropTable) -> String {
        let tables = drop
            .tables
            .iter()
            .map(|t| self.table_name(t))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "DROP {}TABLE {}{}",
            if drop.temporary { "TEMPORARY " } else { "" },
            if drop.if_exists { "IF EXISTS " } else { "" },
            tables
        );
        if let Some(behavior) = &drop.behavior {
            sql.push(' ');
            sql.push_str(behavior);
        }
        sql.push(';');
        sql
    }

    /// Index names and unique constraint names share one namespace per
    /// schema in PostgreSQL (together with tables). Later duplicates get the
    /// table name as a prefix.
    fn rename_collisions(&self, doc: &mut Document, warnings: &mut WarningCollector) {
        let mut used: AHashSet<String> = doc
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Table(t) => Some(t.name.key()),
                _ => None,
            })
            .collect();

        let mut claim = |kind: &str, table: &QualifiedName, name: &mut Identifier| {
            if used.insert(name.key()) {
                return;
            }
            let base = format!("{}_{}", table.name.name(), name.name());
            let mut candidate = base.clone();
            let mut n = 2;
            while used.contains(&candidate.to_lowercase()) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            used.insert(candidate.to_lowercase());
            warnings.add(ConvertWarning::RenamedObject {
                kind: kind.to_string(),
                from: name.name().to_string(),
                to: candidate.clone(),
            });
            *name = Identifier::new(candidate);
        };

        for element in &mut doc.elements {
            if let Element::Table(table) = element {
                let table_name = table.name.clone();
                for constraint in &mut table.constraints {
                    if let Constraint::Unique {
                        name: Some(name), ..
                    } = constraint
                    {
                        claim("unique constraint", &table_name, name);
                    }
                }
            }
        }
        for index in &mut doc.indexes {
            claim("index", &index.table, &mut index.name);
        }
    }
}

fn kind_keyword(kind: IndexKind) -> &'static str {
    match kind {
        IndexKind::Regular => "",
        IndexKind::Unique => "UNIQUE",
        IndexKind::FullText => "FULLTEXT",
        IndexKind::Spatial => "SPATIAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Extractor, IndexColumn};

    fn table(sql: &str) -> TableBlock {
        let mut warnings = WarningCollector::new();
        Extractor::new(&mut warnings).create_table(sql).unwrap()
    }

    #[test]
    fn test_render_table() {
        let resolver = QuotingResolver::new();
        let assembler = Assembler::new(&resolver);
        let t = table(
            "CREATE TABLE `Loan Data` (`id` int NOT NULL, `Start Date` date DEFAULT NULL, PRIMARY KEY (`id`), UNIQUE KEY `uq` (`Start Date`), CONSTRAINT `chk` CHECK (`Start Date` > '2000-01-01'))",
        );
        assert_eq!(
            assembler.render_table(&t),
            "CREATE TABLE IF NOT EXISTS \"Loan Data\" (\n  id int NOT NULL,\n  \"Start Date\" date DEFAULT NULL,\n  PRIMARY KEY (id),\n  CONSTRAINT uq UNIQUE (\"Start Date\"),\n  CONSTRAINT chk CHECK (\"Start Date\" > '2000-01-01')\n);"
        );
    }

    #[test]
    fn test_render_index_and_foreign_key() {
        let resolver = QuotingResolver::new();
        let assembler = Assembler::new(&resolver).with_schema(Some("app"));
        let index = IndexDef {
            name: Identifier::new("idx1"),
            table: QualifiedName::unqualified("m_client"),
            kind: IndexKind::Regular,
            columns: vec![IndexColumn {
                name: Identifier::new("id"),
                order: None,
            }],
            method: None,
        };
        assert_eq!(
            assembler.render_index(&index),
            "CREATE INDEX IF NOT EXISTS idx1 ON app.m_client(id);"
        );

        let t = table(
            "CREATE TABLE m_loan (client_id int, FOREIGN KEY (client_id) REFERENCES m_client (id) ON DELETE CASCADE)",
        );
        let deferred = DeferredForeignKey {
            owner: t.name.clone(),
            foreign_key: t.foreign_keys().next().unwrap().clone(),
        };
        assert_eq!(
            assembler.render_foreign_key(&deferred),
            "ALTER TABLE app.m_loan ADD CONSTRAINT m_loan_client_id_fkey FOREIGN KEY (client_id) REFERENCES app.m_client (id) ON DELETE CASCADE;"
        );
    }

    #[test]
    fn test_group_order_and_preamble() {
        let resolver = QuotingResolver::new();
        let assembler = Assembler::new(&resolver).with_schema(Some("app"));
        let mut t = table("CREATE TABLE a (id int, KEY k (id))");
        let indexes = std::mem::take(&mut t.indexes);
        let doc = Document {
            elements: vec![Element::Comment("-- Table a".into()), Element::Table(t)],
            indexes,
            foreign_keys: Vec::new(),
        };
        let mut warnings = WarningCollector::new();
        let out = assembler.assemble(doc, &mut warnings);
        assert_eq!(
            out.sql,
            format!(
                "{HEADER}\n\nCREATE SCHEMA IF NOT EXISTS app;\nSET search_path TO app, public;\n\n-- Table a\nCREATE TABLE IF NOT EXISTS app.a (\n  id int\n);\n\n{INDEX_SECTION}\nCREATE INDEX IF NOT EXISTS k ON app.a(id);\n"
            )
        );
        assert_eq!(out.index_statements.len(), 1);
    }

    #[test]
    fn test_fulltext_becomes_review_comment() {
        let resolver = QuotingResolver::new();
        let assembler = Assembler::new(&resolver).with_header(false);
        let mut t = table("CREATE TABLE a (body text, FULLTEXT KEY ft (body))");
        let indexes = std::mem::take(&mut t.indexes);
        let doc = Document {
            elements: vec![Element::Table(t)],
            indexes,
            foreign_keys: Vec::new(),
        };
        let mut warnings = WarningCollector::new();
        let out = assembler.assemble(doc, &mut warnings);
        assert!(out
            .sql
            .contains("-- Review: no PostgreSQL equivalent for CREATE FULLTEXT INDEX IF NOT EXISTS ft ON a(body);"));
        assert!(out.index_statements.is_empty());
        assert_eq!(warnings.count(), 1);
    }

    #[test]
    fn test_duplicate_index_names_are_renamed() {
        let resolver = QuotingResolver::new();
        let assembler = Assembler::new(&resolver).with_header(false);
        let mut a = table("CREATE TABLE a (id int, KEY idx_id (id))");
        let mut b = table("CREATE TABLE b (id int, KEY idx_id (id))");
        let mut indexes = std::mem::take(&mut a.indexes);
        indexes.append(&mut b.indexes);
        let doc = Document {
            elements: vec![Element::Table(a), Element::Table(b)],
            indexes,
            foreign_keys: Vec::new(),
        };
        let mut warnings = WarningCollector::new();
        let out = assembler.assemble(doc, &mut warnings);
        assert_eq!(
            out.index_statements,
            vec![
                "CREATE INDEX IF NOT EXISTS idx_id ON a(id);",
                "CREATE INDEX IF NOT EXISTS b_idx_id ON b(id);",
            ]
        );
        assert!(matches!(&warnings.warnings()[0], ConvertWarning::RenamedObject { to, .. } if to == "b_idx_id"));
    }

    #[test]
    fn test_alter_rendering() {
        let resolver = QuotingResolver::new();
        let assembler = Assembler::new(&resolver);
        let mut warnings = WarningCollector::new();
        let alter = Extractor::new(&mut warnings)
            .alter_table("ALTER TABLE t ADD COLUMN `Due Date` datetime NOT NULL, ADD UNIQUE KEY uq (a), DROP COLUMN b")
            .unwrap();
        assert_eq!(
            assembler.render_alter(&alter.table, &alter.actions),
            "ALTER TABLE t ADD COLUMN \"Due Date\" TIMESTAMP NOT NULL, ADD CONSTRAINT uq UNIQUE (a), DROP COLUMN b;"
        );
    }

    #[test]
    fn test_drop_rendering() {
        let resolver = QuotingResolver::new();
        let assembler = Assembler::new(&resolver);
        let drop = DropTable {
            temporary: false,
            if_exists: true,
            tables: vec![QualifiedName::unqualified("a"), QualifiedName::unqualified("Table Name")],
            behavior: None,
        };
        assert_eq!(assembler.render_drop(&drop), "DROP TABLE IF EXISTS a, \"Table Name\";");
    }
}
