//! MySQL to PostgreSQL DDL conversion.
//!
//! The [`Converter`] drives one dump through the whole pipeline:
//! - Statement segmentation and noise filtering
//! - Lexical rewriting of table options and column attributes
//! - Structural extraction into tables, indexes and constraints
//! - Foreign key deferral
//! - Assembly of the PostgreSQL script
//!
//! Anything it cannot convert is passed through and reported as a
//! [`ConvertWarning`]; only unreadable input and unwritable output are errors.

mod config;
mod warnings;

pub use config::ConvertFileConfig;
pub use warnings::{ConvertWarning, WarningCollector};

use crate::assembler::{Assembler, Document, Element, REVIEW_INDEX_PREFIX};
use crate::filter::NoiseFilter;
use crate::input::{read_dump, TextEncoding};
use crate::parser::{Parser, Statement, StatementKind};
use crate::planner::DeferralPlanner;
use crate::rewrite::{
    rewrite_statement, rewrite_text_mode, Rewritten, LABEL_AUTO_INCREMENT_KEYWORD,
    LABEL_ON_UPDATE, LABEL_UNSIGNED,
};
use crate::schema::{AlterAction, Constraint, Extractor, QuotingResolver, TableBlock};
use indicatif::{ProgressBar, ProgressStyle};
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Fatal conversion errors.
#[derive(Debug)]
pub enum ConvertError {
    /// The input could not be opened, decompressed or read.
    InputUnreadable { path: PathBuf, source: io::Error },
    /// The output could not be written (`None` for stdout).
    OutputUnwritable {
        path: Option<PathBuf>,
        source: io::Error,
    },
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::InputUnreadable { path, source } => {
                write!(f, "Cannot read input {}: {}", path.display(), source)
            }
            ConvertError::OutputUnwritable {
                path: Some(path),
                source,
            } => write!(f, "Cannot write output {}: {}", path.display(), source),
            ConvertError::OutputUnwritable { path: None, source } => {
                write!(f, "Cannot write output to stdout: {}", source)
            }
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::InputUnreadable { source, .. }
            | ConvertError::OutputUnwritable { source, .. } => Some(source),
        }
    }
}

/// Options that shape the generated script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Create every table in this schema (empty or `None`: no qualification)
    pub schema: Option<String>,
    /// Start the output with a header comment
    pub header: bool,
    /// Emit `IF NOT EXISTS` on CREATE TABLE and CREATE INDEX
    pub if_not_exists: bool,
    /// Add FK columns missing from their table as `BIGINT`
    pub add_missing_fk_columns: bool,
    /// Extra words treated as reserved
    pub extra_reserved_words: Vec<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            schema: None,
            header: true,
            if_not_exists: true,
            add_missing_fk_columns: false,
            extra_reserved_words: Vec::new(),
        }
    }
}

/// Statistics from one conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ConvertStats {
    /// Statements read from the input
    pub statements_read: usize,
    /// Statements kept by the noise filter
    pub statements_kept: usize,
    /// Statements dropped by the noise filter
    pub statements_skipped: usize,
    /// Source lines in kept statements
    pub lines_kept: usize,
    /// Source lines in dropped statements
    pub lines_skipped: usize,
    /// CREATE TABLE statements converted
    pub tables: usize,
    /// Index statements generated
    pub indexes: usize,
    /// Foreign keys deferred to ALTER TABLE statements
    pub foreign_keys: usize,
    /// Statements passed through after text-mode rewriting only
    pub passed_through: usize,
    /// Warnings collected (after de-duplication)
    pub warnings: usize,
}

/// Everything a conversion produces.
#[derive(Debug, Clone, Default)]
pub struct ConvertOutput {
    pub sql: String,
    pub stats: ConvertStats,
    pub index_statements: Vec<String>,
    pub foreign_key_statements: Vec<String>,
    pub warnings: Vec<ConvertWarning>,
    /// Warnings dropped after the collector limit
    pub warnings_truncated: usize,
}

pub struct Converter {
    options: ConvertOptions,
    resolver: QuotingResolver,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        let resolver = QuotingResolver::new().with_reserved_words(&options.extra_reserved_words);
        Self { options, resolver }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert a whole dump.
    pub fn convert(&self, text: &str) -> ConvertOutput {
        self.convert_with_progress(text, None, WarningCollector::new())
    }

    /// Convert a whole dump, reporting statement counts on `progress` and
    /// adding to warnings already collected (e.g. while decoding).
    pub fn convert_with_progress(
        &self,
        text: &str,
        progress: Option<&ProgressBar>,
        mut warnings: WarningCollector,
    ) -> ConvertOutput {
        let mut stats = ConvertStats::default();
        let mut filter = NoiseFilter::for_conversion();
        let mut planner =
            DeferralPlanner::new().with_missing_column_repair(self.options.add_missing_fk_columns);
        let mut doc = Document::default();

        let mut statements = Parser::new(text).peekable();
        while let Some(stmt) = statements.next() {
            stats.statements_read += 1;
            if let Some(pb) = progress {
                if stats.statements_read % 1000 == 0 {
                    pb.set_message(format!("Processed {} statements...", stats.statements_read));
                }
            }

            if !filter.admit_before(&stmt, statements.peek()) {
                continue;
            }
            self.convert_statement(&stmt, &mut doc, &mut planner, &mut warnings, &mut stats);
        }

        let mut tables: Vec<&mut TableBlock> = doc
            .elements
            .iter_mut()
            .filter_map(|e| match e {
                Element::Table(t) => Some(t),
                _ => None,
            })
            .collect();
        doc.foreign_keys = planner.finish(&mut tables, &mut warnings);

        let filtered = filter.stats();
        stats.statements_kept = filtered.statements_kept;
        stats.statements_skipped = filtered.statements_skipped;
        stats.lines_kept = filtered.lines_kept;
        stats.lines_skipped = filtered.lines_skipped;
        stats.foreign_keys = doc.foreign_keys.len();

        let assembled = Assembler::new(&self.resolver)
            .with_schema(self.options.schema.as_deref())
            .with_header(self.options.header)
            .with_if_not_exists(self.options.if_not_exists)
            .assemble(doc, &mut warnings);
        stats.indexes = assembled.index_statements.len();
        stats.warnings = warnings.count();

        ConvertOutput {
            sql: assembled.sql,
            stats,
            index_statements: assembled.index_statements,
            foreign_key_statements: assembled.foreign_key_statements,
            warnings_truncated: warnings.truncated(),
            warnings: warnings.into_warnings(),
        }
    }

    fn convert_statement(
        &self,
        stmt: &Statement,
        doc: &mut Document,
        planner: &mut DeferralPlanner,
        warnings: &mut WarningCollector,
        stats: &mut ConvertStats,
    ) {
        match stmt.kind {
            StatementKind::Comment => {
                if let Some(index_sql) = stmt.text.strip_prefix(REVIEW_INDEX_PREFIX) {
                    let index = Extractor::new(warnings).create_index(index_sql);
                    if let Some(index) = index {
                        doc.indexes.push(index);
                        return;
                    }
                }
                doc.elements.push(Element::Comment(stmt.text.clone()));
            }
            StatementKind::CreateTable => {
                let rewritten = rewrite_statement(&stmt.text);
                report_rewrites(&rewritten, warnings);
                let table = Extractor::new(warnings)
                    .at_line(stmt.line)
                    .create_table(&rewritten.text);
                match table {
                    Some(mut table) => {
                        doc.indexes.append(&mut table.indexes);
                        planner.defer_table(&mut table);
                        stats.tables += 1;
                        doc.elements.push(Element::Table(table));
                    }
                    None => self.pass_through(stmt, "CREATE TABLE without a column list", doc, warnings, stats),
                }
            }
            StatementKind::CreateIndex => {
                let rewritten = rewrite_statement(&stmt.text);
                let index = Extractor::new(warnings)
                    .at_line(stmt.line)
                    .create_index(&rewritten.text);
                match index {
                    Some(index) => doc.indexes.push(index),
                    None => self.pass_through(stmt, "unrecognized CREATE INDEX", doc, warnings, stats),
                }
            }
            StatementKind::AlterTable => {
                let rewritten = rewrite_statement(&stmt.text);
                report_rewrites(&rewritten, warnings);
                let alter = Extractor::new(warnings)
                    .at_line(stmt.line)
                    .alter_table(&rewritten.text);
                let Some(alter) = alter else {
                    self.pass_through(stmt, "unrecognized ALTER TABLE", doc, warnings, stats);
                    return;
                };

                let mut remaining = Vec::new();
                for action in alter.actions {
                    match action {
                        AlterAction::AddConstraint(Constraint::ForeignKey(fk)) => {
                            planner.defer(alter.table.clone(), fk)
                        }
                        AlterAction::AddIndex(index) => doc.indexes.push(index),
                        AlterAction::AddColumn(column) => {
                            planner.note_added_column(&alter.table, column.name.name());
                            remaining.push(AlterAction::AddColumn(column));
                        }
                        AlterAction::Raw(text) => {
                            let rewritten = rewrite_text_mode(&text, &self.resolver);
                            report_rewrites(&rewritten, warnings);
                            remaining.push(AlterAction::Raw(rewritten.text));
                        }
                        other => remaining.push(other),
                    }
                }
                if !remaining.is_empty() {
                    doc.elements.push(Element::Alter {
                        table: alter.table,
                        actions: remaining,
                    });
                }
            }
            StatementKind::DropTable => {
                let rewritten = rewrite_statement(&stmt.text);
                let drop = Extractor::new(warnings)
                    .at_line(stmt.line)
                    .drop_table(&rewritten.text);
                match drop {
                    Some(drop) => doc.elements.push(Element::Drop(drop)),
                    None => self.pass_through(stmt, "unrecognized DROP TABLE", doc, warnings, stats),
                }
            }
            StatementKind::SetPragma | StatementKind::Data | StatementKind::Other => {
                self.pass_through(stmt, "statement not converted", doc, warnings, stats)
            }
        }
    }

    /// Keep a statement the extractor cannot model, after text-mode rewriting.
    fn pass_through(
        &self,
        stmt: &Statement,
        reason: &str,
        doc: &mut Document,
        warnings: &mut WarningCollector,
        stats: &mut ConvertStats,
    ) {
        let rewritten = rewrite_text_mode(&stmt.text, &self.resolver);
        report_rewrites(&rewritten, warnings);
        warnings.add(ConvertWarning::ambiguity(stmt.line, reason, &stmt.text));
        stats.passed_through += 1;
        doc.elements.push(Element::Raw(rewritten.text));
    }
}

/// Turn rewrite rules that change meaning into warnings.
fn report_rewrites(rewritten: &Rewritten, warnings: &mut WarningCollector) {
    if rewritten.fired(LABEL_UNSIGNED) {
        warnings.add(ConvertWarning::LossyConversion {
            from_type: "UNSIGNED".to_string(),
            to_type: "signed".to_string(),
            table: None,
            column: None,
        });
    }
    if rewritten.fired(LABEL_ON_UPDATE) {
        warnings.add(ConvertWarning::UnsupportedFeature {
            feature: "ON UPDATE CURRENT_TIMESTAMP".to_string(),
            suggestion: Some("removed; use a trigger to keep the column current".to_string()),
        });
    }
    if rewritten.fired(LABEL_AUTO_INCREMENT_KEYWORD) {
        warnings.add(ConvertWarning::UnsupportedFeature {
            feature: "AUTO_INCREMENT outside CREATE TABLE".to_string(),
            suggestion: Some("removed; use a sequence or an identity column".to_string()),
        });
    }
}

/// Configuration for the convert command
#[derive(Debug, Default)]
pub struct ConvertConfig {
    /// Input SQL file
    pub input: PathBuf,
    /// Output SQL file (None for stdout)
    pub output: Option<PathBuf>,
    pub options: ConvertOptions,
    /// Dry run mode
    pub dry_run: bool,
    /// Show progress
    pub progress: bool,
}

/// Result of [`run`]: the conversion plus input facts for reporting.
#[derive(Debug)]
pub struct ConvertRun {
    pub output: ConvertOutput,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub encoding: TextEncoding,
}

/// Run the convert command
pub fn run(config: ConvertConfig) -> anyhow::Result<ConvertRun> {
    let progress_bar = if config.progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message("Reading...");
        Some(pb)
    } else {
        None
    };

    let dump = read_dump(&config.input, progress_bar.as_ref())?;

    let mut warnings = WarningCollector::new();
    if dump.encoding != TextEncoding::Utf8 {
        warnings.add(ConvertWarning::EncodingFallback {
            encoding: dump.encoding.to_string(),
        });
    }

    if let Some(pb) = &progress_bar {
        pb.set_message("Converting...");
    }
    let converter = Converter::new(config.options);
    let output = converter.convert_with_progress(&dump.text, progress_bar.as_ref(), warnings);

    if !config.dry_run {
        write_output(config.output.as_deref(), &output.sql)?;
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Converted {} statements",
            output.stats.statements_read
        ));
    }

    Ok(ConvertRun {
        output_bytes: output.sql.len() as u64,
        output,
        input_bytes: dump.file_bytes,
        encoding: dump.encoding,
    })
}

/// Write the script to `path`, or stdout when `None`.
pub fn write_output(path: Option<&std::path::Path>, sql: &str) -> Result<(), ConvertError> {
    let unwritable = |source: io::Error| ConvertError::OutputUnwritable {
        path: path.map(|p| p.to_path_buf()),
        source,
    };

    let mut writer: Box<dyn Write> = match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(unwritable)?;
            }
            Box::new(BufWriter::with_capacity(
                256 * 1024,
                File::create(path).map_err(unwritable)?,
            ))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    };
    writer.write_all(sql.as_bytes()).map_err(unwritable)?;
    writer.flush().map_err(unwritable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(sql: &str) -> ConvertOutput {
        Converter::new(ConvertOptions {
            header: false,
            ..Default::default()
        })
        .convert(sql)
    }

    #[test]
    fn test_client_table() {
        let out = convert(
            "CREATE TABLE `m_client` (`id` bigint(20) NOT NULL AUTO_INCREMENT, KEY `idx1` (`id`)) ENGINE=InnoDB;",
        );
        assert_eq!(
            out.sql,
            "CREATE TABLE IF NOT EXISTS m_client (\n  id BIGSERIAL\n);\n\n-- Indexes\nCREATE INDEX IF NOT EXISTS idx1 ON m_client(id);\n"
        );
        assert_eq!(out.stats.tables, 1);
        assert_eq!(out.stats.indexes, 1);
    }

    #[test]
    fn test_forward_reference_is_deferred() {
        let out = convert(
            "CREATE TABLE a (id int, b_id int, CONSTRAINT fk_b FOREIGN KEY (b_id) REFERENCES b (id));\nCREATE TABLE b (id int);",
        );
        let create_b = out.sql.find("CREATE TABLE IF NOT EXISTS b").unwrap();
        let alter = out.sql.find("ALTER TABLE a ADD CONSTRAINT fk_b").unwrap();
        assert!(alter > create_b);
        assert!(!out.sql.contains("FOREIGN KEY (b_id) REFERENCES b (id),"));
        assert_eq!(out.foreign_key_statements.len(), 1);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_alter_table_foreign_key_is_deferred() {
        let out = convert(
            "CREATE TABLE a (id int);\nALTER TABLE `a` ADD CONSTRAINT `fk` FOREIGN KEY (`id`) REFERENCES `a` (`id`), ADD KEY `k` (`id`);",
        );
        assert!(!out.sql.contains("ALTER TABLE a ADD KEY"));
        assert_eq!(out.index_statements, vec!["CREATE INDEX IF NOT EXISTS k ON a(id);"]);
        assert_eq!(
            out.foreign_key_statements,
            vec!["ALTER TABLE a ADD CONSTRAINT fk FOREIGN KEY (id) REFERENCES a (id);"]
        );
    }

    #[test]
    fn test_unknown_statement_passes_through_with_warning() {
        let out = convert("CREATE VIEW `v` AS SELECT `id` FROM t;");
        assert_eq!(out.sql, "CREATE VIEW v AS SELECT id FROM t;\n");
        assert_eq!(out.stats.passed_through, 1);
        assert!(matches!(
            out.warnings[0],
            ConvertWarning::StructuralAmbiguity { line: 1, .. }
        ));
    }

    #[test]
    fn test_schema_preamble() {
        let out = Converter::new(ConvertOptions {
            schema: Some("app".into()),
            header: false,
            ..Default::default()
        })
        .convert("DROP TABLE IF EXISTS `t`;\nCREATE TABLE `t` (`id` int);");
        assert_eq!(
            out.sql,
            "CREATE SCHEMA IF NOT EXISTS app;\nSET search_path TO app, public;\n\nDROP TABLE IF EXISTS app.t;\n\nCREATE TABLE IF NOT EXISTS app.t (\n  id int\n);\n"
        );
    }

    #[test]
    fn test_reconverting_output_is_stable() {
        let source = "-- Table structure\n\
CREATE TABLE `Loan Data` (\n\
  `id` int(11) unsigned NOT NULL AUTO_INCREMENT,\n\
  `Start Date` datetime DEFAULT NULL,\n\
  `body` text,\n\
  PRIMARY KEY (`id`),\n\
  KEY `idx_start` (`Start Date`),\n\
  FULLTEXT KEY `ft_body` (`body`),\n\
  CONSTRAINT `fk_self` FOREIGN KEY (`id`) REFERENCES `Loan Data` (`id`) ON DELETE CASCADE\n\
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;\n";
        let converter = Converter::new(ConvertOptions::default());
        let once = converter.convert(source).sql;
        let twice = converter.convert(&once).sql;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_extra_reserved_words() {
        let out = Converter::new(ConvertOptions {
            header: false,
            extra_reserved_words: vec!["status".into()],
            ..Default::default()
        })
        .convert("CREATE TABLE t (status int);");
        assert!(out.sql.contains("  \"status\" int"));
    }

    #[test]
    fn test_error_messages() {
        let err = ConvertError::InputUnreadable {
            path: PathBuf::from("dump.sql"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "Cannot read input dump.sql: missing");
    }
}
