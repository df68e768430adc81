//! Statement-level noise filtering.
//!
//! Rules are declarative tables of anchored patterns matched against the
//! start of each statement. Skip rules always win over keep rules.

use crate::assembler::{FOREIGN_KEY_SECTION, HEADER, INDEX_SECTION, REVIEW_INDEX_PREFIX};
use crate::parser::{Statement, StatementKind};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::Serialize;

/// Which pipeline the filter is feeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterProfile {
    /// Schema-only extraction: keep DDL, drop data and session noise.
    Extraction,
    /// Full conversion: additionally drop statements the target regenerates
    /// or cannot use, and pass unknown statements through.
    Conversion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Skip(&'static str),
}

struct Rule {
    label: &'static str,
    pattern: Regex,
}

fn rule(label: &'static str, pattern: &str) -> Rule {
    Rule {
        label,
        pattern: Regex::new(&format!(r"(?i)^\s*{}", pattern)).unwrap(),
    }
}

static SKIP_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("row data", r"INSERT\s+INTO\b"),
        rule("row data", r"REPLACE\s+INTO\b"),
        rule("row data", r"LOAD\s+DATA\b"),
        rule("table lock", r"LOCK\s+TABLES\b"),
        rule("table unlock", r"UNLOCK\s+TABLES\b"),
        rule("versioned comment", r"/\*!\d*"),
        rule("saved session variable", r"SET\s+@OLD_"),
        rule("client character set", r"SET\s+CHARACTER_SET"),
        rule("client character set", r"SET\s+NAMES\b"),
        rule("sql mode", r"SET\s+SQL_MODE\b"),
        rule("time zone", r"SET\s+TIME_ZONE\b"),
        rule("user variable", r"SET\s+@"),
    ]
});

static CONVERSION_SKIP_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("database selection", r"USE\s+"),
        rule("foreign key checks", r"SET\s+FOREIGN_KEY_CHECKS\b"),
        rule("unique checks", r"SET\s+UNIQUE_CHECKS\b"),
        rule("autocommit", r"SET\s+AUTOCOMMIT\b"),
        rule("transaction control", r"(START\s+TRANSACTION|BEGIN|COMMIT|ROLLBACK)\b"),
        rule("database creation", r"CREATE\s+(DATABASE|SCHEMA)\b"),
        rule("search path", r"SET\s+SEARCH_PATH\b"),
    ]
});

static RE_FOREIGN_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bFOREIGN\s+KEY\b").unwrap());

/// A comment this tool writes into its own output, recognized only where
/// the assembler puts it: the header on line 1, each section marker right
/// before the group it introduces.
fn is_generated_comment(stmt: &Statement, next: Option<&Statement>) -> bool {
    let text = stmt.text.as_str();
    if text == HEADER {
        return stmt.line == 1;
    }
    let Some(next) = next else {
        return false;
    };
    if text == INDEX_SECTION {
        return next.kind == StatementKind::CreateIndex || next.text.starts_with(REVIEW_INDEX_PREFIX);
    }
    if text == FOREIGN_KEY_SECTION {
        return next.kind == StatementKind::AlterTable && RE_FOREIGN_KEY.is_match(&next.text);
    }
    false
}

static KEEP_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("create", r"CREATE\s+"),
        rule("alter", r"ALTER\s+"),
        rule("drop", r"DROP\s+"),
        rule("database selection", r"USE\s+"),
        rule("comment", r"(--|#|/\*)"),
        rule("foreign key checks", r"SET\s+FOREIGN_KEY_CHECKS\b"),
    ]
});

/// Keywords that mark an otherwise unmatched statement as structural.
static STRUCTURAL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(CREATE|ALTER|DROP|TABLE|PRIMARY\s+KEY|FOREIGN\s+KEY|INDEX|CONSTRAINT|REFERENCES)\b")
        .unwrap()
});

/// Counters kept while filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FilterStats {
    pub statements_kept: usize,
    pub statements_skipped: usize,
    pub lines_kept: usize,
    pub lines_skipped: usize,
}

pub struct NoiseFilter {
    profile: FilterProfile,
    stats: FilterStats,
}

impl NoiseFilter {
    pub fn new(profile: FilterProfile) -> Self {
        Self {
            profile,
            stats: FilterStats::default(),
        }
    }

    pub fn for_extraction() -> Self {
        Self::new(FilterProfile::Extraction)
    }

    pub fn for_conversion() -> Self {
        Self::new(FilterProfile::Conversion)
    }

    pub fn profile(&self) -> FilterProfile {
        self.profile
    }

    /// Decide whether a statement survives, without touching the counters.
    ///
    /// Statements arrive whole from the segmenter, so a multi-line bulk
    /// insert is skipped as one unit through to its terminator.
    pub fn classify(&self, stmt: &Statement) -> Verdict {
        self.classify_before(stmt, None)
    }

    /// Like [`NoiseFilter::classify`], with the statement that follows.
    /// Section markers of converted output are only recognized with it.
    pub fn classify_before(&self, stmt: &Statement, next: Option<&Statement>) -> Verdict {
        let text = stmt.text.as_str();

        if let Some(r) = SKIP_RULES.iter().find(|r| r.pattern.is_match(text)) {
            return Verdict::Skip(r.label);
        }
        if self.profile == FilterProfile::Conversion {
            if let Some(r) = CONVERSION_SKIP_RULES.iter().find(|r| r.pattern.is_match(text)) {
                return Verdict::Skip(r.label);
            }
            if stmt.kind == StatementKind::Comment && is_generated_comment(stmt, next) {
                return Verdict::Skip("generated comment");
            }
        }
        if stmt.kind == StatementKind::Data {
            return Verdict::Skip("row data");
        }
        if KEEP_RULES.iter().any(|r| r.pattern.is_match(text)) {
            return Verdict::Keep;
        }

        match self.profile {
            FilterProfile::Conversion => Verdict::Keep,
            FilterProfile::Extraction if STRUCTURAL_KEYWORD.is_match(text) => Verdict::Keep,
            FilterProfile::Extraction => Verdict::Skip("not schema"),
        }
    }

    /// Classify a statement and update the counters. Returns true if it is kept.
    pub fn admit(&mut self, stmt: &Statement) -> bool {
        self.admit_before(stmt, None)
    }

    /// [`NoiseFilter::admit`] with the statement that follows.
    pub fn admit_before(&mut self, stmt: &Statement, next: Option<&Statement>) -> bool {
        match self.classify_before(stmt, next) {
            Verdict::Keep => {
                self.stats.statements_kept += 1;
                self.stats.lines_kept += stmt.line_count;
                true
            }
            Verdict::Skip(_) => {
                self.stats.statements_skipped += 1;
                self.stats.lines_skipped += stmt.line_count;
                false
            }
        }
    }

    /// Filter a sequence of statements, preserving order.
    pub fn apply<I>(&mut self, statements: I) -> Vec<Statement>
    where
        I: IntoIterator<Item = Statement>,
    {
        let mut statements = statements.into_iter().peekable();
        let mut kept = Vec::new();
        while let Some(stmt) = statements.next() {
            if self.admit_before(&stmt, statements.peek()) {
                kept.push(stmt);
            }
        }
        kept
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }
}
