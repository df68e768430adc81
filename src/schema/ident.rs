//! PostgreSQL identifier quoting.

use super::scan::{is_ident_char, map_unquoted, skip_quoted};
use super::{Identifier, QualifiedName};
use ahash::AHashSet;
use std::borrow::Cow;

/// PostgreSQL reserved key words (cannot be used bare as table or column names).
pub const RESERVED_WORDS: &[&str] = &[
    "all",
    "analyse",
    "analyze",
    "and",
    "any",
    "array",
    "as",
    "asc",
    "asymmetric",
    "authorization",
    "binary",
    "both",
    "case",
    "cast",
    "check",
    "collate",
    "collation",
    "column",
    "concurrently",
    "constraint",
    "create",
    "cross",
    "current_catalog",
    "current_date",
    "current_role",
    "current_schema",
    "current_time",
    "current_timestamp",
    "current_user",
    "default",
    "deferrable",
    "desc",
    "distinct",
    "do",
    "else",
    "end",
    "except",
    "false",
    "fetch",
    "for",
    "foreign",
    "freeze",
    "from",
    "full",
    "grant",
    "group",
    "having",
    "ilike",
    "in",
    "initially",
    "inner",
    "intersect",
    "into",
    "is",
    "isnull",
    "join",
    "lateral",
    "leading",
    "left",
    "like",
    "limit",
    "localtime",
    "localtimestamp",
    "natural",
    "not",
    "notnull",
    "null",
    "offset",
    "on",
    "only",
    "or",
    "order",
    "outer",
    "overlaps",
    "placing",
    "primary",
    "references",
    "returning",
    "right",
    "select",
    "session_user",
    "similar",
    "some",
    "symmetric",
    "system_user",
    "table",
    "tablesample",
    "then",
    "to",
    "trailing",
    "true",
    "union",
    "unique",
    "user",
    "using",
    "variadic",
    "verbose",
    "when",
    "where",
    "window",
    "with",
];

/// Words that open a key or constraint clause inside a MySQL table body.
/// A bare column with one of these names would be read back as that clause.
pub const CLAUSE_KEYWORDS: &[&str] = &[
    "check",
    "constraint",
    "foreign",
    "fulltext",
    "index",
    "key",
    "primary",
    "spatial",
    "unique",
];

/// True when the name can only be written quoted because of its characters:
/// empty, a leading digit, or anything outside ASCII letters, digits and `_`.
pub fn has_irregular_shape(name: &str) -> bool {
    name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || name.chars().any(|c| !c.is_ascii_alphanumeric() && c != '_')
}

pub fn is_reserved(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RESERVED_WORDS.binary_search(&lower.as_str()).is_ok()
}

pub fn is_clause_keyword(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    CLAUSE_KEYWORDS.binary_search(&lower.as_str()).is_ok()
}

/// Shape, reserved-word or clause-keyword check against the built-in lists.
pub fn needs_quoting(name: &str) -> bool {
    has_irregular_shape(name) || is_reserved(name) || is_clause_keyword(name)
}

/// Renders identifiers for PostgreSQL output.
#[derive(Debug, Clone, Default)]
pub struct QuotingResolver {
    extra_reserved: AHashSet<String>,
}

impl QuotingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat additional words as reserved.
    pub fn with_reserved_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_reserved
            .extend(words.into_iter().map(|w| w.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn needs_quoting(&self, name: &str) -> bool {
        needs_quoting(name) || self.extra_reserved.contains(&name.to_ascii_lowercase())
    }

    /// The name as it must appear in output.
    pub fn quote<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if self.needs_quoting(name) {
            Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
        } else {
            Cow::Borrowed(name)
        }
    }

    pub fn render<'a>(&self, ident: &'a Identifier) -> Cow<'a, str> {
        self.quote(ident.name())
    }

    pub fn render_qualified(&self, name: &QualifiedName) -> String {
        match &name.schema {
            Some(schema) => format!("{}.{}", self.render(schema), self.render(&name.name)),
            None => self.render(&name.name).into_owned(),
        }
    }

    /// Comma-separated column list, without the parentheses.
    pub fn render_list(&self, columns: &[Identifier]) -> String {
        columns
            .iter()
            .map(|c| self.render(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Replace backtick delimiters: bare names lose them, the rest become
    /// double-quoted. String literals and double-quoted text are left alone.
    pub fn normalize_delimiters(&self, text: &str) -> String {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        let mut copied = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\'' | b'"' => i = skip_quoted(bytes, i),
                b'`' => {
                    let end = skip_quoted(bytes, i);
                    out.push_str(&text[copied..i]);
                    let name = super::scan::unquote(&text[i..end]);
                    out.push_str(&self.quote(&name));
                    copied = end;
                    i = end;
                }
                _ => i += 1,
            }
        }
        out.push_str(&text[copied..]);
        out
    }

    /// Quote bare occurrences of `declared` names in a raw fragment when
    /// their shape makes them unusable bare. Literals and quoted names are
    /// skipped, so applying this twice changes nothing.
    pub fn resolve_fragment(&self, fragment: &str, declared: &[&Identifier]) -> String {
        let mut names: Vec<&str> = declared
            .iter()
            .map(|i| i.name())
            .filter(|n| has_irregular_shape(n) && !n.is_empty())
            .collect();
        if names.is_empty() {
            return fragment.to_string();
        }
        // Longest first so "Start Date" wins over "Start".
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        names.dedup();

        map_unquoted(fragment, |plain| wrap_bare_names(plain, &names, self))
    }
}

fn wrap_bare_names(plain: &str, names: &[&str], resolver: &QuotingResolver) -> String {
    let mut out = String::with_capacity(plain.len());
    let mut i = 0;

    'scan: while i < plain.len() {
        let at_boundary = !plain[..i].chars().next_back().is_some_and(is_ident_char);
        if at_boundary {
            for name in names {
                let end = i + name.len();
                if plain.is_char_boundary(end)
                    && plain.get(i..end) == Some(*name)
                    && !plain[end..].chars().next().is_some_and(is_ident_char)
                {
                    out.push_str(&resolver.quote(name));
                    i = end;
                    continue 'scan;
                }
            }
        }
        let c = plain[i..].chars().next().unwrap_or(' ');
        out.push(c);
        i += c.len_utf8();
    }
    out
}
