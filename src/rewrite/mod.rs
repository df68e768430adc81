//! Lexical rewriting of MySQL-only syntax.
//!
//! Text rules run over whole statements before they are parsed: table
//! options, column attributes PostgreSQL has no use for, and a few literal
//! forms. Type remapping lives in [`types`] because it needs the parsed
//! column (its auto-increment flag) to pick a rule.

pub mod types;

use crate::schema::scan::{is_quote, map_unquoted, skip_quoted};
use crate::schema::QuotingResolver;
use once_cell::sync::Lazy;
use regex::Regex;

/// A single search-and-replace rule. Rules never fail; a rule that does not
/// match leaves the text alone. Literal contents are never rewritten.
pub struct TextRule {
    pub label: &'static str,
    pattern: Regex,
    action: Action,
}

enum Action {
    /// Replace matches in the text outside literals and quoted names.
    Replace(&'static str),
    /// The pattern is anchored to the end of the text in front of a
    /// single-quoted literal. The match and the literal are replaced together
    /// by what the function returns; `None` leaves both alone.
    WithLiteral(fn(&str) -> Option<String>),
}

fn text_rule(label: &'static str, pattern: &str, replacement: &'static str) -> TextRule {
    TextRule {
        label,
        pattern: Regex::new(pattern).unwrap(),
        action: Action::Replace(replacement),
    }
}

fn literal_rule(label: &'static str, pattern: &str, replace: fn(&str) -> Option<String>) -> TextRule {
    TextRule {
        label,
        pattern: Regex::new(pattern).unwrap(),
        action: Action::WithLiteral(replace),
    }
}

fn drop_literal(_: &str) -> Option<String> {
    Some(String::new())
}

fn bit_literal(literal: &str) -> Option<String> {
    match literal {
        "'0'" => Some("FALSE".to_string()),
        "'1'" => Some("TRUE".to_string()),
        _ => None,
    }
}

impl TextRule {
    /// The rewritten text, or `None` when the rule did not apply.
    fn apply(&self, text: &str) -> Option<String> {
        let mut hit = false;
        let out = match self.action {
            Action::Replace(replacement) => map_unquoted(text, |plain| {
                if self.pattern.is_match(plain) {
                    hit = true;
                    self.pattern.replace_all(plain, replacement).into_owned()
                } else {
                    plain.to_string()
                }
            }),
            Action::WithLiteral(replace) => replace_before_literals(text, &self.pattern, |literal| {
                let replaced = replace(literal);
                hit |= replaced.is_some();
                replaced
            }),
        };
        hit.then_some(out)
    }
}

/// Where the unquoted text in front of a single-quoted literal matches
/// `pattern`, replace the match plus the literal with `replace(literal)`.
fn replace_before_literals<F>(text: &str, pattern: &Regex, mut replace: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !is_quote(bytes[i]) {
            i += 1;
            continue;
        }
        let end = skip_quoted(bytes, i);
        let plain = &text[plain_start..i];
        let replaced = if bytes[i] == b'\'' {
            pattern
                .find(plain)
                .and_then(|m| replace(&text[i..end]).map(|r| (m.start(), r)))
        } else {
            None
        };
        match replaced {
            Some((cut, replacement)) => {
                out.push_str(&plain[..cut]);
                out.push_str(&replacement);
            }
            None => out.push_str(&text[plain_start..end]),
        }
        plain_start = end;
        i = end;
    }
    out.push_str(&text[plain_start..]);
    out
}

/// Rule labels that change data semantics and deserve a warning.
pub const LABEL_UNSIGNED: &str = "unsigned modifier";
pub const LABEL_AUTO_INCREMENT_KEYWORD: &str = "auto-increment keyword";
pub const LABEL_ON_UPDATE: &str = "on update current_timestamp";

static TEXT_RULES: Lazy<Vec<TextRule>> = Lazy::new(|| {
    vec![
        text_rule(
            "current_timestamp call",
            r"(?i)\bCURRENT_TIMESTAMP\s*\(\s*\)",
            "CURRENT_TIMESTAMP",
        ),
        text_rule(
            LABEL_ON_UPDATE,
            r"(?i)\s+ON\s+UPDATE\s+CURRENT_TIMESTAMP\b(\s*\(\s*\d*\s*\))?",
            "",
        ),
        literal_rule("bit literal", r"(?i)\bb$", bit_literal),
        text_rule("engine", r"(?i)\s*\bENGINE\s*=\s*\w+", ""),
        text_rule("auto-increment seed", r"(?i)\s*\bAUTO_INCREMENT\s*=\s*\d+", ""),
        text_rule(
            "character set",
            r"(?i)\s*\b((DEFAULT\s+)?CHARSET\s*=\s*\w+|(DEFAULT\s+)?CHARACTER\s+SET\s*=?\s*\w+)",
            "",
        ),
        text_rule("collation", r"(?i)\s*\b(DEFAULT\s+)?COLLATE\b\s*=?\s*\w+", ""),
        literal_rule("table comment", r"(?i)\s*\bCOMMENT\s*=\s*$", drop_literal),
        literal_rule("column comment", r"(?i)\s+COMMENT\s+$", drop_literal),
        text_rule("row format", r"(?i)\s*\bROW_FORMAT\s*=\s*\w+", ""),
        text_rule(
            "storage option",
            r"(?i)\s*\b(STATS_PERSISTENT|STATS_AUTO_RECALC|STATS_SAMPLE_PAGES|KEY_BLOCK_SIZE|PACK_KEYS|CHECKSUM|DELAY_KEY_WRITE|MAX_ROWS|MIN_ROWS|AVG_ROW_LENGTH|INSERT_METHOD)\s*=\s*\w+",
            "",
        ),
        text_rule(LABEL_UNSIGNED, r"(?i)\s+UNSIGNED\b", ""),
        text_rule(LABEL_UNSIGNED, r"(?i)\s+ZEROFILL\b", ""),
    ]
});

static RE_AUTO_INCREMENT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+AUTO_INCREMENT\b").unwrap());

/// Result of rewriting one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    /// Labels of the rules that changed something, in rule order.
    pub fired: Vec<&'static str>,
}

impl Rewritten {
    pub fn fired(&self, label: &str) -> bool {
        self.fired.contains(&label)
    }
}

/// Strip MySQL versioned comments (`/*!40101 ... */`) from inside a statement.
pub fn strip_conditional_comments(stmt: &str) -> String {
    let mut result = String::with_capacity(stmt.len());
    let mut chars = stmt.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            result.push(c);
            if c == '\\' && q == '\'' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                result.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'!') {
                    let mut depth = 1;
                    while depth > 0 {
                        match chars.next() {
                            Some('*') if chars.peek() == Some(&'/') => {
                                chars.next();
                                depth -= 1;
                            }
                            Some('/') if chars.peek() == Some(&'*') => {
                                chars.next();
                                depth += 1;
                            }
                            None => break,
                            _ => {}
                        }
                    }
                } else {
                    result.push_str("/*");
                }
            }
            _ => result.push(c),
        }
    }
    result
}

/// Apply the text rules in order.
pub fn rewrite_statement(stmt: &str) -> Rewritten {
    let mut fired = Vec::new();
    let mut text = strip_conditional_comments(stmt);
    if text.len() != stmt.len() {
        fired.push("versioned comment");
    }

    for rule in TEXT_RULES.iter() {
        if let Some(changed) = rule.apply(&text) {
            text = changed;
            if !fired.contains(&rule.label) {
                fired.push(rule.label);
            }
        }
    }

    Rewritten { text, fired }
}

/// Rewrite a statement that is not parsed into the intermediate form:
/// text rules, delimiter normalization and text-mode type remapping.
/// Leftover `AUTO_INCREMENT` keywords are removed.
pub fn rewrite_text_mode(stmt: &str, resolver: &QuotingResolver) -> Rewritten {
    let mut rewritten = rewrite_statement(stmt);

    let mut hit = false;
    let text = map_unquoted(&rewritten.text, |plain| {
        if RE_AUTO_INCREMENT_KEYWORD.is_match(plain) {
            hit = true;
            RE_AUTO_INCREMENT_KEYWORD.replace_all(plain, "").into_owned()
        } else {
            plain.to_string()
        }
    });
    if hit {
        rewritten.text = text;
        rewritten.fired.push(LABEL_AUTO_INCREMENT_KEYWORD);
    }

    let normalized = resolver.normalize_delimiters(&rewritten.text);
    let remapped = types::remap_types_in_text(&normalized);
    if remapped != normalized {
        rewritten.fired.push("type remap");
    }
    rewritten.text = remapped;
    rewritten
}
