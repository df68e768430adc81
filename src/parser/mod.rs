//! Statement segmentation for MySQL dump text.
//!
//! [`Parser`] walks the decoded dump and yields one [`Statement`] per
//! terminated SQL statement or standalone comment. Semicolons inside
//! string literals, quoted identifiers and comments never end a statement.

use memchr::{memchr, memmem};

/// Coarse statement classification, decided from the leading keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    CreateTable,
    CreateIndex,
    AlterTable,
    DropTable,
    /// `SET ...` statements and versioned `/*!NNNNN ... */` comments.
    SetPragma,
    Comment,
    /// Row data: `INSERT`, `REPLACE`, `LOAD DATA`.
    Data,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    /// Statement text including its terminator, without surrounding blank space.
    pub text: String,
    /// 1-based line the statement starts on.
    pub line: usize,
    /// Number of source lines the statement spans.
    pub line_count: usize,
}

impl Statement {
    /// Last source line the statement occupies.
    pub fn end_line(&self) -> usize {
        self.line + self.line_count.saturating_sub(1)
    }

    /// Statement text with the trailing terminator removed.
    pub fn body(&self) -> &str {
        self.text.trim_end().trim_end_matches(';').trim_end()
    }
}

/// Splits dump text into statements.
pub struct Parser<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str) -> Self {
        // A byte-order mark would otherwise glue itself onto the first keyword.
        let pos = if text.starts_with('\u{feff}') { 3 } else { 0 };
        Self { text, pos, line: 1 }
    }

    /// Read the next statement, or `None` once the input is exhausted.
    ///
    /// An unterminated trailing statement is returned as-is.
    pub fn read_statement(&mut self) -> Option<Statement> {
        let bytes = self.text.as_bytes();
        self.skip_whitespace();
        if self.pos >= bytes.len() {
            return None;
        }

        let start = self.pos;
        let rest = &bytes[start..];
        let (end, kind) = if rest.starts_with(b"--") || rest[0] == b'#' {
            let end = memchr(b'\n', rest).map_or(bytes.len(), |i| start + i);
            (end, StatementKind::Comment)
        } else if rest.starts_with(b"/*!") {
            (self.versioned_comment_end(start), StatementKind::SetPragma)
        } else if rest.starts_with(b"/*") {
            let end = memmem::find(&rest[2..], b"*/").map_or(bytes.len(), |i| start + i + 4);
            (end, StatementKind::Comment)
        } else {
            let end = scan_statement_end(bytes, start);
            let kind = classify(&self.text[start..end]);
            (end, kind)
        };

        let text = self.text[start..end].trim_end();
        let line_count = 1 + text.bytes().filter(|&b| b == b'\n').count();
        let statement = Statement {
            kind,
            text: text.to_string(),
            line: self.line,
            line_count,
        };

        self.line += self.text[start..end].bytes().filter(|&b| b == b'\n').count();
        self.pos = end;
        Some(statement)
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            if bytes[self.pos] == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    /// `/*!40101 SET ... */;` ends after the comment plus an optional `;` on the same line.
    fn versioned_comment_end(&self, start: usize) -> usize {
        let bytes = self.text.as_bytes();
        let mut end = match memmem::find(&bytes[start + 3..], b"*/") {
            Some(i) => start + 3 + i + 2,
            None => return bytes.len(),
        };
        let mut next = end;
        while next < bytes.len() && matches!(bytes[next], b' ' | b'\t') {
            next += 1;
        }
        if next < bytes.len() && bytes[next] == b';' {
            end = next + 1;
        }
        end
    }
}

impl Iterator for Parser<'_> {
    type Item = Statement;

    fn next(&mut self) -> Option<Statement> {
        self.read_statement()
    }
}

/// Find the end of a statement starting at `start`: one past its `;`, or end of input.
fn scan_statement_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' && q != b'`' {
                i += 2;
                continue;
            }
            if b == q {
                // A doubled quote character is an escaped quote.
                if i + 1 < bytes.len() && bytes[i + 1] == q {
                    i += 2;
                    continue;
                }
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b';' => return i + 1,
            b'#' => i = line_end(bytes, i),
            b'-' if is_line_comment(bytes, i) => i = line_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = memmem::find(&bytes[i + 2..], b"*/").map_or(bytes.len(), |j| i + 2 + j + 2);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// `--` starts a comment only when followed by whitespace or end of input.
#[inline]
fn is_line_comment(bytes: &[u8], i: usize) -> bool {
    bytes.get(i + 1) == Some(&b'-')
        && bytes
            .get(i + 2)
            .map_or(true, |b| b.is_ascii_whitespace())
}

#[inline]
fn line_end(bytes: &[u8], i: usize) -> usize {
    memchr(b'\n', &bytes[i..]).map_or(bytes.len(), |j| i + j)
}

/// Classify a statement by its first keywords.
pub fn classify(text: &str) -> StatementKind {
    let mut words = text
        .split(|c: char| c.is_ascii_whitespace() || c == '(' || c == ';')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_uppercase());

    let first = match words.next() {
        Some(w) => w,
        None => return StatementKind::Other,
    };

    match first.as_str() {
        "CREATE" => {
            for word in words {
                match word.as_str() {
                    "TEMPORARY" | "OR" | "REPLACE" | "UNIQUE" | "FULLTEXT" | "SPATIAL" => continue,
                    "TABLE" => return StatementKind::CreateTable,
                    "INDEX" => return StatementKind::CreateIndex,
                    _ => return StatementKind::Other,
                }
            }
            StatementKind::Other
        }
        "ALTER" if words.next().as_deref() == Some("TABLE") => StatementKind::AlterTable,
        "DROP" if words.next().as_deref() == Some("TABLE") => StatementKind::DropTable,
        "SET" => StatementKind::SetPragma,
        "INSERT" | "REPLACE" => StatementKind::Data,
        "LOAD" if words.next().as_deref() == Some("DATA") => StatementKind::Data,
        _ => StatementKind::Other,
    }
}

/// Split a whole dump into statements.
pub fn segment(text: &str) -> Vec<Statement> {
    Parser::new(text).collect()
}
