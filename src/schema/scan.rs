//! Quote- and parenthesis-aware scanning over DDL text.
//!
//! Everything here treats `'...'` as a string literal (with backslash and
//! doubled-quote escapes) and `"..."` / `` `...` `` as quoted identifiers.

use super::QualifiedName;

/// Index just past the literal or quoted identifier opening at `start`.
pub(crate) fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && quote == b'\'' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

#[inline]
pub(crate) fn is_quote(b: u8) -> bool {
    matches!(b, b'\'' | b'"' | b'`')
}

/// Index of the `)` matching the `(` at `open`.
pub fn find_matching_paren(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b if is_quote(b) => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split on `sep` at parenthesis depth 0, outside quotes. Pieces are trimmed
/// and empty pieces dropped.
pub fn split_top_level(s: &str, sep: u8) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b if is_quote(b) => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => depth -= 1,
            b if b == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&s[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Apply `f` to every stretch of text outside literals and quoted identifiers.
pub fn map_unquoted<F>(s: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if is_quote(bytes[i]) {
            out.push_str(&f(&s[plain_start..i]));
            let end = skip_quoted(bytes, i);
            out.push_str(&s[i..end]);
            plain_start = end;
            i = end;
        } else {
            i += 1;
        }
    }
    out.push_str(&f(&s[plain_start..]));
    out
}

#[inline]
pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// First unquoted occurrence of `needle` at or after `from`.
pub fn find_unquoted(s: &str, from: usize, needle: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b if is_quote(b) => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b if b == needle => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Byte spans of whitespace-separated words; quoted text and parenthesized
/// groups never split a word.
pub fn top_level_words(s: &str) -> Vec<(usize, usize)> {
    let bytes = s.as_bytes();
    let mut words = Vec::new();
    let mut i = 0;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i = match bytes[i] {
                b if is_quote(b) => skip_quoted(bytes, i),
                b'(' => find_matching_paren(s, i).map_or(bytes.len(), |close| close + 1),
                _ => i + 1,
            };
        }
        words.push((start, i));
    }
    words
}

/// Strip the delimiters from a quoted identifier, undoing doubled quotes.
pub fn unquote(token: &str) -> String {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'`' || bytes[0] == b'"') && bytes[bytes.len() - 1] == bytes[0] {
        let q = &token[..1];
        token[1..token.len() - 1].replace(&q.repeat(2), q)
    } else {
        token.to_string()
    }
}

/// Forward-only cursor over one clause of DDL.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn is_eof(&mut self) -> bool {
        self.skip_ws();
        self.pos >= self.src.len()
    }

    pub fn skip_ws(&mut self) {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    pub fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.as_bytes().get(self.pos).copied()
    }

    pub fn eat_char(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Case-insensitive keyword match on a whole word.
    pub fn peek_keyword(&mut self, kw: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        rest.len() >= kw.len()
            && rest.is_char_boundary(kw.len())
            && rest[..kw.len()].eq_ignore_ascii_case(kw)
            && !rest[kw.len()..].chars().next().is_some_and(is_ident_char)
    }

    pub fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.peek_keyword(kw) {
            self.pos += kw.len();
            true
        } else {
            false
        }
    }

    /// Eat a keyword sequence such as `IF NOT EXISTS`; all or nothing.
    pub fn eat_keywords(&mut self, kws: &[&str]) -> bool {
        let saved = self.pos;
        if kws.iter().all(|kw| self.eat_keyword(kw)) {
            true
        } else {
            self.pos = saved;
            false
        }
    }

    /// Like [`Cursor::eat_keyword`], returning the text as written.
    pub fn keyword(&mut self, kw: &str) -> Option<&'a str> {
        if self.peek_keyword(kw) {
            let text = &self.src[self.pos..self.pos + kw.len()];
            self.pos += kw.len();
            Some(text)
        } else {
            None
        }
    }

    /// Consume `n` bytes of the remaining input.
    pub fn take(&mut self, n: usize) -> &'a str {
        let end = (self.pos + n).min(self.src.len());
        let text = &self.src[self.pos..end];
        self.pos = end;
        text
    }

    /// A bare word made of identifier characters.
    pub fn word(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_ident_char(c))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    /// A quoted or bare identifier, returned unquoted.
    pub fn identifier(&mut self) -> Option<String> {
        match self.peek()? {
            b'`' | b'"' => {
                let end = skip_quoted(self.src.as_bytes(), self.pos);
                let token = &self.src[self.pos..end];
                self.pos = end;
                Some(unquote(token))
            }
            _ => self.word().map(str::to_string),
        }
    }

    /// `name` or `schema.name`.
    pub fn qualified_name(&mut self) -> Option<QualifiedName> {
        let first = self.identifier()?;
        let saved = self.pos;
        if self.eat_char(b'.') {
            if let Some(second) = self.identifier() {
                return Some(QualifiedName::new(Some(first), second));
            }
            self.pos = saved;
        }
        Some(QualifiedName::new(None, first))
    }

    /// A parenthesized group; returns the text between the parentheses.
    pub fn paren_group(&mut self) -> Option<&'a str> {
        if self.peek()? != b'(' {
            return None;
        }
        let close = find_matching_paren(self.src, self.pos)?;
        let inner = &self.src[self.pos + 1..close];
        self.pos = close + 1;
        Some(inner)
    }

    /// One raw token: a literal, a parenthesized group, a word with an
    /// attached group (`now()`), or a single punctuation character.
    pub fn token(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let b = *bytes.get(start)?;
        if is_quote(b) {
            self.pos = skip_quoted(bytes, start);
        } else if b == b'(' {
            self.paren_group()?;
        } else if self.word().is_some() {
            if bytes.get(self.pos) == Some(&b'(') {
                self.paren_group();
            }
        } else {
            let width = self.rest().chars().next().map_or(1, char::len_utf8);
            self.pos += width;
        }
        Some(&self.src[start..self.pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_top_level_respects_nesting_and_quotes() {
        let parts = split_top_level("a int, b decimal(10,2), c enum('x,y','z'), `d,e` int", b',');
        assert_eq!(
            parts,
            vec!["a int", "b decimal(10,2)", "c enum('x,y','z')", "`d,e` int"]
        );
    }

    #[test]
    fn test_find_matching_paren_skips_quoted_parens() {
        let s = "(a varchar(10) DEFAULT ')', \"b(\" int) tail";
        let close = find_matching_paren(s, 0).unwrap();
        assert_eq!(&s[close + 1..], " tail");
    }

    #[test]
    fn test_map_unquoted() {
        let out = map_unquoted("int 'int' \"int\" int", |s| s.replace("int", "X"));
        assert_eq!(out, "X 'int' \"int\" X");
    }

    #[test]
    fn test_top_level_words() {
        let s = "Start Date decimal(10, 2) DEFAULT 'a b'";
        let words: Vec<&str> = top_level_words(s).into_iter().map(|(a, b)| &s[a..b]).collect();
        assert_eq!(words, vec!["Start", "Date", "decimal(10, 2)", "DEFAULT", "'a b'"]);
    }

    #[test]
    fn test_find_unquoted() {
        assert_eq!(find_unquoted("`a(b` (x)", 0, b'('), Some(6));
        assert_eq!(find_unquoted("abc", 0, b'('), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("`a``b`"), "a`b");
        assert_eq!(unquote("\"a\"\"b\""), "a\"b");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_cursor_keywords_and_identifiers() {
        let mut c = Cursor::new("  if not exists `db`.`my table` (x)");
        assert!(c.eat_keywords(&["IF", "NOT", "EXISTS"]));
        let name = c.qualified_name().unwrap();
        assert_eq!(name.schema.as_ref().unwrap().name(), "db");
        assert_eq!(name.name.name(), "my table");
        assert_eq!(c.paren_group(), Some("x"));
        assert!(c.is_eof());
    }

    #[test]
    fn test_keyword_needs_word_boundary() {
        let mut c = Cursor::new("KEYS");
        assert!(!c.eat_keyword("KEY"));
        assert!(c.eat_keyword("keys"));
    }

    #[test]
    fn test_tokens() {
        let mut c = Cursor::new("DEFAULT now() 'a b' (1 + 2) ,");
        assert_eq!(c.token(), Some("DEFAULT"));
        assert_eq!(c.token(), Some("now()"));
        assert_eq!(c.token(), Some("'a b'"));
        assert_eq!(c.token(), Some("(1 + 2)"));
        assert_eq!(c.token(), Some(","));
        assert_eq!(c.token(), None);
    }
}
