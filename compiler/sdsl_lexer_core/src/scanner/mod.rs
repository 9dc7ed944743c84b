//! Position-tracking character scanner.
//!
//! Lines and columns are 0-based here; diagnostics convert to 1-based.
//! Columns count characters, and only `\n` starts a new line.

use memchr::memmem;

/// Returned by [`Scanner::peek`] for positions past the end of input.
pub const EOF_CHAR: char = '\0';

/// A saved scanner position, restorable with [`Scanner::restore`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScannerState {
    pos: usize,
    line: u32,
    column: u32,
}

impl ScannerState {
    /// Byte offset of the saved position.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos as u32
    }
}

/// Character scanner over a source string.
#[derive(Clone, Debug)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Scanner {
            text,
            pos: 0,
            line: 0,
            column: 0,
        }
    }

    /// The full source text.
    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Current byte offset.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos as u32
    }

    /// Current 0-based line.
    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Current 0-based column, in characters.
    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Unconsumed input.
    #[inline]
    pub fn rest(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or("")
    }

    /// The character `n` positions ahead (0 = current), or [`EOF_CHAR`].
    #[inline]
    pub fn peek(&self, n: usize) -> char {
        self.rest().chars().nth(n).unwrap_or(EOF_CHAR)
    }

    /// The current character, or [`EOF_CHAR`].
    #[inline]
    pub fn current(&self) -> char {
        self.peek(0)
    }

    /// Consume up to `n` characters; stops at the end of input.
    pub fn advance(&mut self, n: usize) {
        for _ in 0..n {
            let Some(c) = self.rest().chars().next() else {
                return;
            };
            self.bump(c);
        }
    }

    #[inline]
    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    /// Consume `literal` if the input starts with it.
    ///
    /// With `case_sensitive == false`, ASCII letters compare without case.
    /// On a mismatch nothing is consumed.
    pub fn read_literal(&mut self, literal: &str, case_sensitive: bool) -> bool {
        let rest = self.rest();
        let Some(candidate) = rest.get(..literal.len()) else {
            return false;
        };
        let matched = if case_sensitive {
            candidate == literal
        } else {
            candidate.eq_ignore_ascii_case(literal)
        };
        if matched {
            self.advance(literal.chars().count());
        }
        matched
    }

    /// Consume characters while `pred` holds; returns the consumed text.
    pub fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.rest().chars().next() {
            if !pred(c) {
                break;
            }
            self.bump(c);
        }
        self.slice(start as u32, self.pos as u32)
    }

    /// Advance to the next `\n` (not consumed) or to the end of input.
    pub fn skip_to_line_end(&mut self) -> &'a str {
        let rest = self.rest();
        let len = memchr::memchr(b'\n', rest.as_bytes()).unwrap_or(rest.len());
        let skipped = &rest[..len];
        self.pos += len;
        self.column += skipped.chars().count() as u32;
        skipped
    }

    /// Skip past the next occurrence of `terminator`, keeping line and column exact.
    ///
    /// Returns `false` and stops at the end of input if there is none.
    pub fn skip_past(&mut self, terminator: &str) -> bool {
        let rest = self.rest();
        let (len, found) = match memmem::find(rest.as_bytes(), terminator.as_bytes()) {
            Some(idx) => (idx + terminator.len(), true),
            None => (rest.len(), false),
        };
        let skipped = &rest[..len];
        let newlines = memchr::memchr_iter(b'\n', skipped.as_bytes()).count() as u32;
        if let Some(last_nl) = memchr::memrchr(b'\n', skipped.as_bytes()) {
            self.column = skipped[last_nl + 1..].chars().count() as u32;
        } else {
            self.column += skipped.chars().count() as u32;
        }
        self.line += newlines;
        self.pos += len;
        found
    }

    /// Text between two byte offsets (clamped to the source).
    #[inline]
    pub fn slice(&self, start: u32, end: u32) -> &'a str {
        let end = (end as usize).min(self.text.len());
        let start = (start as usize).min(end);
        self.text.get(start..end).unwrap_or("")
    }

    /// Text from `start` to the current position.
    #[inline]
    pub fn slice_from(&self, start: u32) -> &'a str {
        self.slice(start, self.pos as u32)
    }

    pub fn save(&self) -> ScannerState {
        ScannerState {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    pub fn restore(&mut self, state: ScannerState) {
        self.pos = state.pos;
        self.line = state.line;
        self.column = state.column;
    }
}

/// Recompute the 0-based (line, column) of `pos` by rescanning from the start.
///
/// `pos` is clamped to the text length and rounded down to a char boundary.
pub fn line_column_at(text: &str, pos: u32) -> (u32, u32) {
    let mut end = (pos as usize).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let prefix = &text[..end];
    let line = memchr::memchr_iter(b'\n', prefix.as_bytes()).count() as u32;
    let line_start = memchr::memrchr(b'\n', prefix.as_bytes()).map_or(0, |i| i + 1);
    let column = prefix[line_start..].chars().count() as u32;
    (line, column)
}

#[cfg(test)]
mod tests;
