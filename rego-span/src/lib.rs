//! Source positions used by every other crate in the workspace.
//!
//! A [`Location`] pins an error or an AST node to a place in the original
//! Rego source text: a 1-based line and column plus the byte length of the
//! span. Nothing here tracks file identity — a `CompiledModule` is always
//! compiled from one source string, so a bare line/column is enough.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position (and extent) within a single Rego source text.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Location {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    /// Byte length of the source this location covers.
    pub len: usize,
}

impl Location {
    pub const fn new(line: usize, column: usize, len: usize) -> Self {
        Self { line, column, len }
    }

    /// A location with no useful position, for synthesized nodes.
    pub const fn dummy() -> Self {
        Self { line: 0, column: 0, len: 0 }
    }

    /// The smallest location spanning both `self` and `other`.
    pub fn merge(self, other: Self) -> Self {
        if self.line == 0 {
            return other;
        }
        if other.line == 0 {
            return self;
        }
        let (start, end) = if (self.line, self.column) <= (other.line, other.column) {
            (self, other)
        } else {
            (other, self)
        };
        Self { line: start.line, column: start.column, len: start.len.max(end.len) }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line && self.column == other.column && self.len == other.len
    }
}

impl Eq for Location {}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Tracks line/column as a lexer scans through source text byte-by-byte.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cursor {
    pub line: usize,
    pub column: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self { line: 1, column: 1 }
    }

    pub fn location(&self, len: usize) -> Location {
        Location::new(self.line, self.column, len)
    }

    /// Advances the cursor past `c`, handling newlines.
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn merge_picks_earliest_start() {
        let a = Location::new(2, 5, 1);
        let b = Location::new(1, 1, 3);
        let merged = a.merge(b);
        assert_eq!(merged.line, 1);
        assert_eq!(merged.column, 1);
    }

    #[test]
    fn merge_with_dummy_keeps_the_other() {
        let a = Location::dummy();
        let b = Location::new(3, 4, 2);
        assert_eq!(a.merge(b), b);
        assert_eq!(b.merge(a), b);
    }

    #[test]
    fn cursor_tracks_newlines() {
        let mut cursor = Cursor::new();
        for c in "ab\ncd".chars() {
            cursor.advance(c);
        }
        assert_eq!(cursor.line, 2);
        assert_eq!(cursor.column, 3);
    }
}
