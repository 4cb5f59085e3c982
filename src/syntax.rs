//! Core syntax types shared by the lexer, recognizer, and diagnostics.
//!
//! Everything here is plain data with source location tracking. Positions are
//! zero-based; `offset` is a byte index into the original text so callers can
//! slice the source in O(1).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A zero-based location in the source text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.column)
    }
}

/// A half-open source range delimited by two positions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width span at the given position.
    pub fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: if other.start.offset < self.start.offset {
                other.start
            } else {
                self.start
            },
            end: if other.end.offset > self.end.offset {
                other.end
            } else {
                self.end
            },
        }
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &Span) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lexical classification of a token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    /// A string literal, or one literal segment of an interpolated string.
    Str,
    /// One `${...}`-style interpolation span inside a string literal.
    Interpolation,
    Operator,
    Punct,
    Comment,
    Whitespace,
    Newline,
    /// A character no lexical rule claimed. Always accompanied by a warning.
    Unknown,
    /// Zero-width end-of-input marker, always the final token.
    Eof,
}

impl TokenKind {
    /// Trivia carries no structure: the recognizer skips it between tokens.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment
        )
    }
}

/// The minimal lexical unit: a kind, the source slice it covers, and its span.
///
/// Tokens borrow from the input text; span concatenation over a full token
/// stream reconstructs the input exactly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Span,
}

impl<'src> Token<'src> {
    pub fn start(&self) -> Position {
        self.span.start
    }

    pub fn end(&self) -> Position {
        self.span.end
    }

    /// True for exactly the keyword `word`.
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == word
    }

    /// True for exactly the operator or punctuation `text`.
    pub fn is_symbol(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Operator | TokenKind::Punct) && self.text == text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_and_containment() {
        let outer = Span::new(Position::new(0, 0, 0), Position::new(2, 0, 20));
        let inner = Span::new(Position::new(0, 4, 4), Position::new(1, 2, 12));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert_eq!(outer.merge(inner), outer);
    }

    #[test]
    fn position_display_is_report_friendly() {
        let at = Position::new(14, 9, 120);
        assert_eq!(at.to_string(), "line 14, col 9");
    }
}
