//! Grammar-driven lexer.
//!
//! One left-to-right scan over the input, trying rules in fixed priority
//! order: newline/whitespace, comments, strings (with interpolation
//! segments), numbers, identifiers/keywords, operators, punctuation. A
//! character nothing claims becomes an `Unknown` token plus a warning — the
//! lexer always advances, so it terminates on any input, however malformed.
//!
//! Interpolated strings are emitted as alternating `Str`/`Interpolation`
//! segment tokens that tile the literal exactly. Interpolation spans are
//! scanned with balanced-delimiter tracking and bounded recursive re-entry
//! into string scanning, so a quote nested inside `${...}` cannot fake the
//! closing delimiter.

use std::collections::VecDeque;

use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::grammar::{CommentForm, Grammar, StringForm};
use crate::syntax::{Position, Span, Token, TokenKind};

/// Bound on nested string re-entry while scanning interpolation spans.
/// Past this depth the scan stays delimiter-balanced but string-blind.
const MAX_INTERPOLATION_DEPTH: usize = 16;

/// Single characters that lex as punctuation when no operator rule claims
/// them. Everything else unclaimed becomes `Unknown`.
const PUNCT_CHARS: &str = "(){}[],;.:";

/// Eagerly tokenizes `text` under `grammar`, pushing lexical diagnostics
/// into `sink`. The returned tokens tile the input exactly and finish with a
/// zero-width `Eof` token.
pub fn tokenize<'src>(
    text: &'src str,
    grammar: &Grammar,
    sink: &mut DiagnosticSink,
) -> Vec<Token<'src>> {
    Lexer::new(text, grammar, sink).collect()
}

/// Restartable token iterator over one input. Construction is cheap; a fresh
/// `Lexer` re-scans from the start, and no cursor is shared across instances.
pub struct Lexer<'src, 'g, 's> {
    text: &'src str,
    grammar: &'g Grammar,
    sink: &'s mut DiagnosticSink,
    pos: Position,
    pending: VecDeque<Token<'src>>,
    eof_emitted: bool,
}

impl<'src, 'g, 's> Iterator for Lexer<'src, 'g, 's> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Token<'src>> {
        if let Some(tok) = self.pending.pop_front() {
            return Some(tok);
        }
        if self.at_end() {
            if self.eof_emitted {
                return None;
            }
            self.eof_emitted = true;
            return Some(self.token(TokenKind::Eof, self.pos));
        }
        Some(self.scan_token())
    }
}

impl<'src, 'g, 's> Lexer<'src, 'g, 's> {
    pub fn new(text: &'src str, grammar: &'g Grammar, sink: &'s mut DiagnosticSink) -> Self {
        Self {
            text,
            grammar,
            sink,
            pos: Position::default(),
            pending: VecDeque::new(),
            eof_emitted: false,
        }
    }

    // ------------------------------------------------------------------
    // Cursor primitives
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos.offset >= self.text.len()
    }

    fn rest(&self) -> &'src str {
        &self.text[self.pos.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, chars_ahead: usize) -> Option<char> {
        self.rest().chars().nth(chars_ahead)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Consumes one character, maintaining line/column/offset.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos.offset += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 0;
        } else {
            self.pos.column += 1;
        }
        Some(c)
    }

    /// Consumes exactly the characters of `s`, which must be present.
    fn bump_str(&mut self, s: &str) {
        for _ in s.chars() {
            self.bump();
        }
    }

    /// Builds a token from `start` to the current cursor.
    fn token(&self, kind: TokenKind, start: Position) -> Token<'src> {
        Token {
            kind,
            text: &self.text[start.offset..self.pos.offset],
            span: Span::new(start, self.pos),
        }
    }

    // ------------------------------------------------------------------
    // Rule dispatch
    // ------------------------------------------------------------------

    fn scan_token(&mut self) -> Token<'src> {
        let start = self.pos;

        // 1. Newlines and horizontal whitespace.
        if self.starts_with("\r\n") {
            self.bump_str("\r\n");
            return self.token(TokenKind::Newline, start);
        }
        let c = self.peek().unwrap_or('\0');
        if c == '\n' {
            self.bump();
            return self.token(TokenKind::Newline, start);
        }
        if c == ' ' || c == '\t' || c == '\r' {
            while matches!(self.peek(), Some(' ' | '\t'))
                || (self.peek() == Some('\r') && !self.starts_with("\r\n"))
            {
                self.bump();
            }
            return self.token(TokenKind::Whitespace, start);
        }

        // 2. Comments.
        if let Some(tok) = self.scan_comment(start) {
            return tok;
        }

        // 3. Strings, longest opener first.
        for i in 0..self.grammar.string_forms.len() {
            if self.starts_with(&self.grammar.string_forms[i].open) {
                let form = self.grammar.string_forms[i].clone();
                return self.scan_string(&form, start);
            }
        }

        // 4. Numbers.
        if c.is_ascii_digit() {
            return self.scan_number(start);
        }

        // 5. Identifiers and keywords (with grammar sigils).
        if is_ident_start(c) {
            return self.scan_ident(start, false);
        }
        if self.grammar.ident_sigils.contains(&c)
            && self.peek_at(1).is_some_and(is_ident_start)
        {
            self.bump();
            return self.scan_ident(start, true);
        }

        // 6. Operators, longest match first.
        for i in 0..self.grammar.operators.len() {
            if self.starts_with(&self.grammar.operators[i]) {
                let op = self.grammar.operators[i].clone();
                self.bump_str(&op);
                return self.token(TokenKind::Operator, start);
            }
        }

        // 7. Punctuation.
        if PUNCT_CHARS.contains(c) {
            self.bump();
            return self.token(TokenKind::Punct, start);
        }

        // 8. Unknown: warn and advance exactly one character.
        self.bump();
        self.sink.warning(
            DiagnosticKind::LexError,
            format!("unrecognized character '{}'", c),
            start,
        );
        self.token(TokenKind::Unknown, start)
    }

    fn scan_comment(&mut self, start: Position) -> Option<Token<'src>> {
        for i in 0..self.grammar.comment_forms.len() {
            match self.grammar.comment_forms[i].clone() {
                CommentForm::Line(marker) => {
                    if self.starts_with(&marker) {
                        self.bump_str(&marker);
                        while !self.at_end() && self.peek() != Some('\n') {
                            self.bump();
                        }
                        return Some(self.token(TokenKind::Comment, start));
                    }
                }
                CommentForm::Block { open, close } => {
                    if self.starts_with(&open) {
                        self.bump_str(&open);
                        loop {
                            if self.starts_with(&close) {
                                self.bump_str(&close);
                                break;
                            }
                            if self.bump().is_none() {
                                self.sink.error(
                                    DiagnosticKind::LexError,
                                    "unterminated block comment",
                                    start,
                                );
                                break;
                            }
                        }
                        return Some(self.token(TokenKind::Comment, start));
                    }
                }
            }
        }
        None
    }

    fn scan_number(&mut self, start: Position) -> Token<'src> {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            self.bump();
        }
        // A fraction only when the dot is followed by a digit; `1..3` keeps
        // its range operator intact.
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exp_digit_at = if matches!(self.peek_at(1), Some('+' | '-')) {
                2
            } else {
                1
            };
            if self.peek_at(exp_digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..exp_digit_at {
                    self.bump();
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        self.token(TokenKind::Number, start)
    }

    fn scan_ident(&mut self, start: Position, sigiled: bool) -> Token<'src> {
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        let text = &self.text[start.offset..self.pos.offset];
        // Sigiled names ($x, @x) are never keywords.
        let kind = if !sigiled && self.grammar.is_keyword(text) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.token(kind, start)
    }

    // ------------------------------------------------------------------
    // Strings and interpolation
    // ------------------------------------------------------------------

    /// Scans one string literal, queueing all of its segment tokens and
    /// returning the first. Segments tile the literal: `Str` for text runs
    /// (delimiters included) and `Interpolation` for embedded expressions.
    fn scan_string(&mut self, form: &StringForm, start: Position) -> Token<'src> {
        let mut segments: Vec<Token<'src>> = Vec::new();
        let mut seg_start = start;
        self.bump_str(&form.open);

        loop {
            if self.at_end() {
                self.sink.error(
                    DiagnosticKind::LexError,
                    "unterminated string literal",
                    start,
                );
                if self.pos.offset > seg_start.offset {
                    segments.push(self.token(TokenKind::Str, seg_start));
                }
                break;
            }

            // Interpolation first: in Swift the `\(` marker would otherwise
            // be eaten by the escape rule.
            if let Some(interp) = &form.interpolation {
                if self.starts_with(&interp.open) {
                    if self.pos.offset > seg_start.offset {
                        segments.push(self.token(TokenKind::Str, seg_start));
                    }
                    let interp = interp.clone();
                    let tok = self.scan_interpolation(&interp.open, &interp.close);
                    segments.push(tok);
                    seg_start = self.pos;
                    continue;
                }
            }

            if let Some(esc) = form.escape {
                if self.peek() == Some(esc) && self.peek_at(1).is_some() {
                    self.bump();
                    self.bump();
                    continue;
                }
            }

            if self.starts_with(&form.close) {
                self.bump_str(&form.close);
                segments.push(self.token(TokenKind::Str, seg_start));
                break;
            }

            self.bump();
        }

        let first = segments.remove(0);
        self.pending.extend(segments);
        first
    }

    /// Consumes one `open ... close` interpolation span as a single token,
    /// balancing nested delimiters and skipping over nested string literals.
    fn scan_interpolation(&mut self, open: &str, close: &str) -> Token<'src> {
        let start = self.pos;
        self.bump_str(open);
        // `${` nests on bare `{`, `\(` on bare `(`.
        let nested_open = matching_opener(close);
        let mut depth: usize = 1;

        while !self.at_end() {
            if self.starts_with(close) {
                depth -= 1;
                self.bump_str(close);
                if depth == 0 {
                    return self.token(TokenKind::Interpolation, start);
                }
                continue;
            }
            if let Some(nested) = nested_open {
                if self.starts_with(nested) {
                    depth += 1;
                    self.bump_str(nested);
                    continue;
                }
            }
            if self.skip_nested_string(1) {
                continue;
            }
            self.bump();
        }

        self.sink.error(
            DiagnosticKind::LexError,
            "unterminated interpolation",
            start,
        );
        self.token(TokenKind::Interpolation, start)
    }

    /// If the cursor sits on a string opener, consumes the whole nested
    /// literal without emitting tokens. Returns whether anything was
    /// consumed. Recursion is bounded; past the bound nested interpolations
    /// are crossed delimiter-blind, which still terminates.
    fn skip_nested_string(&mut self, depth: usize) -> bool {
        let form = match self
            .grammar
            .string_forms
            .iter()
            .find(|f| self.starts_with(&f.open))
        {
            Some(f) => f.clone(),
            None => return false,
        };
        self.bump_str(&form.open);
        while !self.at_end() {
            if depth < MAX_INTERPOLATION_DEPTH {
                if let Some(interp) = &form.interpolation {
                    if self.starts_with(&interp.open) {
                        self.skip_balanced(&interp.open, &interp.close, depth + 1);
                        continue;
                    }
                }
            }
            if let Some(esc) = form.escape {
                if self.peek() == Some(esc) && self.peek_at(1).is_some() {
                    self.bump();
                    self.bump();
                    continue;
                }
            }
            if self.starts_with(&form.close) {
                self.bump_str(&form.close);
                break;
            }
            self.bump();
        }
        true
    }

    /// Consumes a balanced `open ... close` region inside a nested string,
    /// re-entering string skipping below the depth bound.
    fn skip_balanced(&mut self, open: &str, close: &str, depth: usize) {
        self.bump_str(open);
        let nested_open = matching_opener(close);
        let mut level: usize = 1;
        while !self.at_end() && level > 0 {
            if self.starts_with(close) {
                level -= 1;
                self.bump_str(close);
                continue;
            }
            if let Some(nested) = nested_open {
                if self.starts_with(nested) {
                    level += 1;
                    self.bump_str(nested);
                    continue;
                }
            }
            if depth < MAX_INTERPOLATION_DEPTH && self.skip_nested_string(depth + 1) {
                continue;
            }
            self.bump();
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The bare opener that deepens nesting for a given interpolation closer.
fn matching_opener(close: &str) -> Option<&'static str> {
    match close {
        "}" => Some("{"),
        ")" => Some("("),
        "]" => Some("["),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::builtin;

    fn lex<'a>(text: &'a str, grammar: &Grammar) -> (Vec<Token<'a>>, Vec<crate::Diagnostic>) {
        let mut sink = DiagnosticSink::new();
        let tokens = tokenize(text, grammar, &mut sink);
        (tokens, sink.into_sorted())
    }

    #[test]
    fn tokens_tile_the_input() {
        let grammar = builtin::typescript();
        let text = "function greet(user: User): string {\n  return `Hi, ${user.name}!`;\n}\n";
        let (tokens, diags) = lex(text, &grammar);
        let rebuilt: String = tokens.iter().map(|t| t.text).collect();
        assert_eq!(rebuilt, text);
        assert!(diags.is_empty());
    }

    #[test]
    fn offsets_strictly_increase() {
        let grammar = builtin::ruby();
        let text = "while i < 5\n  puts \"n: #{i}\"\nend\n";
        let (tokens, _) = lex(text, &grammar);
        for pair in tokens.windows(2) {
            assert!(pair[0].span.start.offset < pair[1].span.start.offset || pair[1].kind == TokenKind::Eof);
            assert_eq!(pair[0].span.end.offset, pair[1].span.start.offset);
        }
    }

    #[test]
    fn template_literal_splits_into_segments() {
        let grammar = builtin::typescript();
        let (tokens, diags) = lex("`Hello, ${user.name}!`", &grammar);
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Str,
                TokenKind::Interpolation,
                TokenKind::Str,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[1].text, "${user.name}");
        assert!(diags.is_empty());
    }

    #[test]
    fn swift_interpolation_marker_beats_escape_rule() {
        let grammar = builtin::swift();
        let (tokens, diags) = lex(r#""\(firstName) \(lastName)""#, &grammar);
        let interp: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Interpolation)
            .map(|t| t.text)
            .collect();
        assert_eq!(interp, vec![r"\(firstName)", r"\(lastName)"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn nested_quote_inside_interpolation_does_not_close() {
        let grammar = builtin::typescript();
        let (tokens, diags) = lex(r#"`a ${fn("}")} b`"#, &grammar);
        assert!(diags.is_empty());
        let rebuilt: String = tokens.iter().map(|t| t.text).collect();
        assert_eq!(rebuilt, r#"`a ${fn("}")} b`"#);
        assert_eq!(
            tokens.iter().filter(|t| t.kind == TokenKind::Interpolation).count(),
            1
        );
    }

    #[test]
    fn unterminated_string_spans_to_end_of_input() {
        let grammar = builtin::typescript();
        let (tokens, diags) = lex("x = \"abc", &grammar);
        let last = &tokens[tokens.len() - 2];
        assert_eq!(last.kind, TokenKind::Str);
        assert_eq!(last.text, "\"abc");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::LexError);
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let grammar = builtin::csharp();
        let (tokens, diags) = lex("/* never closed", &grammar);
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].text, "/* never closed");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, crate::Severity::Error);
    }

    #[test]
    fn unrecognized_character_warns_and_advances() {
        let grammar = builtin::ruby();
        let (tokens, diags) = lex("x = 1 ¶ y", &grammar);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Unknown));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, crate::Severity::Warning);
        let rebuilt: String = tokens.iter().map(|t| t.text).collect();
        assert_eq!(rebuilt, "x = 1 ¶ y");
    }

    #[test]
    fn ruby_range_keeps_dots_out_of_the_number() {
        let grammar = builtin::ruby();
        let (tokens, _) = lex("for j in 1..3", &grammar);
        let texts: Vec<&str> = tokens
            .iter()
            .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof)
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["for", "j", "in", "1", "..", "3"]);
    }

    #[test]
    fn sigiled_identifiers_are_single_tokens() {
        let grammar = builtin::php();
        let (tokens, _) = lex("$this->names", &grammar);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "$this");
    }

    #[test]
    fn csharp_interpolated_string_prefix_wins() {
        let grammar = builtin::csharp();
        let (tokens, diags) = lex(r#"$"{numbers[i]} is even.""#, &grammar);
        assert!(diags.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert!(tokens[0].text.starts_with("$\""));
        assert_eq!(tokens[1].kind, TokenKind::Interpolation);
        assert_eq!(tokens[1].text, "{numbers[i]}");
    }

    #[test]
    fn restart_rescans_from_the_start() {
        let grammar = builtin::typescript();
        let mut sink_a = DiagnosticSink::new();
        let mut sink_b = DiagnosticSink::new();
        let a: Vec<_> = Lexer::new("let x = 1;", &grammar, &mut sink_a).collect();
        let b: Vec<_> = Lexer::new("let x = 1;", &grammar, &mut sink_b).collect();
        assert_eq!(a, b);
    }
}
