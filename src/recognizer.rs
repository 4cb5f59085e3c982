//! Construct recognizer: recursive descent over the token stream.
//!
//! One polymorphic engine driven by the grammar's ordered pattern table. At
//! each statement start the leading modifier keywords are skipped, the first
//! matching pattern rule builds its construct, and anything that matches no
//! rule becomes a `Statement` leaf — never an error.
//!
//! Recovery is local everywhere: a malformed header gets a diagnostic, a
//! synthesized empty piece, and parsing continues; an unterminated block gets
//! one diagnostic at its opener and closes implicitly at end of input. The
//! recognizer always returns a tree.

use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::grammar::{BlockStyle, ConstructKind, Grammar};
use crate::syntax::{Position, Span, Token, TokenKind};
use crate::tree::{Branch, ConstructNode, TypeKind};

/// Builds the structural tree for one token stream. The lexer terminates its
/// stream with an `Eof` token; a caller-built slice without one gets a
/// synthetic `Eof` appended, so any stream parses. An empty stream yields an
/// empty module.
pub fn recognize<'src>(
    tokens: &[Token<'src>],
    grammar: &Grammar,
    sink: &mut DiagnosticSink,
) -> ConstructNode<'src> {
    let Some(last) = tokens.last() else {
        return ConstructNode::empty_module();
    };
    let end = last.end();
    let terminated;
    let tokens = if last.kind == TokenKind::Eof {
        tokens
    } else {
        let mut padded = tokens.to_vec();
        padded.push(Token {
            kind: TokenKind::Eof,
            text: "",
            span: Span::point(end),
        });
        terminated = padded;
        &terminated
    };
    let mut rec = Recognizer {
        tokens,
        grammar,
        sink,
        idx: 0,
        last_end: Position::default(),
    };
    let children = rec.parse_body(Ctx::Top);
    ConstructNode::Module {
        children,
        span: Span::new(Position::default(), end),
    }
}

/// What terminates the body currently being parsed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Ctx {
    Top,
    Brace,
    /// `EndKeyword` body; `chain` also stops at `else`/`elsif`-style
    /// keywords so conditional arms can hand control back.
    End { chain: bool },
}

struct Recognizer<'a, 'src, 'g, 's> {
    tokens: &'a [Token<'src>],
    grammar: &'g Grammar,
    sink: &'s mut DiagnosticSink,
    idx: usize,
    /// End of the most recently consumed token; node spans close here.
    last_end: Position,
}

impl<'a, 'src, 'g, 's> Recognizer<'a, 'src, 'g, 's> {
    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    /// First non-trivia index at or after `i`. Always valid: the stream
    /// terminates with `Eof`, which is not trivia.
    fn sig_index(&self, mut i: usize) -> usize {
        while self.tokens[i].kind.is_trivia() {
            i += 1;
        }
        i
    }

    /// Next significant token (possibly `Eof`), without consuming.
    fn peek(&self) -> Token<'src> {
        self.tokens[self.sig_index(self.idx)]
    }

    /// Next raw token, trivia included.
    fn peek_raw(&self) -> Token<'src> {
        self.tokens[self.idx.min(self.tokens.len() - 1)]
    }

    /// Consumes one raw token.
    fn bump(&mut self) -> Token<'src> {
        let tok = self.tokens[self.idx];
        if tok.kind != TokenKind::Eof {
            self.idx += 1;
        }
        self.last_end = tok.end();
        tok
    }

    /// Consumes up to and including the next significant token.
    fn bump_sig(&mut self) -> Token<'src> {
        self.idx = self.sig_index(self.idx);
        self.bump()
    }

    fn skip_trivia(&mut self) {
        self.idx = self.sig_index(self.idx);
    }

    /// First index at or after `i` that is neither whitespace nor a comment.
    /// Unlike [`sig_index`](Self::sig_index) this stops at a newline, for
    /// decisions that must not look past the end of the line.
    fn line_sig_index(&self, mut i: usize) -> usize {
        while matches!(
            self.tokens[i].kind,
            TokenKind::Whitespace | TokenKind::Comment
        ) {
            i += 1;
        }
        i
    }

    // ------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------

    fn stops_body(&self, ctx: Ctx, tok: Token<'src>) -> bool {
        match ctx {
            Ctx::Top => false,
            Ctx::Brace => tok.is_symbol("}"),
            Ctx::End { chain } => {
                tok.is_keyword(&self.grammar.end_keyword)
                    || (chain
                        && (tok.is_keyword("else")
                            || (tok.kind == TokenKind::Keyword
                                && self.grammar.is_elseif(tok.text))))
            }
        }
    }

    fn parse_body(&mut self, ctx: Ctx) -> Vec<ConstructNode<'src>> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            let tok = self.peek();
            if tok.kind == TokenKind::Eof || self.stops_body(ctx, tok) {
                break;
            }
            if let Some(node) = self.parse_item(ctx) {
                items.push(node);
            }
        }
        items
    }

    fn parse_item(&mut self, ctx: Ctx) -> Option<ConstructNode<'src>> {
        let first = self.peek();

        // A closer with nothing open: warn, consume, move on.
        if ctx == Ctx::Top && self.is_stray_closer(first) {
            self.sink.warning(
                DiagnosticKind::StructuralError,
                format!("unmatched '{}'", first.text),
                first.start(),
            );
            self.bump_sig();
            return None;
        }

        // Look past modifier keywords for the pattern lead.
        let mut p = self.sig_index(self.idx);
        while self.tokens[p].kind == TokenKind::Keyword
            && self.grammar.is_modifier(self.tokens[p].text)
        {
            p = self.sig_index(p + 1);
        }
        let lead = self.tokens[p];

        if lead.kind == TokenKind::Keyword {
            if let Some(rule) = self.grammar.pattern_for_keyword(lead.text) {
                let construct = rule.construct;
                self.idx = p;
                return Some(self.build(construct, first.start()));
            }
        }

        if self.grammar.has_callable_shape() {
            if let Some(name_idx) = self.find_callable_shape(p) {
                self.idx = p;
                return Some(self.build_callable(name_idx, first.start()));
            }
        }

        self.parse_statement()
    }

    fn is_stray_closer(&self, tok: Token<'src>) -> bool {
        match self.grammar.block_style {
            BlockStyle::Braces => tok.is_symbol("}"),
            BlockStyle::EndKeyword => tok.is_keyword(&self.grammar.end_keyword),
        }
    }

    fn build(&mut self, construct: ConstructKind, start: Position) -> ConstructNode<'src> {
        match construct {
            ConstructKind::Type(kind) => self.build_type(kind, start),
            ConstructKind::Function => self.build_function(start),
            ConstructKind::Conditional => self.build_conditional(start),
            ConstructKind::While => self.build_while(start),
            ConstructKind::For => self.build_for(start),
            ConstructKind::VarBinding => self.build_var_binding(start),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Collects one statement's significant tokens. Balanced `(...)`,
    /// `[...]`, and `{...}` groups are consumed whole, so an object literal
    /// spanning several lines stays a single statement. Ends at a newline or
    /// `;` at depth zero, at end of input, or (without consuming) at an
    /// unbalanced closer.
    fn gather_statement_tokens(&mut self) -> Vec<Token<'src>> {
        let mut out = Vec::new();
        let mut depth: usize = 0;
        loop {
            let tok = self.peek_raw();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Whitespace | TokenKind::Comment => {
                    self.bump();
                }
                TokenKind::Newline => {
                    self.bump();
                    if depth == 0 {
                        break;
                    }
                }
                _ => {
                    if tok.is_symbol("(") || tok.is_symbol("[") || tok.is_symbol("{") {
                        depth += 1;
                    } else if tok.is_symbol(")") || tok.is_symbol("]") || tok.is_symbol("}") {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                    let tok = self.bump();
                    out.push(tok);
                    if tok.is_symbol(";") && depth == 0 {
                        break;
                    }
                }
            }
        }
        out
    }

    fn parse_statement(&mut self) -> Option<ConstructNode<'src>> {
        let tokens = self.gather_statement_tokens();
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => {
                let span = Span::new(first.start(), last.end());
                Some(ConstructNode::Statement { tokens, span })
            }
            _ => {
                // Nothing gathered means the cursor sits on an unbalanced
                // closer; consume it so the parse always makes progress.
                let tok = self.bump_sig();
                if tok.kind != TokenKind::Eof {
                    self.sink.warning(
                        DiagnosticKind::StructuralError,
                        format!("unmatched '{}'", tok.text),
                        tok.start(),
                    );
                }
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Shared header/block helpers
    // ------------------------------------------------------------------

    /// Consumes a balanced `open ... close` group, returning the tokens
    /// strictly inside it. The cursor must sit on `open`.
    fn collect_group(&mut self, open: &str, close: &str) -> Vec<Token<'src>> {
        let opener = self.bump_sig();
        let mut depth: usize = 1;
        let mut out = Vec::new();
        loop {
            let tok = self.peek();
            if tok.kind == TokenKind::Eof {
                self.sink.error(
                    DiagnosticKind::StructuralError,
                    format!("unterminated '{}'", open),
                    opener.start(),
                );
                break;
            }
            if tok.is_symbol(open) {
                depth += 1;
            } else if tok.is_symbol(close) {
                depth -= 1;
                if depth == 0 {
                    self.bump_sig();
                    break;
                }
            }
            out.push(self.bump_sig());
        }
        out
    }

    /// Consumes the rest of the current line, through its newline.
    fn consume_header_rest(&mut self) {
        loop {
            let tok = self.peek_raw();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.bump();
                    break;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Gathers an `EndKeyword`-style header: significant tokens up to the
    /// end of the line or a terminator keyword (`then`, `do`), which is
    /// consumed but not collected.
    fn gather_line_header(&mut self) -> Vec<Token<'src>> {
        let mut out = Vec::new();
        loop {
            let tok = self.peek_raw();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.bump();
                    break;
                }
                TokenKind::Whitespace | TokenKind::Comment => {
                    self.bump();
                }
                TokenKind::Keyword if self.grammar.is_header_terminator(tok.text) => {
                    self.bump();
                    break;
                }
                _ => {
                    out.push(self.bump());
                }
            }
        }
        out
    }

    /// Gathers a brace-style construct header: a balanced parenthesized
    /// group if one follows, otherwise significant tokens up to the block
    /// opener or a statement boundary. A `{` at paren depth one means the
    /// closing `)` never came; the header ends there so the block still
    /// parses.
    fn gather_brace_header(&mut self) -> Vec<Token<'src>> {
        self.skip_trivia();
        if self.peek().is_symbol("(") {
            let opener = self.bump_sig();
            let mut depth: usize = 1;
            let mut out = Vec::new();
            loop {
                let tok = self.peek();
                if tok.kind == TokenKind::Eof {
                    self.sink.error(
                        DiagnosticKind::StructuralError,
                        "unterminated '('",
                        opener.start(),
                    );
                    break;
                }
                if tok.is_symbol("(") {
                    depth += 1;
                } else if tok.is_symbol(")") {
                    depth -= 1;
                    if depth == 0 {
                        self.bump_sig();
                        break;
                    }
                } else if tok.is_symbol("{") && depth == 1 {
                    self.sink.error(
                        DiagnosticKind::StructuralError,
                        "expected ')' to close header",
                        opener.start(),
                    );
                    break;
                }
                out.push(self.bump_sig());
            }
            return out;
        }
        let mut out = Vec::new();
        loop {
            let tok = self.peek();
            if tok.kind == TokenKind::Eof
                || tok.is_symbol("{")
                || tok.is_symbol(";")
                || tok.is_symbol("}")
            {
                break;
            }
            out.push(self.bump_sig());
        }
        out
    }

    /// Consumes remaining declaration-header tokens up to `{`, then the
    /// braced body and its closer. Used by type, function, and callable
    /// declarations, whose headers may carry base lists, return types, and
    /// an opener on the following line.
    fn finish_brace_block(
        &mut self,
        at: Position,
        what: &str,
    ) -> (Vec<ConstructNode<'src>>, Position) {
        loop {
            let tok = self.peek();
            if tok.is_symbol("{") {
                let opener = self.bump_sig();
                let body = self.parse_body(Ctx::Brace);
                if self.peek().is_symbol("}") {
                    let closer = self.bump_sig();
                    return (body, closer.end());
                }
                self.sink.error(
                    DiagnosticKind::StructuralError,
                    format!("unterminated {} body", what),
                    opener.start(),
                );
                return (body, self.last_end);
            }
            if tok.kind == TokenKind::Eof || tok.is_symbol(";") || tok.is_symbol("}") {
                self.sink.error(
                    DiagnosticKind::StructuralError,
                    format!("expected '{{' to open {} body", what),
                    at,
                );
                if tok.is_symbol(";") {
                    self.bump_sig();
                }
                return (Vec::new(), self.last_end);
            }
            self.bump_sig();
        }
    }

    /// Consumes the rest of the header line, then the `end`-delimited body
    /// and its closing keyword.
    fn finish_end_block(
        &mut self,
        at: Position,
        what: &str,
    ) -> (Vec<ConstructNode<'src>>, Position) {
        self.consume_header_rest();
        let body = self.parse_body(Ctx::End { chain: false });
        if self.peek().is_keyword(&self.grammar.end_keyword) {
            let closer = self.bump_sig();
            return (body, closer.end());
        }
        self.sink.error(
            DiagnosticKind::StructuralError,
            format!("unterminated {} body", what),
            at,
        );
        (body, self.last_end)
    }

    /// Parses one conditional/loop body in a brace grammar. Accepts a
    /// braced block (opener possibly on the next line) or, failing that, a
    /// single statement-level item as a braceless body. Returns the body
    /// and whether a chain may continue after it.
    fn parse_brace_body(&mut self, at: Position) -> (Vec<ConstructNode<'src>>, bool) {
        self.skip_trivia();
        let tok = self.peek();
        if tok.is_symbol("{") {
            let opener = self.bump_sig();
            let body = self.parse_body(Ctx::Brace);
            if self.peek().is_symbol("}") {
                self.bump_sig();
                return (body, true);
            }
            self.sink.error(
                DiagnosticKind::StructuralError,
                "unterminated block",
                opener.start(),
            );
            return (body, false);
        }
        if tok.kind == TokenKind::Eof || tok.is_symbol("}") {
            self.sink.error(
                DiagnosticKind::StructuralError,
                "expected a block or statement",
                at,
            );
            return (Vec::new(), false);
        }
        let body = self.parse_item(Ctx::Brace).into_iter().collect();
        (body, true)
    }

    // ------------------------------------------------------------------
    // Construct builders
    // ------------------------------------------------------------------

    fn expect_name(&mut self, after: Token<'src>) -> String {
        self.skip_trivia();
        let tok = self.peek();
        if tok.kind == TokenKind::Identifier {
            self.bump_sig();
            tok.text.to_string()
        } else {
            self.sink.error(
                DiagnosticKind::StructuralError,
                format!("expected a name after '{}'", after.text),
                after.start(),
            );
            String::new()
        }
    }

    fn build_type(&mut self, kind: TypeKind, start: Position) -> ConstructNode<'src> {
        let kw = self.bump_sig();
        let name = self.expect_name(kw);
        let (members, end) = match self.grammar.block_style {
            BlockStyle::Braces => self.finish_brace_block(kw.start(), kw.text),
            BlockStyle::EndKeyword => self.finish_end_block(kw.start(), kw.text),
        };
        ConstructNode::ClassDecl {
            kind,
            name,
            members,
            span: Span::new(start, end),
        }
    }

    fn build_function(&mut self, start: Position) -> ConstructNode<'src> {
        let kw = self.bump_sig();
        let name = self.expect_name(kw);
        let params = match self.grammar.block_style {
            BlockStyle::Braces => self.parse_brace_params(kw.start(), &name),
            BlockStyle::EndKeyword => {
                // Parens are optional here, and only count on the same line
                // as the name; the next line already belongs to the body.
                let p = self.line_sig_index(self.idx);
                if self.tokens[p].is_symbol("(") {
                    self.idx = p;
                    extract_param_names(&self.collect_group("(", ")"))
                } else {
                    Vec::new()
                }
            }
        };
        let (body, end) = match self.grammar.block_style {
            BlockStyle::Braces => self.finish_brace_block(kw.start(), kw.text),
            BlockStyle::EndKeyword => self.finish_end_block(kw.start(), kw.text),
        };
        ConstructNode::FunctionDecl {
            name,
            params,
            body,
            span: Span::new(start, end),
        }
    }

    /// Parameter list for a brace-style function header. Tolerates generic
    /// or type tokens between the name and the `(`; reports a missing list
    /// only when the block opener or a boundary arrives first.
    fn parse_brace_params(&mut self, at: Position, name: &str) -> Vec<String> {
        loop {
            let tok = self.peek();
            if tok.is_symbol("(") {
                return extract_param_names(&self.collect_group("(", ")"));
            }
            if tok.kind == TokenKind::Eof
                || tok.is_symbol("{")
                || tok.is_symbol(";")
                || tok.is_symbol("}")
            {
                self.sink.error(
                    DiagnosticKind::StructuralError,
                    format!("expected parameter list after '{}'", name),
                    at,
                );
                return Vec::new();
            }
            self.bump_sig();
        }
    }

    fn build_callable(&mut self, name_idx: usize, start: Position) -> ConstructNode<'src> {
        // Return-type tokens before the name are header noise; the node's
        // span still starts at the first modifier.
        self.idx = name_idx;
        let name_tok = self.bump_sig();
        let name = name_tok.text.to_string();
        self.skip_trivia();
        let params = extract_param_names(&self.collect_group("(", ")"));
        let (body, end) = self.finish_brace_block(name_tok.start(), "method");
        ConstructNode::FunctionDecl {
            name,
            params,
            body,
            span: Span::new(start, end),
        }
    }

    fn build_conditional(&mut self, start: Position) -> ConstructNode<'src> {
        match self.grammar.block_style {
            BlockStyle::Braces => self.build_conditional_braced(start),
            BlockStyle::EndKeyword => self.build_conditional_end(start),
        }
    }

    fn build_conditional_braced(&mut self, start: Position) -> ConstructNode<'src> {
        let mut branches: Vec<Branch<'src>> = Vec::new();
        loop {
            // `if`, or an `elseif`-style keyword continuing the chain.
            let kw = self.bump_sig();
            let condition = self.gather_brace_header();
            if condition.is_empty() {
                self.sink.error(
                    DiagnosticKind::StructuralError,
                    format!("missing condition after '{}'", kw.text),
                    kw.start(),
                );
            }
            let (body, may_chain) = self.parse_brace_body(kw.start());
            branches.push(Branch { condition, body });
            if !may_chain {
                break;
            }

            let next = self.peek();
            if next.kind == TokenKind::Keyword && self.grammar.is_elseif(next.text) {
                continue;
            }
            if next.is_keyword("else") {
                self.bump_sig();
                let after = self.peek();
                if after.is_keyword("if")
                    || (after.kind == TokenKind::Keyword && self.grammar.is_elseif(after.text))
                {
                    continue;
                }
                let (body, _) = self.parse_brace_body(next.start());
                branches.push(Branch {
                    condition: Vec::new(),
                    body,
                });
            }
            break;
        }
        ConstructNode::Conditional {
            branches,
            span: Span::new(start, self.last_end),
        }
    }

    fn build_conditional_end(&mut self, start: Position) -> ConstructNode<'src> {
        let kw = self.bump_sig();
        let mut condition = self.gather_line_header();
        if condition.is_empty() {
            self.sink.error(
                DiagnosticKind::StructuralError,
                format!("missing condition after '{}'", kw.text),
                kw.start(),
            );
        }
        let mut branches: Vec<Branch<'src>> = Vec::new();
        loop {
            let body = self.parse_body(Ctx::End { chain: true });
            branches.push(Branch { condition, body });

            // The push moved `condition` out; the `elsif` arm is the only
            // path back to the loop head and computes the next one.
            let next = self.peek();
            if next.kind == TokenKind::Keyword && self.grammar.is_elseif(next.text) {
                self.bump_sig();
                condition = self.gather_line_header();
                continue;
            }
            if next.is_keyword("else") {
                self.bump_sig();
                let body = self.parse_body(Ctx::End { chain: false });
                branches.push(Branch {
                    condition: Vec::new(),
                    body,
                });
            }
            break;
        }
        if self.peek().is_keyword(&self.grammar.end_keyword) {
            self.bump_sig();
        } else {
            self.sink.error(
                DiagnosticKind::StructuralError,
                "unterminated conditional",
                kw.start(),
            );
        }
        ConstructNode::Conditional {
            branches,
            span: Span::new(start, self.last_end),
        }
    }

    fn build_while(&mut self, start: Position) -> ConstructNode<'src> {
        let kw = self.bump_sig();
        let (condition, body, end) = match self.grammar.block_style {
            BlockStyle::Braces => {
                let condition = self.gather_brace_header();
                if condition.is_empty() {
                    self.sink.error(
                        DiagnosticKind::StructuralError,
                        format!("missing condition after '{}'", kw.text),
                        kw.start(),
                    );
                }
                let (body, _) = self.parse_brace_body(kw.start());
                (condition, body, self.last_end)
            }
            BlockStyle::EndKeyword => {
                let condition = self.gather_line_header();
                if condition.is_empty() {
                    self.sink.error(
                        DiagnosticKind::StructuralError,
                        format!("missing condition after '{}'", kw.text),
                        kw.start(),
                    );
                }
                let body = self.parse_body(Ctx::End { chain: false });
                let end = if self.peek().is_keyword(&self.grammar.end_keyword) {
                    self.bump_sig().end()
                } else {
                    self.sink.error(
                        DiagnosticKind::StructuralError,
                        "unterminated loop body",
                        kw.start(),
                    );
                    self.last_end
                };
                (condition, body, end)
            }
        };
        ConstructNode::WhileLoop {
            condition,
            body,
            span: Span::new(start, end),
        }
    }

    fn build_for(&mut self, start: Position) -> ConstructNode<'src> {
        let kw = self.bump_sig();
        let (header, body, end) = match self.grammar.block_style {
            BlockStyle::Braces => {
                let header = self.gather_brace_header();
                let (body, _) = self.parse_brace_body(kw.start());
                (header, body, self.last_end)
            }
            BlockStyle::EndKeyword => {
                let header = self.gather_line_header();
                let body = self.parse_body(Ctx::End { chain: false });
                let end = if self.peek().is_keyword(&self.grammar.end_keyword) {
                    self.bump_sig().end()
                } else {
                    self.sink.error(
                        DiagnosticKind::StructuralError,
                        "unterminated loop body",
                        kw.start(),
                    );
                    self.last_end
                };
                (header, body, end)
            }
        };
        ConstructNode::ForLoop {
            header,
            body,
            span: Span::new(start, end),
        }
    }

    fn build_var_binding(&mut self, start: Position) -> ConstructNode<'src> {
        let kw = self.bump_sig();
        let name = self.expect_name(kw);
        let rest = self.gather_statement_tokens();
        // Whatever follows a top-level `=` is the initializer; anything
        // before it is a type annotation.
        let mut init: Vec<Token<'src>> = Vec::new();
        let mut depth: usize = 0;
        let mut seen_eq = false;
        for tok in rest {
            if seen_eq {
                init.push(tok);
                continue;
            }
            if tok.is_symbol("(") || tok.is_symbol("[") || tok.is_symbol("{") {
                depth += 1;
            } else if tok.is_symbol(")") || tok.is_symbol("]") || tok.is_symbol("}") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && tok.is_symbol("=") {
                seen_eq = true;
            }
        }
        if init.last().is_some_and(|t| t.is_symbol(";")) {
            init.pop();
        }
        ConstructNode::VarBinding {
            name,
            init,
            span: Span::new(start, self.last_end),
        }
    }

    // ------------------------------------------------------------------
    // Callable shape lookahead
    // ------------------------------------------------------------------

    /// Looks for `name ( ... ) ... {` starting at significant index `p`
    /// (already past modifiers). Leading type tokens are allowed before the
    /// name; anything else rules the shape out. Pure lookahead, no
    /// consumption, no diagnostics.
    fn find_callable_shape(&self, mut p: usize) -> Option<usize> {
        loop {
            let tok = self.tokens[p];
            match tok.kind {
                TokenKind::Identifier => {
                    let q = self.sig_index(p + 1);
                    if self.tokens[q].is_symbol("(") {
                        return self.shape_has_block_after(q).then_some(p);
                    }
                    p = q;
                }
                TokenKind::Keyword => {
                    p = self.sig_index(p + 1);
                }
                _ if tok.is_symbol("[")
                    || tok.is_symbol("]")
                    || tok.is_symbol("<")
                    || tok.is_symbol(">")
                    || tok.is_symbol(",")
                    || tok.is_symbol(".") =>
                {
                    p = self.sig_index(p + 1);
                }
                _ => return None,
            }
        }
    }

    /// From the opening paren at `q`, checks that the balanced group is
    /// followed (possibly after a return-type annotation) by `{`.
    fn shape_has_block_after(&self, q: usize) -> bool {
        let mut depth: usize = 0;
        let mut i = q;
        loop {
            let tok = self.tokens[i];
            if tok.kind == TokenKind::Eof {
                return false;
            }
            if tok.is_symbol("(") {
                depth += 1;
            } else if tok.is_symbol(")") {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            i = self.sig_index(i + 1);
        }
        // Past the parameter list: allow return-type tokens, then require a
        // block opener before any statement boundary.
        let mut i = self.sig_index(i + 1);
        loop {
            let tok = self.tokens[i];
            if tok.is_symbol("{") {
                return true;
            }
            let allowed = matches!(tok.kind, TokenKind::Keyword | TokenKind::Identifier)
                || tok.is_symbol(":")
                || tok.is_symbol("->")
                || tok.is_symbol("[")
                || tok.is_symbol("]")
                || tok.is_symbol("<")
                || tok.is_symbol(">")
                || tok.is_symbol(",")
                || tok.is_symbol("?");
            if !allowed {
                return false;
            }
            i = self.sig_index(i + 1);
        }
    }
}

/// Parameter names from the tokens inside a parameter list: one name per
/// top-level comma group. Each group is cut at a default-value `=`; with a
/// `:` annotation the name is the last identifier before it, otherwise the
/// last identifier in the group (covers `user: User`, `string[] args`,
/// `$names`, and `firstName: String` alike).
fn extract_param_names(tokens: &[Token<'_>]) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth: usize = 0;
    let mut group: Vec<Token<'_>> = Vec::new();
    for &tok in tokens {
        if tok.is_symbol("(") || tok.is_symbol("[") || tok.is_symbol("{") {
            depth += 1;
        } else if tok.is_symbol(")") || tok.is_symbol("]") || tok.is_symbol("}") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && tok.is_symbol(",") {
            if let Some(name) = param_name_of(&group) {
                names.push(name);
            }
            group.clear();
            continue;
        }
        group.push(tok);
    }
    if let Some(name) = param_name_of(&group) {
        names.push(name);
    }
    names
}

fn param_name_of(group: &[Token<'_>]) -> Option<String> {
    let cut_eq = group
        .iter()
        .position(|t| t.is_symbol("="))
        .unwrap_or(group.len());
    let group = &group[..cut_eq];
    let cut_colon = group
        .iter()
        .position(|t| t.is_symbol(":"))
        .unwrap_or(group.len());
    group[..cut_colon]
        .iter()
        .rev()
        .find(|t| t.kind == TokenKind::Identifier)
        .map(|t| t.text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::builtin;
    use crate::lexer::tokenize;

    fn parse_with<'a>(
        text: &'a str,
        grammar: &Grammar,
    ) -> (ConstructNode<'a>, Vec<crate::Diagnostic>) {
        let mut sink = DiagnosticSink::new();
        let tokens = tokenize(text, grammar, &mut sink);
        let tree = recognize(&tokens, grammar, &mut sink);
        (tree, sink.into_sorted())
    }

    fn children<'t, 'a>(node: &'t ConstructNode<'a>) -> &'t [ConstructNode<'a>] {
        match node {
            ConstructNode::Module { children, .. } => children,
            ConstructNode::ClassDecl { members, .. } => members,
            ConstructNode::FunctionDecl { body, .. } => body,
            _ => panic!("node has no direct child list"),
        }
    }

    #[test]
    fn token_stream_without_trailing_eof_still_parses() {
        let grammar = builtin::typescript();
        let mut sink = DiagnosticSink::new();
        let tokens: Vec<_> = tokenize("let x = 1;", &grammar, &mut sink)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .collect();
        let tree = recognize(&tokens, &grammar, &mut sink);
        let items = children(&tree);
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], ConstructNode::VarBinding { .. }));
        // The module still closes at the last real token.
        assert_eq!(tree.span().end.offset, "let x = 1;".len());
    }

    #[test]
    fn nested_conditional_in_brace_grammar() {
        let grammar = builtin::typescript();
        let (tree, diags) = parse_with("if (x) { if (y) { z(); } }", &grammar);
        assert!(diags.is_empty());
        let top = &children(&tree)[0];
        let ConstructNode::Conditional { branches, .. } = top else {
            panic!("expected conditional, got {}", top.pretty());
        };
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].body.len(), 1);
        assert!(matches!(
            branches[0].body[0],
            ConstructNode::Conditional { .. }
        ));
    }

    #[test]
    fn keyword_delimited_while_loop() {
        let grammar = builtin::ruby();
        let text = "while i < 5\n  puts i\n  i += 1\nend";
        let (tree, diags) = parse_with(text, &grammar);
        assert!(diags.is_empty());
        let ConstructNode::WhileLoop {
            condition,
            body,
            span,
        } = &children(&tree)[0]
        else {
            panic!("expected while loop");
        };
        let cond: Vec<&str> = condition.iter().map(|t| t.text).collect();
        assert_eq!(cond, vec!["i", "<", "5"]);
        assert_eq!(body.len(), 2);
        assert!(body.iter().all(|n| matches!(n, ConstructNode::Statement { .. })));
        // Node closes immediately after the `end` keyword.
        assert_eq!(span.end.offset, text.len());
    }

    #[test]
    fn else_if_chain_folds_into_one_conditional() {
        let grammar = builtin::typescript();
        let text = "if (a) { x(); } else if (b) { y(); } else { z(); }";
        let (tree, diags) = parse_with(text, &grammar);
        assert!(diags.is_empty());
        let ConstructNode::Conditional { branches, .. } = &children(&tree)[0] else {
            panic!("expected conditional");
        };
        assert_eq!(branches.len(), 3);
        assert!(!branches[0].condition.is_empty());
        assert!(!branches[1].condition.is_empty());
        assert!(branches[2].condition.is_empty());
    }

    #[test]
    fn php_elseif_continues_the_chain() {
        let grammar = builtin::php();
        let text = "if ($a) { x(); } elseif ($b) { y(); } else { z(); }";
        let (tree, diags) = parse_with(text, &grammar);
        assert!(diags.is_empty());
        let ConstructNode::Conditional { branches, .. } = &children(&tree)[0] else {
            panic!("expected conditional");
        };
        assert_eq!(branches.len(), 3);
    }

    #[test]
    fn ruby_elsif_and_else_fold() {
        let grammar = builtin::ruby();
        let text = "if a\n  x\nelsif b\n  y\nelse\n  z\nend";
        let (tree, diags) = parse_with(text, &grammar);
        assert!(diags.is_empty());
        let ConstructNode::Conditional { branches, .. } = &children(&tree)[0] else {
            panic!("expected conditional");
        };
        assert_eq!(branches.len(), 3);
        assert!(branches[2].condition.is_empty());
    }

    #[test]
    fn csharp_method_is_recognized_by_shape() {
        let grammar = builtin::csharp();
        let text = "class Program\n{\n    static void Main(string[] args)\n    {\n        int i = 0;\n    }\n}";
        let (tree, diags) = parse_with(text, &grammar);
        assert!(diags.is_empty());
        let class = &children(&tree)[0];
        let ConstructNode::ClassDecl { name, members, .. } = class else {
            panic!("expected class");
        };
        assert_eq!(name, "Program");
        let ConstructNode::FunctionDecl { name, params, body, .. } = &members[0] else {
            panic!("expected method, got {}", class.pretty());
        };
        assert_eq!(name, "Main");
        assert_eq!(params, &vec!["args".to_string()]);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn nested_classes_stay_nested() {
        let grammar = builtin::csharp();
        let text = "namespace N { class Outer { class Inner { } } }";
        let (tree, diags) = parse_with(text, &grammar);
        assert!(diags.is_empty());
        let ns = &children(&tree)[0];
        let ConstructNode::ClassDecl { kind, members, .. } = ns else {
            panic!("expected namespace");
        };
        assert_eq!(*kind, TypeKind::Namespace);
        let ConstructNode::ClassDecl { name, members, .. } = &members[0] else {
            panic!("expected outer class");
        };
        assert_eq!(name, "Outer");
        assert!(matches!(&members[0], ConstructNode::ClassDecl { name, .. } if name == "Inner"));
    }

    #[test]
    fn malformed_if_header_recovers_into_body() {
        let grammar = builtin::typescript();
        let (tree, diags) = parse_with("if { z(); }", &grammar);
        let ConstructNode::Conditional { branches, .. } = &children(&tree)[0] else {
            panic!("expected conditional");
        };
        assert!(branches[0].condition.is_empty());
        assert_eq!(branches[0].body.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::StructuralError);
        assert_eq!(diags[0].at, Position::new(0, 0, 0));
    }

    #[test]
    fn unterminated_block_closes_at_end_of_input() {
        let grammar = builtin::typescript();
        let (tree, diags) = parse_with("while (x) { a();", &grammar);
        let ConstructNode::WhileLoop { body, .. } = &children(&tree)[0] else {
            panic!("expected while loop");
        };
        assert_eq!(body.len(), 1);
        assert_eq!(diags.len(), 1);
        // Reported at the block opener.
        assert_eq!(diags[0].at.offset, 10);
    }

    #[test]
    fn stray_closer_warns_and_parse_continues() {
        let grammar = builtin::typescript();
        let (tree, diags) = parse_with("}\nlet x = 1;", &grammar);
        assert_eq!(children(&tree).len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, crate::Severity::Warning);
    }

    #[test]
    fn var_binding_splits_annotation_from_initializer() {
        let grammar = builtin::typescript();
        let (tree, diags) = parse_with("const user: User = {\n  id: 1,\n};", &grammar);
        assert!(diags.is_empty());
        let ConstructNode::VarBinding { name, init, .. } = &children(&tree)[0] else {
            panic!("expected binding");
        };
        assert_eq!(name, "user");
        assert!(init.first().unwrap().is_symbol("{"));
        assert!(init.last().unwrap().is_symbol("}"));
    }

    #[test]
    fn swift_binding_without_initializer() {
        let grammar = builtin::swift();
        let (tree, diags) = parse_with("var firstName: String\n", &grammar);
        assert!(diags.is_empty());
        let ConstructNode::VarBinding { name, init, .. } = &children(&tree)[0] else {
            panic!("expected binding");
        };
        assert_eq!(name, "firstName");
        assert!(init.is_empty());
    }

    #[test]
    fn swift_init_is_a_method_by_shape() {
        let grammar = builtin::swift();
        let text = "class Person {\n    init(firstName: String, age: Int) {\n        self.firstName = firstName\n    }\n}";
        let (tree, diags) = parse_with(text, &grammar);
        assert!(diags.is_empty());
        let ConstructNode::ClassDecl { members, .. } = &children(&tree)[0] else {
            panic!("expected class");
        };
        let ConstructNode::FunctionDecl { name, params, .. } = &members[0] else {
            panic!("expected init method");
        };
        assert_eq!(name, "init");
        assert_eq!(params, &vec!["firstName".to_string(), "age".to_string()]);
    }

    #[test]
    fn plain_lines_become_statement_leaves() {
        let grammar = builtin::php();
        let text = "$greeter = new Greeter($names);\n$greeter->greetAll();\n";
        let (tree, diags) = parse_with(text, &grammar);
        assert!(diags.is_empty());
        let items = children(&tree);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|n| matches!(n, ConstructNode::Statement { .. })));
    }

    #[test]
    fn span_containment_holds_for_fixture_input() {
        let grammar = builtin::csharp();
        let text = "namespace N\n{\n    class P\n    {\n        static void M(string[] a)\n        {\n            while (i < n)\n            {\n                if (x) { y(); } else { z(); }\n            }\n        }\n    }\n}";
        let (tree, diags) = parse_with(text, &grammar);
        assert!(diags.is_empty());
        check_containment(&tree);
    }

    fn check_containment(node: &ConstructNode<'_>) {
        for child in node.children() {
            assert!(
                node.span().contains(&child.span()),
                "child {:?} escapes parent {:?}",
                child.span(),
                node.span()
            );
            check_containment(child);
        }
    }
}
