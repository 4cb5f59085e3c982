//! Engine facade: the one entry point tying registry, lexer, and recognizer
//! together.
//!
//! `parse` never fails. Every problem in the input, including an unknown
//! language id, comes back as a diagnostic next to a best-effort tree. The
//! engine holds no mutable state, so one engine (or the process-wide default
//! registry behind [`parse`]) serves any number of concurrent calls.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Rendered, Severity};
use crate::lexer::tokenize;
use crate::recognizer::recognize;
use crate::registry::{default_registry, GrammarRegistry};
use crate::syntax::Position;
use crate::tree::ConstructNode;

/// Everything one parse call produces: the structural tree and all
/// diagnostics, ordered by source position.
#[derive(Debug)]
pub struct ParseResult<'src> {
    pub root: ConstructNode<'src>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult<'_> {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Binds each diagnostic to the source text for `miette` reporting.
    pub fn reports(&self, name: &str, text: &str) -> Vec<Rendered> {
        self.diagnostics
            .iter()
            .map(|d| Rendered::new(d.clone(), name, text))
            .collect()
    }
}

/// Stateless facade over a grammar registry.
#[derive(Debug, Copy, Clone)]
pub struct Engine<'r> {
    registry: &'r GrammarRegistry,
}

impl Engine<'static> {
    /// An engine over the process-wide default registry.
    pub fn new() -> Self {
        Engine {
            registry: default_registry(),
        }
    }
}

impl Default for Engine<'static> {
    fn default() -> Self {
        Engine::new()
    }
}

impl<'r> Engine<'r> {
    /// An engine over a caller-built registry, e.g. one with extra grammars.
    pub fn with_registry(registry: &'r GrammarRegistry) -> Self {
        Engine { registry }
    }

    /// Parses `text` as `language_id` (an id or alias). An unknown id yields
    /// an empty module plus one `UnsupportedLanguage` error at the origin.
    pub fn parse<'src>(&self, text: &'src str, language_id: &str) -> ParseResult<'src> {
        let mut sink = DiagnosticSink::new();
        let Some(grammar) = self.registry.lookup(language_id) else {
            sink.error(
                DiagnosticKind::UnsupportedLanguage,
                format!("no grammar registered for '{language_id}'"),
                Position::default(),
            );
            return ParseResult {
                root: ConstructNode::empty_module(),
                diagnostics: sink.into_sorted(),
            };
        };
        let tokens = tokenize(text, &grammar, &mut sink);
        let root = recognize(&tokens, &grammar, &mut sink);
        ParseResult {
            root,
            diagnostics: sink.into_sorted(),
        }
    }

    /// Parses `text`, picking the grammar from the filename's extension.
    pub fn parse_file<'src>(&self, text: &'src str, filename: &str) -> ParseResult<'src> {
        let mut sink = DiagnosticSink::new();
        let Some(grammar) = self.registry.for_filename(filename) else {
            sink.error(
                DiagnosticKind::UnsupportedLanguage,
                format!("no grammar matches filename '{filename}'"),
                Position::default(),
            );
            return ParseResult {
                root: ConstructNode::empty_module(),
                diagnostics: sink.into_sorted(),
            };
        };
        let tokens = tokenize(text, &grammar, &mut sink);
        let root = recognize(&tokens, &grammar, &mut sink);
        ParseResult {
            root,
            diagnostics: sink.into_sorted(),
        }
    }
}

/// Parses with the default registry. The usual entry point.
pub fn parse<'src>(text: &'src str, language_id: &str) -> ParseResult<'src> {
    Engine::new().parse(text, language_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_yields_empty_module_and_one_error() {
        let result = parse("IDENTIFICATION DIVISION.", "cobol");
        assert_eq!(result.root, ConstructNode::empty_module());
        assert_eq!(result.diagnostics.len(), 1);
        let d = &result.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::UnsupportedLanguage);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.at, Position::default());
        assert!(result.has_errors());
    }

    #[test]
    fn alias_resolves_like_primary_id() {
        let by_alias = parse("let x = 1;", "ts");
        let by_id = parse("let x = 1;", "typescript");
        assert_eq!(by_alias.root, by_id.root);
        assert!(by_alias.diagnostics.is_empty());
    }

    #[test]
    fn unterminated_string_is_one_lex_error_with_a_tree() {
        let result = parse("x = \"abc", "typescript");
        assert_eq!(result.diagnostics.len(), 1);
        let d = &result.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::LexError);
        assert_eq!(d.at.offset, 4);
        // The malformed line still lands in the tree.
        let ConstructNode::Module { children, .. } = &result.root else {
            unreachable!();
        };
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn parse_file_uses_the_extension() {
        let result = Engine::new().parse_file("puts 1\n", "script.rb");
        assert!(result.diagnostics.is_empty());
        let unknown = Engine::new().parse_file("x", "notes.txt");
        assert_eq!(unknown.diagnostics[0].kind, DiagnosticKind::UnsupportedLanguage);
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "class A { void M(int x) { if (x) { y(); } } }";
        let first = parse(text, "csharp");
        let second = parse(text, "csharp");
        assert_eq!(first.root, second.root);
        assert_eq!(first.diagnostics, second.diagnostics);
    }

    #[test]
    fn reports_bind_source_for_rendering() {
        let result = parse("x = \"abc", "typescript");
        let reports = result.reports("input.ts", "x = \"abc");
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].diagnostic().render(),
            "line 0, col 4: unterminated string literal"
        );
    }
}
