//! construe: pluggable lexing and construct recognition for multiple
//! languages, producing one language-agnostic structural tree.
//!
//! The pipeline is registry -> lexer -> recognizer, glued by the engine
//! facade. A language is a [`Grammar`] data value, not code: keywords,
//! string and comment forms, operators, block style, and an ordered table of
//! construct patterns. One polymorphic lexer and one polymorphic recognizer
//! consume whichever grammar the registry resolves.
//!
//! Nothing here fails fatally. Malformed input, unterminated blocks, even an
//! unknown language id all come back as position-tagged [`Diagnostic`]s next
//! to a best-effort tree.
//!
//! ```
//! let result = construe::parse("if (x) { go(); }", "typescript");
//! assert!(result.diagnostics.is_empty());
//! ```

pub mod diagnostics;
pub mod engine;
pub mod grammar;
pub mod lexer;
pub mod recognizer;
pub mod registry;
pub mod syntax;
pub mod tree;

pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Rendered, Severity};
pub use engine::{parse, Engine, ParseResult};
pub use grammar::{
    BlockStyle, CommentForm, ConstructKind, Grammar, Matcher, PatternRule, StringForm,
};
pub use lexer::tokenize;
pub use recognizer::recognize;
pub use registry::{build_default_registry, default_registry, GrammarRegistry};
pub use syntax::{Position, Span, Token, TokenKind};
pub use tree::{Branch, ConstructNode, TypeKind};
