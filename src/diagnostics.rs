//! Position-tagged, non-fatal diagnostics.
//!
//! Every failure mode in the engine is a designed state transition: the stage
//! that detects a problem pushes a [`Diagnostic`] into a [`DiagnosticSink`]
//! and continues. There is no fatal error anywhere in the core; callers decide
//! whether any severity should halt a larger pipeline.
//!
//! For user-facing output, [`Rendered`] adapts a diagnostic plus its source
//! text into a `miette` report with a labelled span.

use std::fmt;
use std::sync::Arc;

use miette::{LabeledSpan, NamedSource, SourceCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::syntax::Position;

/// How bad it is. Errors mean the tree around the site is best-effort;
/// warnings mean the input was odd but fully recovered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// The engine's complete failure taxonomy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DiagnosticKind {
    /// No grammar is registered for the requested language id.
    #[error("unsupported language")]
    UnsupportedLanguage,
    /// Unterminated string or comment, or an unrecognized character.
    #[error("lexical error")]
    LexError,
    /// Malformed construct header, unterminated block, stray closer.
    #[error("structural error")]
    StructuralError,
}

/// One position-tagged report. Plain data; ordering is by source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub at: Position,
}

impl Diagnostic {
    /// The external reporting form, e.g.
    /// `line 14, col 9: unterminated string literal`.
    pub fn render(&self) -> String {
        format!("{}: {}", self.at, self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.render())
    }
}

/// Accumulates diagnostics for one parse call.
///
/// The lexer and recognizer each run a single left-to-right pass, so pushes
/// arrive nearly ordered; [`DiagnosticSink::into_sorted`] makes the ordering
/// by position a guarantee rather than an accident.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    items: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, kind: DiagnosticKind, message: impl Into<String>, at: Position) {
        self.items.push(Diagnostic {
            severity: Severity::Error,
            kind,
            message: message.into(),
            at,
        });
    }

    pub fn warning(&mut self, kind: DiagnosticKind, message: impl Into<String>, at: Position) {
        self.items.push(Diagnostic {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            at,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Finishes the sink, yielding diagnostics ordered by source position.
    /// The sort is stable so same-position reports keep emission order.
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.items.sort_by_key(|d| d.at.offset);
        self.items
    }
}

/// A diagnostic bound to its source text, renderable through `miette`.
///
/// The text field is deliberately not named `source`: thiserror would treat
/// it as the error's cause, and `NamedSource` is not an error type.
#[derive(Debug, Error)]
#[error("{}", .diagnostic.message)]
pub struct Rendered {
    diagnostic: Diagnostic,
    src: Arc<NamedSource<String>>,
}

impl Rendered {
    pub fn new(diagnostic: Diagnostic, name: impl AsRef<str>, text: impl Into<String>) -> Self {
        Self {
            diagnostic,
            src: Arc::new(NamedSource::new(name.as_ref(), text.into())),
        }
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }
}

impl miette::Diagnostic for Rendered {
    fn severity(&self) -> Option<miette::Severity> {
        match self.diagnostic.severity {
            Severity::Error => Some(miette::Severity::Error),
            Severity::Warning => Some(miette::Severity::Warning),
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(self.src.as_ref())
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new(
            Some(self.diagnostic.kind.to_string()),
            self.diagnostic.at.offset,
            1,
        );
        Some(Box::new(std::iter::once(label)))
    }
}

#[cfg(test)]
mod diagnostics_tests {
    use super::*;
    use miette::Report;

    #[test]
    fn sink_orders_by_position() {
        let mut sink = DiagnosticSink::new();
        sink.error(
            DiagnosticKind::StructuralError,
            "unterminated block",
            Position::new(3, 0, 30),
        );
        sink.warning(
            DiagnosticKind::LexError,
            "unrecognized character",
            Position::new(0, 5, 5),
        );
        let items = sink.into_sorted();
        assert_eq!(items[0].at.offset, 5);
        assert_eq!(items[1].at.offset, 30);
    }

    #[test]
    fn render_matches_reporting_contract() {
        let d = Diagnostic {
            severity: Severity::Error,
            kind: DiagnosticKind::LexError,
            message: "unterminated string literal".into(),
            at: Position::new(14, 9, 120),
        };
        assert_eq!(d.render(), "line 14, col 9: unterminated string literal");
    }

    #[test]
    fn rendered_source_text_is_not_an_error_cause() {
        use std::error::Error as _;
        let d = Diagnostic {
            severity: Severity::Warning,
            kind: DiagnosticKind::LexError,
            message: "unrecognized character '¶'".into(),
            at: Position::new(0, 0, 0),
        };
        let rendered = Rendered::new(d, "input.rb", "¶ puts 1".to_string());
        // The bound source text renders the span label; it must not show up
        // as a chained cause.
        assert!(rendered.source().is_none());
        assert_eq!(rendered.to_string(), "unrecognized character '¶'");
    }

    #[test]
    fn rendered_report_carries_label_and_source() {
        let d = Diagnostic {
            severity: Severity::Error,
            kind: DiagnosticKind::LexError,
            message: "unterminated string literal".into(),
            at: Position::new(0, 4, 4),
        };
        let report = Report::new(Rendered::new(d, "input.ts", "x = \"abc".to_string()));
        let output = format!("{report:?}");
        assert!(output.contains("unterminated string literal"));
        assert!(output.contains("input.ts"));
    }
}
