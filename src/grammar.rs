//! Grammar descriptors: the per-language rule tables driving the engine.
//!
//! Rather than one parser subclass per language, each language is data — an
//! immutable [`Grammar`] value holding its keyword set, string and comment
//! forms, operator table, block delimiting style, and ordered construct
//! patterns. The lexer and recognizer are single polymorphic engines driven
//! by that data.
//!
//! Grammar Invariant: a `Grammar` is a read-only snapshot for the duration of
//! every parse that uses it. Grammars are registered during single-threaded
//! setup and shared by reference afterwards; nothing in the engine mutates
//! one. See registry.rs for enforcement.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::tree::TypeKind;

pub mod builtin;

/// How a string literal is delimited, escaped, and (optionally) interpolated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringForm {
    /// Opening delimiter; multi-character openers (C# `$"`) are matched
    /// longest-first.
    pub open: String,
    pub close: String,
    /// Escape introducer valid inside the literal, usually `\`.
    pub escape: Option<char>,
    pub interpolation: Option<Interpolation>,
}

impl StringForm {
    pub fn plain(open: &str, close: &str) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
            escape: Some('\\'),
            interpolation: None,
        }
    }

    pub fn interpolated(open: &str, close: &str, interp_open: &str, interp_close: &str) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
            escape: Some('\\'),
            interpolation: Some(Interpolation {
                open: interp_open.into(),
                close: interp_close.into(),
            }),
        }
    }
}

/// Markers delimiting one interpolation span inside a string literal,
/// e.g. `${` / `}` or `\(` / `)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpolation {
    pub open: String,
    pub close: String,
}

/// A comment form: to end-of-line, or to a matching block closer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentForm {
    Line(String),
    Block { open: String, close: String },
}

/// How this language closes construct bodies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BlockStyle {
    /// `{ ... }`, possibly with the opener on its own line.
    #[default]
    Braces,
    /// Header runs to end of line (or a terminator keyword such as `do` or
    /// `then`); the body is closed by the grammar's end keyword.
    EndKeyword,
}

/// The construct a pattern rule builds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructKind {
    Type(TypeKind),
    Function,
    Conditional,
    While,
    For,
    VarBinding,
}

/// What triggers a pattern rule at a statement start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Matcher {
    /// A leading keyword, after any modifier keywords.
    Keyword(String),
    /// An identifier followed by a balanced `(...)` parameter list and a
    /// block opener — methods in languages that declare them without a
    /// keyword (C# methods, TS `constructor`, Swift `init`).
    CallableShape,
}

/// One entry of a grammar's ordered pattern table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub matcher: Matcher,
    pub construct: ConstructKind,
}

impl PatternRule {
    pub fn keyword(word: &str, construct: ConstructKind) -> Self {
        Self {
            matcher: Matcher::Keyword(word.into()),
            construct,
        }
    }

    pub fn callable_shape() -> Self {
        Self {
            matcher: Matcher::CallableShape,
            construct: ConstructKind::Function,
        }
    }
}

/// Immutable rule set for one language.
///
/// Built once (either by [`builtin`] or by an external loader), then shared
/// read-only across all parses of that language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub language_id: String,
    /// Alternate ids resolving to this grammar, e.g. `ts` for `typescript`.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// File extensions (without dot) for filename-based lookup.
    #[serde(default)]
    pub file_extensions: Vec<String>,
    pub keywords: HashSet<String>,
    /// Keywords that may prefix a declaration without changing what it is
    /// (`public`, `static`, `export`, ...). Skipped when matching patterns.
    #[serde(default)]
    pub modifiers: HashSet<String>,
    /// Characters that may start an identifier in addition to letters and
    /// underscore (PHP `$`, Ruby `@`).
    #[serde(default)]
    pub ident_sigils: Vec<char>,
    pub string_forms: Vec<StringForm>,
    pub comment_forms: Vec<CommentForm>,
    /// Multi-character operators, matched longest-first. Single characters
    /// not listed here lex as punctuation.
    pub operators: Vec<String>,
    #[serde(default)]
    pub block_style: BlockStyle,
    /// Closes `EndKeyword` bodies. Ignored for brace grammars.
    #[serde(default = "default_end_keyword")]
    pub end_keyword: String,
    /// Keywords that terminate an `EndKeyword`-style header early
    /// (Ruby `then`, `do`).
    #[serde(default)]
    pub header_terminators: Vec<String>,
    /// Continues a conditional chain with a new condition in one keyword
    /// (Ruby `elsif`, PHP `elseif`). `else if` needs no entry here.
    #[serde(default)]
    pub elseif_keywords: Vec<String>,
    /// Ordered: the first matching rule wins.
    pub construct_patterns: Vec<PatternRule>,
}

fn default_end_keyword() -> String {
    "end".into()
}

impl Grammar {
    pub fn new(language_id: &str) -> Self {
        Self {
            language_id: language_id.into(),
            aliases: Vec::new(),
            file_extensions: Vec::new(),
            keywords: HashSet::new(),
            modifiers: HashSet::new(),
            ident_sigils: Vec::new(),
            string_forms: Vec::new(),
            comment_forms: Vec::new(),
            operators: Vec::new(),
            block_style: BlockStyle::Braces,
            end_keyword: default_end_keyword(),
            header_terminators: Vec::new(),
            elseif_keywords: Vec::new(),
            construct_patterns: Vec::new(),
        }
    }

    pub fn aliases(mut self, ids: &[&str]) -> Self {
        self.aliases = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn file_extensions(mut self, exts: &[&str]) -> Self {
        self.file_extensions = exts.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn keywords(mut self, words: &[&str]) -> Self {
        self.keywords = words.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn modifiers(mut self, words: &[&str]) -> Self {
        self.modifiers = words.iter().map(|s| s.to_string()).collect();
        // Modifiers are keywords too; keep the sets consistent.
        self.keywords.extend(self.modifiers.iter().cloned());
        self
    }

    pub fn ident_sigils(mut self, sigils: &[char]) -> Self {
        self.ident_sigils = sigils.to_vec();
        self
    }

    pub fn string_forms(mut self, forms: Vec<StringForm>) -> Self {
        self.string_forms = forms;
        // Longest opener first so `$"` is tried before `"`.
        self.string_forms
            .sort_by(|a, b| b.open.len().cmp(&a.open.len()));
        self
    }

    pub fn comment_forms(mut self, forms: Vec<CommentForm>) -> Self {
        self.comment_forms = forms;
        self
    }

    pub fn operators(mut self, ops: &[&str]) -> Self {
        self.operators = ops.iter().map(|s| s.to_string()).collect();
        self.operators.sort_by(|a, b| b.len().cmp(&a.len()));
        self
    }

    pub fn block_style(mut self, style: BlockStyle) -> Self {
        self.block_style = style;
        self
    }

    pub fn header_terminators(mut self, words: &[&str]) -> Self {
        self.header_terminators = words.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn elseif_keywords(mut self, words: &[&str]) -> Self {
        self.elseif_keywords = words.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn construct_patterns(mut self, patterns: Vec<PatternRule>) -> Self {
        self.construct_patterns = patterns;
        self
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(word)
    }

    pub fn is_modifier(&self, word: &str) -> bool {
        self.modifiers.contains(word)
    }

    pub fn is_elseif(&self, word: &str) -> bool {
        self.elseif_keywords.iter().any(|k| k == word)
    }

    pub fn is_header_terminator(&self, word: &str) -> bool {
        self.header_terminators.iter().any(|k| k == word)
    }

    /// Whether this grammar recognizes keyword-less callable declarations.
    pub fn has_callable_shape(&self) -> bool {
        self.construct_patterns
            .iter()
            .any(|p| p.matcher == Matcher::CallableShape)
    }

    /// The pattern rule led by `word`, if any.
    pub fn pattern_for_keyword(&self, word: &str) -> Option<&PatternRule> {
        self.construct_patterns
            .iter()
            .find(|p| matches!(&p.matcher, Matcher::Keyword(k) if k == word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_table_is_sorted_longest_first() {
        let g = Grammar::new("x").operators(&["=", "==", "=>", "==="]);
        assert_eq!(g.operators[0], "===");
        assert!(g.operators.iter().rev().take(2).all(|op| op.len() == 1 || op.len() == 2));
    }

    #[test]
    fn string_forms_sorted_by_opener_length() {
        let g = Grammar::new("x").string_forms(vec![
            StringForm::plain("\"", "\""),
            StringForm::interpolated("$\"", "\"", "{", "}"),
        ]);
        assert_eq!(g.string_forms[0].open, "$\"");
    }

    #[test]
    fn modifiers_are_also_keywords() {
        let g = Grammar::new("x").keywords(&["class"]).modifiers(&["public"]);
        assert!(g.is_keyword("public"));
        assert!(g.is_modifier("public"));
        assert!(!g.is_modifier("class"));
    }
}
