//! Built-in grammars for the five supported languages.
//!
//! Each grammar is a plain data value; the tables below define exactly what
//! the engine recognizes per language. External callers may register further
//! grammars through the registry before parsing starts.

use crate::grammar::{
    BlockStyle, CommentForm, ConstructKind, Grammar, PatternRule, StringForm,
};
use crate::tree::TypeKind;

fn line(marker: &str) -> CommentForm {
    CommentForm::Line(marker.into())
}

fn block(open: &str, close: &str) -> CommentForm {
    CommentForm::Block {
        open: open.into(),
        close: close.into(),
    }
}

pub fn csharp() -> Grammar {
    Grammar::new("csharp")
        .aliases(&["cs", "c#"])
        .file_extensions(&["cs"])
        .keywords(&[
            "namespace", "class", "struct", "interface", "enum", "using", "if", "else", "while",
            "for", "foreach", "in", "do", "switch", "case", "default", "break", "continue",
            "return", "new", "var", "void", "int", "uint", "long", "short", "byte", "string",
            "bool", "float", "double", "char", "decimal", "object", "null", "true", "false",
            "this", "base", "throw", "try", "catch", "finally", "is", "as", "out", "ref",
        ])
        .modifiers(&[
            "public", "private", "protected", "internal", "static", "sealed", "abstract",
            "virtual", "override", "readonly", "async", "partial",
        ])
        .string_forms(vec![
            StringForm::interpolated("$\"", "\"", "{", "}"),
            StringForm::plain("\"", "\""),
            StringForm::plain("'", "'"),
        ])
        .comment_forms(vec![line("//"), block("/*", "*/")])
        .operators(&[
            "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=", "=>",
            "??", "?.", "<<", ">>", "+", "-", "*", "/", "%", "<", ">", "=", "!", "&", "|", "^",
            "~", "?",
        ])
        .construct_patterns(vec![
            PatternRule::keyword("namespace", ConstructKind::Type(TypeKind::Namespace)),
            PatternRule::keyword("class", ConstructKind::Type(TypeKind::Class)),
            PatternRule::keyword("struct", ConstructKind::Type(TypeKind::Class)),
            PatternRule::keyword("interface", ConstructKind::Type(TypeKind::Interface)),
            PatternRule::keyword("enum", ConstructKind::Type(TypeKind::Enum)),
            PatternRule::keyword("if", ConstructKind::Conditional),
            PatternRule::keyword("while", ConstructKind::While),
            PatternRule::keyword("for", ConstructKind::For),
            PatternRule::keyword("foreach", ConstructKind::For),
            PatternRule::keyword("var", ConstructKind::VarBinding),
            // Methods carry no leading keyword in C#.
            PatternRule::callable_shape(),
        ])
}

pub fn php() -> Grammar {
    Grammar::new("php")
        .file_extensions(&["php"])
        .keywords(&[
            "namespace", "class", "interface", "trait", "extends", "implements", "function",
            "return", "if", "else", "elseif", "while", "for", "foreach", "as", "do", "switch",
            "case", "default", "break", "continue", "new", "echo", "print", "null", "true",
            "false", "require", "require_once", "include", "include_once", "use", "global",
            "try", "catch", "finally", "throw", "instanceof", "array",
        ])
        .modifiers(&["public", "private", "protected", "static", "final", "abstract"])
        .ident_sigils(&['$'])
        .string_forms(vec![
            StringForm::interpolated("\"", "\"", "{$", "}"),
            StringForm::plain("'", "'"),
        ])
        .comment_forms(vec![line("//"), line("#"), block("/*", "*/")])
        .operators(&[
            "<?php", "<?=", "<?", "?>", "===", "!==", "<=>", "==", "!=", "<>", "<=", ">=", "&&",
            "||", "++", "--", "+=", "-=", "*=", "/=", ".=", "->", "=>", "::", "**", "+", "-",
            "*", "/", "%", "<", ">", "=", "!", "&", "|", "^", "~", "?", "@",
        ])
        .elseif_keywords(&["elseif"])
        .construct_patterns(vec![
            PatternRule::keyword("namespace", ConstructKind::Type(TypeKind::Namespace)),
            PatternRule::keyword("class", ConstructKind::Type(TypeKind::Class)),
            PatternRule::keyword("interface", ConstructKind::Type(TypeKind::Interface)),
            PatternRule::keyword("trait", ConstructKind::Type(TypeKind::Class)),
            PatternRule::keyword("function", ConstructKind::Function),
            PatternRule::keyword("if", ConstructKind::Conditional),
            PatternRule::keyword("while", ConstructKind::While),
            PatternRule::keyword("for", ConstructKind::For),
            PatternRule::keyword("foreach", ConstructKind::For),
        ])
}

pub fn ruby() -> Grammar {
    Grammar::new("ruby")
        .aliases(&["rb"])
        .file_extensions(&["rb"])
        .keywords(&[
            "class", "module", "def", "end", "if", "elsif", "else", "unless", "while", "until",
            "for", "in", "do", "then", "return", "yield", "begin", "rescue", "ensure", "case",
            "when", "break", "next", "redo", "retry", "nil", "true", "false", "self", "super",
            "and", "or", "not", "require", "attr_accessor", "attr_reader", "attr_writer",
        ])
        .ident_sigils(&['@', '$'])
        .string_forms(vec![
            StringForm::interpolated("\"", "\"", "#{", "}"),
            StringForm::plain("'", "'"),
        ])
        .comment_forms(vec![line("#")])
        .operators(&[
            "<=>", "===", "==", "!=", "<=", ">=", "&&", "||", "**", "+=", "-=", "*=", "/=",
            "%=", "||=", "&&=", "<<", ">>", "=~", "!~", "...", "..", "::", "->", "+", "-", "*",
            "/", "%", "<", ">", "=", "!", "&", "|", "^", "~", "?",
        ])
        .block_style(BlockStyle::EndKeyword)
        .header_terminators(&["then", "do"])
        .elseif_keywords(&["elsif"])
        .construct_patterns(vec![
            PatternRule::keyword("class", ConstructKind::Type(TypeKind::Class)),
            PatternRule::keyword("module", ConstructKind::Type(TypeKind::Namespace)),
            PatternRule::keyword("def", ConstructKind::Function),
            PatternRule::keyword("if", ConstructKind::Conditional),
            PatternRule::keyword("while", ConstructKind::While),
            PatternRule::keyword("for", ConstructKind::For),
        ])
}

pub fn swift() -> Grammar {
    Grammar::new("swift")
        .file_extensions(&["swift"])
        .keywords(&[
            "class", "struct", "enum", "protocol", "extension", "func", "var", "let", "if",
            "else", "guard", "while", "for", "in", "repeat", "switch", "case", "default",
            "return", "import", "self", "super", "nil", "true", "false", "throw", "throws",
            "try", "catch", "where", "as", "is", "typealias", "deinit", "subscript", "defer",
        ])
        .modifiers(&[
            "public", "private", "fileprivate", "internal", "open", "final", "static",
            "override", "lazy", "weak", "unowned", "mutating", "convenience", "required",
            "indirect",
        ])
        .string_forms(vec![StringForm::interpolated("\"", "\"", "\\(", ")")])
        .comment_forms(vec![line("//"), block("/*", "*/")])
        .operators(&[
            "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "->", "??",
            "..<", "...", "+", "-", "*", "/", "%", "<", ">", "=", "!", "&", "|", "^", "~", "?",
        ])
        .construct_patterns(vec![
            PatternRule::keyword("class", ConstructKind::Type(TypeKind::Class)),
            PatternRule::keyword("struct", ConstructKind::Type(TypeKind::Class)),
            PatternRule::keyword("enum", ConstructKind::Type(TypeKind::Enum)),
            PatternRule::keyword("protocol", ConstructKind::Type(TypeKind::Interface)),
            PatternRule::keyword("extension", ConstructKind::Type(TypeKind::Class)),
            PatternRule::keyword("func", ConstructKind::Function),
            PatternRule::keyword("if", ConstructKind::Conditional),
            PatternRule::keyword("while", ConstructKind::While),
            PatternRule::keyword("for", ConstructKind::For),
            PatternRule::keyword("let", ConstructKind::VarBinding),
            PatternRule::keyword("var", ConstructKind::VarBinding),
            // `init` declarations have no leading keyword here.
            PatternRule::callable_shape(),
        ])
}

pub fn typescript() -> Grammar {
    Grammar::new("typescript")
        .aliases(&["ts", "tsx", "javascript", "js"])
        .file_extensions(&["ts", "tsx", "js", "jsx"])
        .keywords(&[
            "class", "interface", "enum", "extends", "implements", "function", "return", "if",
            "else", "while", "for", "do", "switch", "case", "break", "continue", "new", "const",
            "let", "var", "typeof", "instanceof", "in", "of", "import", "from", "this", "super",
            "null", "undefined", "true", "false", "void", "delete", "yield", "await", "throw",
            "try", "catch", "finally", "type", "keyof",
        ])
        .modifiers(&[
            "export", "public", "private", "protected", "static", "readonly", "abstract",
            "async", "declare",
        ])
        .string_forms(vec![
            StringForm::interpolated("`", "`", "${", "}"),
            StringForm::plain("\"", "\""),
            StringForm::plain("'", "'"),
        ])
        .comment_forms(vec![line("//"), block("/*", "*/")])
        .operators(&[
            "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=",
            "/=", "%=", "=>", "...", "?.", "??", "**", "<<", ">>", "+", "-", "*", "/", "%",
            "<", ">", "=", "!", "&", "|", "^", "~", "?",
        ])
        .construct_patterns(vec![
            PatternRule::keyword("class", ConstructKind::Type(TypeKind::Class)),
            PatternRule::keyword("interface", ConstructKind::Type(TypeKind::Interface)),
            PatternRule::keyword("enum", ConstructKind::Type(TypeKind::Enum)),
            PatternRule::keyword("function", ConstructKind::Function),
            PatternRule::keyword("if", ConstructKind::Conditional),
            PatternRule::keyword("while", ConstructKind::While),
            PatternRule::keyword("for", ConstructKind::For),
            PatternRule::keyword("const", ConstructKind::VarBinding),
            PatternRule::keyword("let", ConstructKind::VarBinding),
            PatternRule::keyword("var", ConstructKind::VarBinding),
            // Class methods and `constructor` carry no leading keyword.
            PatternRule::callable_shape(),
        ])
}

/// All built-in grammars, in registration order.
pub fn all() -> Vec<Grammar> {
    vec![csharp(), php(), ruby(), swift(), typescript()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_has_patterns_and_extensions() {
        for grammar in all() {
            assert!(!grammar.construct_patterns.is_empty(), "{}", grammar.language_id);
            assert!(!grammar.file_extensions.is_empty(), "{}", grammar.language_id);
            assert!(!grammar.keywords.is_empty(), "{}", grammar.language_id);
        }
    }

    #[test]
    fn ruby_is_the_only_end_delimited_builtin() {
        for grammar in all() {
            let expected = if grammar.language_id == "ruby" {
                BlockStyle::EndKeyword
            } else {
                BlockStyle::Braces
            };
            assert_eq!(grammar.block_style, expected);
        }
    }
}
