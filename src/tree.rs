//! The language-agnostic structural tree.
//!
//! One [`ConstructNode::Module`] owns the whole result of a parse. Children
//! are owned exclusively by their parent (no sharing, no back-references);
//! every node carries the source span it covers.

use serde::Serialize;

use crate::syntax::{Span, Token};

/// Flavor of a type-like declaration. The recognizer treats all of these as
/// named containers of members; tooling that cares can tell them apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    /// A pure grouping container: C# `namespace`, Ruby `module`.
    Namespace,
}

/// One arm of a conditional chain: its condition tokens and its body.
/// A trailing `else` is a branch with an empty condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch<'src> {
    pub condition: Vec<Token<'src>>,
    pub body: Vec<ConstructNode<'src>>,
}

/// A recognized structural element. `Statement` is the well-formed fallback
/// for lines that match no construct pattern; it is not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstructNode<'src> {
    Module {
        children: Vec<ConstructNode<'src>>,
        span: Span,
    },
    ClassDecl {
        kind: TypeKind,
        name: String,
        members: Vec<ConstructNode<'src>>,
        span: Span,
    },
    FunctionDecl {
        name: String,
        params: Vec<String>,
        body: Vec<ConstructNode<'src>>,
        span: Span,
    },
    Conditional {
        branches: Vec<Branch<'src>>,
        span: Span,
    },
    WhileLoop {
        condition: Vec<Token<'src>>,
        body: Vec<ConstructNode<'src>>,
        span: Span,
    },
    ForLoop {
        header: Vec<Token<'src>>,
        body: Vec<ConstructNode<'src>>,
        span: Span,
    },
    VarBinding {
        name: String,
        init: Vec<Token<'src>>,
        span: Span,
    },
    Statement {
        tokens: Vec<Token<'src>>,
        span: Span,
    },
}

impl<'src> ConstructNode<'src> {
    /// An empty module with a zero span; the result for unsupported languages.
    pub fn empty_module() -> Self {
        ConstructNode::Module {
            children: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ConstructNode::Module { span, .. }
            | ConstructNode::ClassDecl { span, .. }
            | ConstructNode::FunctionDecl { span, .. }
            | ConstructNode::Conditional { span, .. }
            | ConstructNode::WhileLoop { span, .. }
            | ConstructNode::ForLoop { span, .. }
            | ConstructNode::VarBinding { span, .. }
            | ConstructNode::Statement { span, .. } => *span,
        }
    }

    /// Direct children, in source order. Conditional branches contribute
    /// their bodies.
    pub fn children(&self) -> Vec<&ConstructNode<'src>> {
        match self {
            ConstructNode::Module { children, .. } => children.iter().collect(),
            ConstructNode::ClassDecl { members, .. } => members.iter().collect(),
            ConstructNode::FunctionDecl { body, .. }
            | ConstructNode::WhileLoop { body, .. }
            | ConstructNode::ForLoop { body, .. } => body.iter().collect(),
            ConstructNode::Conditional { branches, .. } => {
                branches.iter().flat_map(|b| b.body.iter()).collect()
            }
            ConstructNode::VarBinding { .. } | ConstructNode::Statement { .. } => Vec::new(),
        }
    }

    /// Serializes the tree as JSON, the interchange form for downstream
    /// tooling.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Utility: compact one-line outline, mainly for tests and debugging.
    pub fn pretty(&self) -> String {
        match self {
            ConstructNode::Module { children, .. } => {
                format!("(module{})", pretty_list(children))
            }
            ConstructNode::ClassDecl {
                kind,
                name,
                members,
                ..
            } => {
                let tag = match kind {
                    TypeKind::Class => "class",
                    TypeKind::Interface => "interface",
                    TypeKind::Enum => "enum",
                    TypeKind::Namespace => "namespace",
                };
                format!("({} {}{})", tag, name, pretty_list(members))
            }
            ConstructNode::FunctionDecl {
                name, params, body, ..
            } => {
                format!("(fn {} [{}]{})", name, params.join(" "), pretty_list(body))
            }
            ConstructNode::Conditional { branches, .. } => {
                let inner: String = branches
                    .iter()
                    .map(|b| {
                        let cond = if b.condition.is_empty() {
                            "else".to_string()
                        } else {
                            "cond".to_string()
                        };
                        format!(" ({}{})", cond, pretty_list(&b.body))
                    })
                    .collect();
                format!("(if{})", inner)
            }
            ConstructNode::WhileLoop { body, .. } => format!("(while{})", pretty_list(body)),
            ConstructNode::ForLoop { body, .. } => format!("(for{})", pretty_list(body)),
            ConstructNode::VarBinding { name, .. } => format!("(bind {})", name),
            ConstructNode::Statement { .. } => "(stmt)".to_string(),
        }
    }
}

fn pretty_list(nodes: &[ConstructNode<'_>]) -> String {
    nodes.iter().map(|n| format!(" {}", n.pretty())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Position;

    #[test]
    fn empty_module_has_zero_span() {
        let m = ConstructNode::empty_module();
        assert_eq!(m.span(), Span::default());
        assert!(m.children().is_empty());
    }

    #[test]
    fn tree_serializes_to_json() {
        let node = ConstructNode::FunctionDecl {
            name: "greet".into(),
            params: vec!["name".into()],
            body: vec![],
            span: Span::default(),
        };
        let json = node.to_json().unwrap();
        assert!(json.contains("\"FunctionDecl\""));
        assert!(json.contains("\"greet\""));
    }

    #[test]
    fn pretty_outline_is_stable() {
        let span = Span::new(Position::default(), Position::new(0, 10, 10));
        let node = ConstructNode::ClassDecl {
            kind: TypeKind::Class,
            name: "Person".into(),
            members: vec![ConstructNode::FunctionDecl {
                name: "fullName".into(),
                params: vec![],
                body: vec![],
                span,
            }],
            span,
        };
        assert_eq!(node.pretty(), "(class Person (fn fullName []))");
    }
}
