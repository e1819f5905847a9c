//! C# parsing layer built on tree-sitter.
//!
//! The engine never owns a parser for longer than one call:
//! `tree_sitter::Parser` is not `Sync`, so a fresh instance is created per
//! parse and only the resulting [`ParsedFile`] is shared.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

/// Errors from the parsing layer.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The grammar was rejected by the tree-sitter runtime (version skew).
    #[error("loading C# grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
    /// The parser returned no tree at all. Partial parses still produce a
    /// tree with ERROR nodes and are not reported here.
    #[error("failed to parse {0}")]
    Unparseable(String),
}

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Kinds of nodes the rule engine evaluates.
///
/// Everything else is [`NodeKind::Other`]: traversed, never matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An invocation expression (`x.Foo(...)`, `Foo<T>(...)`).
    Invocation,
    /// A class/record/struct declaration.
    TypeDeclaration,
    /// Any other grammar production.
    Other,
}

/// Map a tree-sitter grammar kind onto the engine's node classification.
pub fn classify(node: &Node) -> NodeKind {
    match node.kind() {
        "invocation_expression" => NodeKind::Invocation,
        "class_declaration" | "record_declaration" | "struct_declaration" => {
            NodeKind::TypeDeclaration
        }
        _ => NodeKind::Other,
    }
}

/// Holds a parsed tree and the source it was parsed from.
///
/// The source buffer is retained because node rendering (`node_text`) slices
/// into it; the tree only stores byte ranges.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code.
    pub source: Vec<u8>,
    /// The file path, used verbatim in finding messages.
    pub path: String,
}

/// C# parser handle. Cheap to construct and to share across threads.
pub struct CSharpParser {
    language: Language,
}

impl CSharpParser {
    /// Create a parser handle for the C# grammar.
    pub fn new() -> Self {
        Self {
            language: tree_sitter_c_sharp::LANGUAGE.into(),
        }
    }

    /// Parse one source file into a [`ParsedFile`].
    ///
    /// Partial parse errors still return a valid tree with ERROR nodes; the
    /// rule matchers treat those like any other node.
    pub fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile, ParseError> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::Unparseable(path.display().to_string()))?;
        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.display().to_string(),
        })
    }
}

impl Default for CSharpParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedFile {
        CSharpParser::new()
            .parse(Path::new("test.cs"), source.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_parse_simple_class() {
        let parsed = parse("class Foo { void Bar() { } }");
        let root = parsed.tree.root_node();
        assert_eq!(root.kind(), "compilation_unit");
        assert!(!root.has_error());
    }

    #[test]
    fn test_classify_invocation() {
        let parsed = parse("class C { void M() { Mapper.Initialize(x => {}); } }");
        let mut found = false;
        visit_all(parsed.tree.root_node(), &mut |n| {
            if classify(&n) == NodeKind::Invocation {
                found = true;
            }
        });
        assert!(found, "expected an invocation_expression in the tree");
    }

    #[test]
    fn test_classify_type_declaration() {
        let parsed = parse("class MyProfile : Profile { }");
        let mut kinds = Vec::new();
        visit_all(parsed.tree.root_node(), &mut |n| kinds.push(classify(&n)));
        assert!(kinds.contains(&NodeKind::TypeDeclaration));
    }

    #[test]
    fn test_span_from_node() {
        let parsed = parse("class Foo { }");
        let class_node = parsed.tree.root_node().named_child(0).unwrap();
        let span = Span::from_node(class_node);
        assert_eq!(span.start_line, 1);
        assert_eq!(span.start_col, 1);
        assert_eq!(span.start_byte, 0);
        assert_eq!(span.end_byte, 13);
    }

    #[test]
    fn test_partial_parse_still_yields_tree() {
        // Mid-edit fragment: parse must not fail, just mark errors.
        let parsed = parse("class Broken {");
        assert!(parsed.tree.root_node().has_error());
    }

    fn visit_all(node: Node, f: &mut impl FnMut(Node)) {
        f(node);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            visit_all(child, f);
        }
    }
}
