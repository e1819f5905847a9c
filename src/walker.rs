//! Pre-order syntax-tree walker that drives rule evaluation.
//!
//! The walker visits every node exactly once, in source order, and consults
//! the rule set at exactly two node kinds: invocation expressions and type
//! declarations. It holds no cross-node state, so separate trees (files) can
//! be walked fully in parallel against one shared [`RuleSet`].

use std::sync::atomic::{AtomicBool, Ordering};

use tree_sitter::Node;

use crate::rules::{Finding, MatchContext, RuleSet};
use crate::syntax::{classify, NodeKind, ParsedFile, Span};

/// Walks one parsed file and emits findings through a caller-supplied sink.
pub struct Walker<'rs> {
    rules: &'rs RuleSet,
}

impl<'rs> Walker<'rs> {
    /// Create a walker over the given rule set.
    pub fn new(rules: &'rs RuleSet) -> Self {
        Self { rules }
    }

    /// Walk the tree, collecting findings into a vector.
    ///
    /// Running this twice on the same tree yields an identical,
    /// order-preserved sequence.
    pub fn analyze(&self, parsed: &ParsedFile) -> Vec<Finding> {
        let mut findings = Vec::new();
        self.walk(parsed, &mut |finding| findings.push(finding));
        findings
    }

    /// Walk the tree, handing each finding to `sink` the moment a rule
    /// matches, so the host can start reporting before traversal completes.
    pub fn walk<F: FnMut(Finding)>(&self, parsed: &ParsedFile, sink: &mut F) {
        self.walk_until(parsed, None, sink);
    }

    /// Like [`Walker::walk`], but abandons the traversal once `cancel` is
    /// set. The flag is checked between top-level declarations only; the
    /// subtree currently being visited always finishes.
    pub fn walk_until<F: FnMut(Finding)>(
        &self,
        parsed: &ParsedFile,
        cancel: Option<&AtomicBool>,
        sink: &mut F,
    ) {
        let root = parsed.tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if let Some(flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    return;
                }
            }
            self.visit(child, parsed, sink);
        }
    }

    fn visit<F: FnMut(Finding)>(&self, node: Node, parsed: &ParsedFile, sink: &mut F) {
        match classify(&node) {
            NodeKind::Invocation => self.check_invocation(node, parsed, sink),
            NodeKind::TypeDeclaration => self.check_type_declaration(node, parsed, sink),
            NodeKind::Other => {}
        }

        // Always recurse: a matched invocation's arguments may themselves
        // contain further matches.
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, parsed, sink);
        }
    }

    fn check_invocation<F: FnMut(Finding)>(&self, node: Node, parsed: &ParsedFile, sink: &mut F) {
        let ctx = MatchContext {
            node,
            source: &parsed.source,
        };
        if let Some(rule) = self.rules.first_match(NodeKind::Invocation, &ctx) {
            sink(Finding::new(rule, &parsed.path, Span::from_node(node)));
        }
    }

    fn check_type_declaration<F: FnMut(Finding)>(
        &self,
        node: Node,
        parsed: &ParsedFile,
        sink: &mut F,
    ) {
        let ctx = MatchContext {
            node,
            source: &parsed.source,
        };
        if let Some(rule) = self.rules.first_match(NodeKind::TypeDeclaration, &ctx) {
            // Anchor at the declared name so tooling highlights one
            // identifier, not the whole declaration body.
            let anchor = node.child_by_field_name("name").unwrap_or(node);
            sink(Finding::new(rule, &parsed.path, Span::from_node(anchor)));
        }
    }
}
