//! mapcheck - AutoMapper upgrade analyzer.
//!
//! Mapcheck scans C# sources for usages of the AutoMapper API surface that
//! are known to break across the library's major versions: the removed
//! static `Mapper` facade, changed method overloads, resolver and converter
//! signature changes, and `Profile` subclassing.
//!
//! # Architecture
//!
//! - `syntax`: tree-sitter parsing for C#, spans, node classification
//! - `rules`: the ordered breaking-change rule catalog (structural and
//!   textual matchers) and the `Finding` type
//! - `walker`: pre-order tree walker that drives rule evaluation and emits
//!   findings through a sink
//! - `runner`: parallel per-file scan orchestration
//! - `report`: output formatting (pretty, JSON, SARIF)
//! - `cli`: command-line surface
//!
//! The engine is pure: one traversal is a function of (tree, rule set) to a
//! sequence of findings, with no shared mutable state, so files are analyzed
//! concurrently against a single shared [`RuleSet`].
//!
//! # Adding a rule
//!
//! Append a `Rule` to [`RuleSet::breaking_changes`] with a descriptor id and
//! a structural or textual matcher. The walker needs no changes.

pub mod cli;
pub mod report;
pub mod rules;
pub mod runner;
pub mod syntax;
pub mod walker;

pub use rules::{Finding, Matcher, Rule, RuleId, RuleSet, RuleSetError, Severity};
pub use runner::{Runner, ScanResult, SkippedFile};
pub use syntax::{CSharpParser, NodeKind, ParseError, ParsedFile, Span};
pub use walker::Walker;
