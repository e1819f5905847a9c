//! The AutoMapper breaking-change rule catalog.
//!
//! Each rule is a predicate over one syntax node plus a finding descriptor.
//! Matchers come in two styles:
//!
//! - **Structural**: inspects the node's typed shape (receiver identity,
//!   invoked member name, base-type list). Used where the shape is cheap to
//!   check without misfiring on look-alikes.
//! - **Textual**: runs a regex over the node's rendered text. A deliberate
//!   escape hatch for signatures that are awkward to express structurally
//!   (multi-token method names, using-directive text), not the primary
//!   mechanism.
//!
//! Rules are independent: no rule reads another's outcome, and the catalog is
//! immutable after construction, so one `RuleSet` is safely shared by
//! reference across parallel traversals.

use std::fmt;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tree_sitter::Node;

use crate::syntax::{NodeKind, Span};

/// Severity levels for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Stable identifiers for the breaking-change descriptors.
///
/// `ProfileInheritance` backs two matchers (the static `Mapper.CreateMap`
/// facade call and `Profile` subclassing), mirroring the upstream analyzer
/// which shares one descriptor between its invocation and class checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuleId {
    #[serde(rename = "AR001")]
    StaticInitialization,
    #[serde(rename = "AR002")]
    ConfigurationStore,
    #[serde(rename = "AR003")]
    ProfileInheritance,
    #[serde(rename = "AR004")]
    CreateMapOverloads,
    #[serde(rename = "AR005")]
    ForAllMembers,
    #[serde(rename = "AR006")]
    ConstructUsingServiceLocator,
    #[serde(rename = "AR007")]
    InaccessibleSetterIgnore,
    #[serde(rename = "AR008")]
    CustomResolver,
    #[serde(rename = "AR009")]
    CollectionPackage,
    #[serde(rename = "AR010")]
    ValueConverter,
}

impl RuleId {
    /// All descriptors, in catalog order.
    pub const ALL: [RuleId; 10] = [
        RuleId::StaticInitialization,
        RuleId::ConfigurationStore,
        RuleId::ProfileInheritance,
        RuleId::CreateMapOverloads,
        RuleId::ForAllMembers,
        RuleId::ConstructUsingServiceLocator,
        RuleId::InaccessibleSetterIgnore,
        RuleId::CustomResolver,
        RuleId::CollectionPackage,
        RuleId::ValueConverter,
    ];

    /// Stable short code, as emitted in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::StaticInitialization => "AR001",
            RuleId::ConfigurationStore => "AR002",
            RuleId::ProfileInheritance => "AR003",
            RuleId::CreateMapOverloads => "AR004",
            RuleId::ForAllMembers => "AR005",
            RuleId::ConstructUsingServiceLocator => "AR006",
            RuleId::InaccessibleSetterIgnore => "AR007",
            RuleId::CustomResolver => "AR008",
            RuleId::CollectionPackage => "AR009",
            RuleId::ValueConverter => "AR010",
        }
    }

    /// PascalCase rule name for SARIF output.
    pub fn name(&self) -> &'static str {
        match self {
            RuleId::StaticInitialization => "StaticMapperInitialization",
            RuleId::ConfigurationStore => "ConfigurationStore",
            RuleId::ProfileInheritance => "ProfileInheritance",
            RuleId::CreateMapOverloads => "CreateMapOverloads",
            RuleId::ForAllMembers => "ForAllMembersMethod",
            RuleId::ConstructUsingServiceLocator => "ConstructUsingServiceLocator",
            RuleId::InaccessibleSetterIgnore => "IgnoreAllPropertiesWithAnInaccessibleSetter",
            RuleId::CustomResolver => "CustomResolvers",
            RuleId::CollectionPackage => "AutoMapperCollection",
            RuleId::ValueConverter => "ValueConverter",
        }
    }

    /// Short description used to build the finding message.
    pub fn summary(&self) -> &'static str {
        match self {
            RuleId::StaticInitialization => "Static Mapper initialization",
            RuleId::ConfigurationStore => "Configuration Store usage",
            RuleId::ProfileInheritance => "Profile inheritance",
            RuleId::CreateMapOverloads => "CreateMap method overloads",
            RuleId::ForAllMembers => "ForAllMembers method",
            RuleId::ConstructUsingServiceLocator => "ConstructUsingServiceLocator method",
            RuleId::InaccessibleSetterIgnore => {
                "IgnoreAllPropertiesWithAnInaccessibleSetter method"
            }
            RuleId::CustomResolver => "Custom resolvers",
            RuleId::CollectionPackage => "AutoMapper.Collection package",
            RuleId::ValueConverter => "ValueConverter",
        }
    }

    /// Upgrade guidance shown in `mapcheck rules` and SARIF full descriptions.
    pub fn guidance(&self) -> &'static str {
        match self {
            RuleId::StaticInitialization => {
                "Mapper.Initialize was removed in AutoMapper 9.0. Build a \
                 MapperConfiguration and create an IMapper instance from it."
            }
            RuleId::ConfigurationStore => {
                "The static Mapper.Configuration store is gone. Configuration \
                 now lives on the MapperConfiguration instance."
            }
            RuleId::ProfileInheritance => {
                "Static Mapper.CreateMap and Profile-based setup changed across \
                 major versions. Mapping configuration belongs in the Profile \
                 constructor on an instance configuration."
            }
            RuleId::CreateMapOverloads => {
                "Several generic CreateMap overloads were removed or changed \
                 shape. Verify each call against the target version."
            }
            RuleId::ForAllMembers => {
                "ForAllMembers option APIs were consolidated; ResolveUsing-style \
                 options merged into MapFrom."
            }
            RuleId::ConstructUsingServiceLocator => {
                "ConstructUsingServiceLocator was removed. Use ConstructUsing \
                 with a service-provider callback instead."
            }
            RuleId::InaccessibleSetterIgnore => {
                "IgnoreAllPropertiesWithAnInaccessibleSetter changed behavior \
                 for read-only and init-only properties."
            }
            RuleId::CustomResolver => {
                "IValueResolver became generic. Custom resolvers must be \
                 rewritten against the typed interface."
            }
            RuleId::CollectionPackage => {
                "AutoMapper.Collection releases in lock-step with AutoMapper \
                 majors and must be upgraded together."
            }
            RuleId::ValueConverter => {
                "ValueConverter signatures changed shape. Review each converter \
                 against the target version."
            }
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reported occurrence of a detected breaking-change pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub rule: RuleId,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub span: Span,
}

impl Finding {
    /// Build the finding for a matched rule, anchored at `span`.
    pub fn new(rule: &Rule, file: &str, span: Span) -> Self {
        Self {
            rule: rule.id,
            severity: rule.severity,
            message: format!(
                "Breaking change: {} found in file: {}",
                rule.id.summary(),
                file
            ),
            file: file.to_string(),
            span,
        }
    }
}

/// The node under evaluation plus the source buffer it renders from.
pub struct MatchContext<'a> {
    pub node: Node<'a>,
    pub source: &'a [u8],
}

impl<'a> MatchContext<'a> {
    /// Rendered text of the node (and, implicitly, its full subtree).
    pub fn text(&self) -> &'a str {
        self.node.utf8_text(self.source).unwrap_or("")
    }

    fn node_text(&self, node: Node<'a>) -> &'a str {
        node.utf8_text(self.source).unwrap_or("")
    }
}

/// A rule's pattern, either over the node's typed shape or its rendering.
pub enum Matcher {
    /// Pure predicate over the node's structure.
    Structural(fn(&MatchContext<'_>) -> bool),
    /// Regex over the node's rendered text. `reject_preceded_by` drops
    /// candidate matches whose preceding text ends with the given string;
    /// this stands in for the reference regex's negative look-behind, which
    /// the regex crate does not support.
    Textual {
        pattern: Regex,
        reject_preceded_by: Option<&'static str>,
    },
}

impl Matcher {
    /// Evaluate the matcher. Total: malformed or partial nodes yield `false`.
    pub fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        match self {
            Matcher::Structural(predicate) => predicate(ctx),
            Matcher::Textual {
                pattern,
                reject_preceded_by,
            } => textual_match(pattern, *reject_preceded_by, ctx.text()),
        }
    }
}

fn textual_match(pattern: &Regex, reject_preceded_by: Option<&str>, text: &str) -> bool {
    match reject_preceded_by {
        None => pattern.is_match(text),
        Some(prefix) => pattern
            .find_iter(text)
            .any(|m| !text[..m.start()].ends_with(prefix)),
    }
}

/// One detection rule: descriptor id, applicable node kind, matcher.
pub struct Rule {
    pub id: RuleId,
    pub kind: NodeKind,
    pub severity: Severity,
    pub matcher: Matcher,
}

/// Error building the rule catalog.
///
/// A malformed pattern is a configuration error, fatal at construction time;
/// it can never surface as a per-node runtime error.
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("invalid pattern for rule {id}: {source}")]
    BadPattern {
        id: RuleId,
        #[source]
        source: regex::Error,
    },
}

/// The ordered, immutable catalog of detection rules.
///
/// Evaluation is top-to-bottom with first-match-wins per node, so earlier,
/// more specific structural rules take precedence over the generic textual
/// ones when both could match the same node.
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build the standard AutoMapper breaking-change catalog.
    pub fn breaking_changes() -> Result<Self, RuleSetError> {
        let structural = |id, kind, predicate: fn(&MatchContext<'_>) -> bool| Rule {
            id,
            kind,
            severity: Severity::Warning,
            matcher: Matcher::Structural(predicate),
        };
        fn textual(
            id: RuleId,
            pattern: &str,
            reject: Option<&'static str>,
        ) -> Result<Rule, RuleSetError> {
            Ok(Rule {
                id,
                kind: NodeKind::Invocation,
                severity: Severity::Warning,
                matcher: Matcher::Textual {
                    pattern: Regex::new(pattern)
                        .map_err(|source| RuleSetError::BadPattern { id, source })?,
                    reject_preceded_by: reject,
                },
            })
        }

        let rules = vec![
            structural(
                RuleId::StaticInitialization,
                NodeKind::Invocation,
                is_static_initialization,
            ),
            structural(
                RuleId::ConfigurationStore,
                NodeKind::Invocation,
                is_configuration_store,
            ),
            structural(
                RuleId::ProfileInheritance,
                NodeKind::Invocation,
                is_static_create_map,
            ),
            structural(
                RuleId::CreateMapOverloads,
                NodeKind::Invocation,
                is_generic_create_map,
            ),
            textual(RuleId::ForAllMembers, r"ForAllMembers\s*\(", None)?,
            textual(
                RuleId::ConstructUsingServiceLocator,
                r"ConstructUsingServiceLocator\s*\(",
                None,
            )?,
            textual(
                RuleId::InaccessibleSetterIgnore,
                r"IgnoreAllPropertiesWithAnInaccessibleSetter\s*\(",
                None,
            )?,
            textual(
                RuleId::CustomResolver,
                r"\.ValueResolver\s*<.*?>",
                Some("AutoMapper"),
            )?,
            textual(
                RuleId::CollectionPackage,
                r"using\s+AutoMapper\.Collection",
                None,
            )?,
            textual(RuleId::ValueConverter, r"ValueConverter\s*<.*?>", None)?,
            structural(
                RuleId::ProfileInheritance,
                NodeKind::TypeDeclaration,
                extends_profile,
            ),
        ];

        Ok(Self { rules })
    }

    /// Rules applicable to the given node kind, in priority order.
    pub fn rules_for(&self, kind: NodeKind) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.kind == kind)
    }

    /// The first rule, in priority order, whose matcher accepts the node.
    pub fn first_match(&self, kind: NodeKind, ctx: &MatchContext<'_>) -> Option<&Rule> {
        self.rules_for(kind).find(|rule| rule.matcher.matches(ctx))
    }

    /// Number of matchers in the catalog.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Structural matchers
// ---------------------------------------------------------------------------

/// `Mapper.Initialize(...)` - the static facade entry point.
fn is_static_initialization(ctx: &MatchContext<'_>) -> bool {
    is_facade_call(ctx, "Initialize")
}

/// `Mapper.Configuration(...)` - the static configuration store.
fn is_configuration_store(ctx: &MatchContext<'_>) -> bool {
    is_facade_call(ctx, "Configuration")
}

/// `Mapper.CreateMap(...)` - static map registration.
fn is_static_create_map(ctx: &MatchContext<'_>) -> bool {
    is_facade_call(ctx, "CreateMap")
}

/// True when the invocation's callee is `Mapper.<member>`, with `Mapper` a
/// bare identifier. Missing sub-structure (no callee, no receiver) is "no
/// match", never an error.
fn is_facade_call(ctx: &MatchContext<'_>, member: &str) -> bool {
    let Some(callee) = ctx.node.child_by_field_name("function") else {
        return false;
    };
    if callee.kind() != "member_access_expression" {
        return false;
    }
    let receiver_is_mapper = callee
        .child_by_field_name("expression")
        .is_some_and(|recv| recv.kind() == "identifier" && ctx.node_text(recv) == "Mapper");
    let member_matches = callee
        .child_by_field_name("name")
        .and_then(|name| member_identifier(ctx, name))
        == Some(member);
    receiver_is_mapper && member_matches
}

/// An invocation whose invoked member is a generic `CreateMap<...>`, with or
/// without a receiver (`cfg.CreateMap<A, B>()` or bare `CreateMap<A, B>()`
/// inside a Profile constructor).
fn is_generic_create_map(ctx: &MatchContext<'_>) -> bool {
    let Some(callee) = ctx.node.child_by_field_name("function") else {
        return false;
    };
    let name = match callee.kind() {
        "member_access_expression" => callee.child_by_field_name("name"),
        "generic_name" => Some(callee),
        _ => None,
    };
    name.is_some_and(|name| {
        name.kind() == "generic_name"
            && name
                .named_child(0)
                .is_some_and(|id| id.kind() == "identifier" && ctx.node_text(id) == "CreateMap")
    })
}

/// The identifier portion of an invoked member name: `CreateMap` for both
/// `CreateMap` and `CreateMap<A, B>`.
fn member_identifier<'a>(ctx: &MatchContext<'a>, name: Node<'a>) -> Option<&'a str> {
    match name.kind() {
        "identifier" => Some(ctx.node_text(name)),
        "generic_name" => name
            .named_child(0)
            .filter(|id| id.kind() == "identifier")
            .map(|id| ctx.node_text(id)),
        _ => None,
    }
}

/// A type declaration whose base list contains a type rendered exactly
/// `Profile`. An absent base list is "no match".
fn extends_profile(ctx: &MatchContext<'_>) -> bool {
    let mut cursor = ctx.node.walk();
    let Some(bases) = ctx
        .node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "base_list")
    else {
        return false;
    };
    let mut base_cursor = bases.walk();
    let has_profile = bases
        .named_children(&mut base_cursor)
        .any(|base| ctx.node_text(base) == "Profile");
    has_profile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_builds() {
        let rules = RuleSet::breaking_changes().unwrap();
        assert_eq!(rules.len(), 11);
        assert_eq!(rules.rules_for(NodeKind::Invocation).count(), 10);
        assert_eq!(rules.rules_for(NodeKind::TypeDeclaration).count(), 1);
    }

    #[test]
    fn test_invocation_rule_priority_order() {
        let rules = RuleSet::breaking_changes().unwrap();
        let ids: Vec<RuleId> = rules
            .rules_for(NodeKind::Invocation)
            .map(|r| r.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                RuleId::StaticInitialization,
                RuleId::ConfigurationStore,
                RuleId::ProfileInheritance,
                RuleId::CreateMapOverloads,
                RuleId::ForAllMembers,
                RuleId::ConstructUsingServiceLocator,
                RuleId::InaccessibleSetterIgnore,
                RuleId::CustomResolver,
                RuleId::CollectionPackage,
                RuleId::ValueConverter,
            ]
        );
    }

    #[test]
    fn test_all_rules_warning_severity() {
        let rules = RuleSet::breaking_changes().unwrap();
        assert!(rules.rules.iter().all(|r| r.severity == Severity::Warning));
    }

    #[test]
    fn test_rule_id_codes() {
        assert_eq!(RuleId::StaticInitialization.as_str(), "AR001");
        assert_eq!(RuleId::ValueConverter.as_str(), "AR010");
        let codes: Vec<&str> = RuleId::ALL.iter().map(|id| id.as_str()).collect();
        let mut deduped = codes.clone();
        deduped.dedup();
        assert_eq!(codes, deduped, "descriptor codes must be unique");
    }

    #[test]
    fn test_textual_match_plain() {
        let re = Regex::new(r"ForAllMembers\s*\(").unwrap();
        assert!(textual_match(&re, None, "x.ForAllMembers (o => o.Ignore())"));
        assert!(!textual_match(&re, None, "x.ForAllMembersTyped"));
    }

    #[test]
    fn test_textual_match_preceded_by_guard() {
        let re = Regex::new(r"\.ValueResolver\s*<.*?>").unwrap();
        // Qualified by the library's own namespace: not a custom resolver.
        assert!(!textual_match(
            &re,
            Some("AutoMapper"),
            "opt.MapFrom<AutoMapper.ValueResolver<Src, Dest, int>>()"
        ));
        // Unqualified reference: flagged.
        assert!(textual_match(
            &re,
            Some("AutoMapper"),
            "opt.MapFrom<My.ValueResolver<Src, Dest, int>>()"
        ));
    }

    #[test]
    fn test_finding_message_format() {
        let rules = RuleSet::breaking_changes().unwrap();
        let rule = rules.rules_for(NodeKind::Invocation).next().unwrap();
        let span = Span {
            start_byte: 0,
            end_byte: 5,
            start_line: 1,
            start_col: 1,
            end_line: 1,
            end_col: 6,
        };
        let finding = Finding::new(rule, "Startup.cs", span);
        assert_eq!(
            finding.message,
            "Breaking change: Static Mapper initialization found in file: Startup.cs"
        );
        assert_eq!(finding.rule, RuleId::StaticInitialization);
        assert_eq!(finding.severity, Severity::Warning);
    }
}
