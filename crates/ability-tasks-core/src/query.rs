//! Compound boolean queries over tag presence.
//!
//! A [`TagQuery`] is an expression tree of [`TagQueryExpr`] nodes, evaluated
//! against a [`TagContainer`] with hierarchical matching.
//!
//! # Example
//!
//! ```
//! use ability_tasks_core::{GameplayTag, TagContainer, TagQuery, TagQueryExpr};
//!
//! let stunned = GameplayTag::new("State.Stunned").unwrap();
//! let immune = GameplayTag::new("State.Immune").unwrap();
//!
//! // Stunned and not immune.
//! let query = TagQuery::new(TagQueryExpr::AllExprMatch(vec![
//!     TagQueryExpr::AllTagsMatch(vec![stunned.clone()]),
//!     TagQueryExpr::NoTagsMatch(vec![immune]),
//! ]));
//!
//! assert!(query.matches(&TagContainer::single(stunned)));
//! assert!(!query.matches(&TagContainer::new()));
//! ```
//!
//! In TOML configuration the same query reads:
//!
//! ```toml
//! [query]
//! all_expr = [
//!     { all_tags = ["State.Stunned"] },
//!     { no_tags = ["State.Immune"] },
//! ]
//! ```

use serde::{Deserialize, Serialize};

use crate::tag::{GameplayTag, TagContainer};

/// A node of a tag query expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagQueryExpr {
    /// True if any listed tag is present. False when the list is empty.
    #[serde(rename = "any_tags")]
    AnyTagsMatch(Vec<GameplayTag>),
    /// True if every listed tag is present. True when the list is empty.
    #[serde(rename = "all_tags")]
    AllTagsMatch(Vec<GameplayTag>),
    /// True if no listed tag is present. True when the list is empty.
    #[serde(rename = "no_tags")]
    NoTagsMatch(Vec<GameplayTag>),
    /// True if any sub-expression is true. False when the list is empty.
    #[serde(rename = "any_expr")]
    AnyExprMatch(Vec<TagQueryExpr>),
    /// True if every sub-expression is true. True when the list is empty.
    #[serde(rename = "all_expr")]
    AllExprMatch(Vec<TagQueryExpr>),
    /// True if no sub-expression is true. True when the list is empty.
    #[serde(rename = "no_expr")]
    NoExprMatch(Vec<TagQueryExpr>),
}

impl TagQueryExpr {
    /// Evaluate this node against a container.
    pub fn matches(&self, container: &TagContainer) -> bool {
        match self {
            Self::AnyTagsMatch(tags) => tags.iter().any(|tag| container.has_tag(tag)),
            Self::AllTagsMatch(tags) => tags.iter().all(|tag| container.has_tag(tag)),
            Self::NoTagsMatch(tags) => !tags.iter().any(|tag| container.has_tag(tag)),
            Self::AnyExprMatch(exprs) => exprs.iter().any(|expr| expr.matches(container)),
            Self::AllExprMatch(exprs) => exprs.iter().all(|expr| expr.matches(container)),
            Self::NoExprMatch(exprs) => !exprs.iter().any(|expr| expr.matches(container)),
        }
    }

    fn collect_tags(&self, out: &mut Vec<GameplayTag>) {
        match self {
            Self::AnyTagsMatch(tags) | Self::AllTagsMatch(tags) | Self::NoTagsMatch(tags) => {
                for tag in tags {
                    if !out.contains(tag) {
                        out.push(tag.clone());
                    }
                }
            }
            Self::AnyExprMatch(exprs) | Self::AllExprMatch(exprs) | Self::NoExprMatch(exprs) => {
                for expr in exprs {
                    expr.collect_tags(out);
                }
            }
        }
    }
}

/// A compound tag query. May be empty, in which case it never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagQuery {
    root: Option<TagQueryExpr>,
}

impl TagQuery {
    /// Create a query from a root expression.
    pub fn new(root: TagQueryExpr) -> Self {
        Self { root: Some(root) }
    }

    /// Create an empty query.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Query that is true when every tag of `tags` is present.
    pub fn match_all_tags(tags: &TagContainer) -> Self {
        Self::new(TagQueryExpr::AllTagsMatch(tags.iter().cloned().collect()))
    }

    /// Query that is true when any tag of `tags` is present.
    pub fn match_any_tags(tags: &TagContainer) -> Self {
        Self::new(TagQueryExpr::AnyTagsMatch(tags.iter().cloned().collect()))
    }

    /// Query that is true when no tag of `tags` is present.
    pub fn match_no_tags(tags: &TagContainer) -> Self {
        Self::new(TagQueryExpr::NoTagsMatch(tags.iter().cloned().collect()))
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<&TagQueryExpr> {
        self.root.as_ref()
    }

    /// Evaluate the query. An empty query never matches.
    pub fn matches(&self, container: &TagContainer) -> bool {
        self.root
            .as_ref()
            .is_some_and(|root| root.matches(container))
    }

    /// Distinct tags referenced anywhere in the query, in first-appearance order.
    pub fn referenced_tags(&self) -> Vec<GameplayTag> {
        let mut tags = Vec::new();
        if let Some(root) = &self.root {
            root.collect_tags(&mut tags);
        }
        tags
    }
}
