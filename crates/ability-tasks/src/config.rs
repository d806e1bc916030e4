//! Declarative waiter configuration.
//!
//! Each waiter can be built from a config struct. The structs deserialize
//! from TOML so that waiter parameters can live in game data:
//!
//! ```
//! use ability_tasks::config::{self, QueryTrigger, TagQueryConfig};
//!
//! let config: TagQueryConfig = config::from_toml_str(
//!     r#"
//!     trigger = "when_true"
//!     only_trigger_once = true
//!
//!     [query]
//!     all_tags = ["State.Stunned", "State.Grounded"]
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.trigger, QueryTrigger::WhenTrue);
//! assert_eq!(config.query.referenced_tags().len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use ability_tasks_core::{ActorId, Attribute, GameplayTag, Result, TagQuery, TagRequirements};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Parse a config struct from a TOML document.
pub fn from_toml_str<T: DeserializeOwned>(source: &str) -> Result<T> {
    Ok(toml::from_str(source)?)
}

/// Predicate over the actor an effect landed on.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFilter {
    /// Every recipient passes.
    #[default]
    Any,
    /// Only the listed actors pass.
    Only(Vec<ActorId>),
    /// Every actor except the listed ones passes.
    Except(Vec<ActorId>),
    /// A caller-supplied predicate.
    #[serde(skip)]
    Custom(Arc<dyn Fn(ActorId) -> bool + Send + Sync>),
}

impl TargetFilter {
    /// Wrap a predicate.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(ActorId) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    pub fn passes(&self, actor: ActorId) -> bool {
        match self {
            Self::Any => true,
            Self::Only(actors) => actors.contains(&actor),
            Self::Except(actors) => !actors.contains(&actor),
            Self::Custom(predicate) => predicate(actor),
        }
    }
}

impl fmt::Debug for TargetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Only(actors) => f.debug_tuple("Only").field(actors).finish(),
            Self::Except(actors) => f.debug_tuple("Except").field(actors).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Which edge of a tag query fires the waiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryTrigger {
    /// Fire when the query becomes true.
    #[default]
    WhenTrue,
    /// Fire when the query becomes false.
    WhenFalse,
}

impl QueryTrigger {
    /// Returns `true` if a query now in `state` satisfies this trigger.
    pub fn is_satisfied_by(self, state: bool) -> bool {
        match self {
            Self::WhenTrue => state,
            Self::WhenFalse => !state,
        }
    }
}

/// Parameters of [`WaitAttributeChanged`](crate::WaitAttributeChanged).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeChangedConfig {
    pub attributes: Vec<Attribute>,
    pub only_trigger_once: bool,
}

/// Parameters of [`WaitEffectApplied`](crate::WaitEffectApplied).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectAppliedConfig {
    pub target_filter: TargetFilter,
    /// Checked against the effect spec's captured source tags.
    pub source_requirements: TagRequirements,
    /// Checked against the effect spec's captured target tags.
    pub target_requirements: TagRequirements,
    /// Also listen to periodic executions of active effects.
    pub listen_for_periodic: bool,
    pub trigger_once: bool,
}

fn default_true() -> bool {
    true
}

/// Parameters of [`WaitGameplayEvent`](crate::WaitGameplayEvent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameplayEventConfig {
    pub tag: GameplayTag,
    #[serde(default)]
    pub only_trigger_once: bool,
    /// When `false`, events with descendant tags are received too.
    #[serde(default = "default_true")]
    pub only_match_exact: bool,
}

/// Parameters of [`WaitTagCountReached`](crate::WaitTagCountReached).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCountConfig {
    pub tag: GameplayTag,
    /// 1 waits for the tag to be added, 0 for it to be removed.
    pub target_count: i32,
    #[serde(default)]
    pub only_trigger_once: bool,
}

/// Parameters of [`WaitTagCountChanged`](crate::WaitTagCountChanged).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagCountChangedConfig {
    pub tags: Vec<GameplayTag>,
    pub only_trigger_once: bool,
}

/// Parameters of [`WaitTagQuery`](crate::WaitTagQuery).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagQueryConfig {
    pub query: TagQuery,
    pub trigger: QueryTrigger,
    pub only_trigger_once: bool,
}
