//! Core systems for ability tasks.
//!
//! This crate provides everything the wait tasks in `ability-tasks` are built
//! on:
//!
//! - **Gameplay Tags**: Hierarchical labels, tag containers and requirements
//! - **Tag Queries**: Compound boolean expressions over tag presence
//! - **Listener Registries**: Ordered, reentrancy-safe multicast signals
//! - **Event Sources**: One subscribe/unsubscribe capability per owner feed
//! - **Owner Contract**: [`AbilityOwner`] plus the in-memory
//!   [`AbilitySystemComponent`] and actor → component resolution
//! - **Cancellation**: Cooperative [`CancellationToken`]s
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ability_tasks_core::{
//!     AbilityOwner, AbilitySystemComponent, ActorId, EventSource, GameplayTag,
//!     TagCountChange, TagEventSelector, TagEventType,
//! };
//!
//! let component = AbilitySystemComponent::new(ActorId::next());
//! let stunned = GameplayTag::new("State.Stunned").unwrap();
//!
//! let handle = component.tag_feed().subscribe(
//!     TagEventSelector::new(stunned.clone(), TagEventType::NewOrRemoved),
//!     Arc::new(|change: &TagCountChange| println!("{} -> {}", change.tag, change.new_count)),
//! );
//!
//! component.add_tag(&stunned, 1);
//! assert!(component.tag_feed().unsubscribe(&handle));
//! ```

pub mod actor;
pub mod attribute;
mod cancel;
pub mod component;
pub mod effect;
mod error;
pub mod event;
pub mod logging;
pub mod query;
pub mod signal;
pub mod source;
pub mod tag;
pub mod tag_count;

pub use actor::{ActorId, ActorRegistry, ActorResolver};
pub use attribute::{Attribute, AttributeChange};
pub use cancel::CancellationToken;
pub use component::{AbilityOwner, AbilitySystemComponent};
pub use effect::{ActiveEffectHandle, EffectApplication, EffectFeedKind, EffectSpec};
pub use error::{Error, Result};
pub use event::{EventMatch, GameplayEventData, GameplayEventNotice};
pub use query::{TagQuery, TagQueryExpr};
pub use signal::{ConnectionId, KeyedSignal, Signal, Slot};
pub use source::{
    AttributeFeed, AttributeSource, EffectFeed, EffectSource, EventSource, GameplayEventFeed,
    GameplayEventSource, ListenerHandle, TagEventFeed, TagEventSource,
};
pub use tag::{GameplayTag, TagContainer, TagRequirements};
pub use tag_count::{TagCountChange, TagCountDelta, TagCountMap, TagEventSelector, TagEventType};
