//! Ability Tasks - cancellable wait tasks for gameplay abilities.
//!
//! A wait task watches an ability-owning component without keeping it alive
//! and turns the component's broadcasts into caller-facing notifications:
//! attribute changes, effect applications, gameplay events, tag additions and
//! removals, tag count changes and compound tag queries.
//!
//! This crate re-exports everything from `ability-tasks-core`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ability_tasks::{
//!     AbilitySystemComponent, ActorId, AsyncTask, Attribute, TaskState, WaitAttributeChanged,
//! };
//!
//! let owner = Arc::new(AbilitySystemComponent::new(ActorId::next()));
//! let health = Attribute::new("Health");
//!
//! let task = WaitAttributeChanged::new(&owner, health.clone(), true);
//! task.changed().connect(|change| {
//!     println!("{}: {} -> {}", change.attribute, change.old_value, change.new_value);
//! });
//! task.activate();
//!
//! owner.set_attribute(&health, 75.0);
//! assert_eq!(task.state(), TaskState::Ended);
//! ```

pub mod config;
mod listener;
mod set;
mod task;
pub mod wait;

pub use ability_tasks_core::*;

pub use config::{
    AttributeChangedConfig, EffectAppliedConfig, GameplayEventConfig, QueryTrigger, TagCountChangedConfig,
    TagCountConfig, TagQueryConfig, TargetFilter,
};
pub use set::TaskSet;
pub use task::{AsyncTask, TaskCore, TaskId, TaskOwner, TaskState};
pub use wait::{
    WaitAttributeChanged, WaitEffectApplied, WaitGameplayEvent, WaitTagCountChanged, WaitTagCountReached,
    WaitTagQuery,
};

static_assertions::assert_impl_all!(TaskOwner: Send, Sync);
static_assertions::assert_impl_all!(TaskSet: Send, Sync);
static_assertions::assert_impl_all!(WaitAttributeChanged: Send, Sync);
static_assertions::assert_impl_all!(WaitEffectApplied: Send, Sync);
static_assertions::assert_impl_all!(WaitGameplayEvent: Send, Sync);
static_assertions::assert_impl_all!(WaitTagCountChanged: Send, Sync);
static_assertions::assert_impl_all!(WaitTagCountReached: Send, Sync);
static_assertions::assert_impl_all!(WaitTagQuery: Send, Sync);
