use std::sync::Arc;

use ability_tasks_core::logging::targets;
use ability_tasks_core::{
    AbilityOwner, GameplayTag, Signal, TagCountChange, TagEventSelector, TagEventType,
};

use crate::config::TagCountConfig;
use crate::listener::{Registrations, bind};
use crate::task::{AsyncTask, TaskCore, TaskOwner};

/// Waits for a tag's count to become exactly a target value.
///
/// Only changes that cross zero are observed, so [`tag_added`](Self::tag_added)
/// fires on 0 → 1 and [`tag_removed`](Self::tag_removed) on a drop to 0.
/// Adding several stacks at once (0 → 2) does not fire an added waiter.
pub struct WaitTagCountReached {
    core: TaskCore,
    tag: GameplayTag,
    target_count: i32,
    only_trigger_once: bool,
    registrations: Registrations<TagEventSelector>,
    reached: Signal<GameplayTag>,
}

impl WaitTagCountReached {
    /// Wait for `tag` to be added.
    pub fn tag_added(owner: impl Into<TaskOwner>, tag: GameplayTag, only_trigger_once: bool) -> Arc<Self> {
        Self::from_config(
            owner,
            TagCountConfig {
                tag,
                target_count: 1,
                only_trigger_once,
            },
        )
    }

    /// Wait for `tag` to be removed.
    pub fn tag_removed(owner: impl Into<TaskOwner>, tag: GameplayTag, only_trigger_once: bool) -> Arc<Self> {
        Self::from_config(
            owner,
            TagCountConfig {
                tag,
                target_count: 0,
                only_trigger_once,
            },
        )
    }

    pub fn from_config(owner: impl Into<TaskOwner>, config: TagCountConfig) -> Arc<Self> {
        Arc::new(Self {
            core: TaskCore::new("wait_tag_count_reached", owner.into()),
            tag: config.tag,
            target_count: config.target_count,
            only_trigger_once: config.only_trigger_once,
            registrations: Registrations::new(),
            reached: Signal::new(),
        })
    }

    /// Emitted with the watched tag when its count reaches the target.
    pub fn reached(&self) -> &Signal<GameplayTag> {
        &self.reached
    }

    pub fn tag(&self) -> &GameplayTag {
        &self.tag
    }

    pub fn target_count(&self) -> i32 {
        self.target_count
    }

    fn on_tag_changed(&self, change: &TagCountChange) {
        if !self.ready_to_broadcast() {
            return;
        }
        if change.new_count != self.target_count {
            tracing::trace!(
                target: targets::WAITER,
                tag = %change.tag,
                count = change.new_count,
                target_count = self.target_count,
                "count ignored"
            );
            return;
        }
        if self.only_trigger_once {
            self.end_action();
        }
        self.reached.emit(change.tag.clone());
    }
}

impl AsyncTask for WaitTagCountReached {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn on_activate(self: &Arc<Self>, owner: &Arc<dyn AbilityOwner>) {
        self.registrations.subscribe(
            owner.tag_feed(),
            TagEventSelector::new(self.tag.clone(), TagEventType::NewOrRemoved),
            bind(self, Self::on_tag_changed),
        );
    }

    fn on_end(&self, owner: Option<&Arc<dyn AbilityOwner>>) {
        self.registrations
            .unsubscribe_all(owner.map(|owner| owner.tag_feed()));
    }
}
