use std::sync::Arc;

use ability_tasks_core::{
    AbilityOwner, GameplayTag, Signal, TagCountChange, TagEventSelector, TagEventType,
};

use crate::config::TagCountChangedConfig;
use crate::listener::{Registrations, bind};
use crate::task::{AsyncTask, TaskCore, TaskOwner};

/// Forwards every count change of the watched tags.
pub struct WaitTagCountChanged {
    core: TaskCore,
    tags: Vec<GameplayTag>,
    only_trigger_once: bool,
    registrations: Registrations<TagEventSelector>,
    count_changed: Signal<TagCountChange>,
}

impl WaitTagCountChanged {
    pub fn new(owner: impl Into<TaskOwner>, tag: GameplayTag) -> Arc<Self> {
        Self::from_config(
            owner,
            TagCountChangedConfig {
                tags: vec![tag],
                only_trigger_once: false,
            },
        )
    }

    pub fn from_config(owner: impl Into<TaskOwner>, config: TagCountChangedConfig) -> Arc<Self> {
        Arc::new(Self {
            core: TaskCore::new("wait_tag_count_changed", owner.into()),
            tags: config.tags,
            only_trigger_once: config.only_trigger_once,
            registrations: Registrations::new(),
            count_changed: Signal::new(),
        })
    }

    pub fn count_changed(&self) -> &Signal<TagCountChange> {
        &self.count_changed
    }

    fn on_count_changed(&self, change: &TagCountChange) {
        if !self.ready_to_broadcast() {
            return;
        }
        if self.only_trigger_once {
            self.end_action();
        }
        self.count_changed.emit(change.clone());
    }
}

impl AsyncTask for WaitTagCountChanged {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn on_activate(self: &Arc<Self>, owner: &Arc<dyn AbilityOwner>) {
        for tag in &self.tags {
            self.registrations.subscribe(
                owner.tag_feed(),
                TagEventSelector::new(tag.clone(), TagEventType::AnyCountChange),
                bind(self, Self::on_count_changed),
            );
        }
    }

    fn on_end(&self, owner: Option<&Arc<dyn AbilityOwner>>) {
        self.registrations
            .unsubscribe_all(owner.map(|owner| owner.tag_feed()));
    }
}
