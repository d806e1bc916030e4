use std::sync::Arc;

use ability_tasks_core::{
    AbilityOwner, EventMatch, GameplayEventData, GameplayEventNotice, GameplayTag, Signal,
    TagContainer,
};

use crate::config::GameplayEventConfig;
use crate::listener::{Registrations, bind};
use crate::task::{AsyncTask, TaskCore, TaskOwner};

/// Waits for a generic gameplay event.
///
/// In exact mode only events with the configured tag are received; otherwise
/// events whose tag is the configured tag or one of its descendants are. The
/// forwarded payload always carries the tag the event was sent with.
pub struct WaitGameplayEvent {
    core: TaskCore,
    selector: EventMatch,
    only_trigger_once: bool,
    registrations: Registrations<EventMatch>,
    received: Signal<GameplayEventData>,
}

impl WaitGameplayEvent {
    pub fn new(
        owner: impl Into<TaskOwner>,
        tag: GameplayTag,
        only_trigger_once: bool,
        only_match_exact: bool,
    ) -> Arc<Self> {
        Self::from_config(
            owner,
            GameplayEventConfig {
                tag,
                only_trigger_once,
                only_match_exact,
            },
        )
    }

    pub fn from_config(owner: impl Into<TaskOwner>, config: GameplayEventConfig) -> Arc<Self> {
        let selector = if config.only_match_exact {
            EventMatch::Exact(config.tag)
        } else {
            EventMatch::Container(TagContainer::single(config.tag))
        };
        Arc::new(Self {
            core: TaskCore::new("wait_gameplay_event", owner.into()),
            selector,
            only_trigger_once: config.only_trigger_once,
            registrations: Registrations::new(),
            received: Signal::new(),
        })
    }

    /// Emitted with the payload of each received event.
    pub fn received(&self) -> &Signal<GameplayEventData> {
        &self.received
    }

    fn on_event(&self, notice: &GameplayEventNotice) {
        if !self.ready_to_broadcast() {
            return;
        }
        let mut payload = notice.payload.clone().unwrap_or_default();
        payload.event_tag = Some(notice.tag.clone());

        if self.only_trigger_once {
            self.end_action();
        }
        self.received.emit(payload);
    }
}

impl AsyncTask for WaitGameplayEvent {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn on_activate(self: &Arc<Self>, owner: &Arc<dyn AbilityOwner>) {
        self.registrations.subscribe(
            owner.event_feed(),
            self.selector.clone(),
            bind(self, Self::on_event),
        );
    }

    fn on_end(&self, owner: Option<&Arc<dyn AbilityOwner>>) {
        self.registrations
            .unsubscribe_all(owner.map(|owner| owner.event_feed()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;
    use crate::wait::test_util::{component, record, tag};
    use ability_tasks_core::ActorId;

    #[test]
    fn test_exact_mode_stamps_tag() {
        let owner = component();
        let task = WaitGameplayEvent::new(&owner, tag("Event.Hit"), false, true);
        let received = record(task.received());
        task.activate();

        let instigator = ActorId::next();
        owner.send_gameplay_event(
            &tag("Event.Hit"),
            Some(GameplayEventData {
                instigator: Some(instigator),
                magnitude: 12.5,
                ..GameplayEventData::default()
            }),
        );
        owner.send_gameplay_event(&tag("Event.Hit.Critical"), None);
        owner.send_gameplay_event(&tag("Event.Miss"), None);

        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].event_tag, Some(tag("Event.Hit")));
        assert_eq!(received[0].instigator, Some(instigator));
        assert_eq!(received[0].magnitude, 12.5);
    }

    #[test]
    fn test_hierarchical_mode() {
        let owner = component();
        let task = WaitGameplayEvent::new(&owner, tag("Event.Hit"), false, false);
        let received = record(task.received());
        task.activate();

        owner.send_gameplay_event(&tag("Event.Hit.Critical"), None);
        owner.send_gameplay_event(&tag("Event"), None);
        owner.send_gameplay_event(&tag("Event.Hit"), None);

        let tags: Vec<_> = received
            .lock()
            .iter()
            .filter_map(|payload| payload.event_tag.clone())
            .collect();
        assert_eq!(tags, [tag("Event.Hit.Critical"), tag("Event.Hit")]);
        // Empty payloads are defaulted.
        assert_eq!(received.lock()[0].magnitude, 0.0);
    }

    #[test]
    fn test_once_only_unregisters() {
        let owner = component();
        let task = WaitGameplayEvent::new(&owner, tag("Event.Land"), true, false);
        let received = record(task.received());
        task.activate();
        let selector = EventMatch::Container(TagContainer::single(tag("Event.Land")));
        assert_eq!(owner.event_feed().listener_count(&selector), 1);

        owner.send_gameplay_event(&tag("Event.Land"), None);
        owner.send_gameplay_event(&tag("Event.Land"), None);

        assert_eq!(received.lock().len(), 1);
        assert_eq!(task.state(), TaskState::Ended);
        assert_eq!(owner.event_feed().listener_count(&selector), 0);
    }
}
