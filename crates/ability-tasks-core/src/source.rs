//! The event source capability and the owner feeds that implement it.
//!
//! Every owner broadcast a task can listen to is reached through the single
//! [`EventSource`] trait: `subscribe(selector, callback) -> handle` and
//! `unsubscribe(handle)`. The selector type is what differs between feeds:
//!
//! | Feed                  | Selector            | Payload                 |
//! |-----------------------|---------------------|-------------------------|
//! | [`AttributeFeed`]     | [`Attribute`]       | [`AttributeChange`]     |
//! | [`EffectFeed`]        | [`EffectFeedKind`]  | [`EffectApplication`]   |
//! | [`GameplayEventFeed`] | [`EventMatch`]      | [`GameplayEventNotice`] |
//! | [`TagEventFeed`]      | [`TagEventSelector`]| [`TagCountChange`]      |

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::attribute::{Attribute, AttributeChange};
use crate::effect::{EffectApplication, EffectFeedKind};
use crate::event::{EventMatch, GameplayEventNotice};
use crate::signal::{ConnectionId, KeyedSignal, Signal, Slot};
use crate::tag::GameplayTag;
use crate::tag_count::{TagCountChange, TagCountDelta, TagEventSelector, TagEventType};

/// A registration on an [`EventSource`], used to unsubscribe it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerHandle<S> {
    selector: S,
    id: ConnectionId,
}

impl<S> ListenerHandle<S> {
    pub fn new(selector: S, id: ConnectionId) -> Self {
        Self { selector, id }
    }

    pub fn selector(&self) -> &S {
        &self.selector
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

/// A subscribable stream of owner notifications.
pub trait EventSource: Send + Sync {
    /// What a listener selects on (an attribute, a tag, ...).
    type Selector: Clone + Send + Sync + 'static;
    /// The notification payload.
    type Args: 'static;

    /// Register a callback for the selected notifications.
    fn subscribe(
        &self,
        selector: Self::Selector,
        callback: Slot<Self::Args>,
    ) -> ListenerHandle<Self::Selector>;

    /// Remove a registration. Returns `false` if it was already removed.
    fn unsubscribe(&self, handle: &ListenerHandle<Self::Selector>) -> bool;

    /// Number of callbacks registered for a selector.
    fn listener_count(&self, selector: &Self::Selector) -> usize;
}

/// Attribute change source as seen by tasks.
pub type AttributeSource = dyn EventSource<Selector = Attribute, Args = AttributeChange>;
/// Effect application source as seen by tasks.
pub type EffectSource = dyn EventSource<Selector = EffectFeedKind, Args = EffectApplication>;
/// Gameplay event source as seen by tasks.
pub type GameplayEventSource = dyn EventSource<Selector = EventMatch, Args = GameplayEventNotice>;
/// Tag count source as seen by tasks.
pub type TagEventSource = dyn EventSource<Selector = TagEventSelector, Args = TagCountChange>;

/// Per-attribute change notifications.
#[derive(Default)]
pub struct AttributeFeed {
    listeners: KeyedSignal<Attribute, AttributeChange>,
}

impl AttributeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast(&self, change: AttributeChange) {
        let attribute = change.attribute.clone();
        self.listeners.emit(&attribute, change);
    }
}

impl EventSource for AttributeFeed {
    type Selector = Attribute;
    type Args = AttributeChange;

    fn subscribe(&self, selector: Attribute, callback: Slot<AttributeChange>) -> ListenerHandle<Attribute> {
        let id = self.listeners.connect_slot(selector.clone(), callback);
        ListenerHandle::new(selector, id)
    }

    fn unsubscribe(&self, handle: &ListenerHandle<Attribute>) -> bool {
        self.listeners.disconnect(handle.selector(), handle.id())
    }

    fn listener_count(&self, selector: &Attribute) -> usize {
        self.listeners.connection_count(selector)
    }
}

/// The "applied to self" and "periodic executed on self" effect feeds.
#[derive(Default)]
pub struct EffectFeed {
    applied: Signal<EffectApplication>,
    periodic_executed: Signal<EffectApplication>,
}

impl EffectFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn signal(&self, kind: EffectFeedKind) -> &Signal<EffectApplication> {
        match kind {
            EffectFeedKind::Applied => &self.applied,
            EffectFeedKind::PeriodicExecuted => &self.periodic_executed,
        }
    }

    pub fn broadcast(&self, kind: EffectFeedKind, application: EffectApplication) {
        self.signal(kind).emit(application);
    }
}

impl EventSource for EffectFeed {
    type Selector = EffectFeedKind;
    type Args = EffectApplication;

    fn subscribe(
        &self,
        selector: EffectFeedKind,
        callback: Slot<EffectApplication>,
    ) -> ListenerHandle<EffectFeedKind> {
        let id = self.signal(selector).connect_slot(callback);
        ListenerHandle::new(selector, id)
    }

    fn unsubscribe(&self, handle: &ListenerHandle<EffectFeedKind>) -> bool {
        self.signal(*handle.selector()).disconnect(handle.id())
    }

    fn listener_count(&self, selector: &EffectFeedKind) -> usize {
        self.signal(*selector).connection_count()
    }
}

/// Generic gameplay events, by exact tag or by container match.
///
/// Exact-tag listeners run before container listeners.
#[derive(Default)]
pub struct GameplayEventFeed {
    exact: KeyedSignal<GameplayTag, GameplayEventNotice>,
    matching: Signal<GameplayEventNotice>,
    /// Selector of each container listener, for counting and teardown.
    containers: Mutex<HashMap<ConnectionId, EventMatch>>,
}

impl GameplayEventFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast(&self, notice: GameplayEventNotice) {
        let tag = notice.tag.clone();
        self.exact.emit(&tag, notice.clone());
        self.matching.emit(notice);
    }
}

impl EventSource for GameplayEventFeed {
    type Selector = EventMatch;
    type Args = GameplayEventNotice;

    fn subscribe(
        &self,
        selector: EventMatch,
        callback: Slot<GameplayEventNotice>,
    ) -> ListenerHandle<EventMatch> {
        let id = match &selector {
            EventMatch::Exact(tag) => self.exact.connect_slot(tag.clone(), callback),
            EventMatch::Container(_) => {
                let filter = selector.clone();
                let id = self.matching.connect(move |notice: &GameplayEventNotice| {
                    if filter.matches(&notice.tag) {
                        callback(notice);
                    }
                });
                self.containers.lock().insert(id, selector.clone());
                id
            }
        };
        ListenerHandle::new(selector, id)
    }

    fn unsubscribe(&self, handle: &ListenerHandle<EventMatch>) -> bool {
        match handle.selector() {
            EventMatch::Exact(tag) => self.exact.disconnect(tag, handle.id()),
            EventMatch::Container(_) => {
                self.containers.lock().remove(&handle.id());
                self.matching.disconnect(handle.id())
            }
        }
    }

    fn listener_count(&self, selector: &EventMatch) -> usize {
        match selector {
            EventMatch::Exact(tag) => self.exact.connection_count(tag),
            EventMatch::Container(_) => self
                .containers
                .lock()
                .values()
                .filter(|registered| *registered == selector)
                .count(),
        }
    }
}

/// Tag count notifications, per tag and event type.
#[derive(Default)]
pub struct TagEventFeed {
    listeners: KeyedSignal<TagEventSelector, TagCountChange>,
}

impl TagEventFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify listeners of a batch of count changes.
    ///
    /// For each change, `NewOrRemoved` listeners run first (only when the
    /// count crossed zero), then `AnyCountChange` listeners.
    pub fn broadcast(&self, deltas: &[TagCountDelta]) {
        for delta in deltas {
            let change = TagCountChange {
                tag: delta.tag.clone(),
                new_count: delta.new_count,
            };
            if delta.is_new_or_removed() {
                let selector = TagEventSelector::new(delta.tag.clone(), TagEventType::NewOrRemoved);
                self.listeners.emit(&selector, change.clone());
            }
            let selector = TagEventSelector::new(delta.tag.clone(), TagEventType::AnyCountChange);
            self.listeners.emit(&selector, change);
        }
    }

    /// Number of listeners on a tag across both event types.
    pub fn tag_listener_count(&self, tag: &GameplayTag) -> usize {
        [TagEventType::NewOrRemoved, TagEventType::AnyCountChange]
            .into_iter()
            .map(|event_type| {
                self.listeners
                    .connection_count(&TagEventSelector::new(tag.clone(), event_type))
            })
            .sum()
    }
}

impl EventSource for TagEventFeed {
    type Selector = TagEventSelector;
    type Args = TagCountChange;

    fn subscribe(
        &self,
        selector: TagEventSelector,
        callback: Slot<TagCountChange>,
    ) -> ListenerHandle<TagEventSelector> {
        let id = self.listeners.connect_slot(selector.clone(), callback);
        ListenerHandle::new(selector, id)
    }

    fn unsubscribe(&self, handle: &ListenerHandle<TagEventSelector>) -> bool {
        self.listeners.disconnect(handle.selector(), handle.id())
    }

    fn listener_count(&self, selector: &TagEventSelector) -> usize {
        self.listeners.connection_count(selector)
    }
}

static_assertions::assert_impl_all!(AttributeFeed: Send, Sync);
static_assertions::assert_impl_all!(GameplayEventFeed: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagContainer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tag(name: &str) -> GameplayTag {
        GameplayTag::new(name).unwrap()
    }

    fn counter_slot<A: 'static>(counter: &Arc<AtomicUsize>) -> Slot<A> {
        let counter = counter.clone();
        Arc::new(move |_: &A| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_event_feed_exact_and_container() {
        let feed = GameplayEventFeed::new();
        let exact_calls = Arc::new(AtomicUsize::new(0));
        let container_calls = Arc::new(AtomicUsize::new(0));

        let exact = feed.subscribe(EventMatch::Exact(tag("Event.Hit")), counter_slot(&exact_calls));
        let container_selector = EventMatch::Container(TagContainer::single(tag("Event")));
        let container = feed.subscribe(container_selector.clone(), counter_slot(&container_calls));

        assert_eq!(feed.listener_count(&container_selector), 1);

        for name in ["Event.Hit", "Event.Hit.Critical", "Other"] {
            feed.broadcast(GameplayEventNotice {
                tag: tag(name),
                payload: None,
            });
        }

        assert_eq!(exact_calls.load(Ordering::SeqCst), 1);
        assert_eq!(container_calls.load(Ordering::SeqCst), 2);

        assert!(feed.unsubscribe(&exact));
        assert!(feed.unsubscribe(&container));
        assert!(!feed.unsubscribe(&container));
        assert_eq!(feed.listener_count(&container_selector), 0);
    }

    #[test]
    fn test_tag_feed_event_types() {
        let feed = TagEventFeed::new();
        let edge_calls = Arc::new(AtomicUsize::new(0));
        let any_calls = Arc::new(AtomicUsize::new(0));

        feed.subscribe(
            TagEventSelector::new(tag("A"), TagEventType::NewOrRemoved),
            counter_slot(&edge_calls),
        );
        feed.subscribe(
            TagEventSelector::new(tag("A"), TagEventType::AnyCountChange),
            counter_slot(&any_calls),
        );
        assert_eq!(feed.tag_listener_count(&tag("A")), 2);

        let step = |old_count, new_count| TagCountDelta {
            tag: tag("A"),
            old_count,
            new_count,
        };
        feed.broadcast(&[step(0, 1)]);
        feed.broadcast(&[step(1, 2)]);
        feed.broadcast(&[step(2, 1)]);
        feed.broadcast(&[step(1, 0)]);

        assert_eq!(edge_calls.load(Ordering::SeqCst), 2);
        assert_eq!(any_calls.load(Ordering::SeqCst), 4);
    }
}
