//! The ability-owning component contract and an in-memory implementation.
//!
//! Tasks only ever talk to an owner through [`AbilityOwner`]: four event
//! sources, the current tag counts and the avatar actor.
//! [`AbilitySystemComponent`] is a plain-storage implementation used by
//! embedders that do not bring their own, and by the tests.
//!
//! No lock is held while a feed broadcasts, so listeners may call back into
//! the component (apply another effect, add a tag, ...) from a callback.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::actor::ActorId;
use crate::attribute::{Attribute, AttributeChange};
use crate::effect::{ActiveEffectHandle, EffectApplication, EffectFeedKind, EffectSpec};
use crate::event::{GameplayEventData, GameplayEventNotice};
use crate::logging::targets;
use crate::source::{
    AttributeFeed, AttributeSource, EffectFeed, EffectSource, GameplayEventFeed,
    GameplayEventSource, TagEventFeed, TagEventSource,
};
use crate::tag::{GameplayTag, TagContainer};
use crate::tag_count::TagCountMap;

/// The contract every owning component offers to tasks.
pub trait AbilityOwner: Send + Sync {
    /// The host actor this component belongs to.
    fn avatar(&self) -> ActorId;

    /// Attribute value changes, per attribute.
    fn attribute_feed(&self) -> &AttributeSource;

    /// Effects applied to this component and periodic executions on it.
    fn effect_feed(&self) -> &EffectSource;

    /// Generic gameplay events sent to this component.
    fn event_feed(&self) -> &GameplayEventSource;

    /// Tag count mutations, per tag.
    fn tag_feed(&self) -> &TagEventSource;

    /// Current count of a tag (including descendant tags).
    fn tag_count(&self, tag: &GameplayTag) -> i32;
}

/// An effect currently active on a component.
struct ActiveEffect {
    spec: Arc<EffectSpec>,
    source: ActorId,
}

/// In-memory owning component.
///
/// # Example
///
/// ```
/// use ability_tasks_core::{AbilityOwner, AbilitySystemComponent, ActorId, GameplayTag};
///
/// let component = AbilitySystemComponent::new(ActorId::next());
/// let stunned = GameplayTag::new("State.Stunned").unwrap();
///
/// component.add_tag(&stunned, 1);
/// assert_eq!(component.tag_count(&stunned), 1);
/// ```
pub struct AbilitySystemComponent {
    avatar: ActorId,
    attributes: RwLock<HashMap<Attribute, f32>>,
    tags: Mutex<TagCountMap>,
    effects: Mutex<HashMap<ActiveEffectHandle, ActiveEffect>>,
    attribute_feed: AttributeFeed,
    effect_feed: EffectFeed,
    event_feed: GameplayEventFeed,
    tag_feed: TagEventFeed,
}

impl AbilitySystemComponent {
    /// Create a component for the given avatar actor.
    pub fn new(avatar: ActorId) -> Self {
        Self {
            avatar,
            attributes: RwLock::new(HashMap::new()),
            tags: Mutex::new(TagCountMap::new()),
            effects: Mutex::new(HashMap::new()),
            attribute_feed: AttributeFeed::new(),
            effect_feed: EffectFeed::new(),
            event_feed: GameplayEventFeed::new(),
            tag_feed: TagEventFeed::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    /// Current value of an attribute, if it has ever been set.
    pub fn attribute(&self, attribute: &Attribute) -> Option<f32> {
        self.attributes.read().get(attribute).copied()
    }

    /// Set an attribute value.
    ///
    /// Broadcasts (attribute, new, old) when the value changed. An unset
    /// attribute reads as `0.0` for the old value.
    pub fn set_attribute(&self, attribute: &Attribute, value: f32) {
        let old_value = self
            .attributes
            .write()
            .insert(attribute.clone(), value)
            .unwrap_or(0.0);
        if old_value == value {
            return;
        }
        tracing::trace!(target: targets::OWNER, %attribute, old_value, new_value = value, "attribute changed");
        self.attribute_feed.broadcast(AttributeChange {
            attribute: attribute.clone(),
            new_value: value,
            old_value,
        });
    }

    // -------------------------------------------------------------------------
    // Tags
    // -------------------------------------------------------------------------

    /// Add `count` stacks of a tag.
    pub fn add_tag(&self, tag: &GameplayTag, count: i32) {
        self.update_tag(tag, count);
    }

    /// Remove `count` stacks of a tag. The count never goes below zero.
    pub fn remove_tag(&self, tag: &GameplayTag, count: i32) {
        self.update_tag(tag, count.saturating_neg());
    }

    fn update_tag(&self, tag: &GameplayTag, delta: i32) {
        let deltas = self.tags.lock().update(tag, delta);
        if deltas.is_empty() {
            return;
        }
        tracing::trace!(target: targets::OWNER, %tag, delta, "tag count changed");
        self.tag_feed.broadcast(&deltas);
    }

    /// Returns `true` if the tag (or a descendant) is present.
    pub fn has_tag(&self, tag: &GameplayTag) -> bool {
        self.tags.lock().count(tag) > 0
    }

    /// Tags added directly to this component.
    pub fn owned_tags(&self) -> TagContainer {
        self.tags.lock().explicit_tags()
    }

    /// Number of tag listeners registered for a tag, across event types.
    pub fn tag_listener_count(&self, tag: &GameplayTag) -> usize {
        self.tag_feed.tag_listener_count(tag)
    }

    // -------------------------------------------------------------------------
    // Effects
    // -------------------------------------------------------------------------

    /// Apply an effect to this component.
    ///
    /// The spec is snapshotted with this component's owned tags captured as
    /// target tags, its granted tags are added, and the applied feed fires.
    pub fn apply_effect(&self, source: ActorId, spec: EffectSpec) -> ActiveEffectHandle {
        let mut spec = spec;
        spec.captured_target_tags = self.owned_tags();
        let spec = Arc::new(spec);
        let handle = ActiveEffectHandle::next();

        self.effects.lock().insert(
            handle,
            ActiveEffect {
                spec: spec.clone(),
                source,
            },
        );
        for tag in &spec.granted_tags {
            self.add_tag(tag, 1);
        }

        tracing::debug!(target: targets::OWNER, effect = %spec.name, handle = handle.as_u64(), "effect applied");
        self.effect_feed.broadcast(
            EffectFeedKind::Applied,
            EffectApplication {
                source,
                target: self.avatar,
                spec,
                handle,
            },
        );
        handle
    }

    /// Apply an effect from this component to `target`, capturing this
    /// component's owned tags as the source tags.
    pub fn apply_effect_to(&self, target: &AbilitySystemComponent, spec: EffectSpec) -> ActiveEffectHandle {
        target.apply_effect(self.avatar, spec.with_source_tags(self.owned_tags()))
    }

    /// Run one periodic execution of an active effect.
    ///
    /// Returns `false` if the handle is not active.
    pub fn execute_periodic(&self, handle: ActiveEffectHandle) -> bool {
        let active = self
            .effects
            .lock()
            .get(&handle)
            .map(|effect| (effect.spec.clone(), effect.source));
        let Some((spec, source)) = active else {
            return false;
        };
        self.effect_feed.broadcast(
            EffectFeedKind::PeriodicExecuted,
            EffectApplication {
                source,
                target: self.avatar,
                spec,
                handle,
            },
        );
        true
    }

    /// Remove an active effect and the tags it granted.
    pub fn remove_effect(&self, handle: ActiveEffectHandle) -> bool {
        let Some(effect) = self.effects.lock().remove(&handle) else {
            return false;
        };
        for tag in &effect.spec.granted_tags {
            self.remove_tag(tag, 1);
        }
        true
    }

    pub fn active_effect_count(&self) -> usize {
        self.effects.lock().len()
    }

    // -------------------------------------------------------------------------
    // Gameplay events
    // -------------------------------------------------------------------------

    /// Send a generic gameplay event to this component.
    pub fn send_gameplay_event(&self, tag: &GameplayTag, payload: Option<GameplayEventData>) {
        tracing::trace!(target: targets::OWNER, %tag, "gameplay event");
        self.event_feed.broadcast(GameplayEventNotice {
            tag: tag.clone(),
            payload,
        });
    }
}

impl AbilityOwner for AbilitySystemComponent {
    fn avatar(&self) -> ActorId {
        self.avatar
    }

    fn attribute_feed(&self) -> &AttributeSource {
        &self.attribute_feed
    }

    fn effect_feed(&self) -> &EffectSource {
        &self.effect_feed
    }

    fn event_feed(&self) -> &GameplayEventSource {
        &self.event_feed
    }

    fn tag_feed(&self) -> &TagEventSource {
        &self.tag_feed
    }

    fn tag_count(&self, tag: &GameplayTag) -> i32 {
        self.tags.lock().count(tag)
    }
}

static_assertions::assert_impl_all!(AbilitySystemComponent: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag_count::{TagEventSelector, TagEventType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tag(name: &str) -> GameplayTag {
        GameplayTag::new(name).unwrap()
    }

    #[test]
    fn test_set_attribute_broadcasts_changes_only() {
        let component = AbilitySystemComponent::new(ActorId::next());
        let health = Attribute::new("Health");
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        component.attribute_feed().subscribe(
            health.clone(),
            Arc::new(move |change: &AttributeChange| {
                received_clone.lock().push((change.old_value, change.new_value));
            }),
        );

        component.set_attribute(&health, 100.0);
        component.set_attribute(&health, 100.0);
        component.set_attribute(&health, 80.0);

        assert_eq!(*received.lock(), vec![(0.0, 100.0), (100.0, 80.0)]);
        assert_eq!(component.attribute(&health), Some(80.0));
    }

    #[test]
    fn test_apply_effect_snapshots_spec() {
        let source = AbilitySystemComponent::new(ActorId::next());
        let target = AbilitySystemComponent::new(ActorId::next());
        source.add_tag(&tag("Team.Red"), 1);
        target.add_tag(&tag("Team.Blue"), 1);

        let delivered = Arc::new(Mutex::new(None));
        let delivered_clone = delivered.clone();
        target.effect_feed().subscribe(
            EffectFeedKind::Applied,
            Arc::new(move |application: &EffectApplication| {
                *delivered_clone.lock() = Some(application.clone());
            }),
        );

        let spec = EffectSpec::new("Burn").with_granted_tags(TagContainer::single(tag("State.Burning")));
        let handle = source.apply_effect_to(&target, spec);

        let application = delivered.lock().clone().unwrap();
        assert_eq!(application.handle, handle);
        assert_eq!(application.source, source.avatar());
        assert_eq!(application.target, target.avatar());
        assert!(application.spec.captured_source_tags.has_tag_exact(&tag("Team.Red")));
        assert!(application.spec.captured_target_tags.has_tag_exact(&tag("Team.Blue")));
        // Granted tags are not part of the captured target tags.
        assert!(!application.spec.captured_target_tags.has_tag(&tag("State.Burning")));

        assert!(target.has_tag(&tag("State.Burning")));
        assert!(target.remove_effect(handle));
        assert!(!target.has_tag(&tag("State.Burning")));
        assert!(!target.execute_periodic(handle));
    }

    #[test]
    fn test_listener_may_reenter_component() {
        let component = Arc::new(AbilitySystemComponent::new(ActorId::next()));
        let calls = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&component);
        let calls_clone = calls.clone();
        component.tag_feed().subscribe(
            TagEventSelector::new(tag("A"), TagEventType::NewOrRemoved),
            Arc::new(move |change: &crate::tag_count::TagCountChange| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                if change.new_count > 0 {
                    if let Some(component) = weak.upgrade() {
                        component.add_tag(&tag("B"), 1);
                    }
                }
            }),
        );

        component.add_tag(&tag("A"), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(component.has_tag(&tag("B")));
    }

    #[test]
    fn test_extreme_tag_counts_saturate() {
        let component = AbilitySystemComponent::new(ActorId::next());
        component.add_tag(&tag("A"), i32::MAX);
        component.add_tag(&tag("A"), 1);
        assert_eq!(component.tag_count(&tag("A")), i32::MAX);

        component.remove_tag(&tag("A"), i32::MIN);
        assert_eq!(component.tag_count(&tag("A")), i32::MAX);
        component.remove_tag(&tag("A"), i32::MAX);
        assert!(!component.has_tag(&tag("A")));
    }
}
