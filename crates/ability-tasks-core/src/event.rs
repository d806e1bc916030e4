//! Generic gameplay event payloads and subscription matching.

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::tag::{GameplayTag, TagContainer};

/// Payload carried by a generic gameplay event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayEventData {
    /// The tag the event was matched on. Stamped by the receiving task.
    pub event_tag: Option<GameplayTag>,
    pub instigator: Option<ActorId>,
    pub target: Option<ActorId>,
    pub magnitude: f32,
    pub instigator_tags: TagContainer,
    pub target_tags: TagContainer,
}

/// A gameplay event as delivered by an owner's event feed.
#[derive(Debug, Clone)]
pub struct GameplayEventNotice {
    /// The tag the event was sent with.
    pub tag: GameplayTag,
    /// The payload, if the sender supplied one.
    pub payload: Option<GameplayEventData>,
}

/// How a listener selects gameplay events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventMatch {
    /// Only events sent with exactly this tag.
    Exact(GameplayTag),
    /// Events whose tag matches any tag of the container hierarchically.
    Container(TagContainer),
}

impl EventMatch {
    /// Returns `true` if an event sent with `tag` is selected.
    pub fn matches(&self, tag: &GameplayTag) -> bool {
        match self {
            Self::Exact(exact) => exact == tag,
            Self::Container(container) => container.iter().any(|wanted| tag.matches(wanted)),
        }
    }
}
