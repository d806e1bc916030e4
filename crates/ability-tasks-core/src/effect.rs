//! Gameplay effect specifications and application notices.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::tag::TagContainer;

/// Handle identifying an effect instance active on a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveEffectHandle(u64);

/// Global counter for generating unique effect handles.
static NEXT_EFFECT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl ActiveEffectHandle {
    pub(crate) fn next() -> Self {
        Self(NEXT_EFFECT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A gameplay effect specification.
///
/// The captured tag containers are the aggregated source and target tags at
/// the moment the spec was applied. Owners hand specs out as immutable
/// `Arc<EffectSpec>` snapshots, so a delivered spec never changes afterward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSpec {
    /// Name of the effect definition.
    pub name: String,
    pub level: f32,
    /// Tags granted to the target while the effect is active.
    pub granted_tags: TagContainer,
    /// Tags of the source, captured at application.
    pub captured_source_tags: TagContainer,
    /// Tags of the target, captured at application.
    pub captured_target_tags: TagContainer,
}

impl EffectSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: 1.0,
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: f32) -> Self {
        self.level = level;
        self
    }

    pub fn with_granted_tags(mut self, tags: TagContainer) -> Self {
        self.granted_tags = tags;
        self
    }

    pub fn with_source_tags(mut self, tags: TagContainer) -> Self {
        self.captured_source_tags = tags;
        self
    }
}

/// Which effect feed a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectFeedKind {
    /// An effect was applied to the owner.
    Applied,
    /// A periodic effect on the owner executed.
    PeriodicExecuted,
}

/// Notification payload of the effect feeds.
#[derive(Debug, Clone)]
pub struct EffectApplication {
    /// Avatar of the component that originated the effect.
    pub source: ActorId,
    /// Avatar of the component the effect landed on.
    pub target: ActorId,
    pub spec: Arc<EffectSpec>,
    pub handle: ActiveEffectHandle,
}
