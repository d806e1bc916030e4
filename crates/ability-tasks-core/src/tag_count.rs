//! Tag counts and tag count notifications.
//!
//! A tag's count is how many sources currently apply it. Counts propagate up
//! the hierarchy: adding `State.Debuff.Stunned` also counts toward
//! `State.Debuff` and `State`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tag::{GameplayTag, TagContainer};

/// Which count mutations a tag listener is notified of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagEventType {
    /// Only when the count moves between zero and non-zero.
    #[default]
    NewOrRemoved,
    /// On every count change.
    AnyCountChange,
}

/// Selector for the tag event feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagEventSelector {
    pub tag: GameplayTag,
    pub event_type: TagEventType,
}

impl TagEventSelector {
    pub fn new(tag: GameplayTag, event_type: TagEventType) -> Self {
        Self { tag, event_type }
    }
}

/// Payload of a tag count notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCountChange {
    pub tag: GameplayTag,
    pub new_count: i32,
}

/// One count mutation produced by [`TagCountMap::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCountDelta {
    pub tag: GameplayTag,
    pub old_count: i32,
    pub new_count: i32,
}

impl TagCountDelta {
    /// Returns `true` if the count moved between zero and non-zero.
    pub fn is_new_or_removed(&self) -> bool {
        (self.old_count == 0) != (self.new_count == 0)
    }
}

/// Explicit and hierarchical tag counts.
#[derive(Debug, Default)]
pub struct TagCountMap {
    /// Counts of tags added directly.
    explicit: HashMap<GameplayTag, i32>,
    /// Counts including descendants.
    effective: HashMap<GameplayTag, i32>,
}

impl TagCountMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective count of a tag, including its descendants.
    pub fn count(&self, tag: &GameplayTag) -> i32 {
        self.effective.get(tag).copied().unwrap_or(0)
    }

    /// Count of a tag added directly.
    pub fn explicit_count(&self, tag: &GameplayTag) -> i32 {
        self.explicit.get(tag).copied().unwrap_or(0)
    }

    /// Tags added directly with a positive count.
    pub fn explicit_tags(&self) -> TagContainer {
        self.explicit
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    /// Change the explicit count of `tag` by `delta`, never going below zero.
    ///
    /// Counts saturate at `i32::MAX`. Returns the resulting count changes for
    /// the tag and each of its ancestors, the tag itself first; an ancestor
    /// whose count is already saturated is left out.
    pub fn update(&mut self, tag: &GameplayTag, delta: i32) -> Vec<TagCountDelta> {
        let old_explicit = self.explicit_count(tag);
        let new_explicit = old_explicit.saturating_add(delta).max(0);
        let applied = new_explicit - old_explicit;
        if applied == 0 {
            return Vec::new();
        }

        if new_explicit == 0 {
            self.explicit.remove(tag);
        } else {
            self.explicit.insert(tag.clone(), new_explicit);
        }

        std::iter::once(tag.clone())
            .chain(tag.parents())
            .filter_map(|affected| {
                let old_count = self.count(&affected);
                let new_count = old_count.saturating_add(applied).max(0);
                if new_count == old_count {
                    return None;
                }
                if new_count == 0 {
                    self.effective.remove(&affected);
                } else {
                    self.effective.insert(affected.clone(), new_count);
                }
                Some(TagCountDelta {
                    tag: affected,
                    old_count,
                    new_count,
                })
            })
            .collect()
    }
}
