//! Host actors and actor → component resolution.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::component::AbilityOwner;

/// Identifier of a host actor (the scene object an owning component lives on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(u64);

/// Global counter for generating unique actor IDs.
static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

impl ActorId {
    /// Allocate a fresh, process-unique actor ID.
    pub fn next() -> Self {
        Self(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Create an ActorId from a raw value, e.g. one read from configuration.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Looks up the owning component associated with a host actor.
pub trait ActorResolver: Send + Sync {
    /// Returns the actor's owning component, or `None` if the actor has none
    /// or it no longer exists.
    fn resolve(&self, actor: ActorId) -> Option<Arc<dyn AbilityOwner>>;
}

/// A resolver backed by a table of weak component references.
///
/// The registry never keeps a component alive: once the last strong
/// reference elsewhere is dropped, resolution for that actor fails.
#[derive(Default)]
pub struct ActorRegistry {
    components: RwLock<HashMap<ActorId, Weak<dyn AbilityOwner>>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a component with its avatar actor.
    pub fn register(&self, component: &Arc<dyn AbilityOwner>) -> ActorId {
        let actor = component.avatar();
        self.components
            .write()
            .insert(actor, Arc::downgrade(component));
        actor
    }

    /// Remove an actor. Returns `true` if it was registered.
    pub fn unregister(&self, actor: ActorId) -> bool {
        self.components.write().remove(&actor).is_some()
    }

    /// Drop entries whose component has been destroyed.
    pub fn purge_dead(&self) -> usize {
        let mut components = self.components.write();
        let before = components.len();
        components.retain(|_, component| component.strong_count() > 0);
        before - components.len()
    }

    pub fn len(&self) -> usize {
        self.components.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.read().is_empty()
    }
}

impl ActorResolver for ActorRegistry {
    fn resolve(&self, actor: ActorId) -> Option<Arc<dyn AbilityOwner>> {
        self.components.read().get(&actor).and_then(Weak::upgrade)
    }
}
