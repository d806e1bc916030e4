//! Edge-triggered tag query waiter.
//!
//! The waiter keeps a snapshot of which queried tags are present on the
//! owner. The snapshot is seeded at activation and then patched one tag at a
//! time from per-tag count notifications; after every patch the whole query
//! is evaluated against the snapshot and compared with the previous result.
//! Only a change of the result can fire, and only in the direction the
//! trigger asks for.

use std::collections::HashMap;
use std::sync::Arc;

use ability_tasks_core::logging::targets;
use ability_tasks_core::{
    AbilityOwner, GameplayTag, ListenerHandle, Signal, TagContainer, TagCountChange,
    TagEventSelector, TagEventType, TagQuery,
};
use parking_lot::Mutex;

use crate::config::{QueryTrigger, TagQueryConfig};
use crate::listener::bind;
use crate::task::{AsyncTask, TaskCore, TaskOwner};

struct QueryState {
    /// Queried tags whose count on the owner is above zero.
    snapshot: TagContainer,
    /// Result of the last evaluation.
    query_state: bool,
    listeners: HashMap<GameplayTag, ListenerHandle<TagEventSelector>>,
    /// Set once every listener is registered; evaluation waits for it.
    registered: bool,
}

impl QueryState {
    fn update_target_tags(&mut self, tag: &GameplayTag, new_count: i32) {
        if new_count > 0 {
            self.snapshot.add_tag(tag.clone());
        } else {
            self.snapshot.remove_tag(tag);
        }
    }
}

/// Waits for a tag query to become true or false.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ability_tasks::{
///     AbilitySystemComponent, ActorId, AsyncTask, GameplayTag, QueryTrigger, TagQuery,
///     WaitTagQuery,
/// };
///
/// let owner = Arc::new(AbilitySystemComponent::new(ActorId::next()));
/// let wet = GameplayTag::new("State.Wet").unwrap();
/// let cold = GameplayTag::new("State.Cold").unwrap();
/// let query = TagQuery::match_all_tags(&[wet.clone(), cold.clone()].into_iter().collect());
///
/// let task = WaitTagQuery::new(&owner, query, QueryTrigger::WhenTrue, true);
/// task.triggered().connect(|_| println!("frozen"));
/// task.activate();
///
/// owner.add_tag(&wet, 1);
/// owner.add_tag(&cold, 1);
/// assert!(task.query_state());
/// ```
pub struct WaitTagQuery {
    core: TaskCore,
    query: TagQuery,
    trigger: QueryTrigger,
    only_trigger_once: bool,
    state: Mutex<QueryState>,
    triggered: Signal<()>,
}

impl WaitTagQuery {
    pub fn new(
        owner: impl Into<TaskOwner>,
        query: TagQuery,
        trigger: QueryTrigger,
        only_trigger_once: bool,
    ) -> Arc<Self> {
        Self::from_config(
            owner,
            TagQueryConfig {
                query,
                trigger,
                only_trigger_once,
            },
        )
    }

    pub fn from_config(owner: impl Into<TaskOwner>, config: TagQueryConfig) -> Arc<Self> {
        Arc::new(Self {
            core: TaskCore::new("wait_tag_query", owner.into()),
            state: Mutex::new(QueryState {
                snapshot: TagContainer::new(),
                query_state: config.trigger != QueryTrigger::WhenTrue,
                listeners: HashMap::new(),
                registered: false,
            }),
            query: config.query,
            trigger: config.trigger,
            only_trigger_once: config.only_trigger_once,
            triggered: Signal::new(),
        })
    }

    /// Emitted when the query result flips in the triggering direction.
    pub fn triggered(&self) -> &Signal<()> {
        &self.triggered
    }

    pub fn query(&self) -> &TagQuery {
        &self.query
    }

    /// Result of the last evaluation.
    pub fn query_state(&self) -> bool {
        self.state.lock().query_state
    }

    /// The queried tags currently present on the owner.
    pub fn present_tags(&self) -> TagContainer {
        self.state.lock().snapshot.clone()
    }

    fn on_tag_changed(&self, change: &TagCountChange) {
        if !self.ready_to_broadcast() {
            return;
        }
        let registered = {
            let mut state = self.state.lock();
            state.update_target_tags(&change.tag, change.new_count);
            state.registered
        };
        if registered {
            self.evaluate();
        }
    }

    fn evaluate(&self) {
        if self.query.is_empty() {
            return;
        }
        let fire = {
            let mut state = self.state.lock();
            let matches = self.query.matches(&state.snapshot);
            let changed = matches != state.query_state;
            state.query_state = matches;
            tracing::trace!(target: targets::QUERY, matches, changed, "query evaluated");
            changed && self.trigger.is_satisfied_by(matches)
        };
        if !fire {
            return;
        }
        tracing::debug!(target: targets::QUERY, task = self.core.id().as_u64(), trigger = ?self.trigger, "query triggered");
        if self.only_trigger_once {
            self.end_action();
        }
        self.triggered.emit(());
    }
}

impl AsyncTask for WaitTagQuery {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn on_activate(self: &Arc<Self>, owner: &Arc<dyn AbilityOwner>) {
        let feed = owner.tag_feed();
        for tag in self.query.referenced_tags() {
            let count = owner.tag_count(&tag);
            {
                let mut state = self.state.lock();
                state.update_target_tags(&tag, count);
                if state.listeners.contains_key(&tag) {
                    continue;
                }
            }
            let handle = feed.subscribe(
                TagEventSelector::new(tag.clone(), TagEventType::NewOrRemoved),
                bind(self, Self::on_tag_changed),
            );
            self.state.lock().listeners.insert(tag, handle);
        }
        self.state.lock().registered = true;
        self.evaluate();
    }

    fn on_end(&self, owner: Option<&Arc<dyn AbilityOwner>>) {
        let listeners = {
            let mut state = self.state.lock();
            state.registered = false;
            state.snapshot.clear();
            std::mem::take(&mut state.listeners)
        };
        let Some(owner) = owner else {
            return;
        };
        let feed = owner.tag_feed();
        for handle in listeners.values() {
            feed.unsubscribe(handle);
        }
    }
}
