//! The async task base: lifecycle, weak owner and cancellation.
//!
//! Every waiter embeds a [`TaskCore`] and implements [`AsyncTask`] by
//! supplying two hooks, [`on_activate`](AsyncTask::on_activate) to register
//! its listeners and [`on_end`](AsyncTask::on_end) to unregister them. The
//! provided methods drive the lifecycle:
//!
//! ```text
//!   Inactive ──activate()──► Active ──end_action()/cancel()──► Ended
//!      │                                                        ▲
//!      └──────────────── end_action()/cancel() ─────────────────┘
//! ```
//!
//! - `activate()` on an Active or Ended task does nothing.
//! - `end_action()` runs at most once: unregister listeners, clear the owner,
//!   release the cancellation token, in that order.
//! - `cancel()` ends the task, then cancels the token it had handed out.
//!
//! A task never keeps its owner alive. If the owner is gone at activation
//! the task ends without registering anything; if it disappears later, the
//! next notification that reaches the task ends it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ability_tasks_core::logging::targets;
use ability_tasks_core::{AbilityOwner, ActorId, ActorResolver, CancellationToken};
use parking_lot::Mutex;

/// A unique identifier for a task, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created, not yet activated.
    Inactive,
    /// Listening to its owner.
    Active,
    /// Finished. Never becomes active again.
    Ended,
}

/// A non-owning reference to the component a task observes.
#[derive(Clone, Default)]
pub struct TaskOwner {
    component: Option<Weak<dyn AbilityOwner>>,
}

impl TaskOwner {
    /// Observe a component directly.
    pub fn new(component: &Arc<dyn AbilityOwner>) -> Self {
        Self {
            component: Some(Arc::downgrade(component)),
        }
    }

    /// Observe the component of a host actor.
    ///
    /// If the resolver has no component for the actor, the owner is unset
    /// and a task using it ends on activation.
    pub fn from_actor(resolver: &dyn ActorResolver, actor: ActorId) -> Self {
        match resolver.resolve(actor) {
            Some(component) => Self::new(&component),
            None => {
                tracing::debug!(target: targets::TASK, actor = actor.as_u64(), "actor has no owning component");
                Self::none()
            }
        }
    }

    /// An unset owner.
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve to the live component, if it still exists.
    pub fn resolve(&self) -> Option<Arc<dyn AbilityOwner>> {
        self.component.as_ref().and_then(Weak::upgrade)
    }
}

impl<C: AbilityOwner + 'static> From<&Arc<C>> for TaskOwner {
    fn from(component: &Arc<C>) -> Self {
        let component: Arc<dyn AbilityOwner> = component.clone();
        Self::new(&component)
    }
}

impl fmt::Debug for TaskOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOwner")
            .field("alive", &self.resolve().is_some())
            .finish()
    }
}

/// State shared by every task: identity, lifecycle, owner and token.
pub struct TaskCore {
    id: TaskId,
    kind: &'static str,
    state: Mutex<TaskState>,
    owner: Mutex<TaskOwner>,
    cancellation: Mutex<Option<CancellationToken>>,
}

impl TaskCore {
    /// Create the core of a task of the given kind.
    pub fn new(kind: &'static str, owner: TaskOwner) -> Self {
        Self {
            id: next_task_id(),
            kind,
            state: Mutex::new(TaskState::Inactive),
            owner: Mutex::new(owner),
            cancellation: Mutex::new(None),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Short name of the waiter kind, for logs.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == TaskState::Active
    }

    /// Resolve the owner, if it is set and still alive.
    pub fn owner(&self) -> Option<Arc<dyn AbilityOwner>> {
        self.owner.lock().resolve()
    }

    /// Replace the owner. Only meaningful before activation.
    pub fn set_owner(&self, owner: TaskOwner) {
        *self.owner.lock() = owner;
    }

    /// The token handed to cooperating consumers, while the task holds one.
    pub fn cancellation_token(&self) -> Option<CancellationToken> {
        self.cancellation.lock().clone()
    }

    /// Inactive → Active with a fresh token. Returns `false` otherwise.
    fn begin_activation(&self) -> bool {
        let mut state = self.state.lock();
        if *state != TaskState::Inactive {
            return false;
        }
        *state = TaskState::Active;
        *self.cancellation.lock() = Some(CancellationToken::new());
        true
    }

    /// Move to Ended. Returns `false` if the task had already ended.
    fn begin_end(&self) -> bool {
        let mut state = self.state.lock();
        if *state == TaskState::Ended {
            return false;
        }
        *state = TaskState::Ended;
        true
    }

    fn finish_end(&self) {
        *self.owner.lock() = TaskOwner::none();
        self.cancellation.lock().take();
    }
}

impl fmt::Debug for TaskCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCore")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

/// Ends the task if registration unwinds.
struct EndOnPanic<'a, T: AsyncTask + ?Sized>(&'a T);

impl<T: AsyncTask + ?Sized> Drop for EndOnPanic<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::warn!(target: targets::TASK, task = self.0.core().id().as_u64(), "activation panicked, ending task");
            self.0.end_action();
        }
    }
}

/// A cancellable, weakly-owned wait task.
pub trait AsyncTask: Send + Sync + 'static {
    /// The embedded lifecycle state.
    fn core(&self) -> &TaskCore;

    /// Register listeners on the owner. Runs once, on activation, with the
    /// owner already resolved.
    fn on_activate(self: &Arc<Self>, owner: &Arc<dyn AbilityOwner>)
    where
        Self: Sized;

    /// Unregister every listener this task registered.
    ///
    /// `owner` is `None` when the owner no longer exists; its registration
    /// tables went with it, so there is nothing to unregister.
    fn on_end(&self, owner: Option<&Arc<dyn AbilityOwner>>);

    /// Start listening. Does nothing unless the task is Inactive.
    fn activate(self: &Arc<Self>)
    where
        Self: Sized,
    {
        let core = self.core();
        let _span = tracing::debug_span!(
            target: targets::TASK,
            "activate",
            task = core.id().as_u64(),
            kind = core.kind()
        )
        .entered();

        if !core.begin_activation() {
            tracing::debug!(target: targets::TASK, state = ?core.state(), "activate ignored");
            return;
        }
        let Some(owner) = core.owner() else {
            tracing::debug!(target: targets::TASK, "owner unavailable, ending task");
            self.end_action();
            return;
        };

        let _guard = EndOnPanic(&**self);
        self.on_activate(&owner);
        tracing::debug!(target: targets::TASK, "task activated");
    }

    /// End the task: unregister listeners, clear the owner, release the token.
    ///
    /// Idempotent. On an Inactive task this moves it straight to Ended.
    fn end_action(&self) {
        let core = self.core();
        if !core.begin_end() {
            return;
        }
        let owner = core.owner();
        self.on_end(owner.as_ref());
        core.finish_end();
        tracing::debug!(target: targets::TASK, task = core.id().as_u64(), kind = core.kind(), "task ended");
    }

    /// End the task and signal cancellation to holders of its token.
    fn cancel(&self) {
        let token = self.core().cancellation_token();
        self.end_action();
        if let Some(token) = token {
            token.cancel();
        }
    }

    /// `true` iff the owner still resolves to a live component.
    fn should_broadcast_delegates(&self) -> bool {
        self.core().owner().is_some()
    }

    /// Common callback preamble.
    ///
    /// Returns `false` if the notification must be dropped: the task is not
    /// active, or its owner is gone (in which case the task is ended).
    fn ready_to_broadcast(&self) -> bool {
        if !self.core().is_active() {
            return false;
        }
        if !self.should_broadcast_delegates() {
            tracing::debug!(target: targets::TASK, task = self.core().id().as_u64(), "owner gone, ending task");
            self.end_action();
            return false;
        }
        true
    }

    fn state(&self) -> TaskState {
        self.core().state()
    }

    fn cancellation_token(&self) -> Option<CancellationToken> {
        self.core().cancellation_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ability_tasks_core::{AbilitySystemComponent, ActorRegistry};
    use std::sync::atomic::AtomicUsize;

    /// A task that only counts its hook invocations.
    struct CountingTask {
        core: TaskCore,
        activations: AtomicUsize,
        ends: AtomicUsize,
        ended_with_owner: Mutex<Option<bool>>,
        panic_on_activate: bool,
    }

    impl CountingTask {
        fn new(owner: TaskOwner) -> Arc<Self> {
            Arc::new(Self {
                core: TaskCore::new("counting", owner),
                activations: AtomicUsize::new(0),
                ends: AtomicUsize::new(0),
                ended_with_owner: Mutex::new(None),
                panic_on_activate: false,
            })
        }
    }

    impl AsyncTask for CountingTask {
        fn core(&self) -> &TaskCore {
            &self.core
        }

        fn on_activate(self: &Arc<Self>, _owner: &Arc<dyn AbilityOwner>) {
            self.activations.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_activate {
                panic!("registration failed");
            }
        }

        fn on_end(&self, owner: Option<&Arc<dyn AbilityOwner>>) {
            self.ends.fetch_add(1, Ordering::SeqCst);
            *self.ended_with_owner.lock() = Some(owner.is_some());
        }
    }

    fn component() -> Arc<AbilitySystemComponent> {
        Arc::new(AbilitySystemComponent::new(ActorId::next()))
    }

    #[test]
    fn test_lifecycle_transitions() {
        let owner = component();
        let task = CountingTask::new(TaskOwner::from(&owner));
        assert_eq!(task.state(), TaskState::Inactive);
        assert!(task.cancellation_token().is_none());

        task.activate();
        assert_eq!(task.state(), TaskState::Active);
        assert!(task.cancellation_token().is_some());
        assert!(task.should_broadcast_delegates());

        task.end_action();
        assert_eq!(task.state(), TaskState::Ended);
        assert!(task.cancellation_token().is_none());
        assert!(!task.should_broadcast_delegates());
        assert_eq!(*task.ended_with_owner.lock(), Some(true));
    }

    #[test]
    fn test_activate_twice_registers_once() {
        let owner = component();
        let task = CountingTask::new(TaskOwner::from(&owner));
        task.activate();
        task.activate();
        assert_eq!(task.activations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_end_is_idempotent() {
        let owner = component();
        let task = CountingTask::new(TaskOwner::from(&owner));
        task.activate();
        task.end_action();
        task.end_action();
        task.cancel();
        assert_eq!(task.ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_end_before_activate_prevents_activation() {
        let owner = component();
        let task = CountingTask::new(TaskOwner::from(&owner));
        task.end_action();
        task.activate();

        assert_eq!(task.state(), TaskState::Ended);
        assert_eq!(task.activations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_signals_token_holders() {
        let owner = component();
        let task = CountingTask::new(TaskOwner::from(&owner));

        // Cancelling a never-activated task is safe.
        let idle = CountingTask::new(TaskOwner::from(&owner));
        idle.cancel();
        assert_eq!(idle.state(), TaskState::Ended);

        task.activate();
        let token = task.cancellation_token().unwrap();
        task.cancel();
        assert!(token.is_cancelled());
        task.cancel();
    }

    #[test]
    fn test_dead_owner_ends_on_activate() {
        let owner = component();
        let task = CountingTask::new(TaskOwner::from(&owner));
        drop(owner);

        task.activate();
        assert_eq!(task.state(), TaskState::Ended);
        assert_eq!(task.activations.load(Ordering::SeqCst), 0);
        assert_eq!(*task.ended_with_owner.lock(), Some(false));
    }

    #[test]
    fn test_owner_from_actor() {
        let registry = ActorRegistry::new();
        let owner: Arc<dyn AbilityOwner> = component();
        let actor = registry.register(&owner);

        let task = CountingTask::new(TaskOwner::from_actor(&registry, actor));
        assert!(task.should_broadcast_delegates());

        let orphan = CountingTask::new(TaskOwner::from_actor(&registry, ActorId::next()));
        assert!(!orphan.should_broadcast_delegates());
        orphan.activate();
        assert_eq!(orphan.state(), TaskState::Ended);
    }

    #[test]
    fn test_set_owner_retargets_before_activation() {
        let first = component();
        let second = component();
        let task = CountingTask::new(TaskOwner::from(&first));

        task.core().set_owner(TaskOwner::from(&second));
        drop(first);
        assert!(task.should_broadcast_delegates());

        task.activate();
        assert_eq!(task.state(), TaskState::Active);
        assert_eq!(task.activations.load(Ordering::SeqCst), 1);

        drop(second);
        assert!(!task.ready_to_broadcast());
        assert_eq!(task.state(), TaskState::Ended);
    }

    #[test]
    fn test_ready_to_broadcast_ends_when_owner_dies() {
        let owner = component();
        let task = CountingTask::new(TaskOwner::from(&owner));
        task.activate();
        assert!(task.ready_to_broadcast());

        drop(owner);
        assert!(!task.ready_to_broadcast());
        assert_eq!(task.state(), TaskState::Ended);
    }

    #[test]
    fn test_panic_during_activation_ends_task() {
        let owner = component();
        let task = Arc::new(CountingTask {
            core: TaskCore::new("counting", TaskOwner::from(&owner)),
            activations: AtomicUsize::new(0),
            ends: AtomicUsize::new(0),
            ended_with_owner: Mutex::new(None),
            panic_on_activate: true,
        });

        let task_clone = task.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            task_clone.activate();
        }));

        assert!(result.is_err());
        assert_eq!(task.state(), TaskState::Ended);
        assert_eq!(task.ends.load(Ordering::SeqCst), 1);
    }
}
