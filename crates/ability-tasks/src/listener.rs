//! Glue between tasks and owner event sources.

use std::sync::Arc;

use ability_tasks_core::{EventSource, ListenerHandle, Slot};
use parking_lot::Mutex;

/// Wrap a task method as an owner callback.
///
/// The callback holds only a weak reference to the task, so an owner feed
/// never keeps a task alive; once the task is dropped the callback does
/// nothing.
pub(crate) fn bind<T, A>(task: &Arc<T>, handler: fn(&T, &A)) -> Slot<A>
where
    T: Send + Sync + 'static,
    A: 'static,
{
    let task = Arc::downgrade(task);
    Arc::new(move |args: &A| {
        if let Some(task) = task.upgrade() {
            handler(&task, args);
        }
    })
}

/// The registrations a task holds on one event source.
pub(crate) struct Registrations<S> {
    handles: Mutex<Vec<ListenerHandle<S>>>,
}

impl<S: Clone + Send + Sync + 'static> Registrations<S> {
    pub(crate) fn new() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe and remember the handle.
    pub(crate) fn subscribe<A: 'static>(
        &self,
        source: &dyn EventSource<Selector = S, Args = A>,
        selector: S,
        callback: Slot<A>,
    ) {
        let handle = source.subscribe(selector, callback);
        self.handles.lock().push(handle);
    }

    /// Unsubscribe every remembered handle. Safe to call when empty.
    ///
    /// With no source (the owner is gone) the handles are just forgotten.
    pub(crate) fn unsubscribe_all<A: 'static>(
        &self,
        source: Option<&dyn EventSource<Selector = S, Args = A>>,
    ) -> usize {
        let handles = std::mem::take(&mut *self.handles.lock());
        let Some(source) = source else {
            return 0;
        };
        handles
            .iter()
            .filter(|handle| source.unsubscribe(handle))
            .count()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handles.lock().len()
    }
}
