//! Listener registries for owner broadcasts.
//!
//! This module provides the ordered multicast callback lists that every owner
//! feed is built from. A [`Signal`] is a single list of listeners; a
//! [`KeyedSignal`] keeps one list per key (per attribute, per tag, ...).
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - An ordered list of listeners invoked on emission
//! - [`KeyedSignal<K, Args>`] - One [`Signal`] per key, created on demand
//! - [`ConnectionId`] - Unique identifier returned when connecting a listener
//!
//! # Dispatch Rules
//!
//! - Listeners run in the order they were connected.
//! - No internal lock is held while a listener runs, so a listener may
//!   connect or disconnect listeners (including itself) on the same signal.
//! - A listener disconnected during an emission is not invoked afterward in
//!   that emission.
//! - A listener connected during an emission is first invoked by the next
//!   emission.
//!
//! # Example
//!
//! ```
//! use ability_tasks_core::Signal;
//!
//! let health_changed = Signal::<f32>::new();
//!
//! let conn_id = health_changed.connect(|value| {
//!     println!("Health is now {}", value);
//! });
//!
//! health_changed.emit(75.0);
//! health_changed.disconnect(conn_id);
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-listener connection.
    ///
    /// Use this ID to disconnect a specific listener via [`Signal::disconnect`].
    /// The ID remains valid until the listener is explicitly disconnected or
    /// the signal is dropped.
    pub struct ConnectionId;
}

/// A shared listener callback.
pub type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Connected listeners plus their connection order.
struct Connections<Args> {
    slots: SlotMap<ConnectionId, Slot<Args>>,
    order: Vec<ConnectionId>,
}

impl<Args> Connections<Args> {
    fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            order: Vec::new(),
        }
    }
}

/// An ordered list of listeners that can be notified together.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to listeners by reference. Use `()` for
///   notifications without data, or a struct/tuple for payloads.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync`. Dispatch is synchronous: `emit` returns
/// once every listener has run on the calling thread.
pub struct Signal<Args> {
    connections: Mutex<Connections<Args>>,
    /// Whether emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Connections::new()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a listener (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the listener.
    ///
    /// # Example
    ///
    /// ```
    /// use ability_tasks_core::Signal;
    ///
    /// let signal = Signal::<String>::new();
    /// let id = signal.connect(|s| println!("Got: {}", s));
    /// signal.emit("Hello".to_string());
    /// assert!(signal.disconnect(id));
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connect_slot(Arc::new(slot))
    }

    /// Connect an already shared listener.
    pub fn connect_slot(&self, slot: Slot<Args>) -> ConnectionId {
        let mut connections = self.connections.lock();
        let id = connections.slots.insert(slot);
        connections.order.push(id);
        id
    }

    /// Disconnect a specific listener by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` if it
    /// was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock();
        if connections.slots.remove(id).is_some() {
            connections.order.retain(|existing| *existing != id);
            true
        } else {
            false
        }
    }

    /// Disconnect all listeners from this signal.
    pub fn disconnect_all(&self) {
        let mut connections = self.connections.lock();
        connections.slots.clear();
        connections.order.clear();
    }

    /// Check whether a connection is still registered.
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.lock().slots.contains_key(id)
    }

    /// Get the number of connected listeners.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().slots.len()
    }

    /// Block emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking every connected listener in connection order.
    #[tracing::instrument(skip_all, target = "ability_tasks_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        // Snapshot so that listeners can mutate the connection list.
        let snapshot: Vec<(ConnectionId, Slot<Args>)> = {
            let connections = self.connections.lock();
            connections
                .order
                .iter()
                .filter_map(|id| connections.slots.get(*id).map(|slot| (*id, slot.clone())))
                .collect()
        };
        tracing::trace!(target: targets::SIGNAL, connection_count = snapshot.len(), "emitting signal");

        for (id, slot) in snapshot {
            if !self.is_connected(id) {
                continue;
            }
            slot(&args);
        }
    }
}

/// A family of signals addressed by key.
///
/// Each key gets its own ordered listener list, created on first connection
/// and dropped again once its last listener disconnects.
pub struct KeyedSignal<K, Args> {
    signals: Mutex<HashMap<K, Arc<Signal<Args>>>>,
}

impl<K: Eq + Hash + Clone, Args: 'static> Default for KeyedSignal<K, Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, Args: 'static> KeyedSignal<K, Args> {
    /// Create an empty keyed signal.
    pub fn new() -> Self {
        Self {
            signals: Mutex::new(HashMap::new()),
        }
    }

    /// Connect a listener for one key.
    pub fn connect_slot(&self, key: K, slot: Slot<Args>) -> ConnectionId {
        let signal = self
            .signals
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::new(Signal::new()))
            .clone();
        signal.connect_slot(slot)
    }

    /// Disconnect a listener from one key.
    ///
    /// Returns `false` if the key has no such listener.
    pub fn disconnect(&self, key: &K, id: ConnectionId) -> bool {
        let mut signals = self.signals.lock();
        let Some(signal) = signals.get(key) else {
            return false;
        };
        let removed = signal.disconnect(id);
        if signal.connection_count() == 0 {
            signals.remove(key);
        }
        removed
    }

    /// Get the number of listeners connected for one key.
    pub fn connection_count(&self, key: &K) -> usize {
        self.signals
            .lock()
            .get(key)
            .map_or(0, |signal| signal.connection_count())
    }

    /// Get the number of listeners across every key.
    pub fn total_connection_count(&self) -> usize {
        self.signals
            .lock()
            .values()
            .map(|signal| signal.connection_count())
            .sum()
    }

    /// Emit to the listeners of one key.
    pub fn emit(&self, key: &K, args: Args) {
        let signal = self.signals.lock().get(key).cloned();
        if let Some(signal) = signal {
            signal.emit(args);
        }
    }
}

static_assertions::assert_impl_all!(Signal<i32>: Send, Sync);
static_assertions::assert_impl_all!(KeyedSignal<String, i32>: Send, Sync);
