//! Typed single-threaded publish/subscribe channels.
//!
//! Each observable entity owns one [`Signal`] per event type. Observers
//! call [`Signal::connect`] and keep the returned [`Subscription`] for as
//! long as they want to be notified; dropping it disconnects.
//!
//! Delivery is synchronous and happens in connection order, before
//! [`Signal::emit`] returns, so an observer always sees a notification
//! before any later mutation of the emitting entity. The slot list is
//! snapshotted at the start of each emission: handlers may connect or
//! disconnect freely while being called, newly connected handlers only
//! see later emissions, and disconnected handlers are skipped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Handler<T> = Rc<dyn Fn(&T)>;

#[derive(Debug, Default)]
struct SlotState {
    connected: Cell<bool>,
    blocked: Cell<bool>,
}

struct Slot<T> {
    id: u64,
    handler: Handler<T>,
    state: Rc<SlotState>,
}

struct SlotTable<T> {
    next_id: u64,
    slots: Vec<Slot<T>>,
}

/// A typed notification channel.
pub struct Signal<T> {
    table: Rc<RefCell<SlotTable<T>>>,
}

impl<T: 'static> Signal<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Rc::new(RefCell::new(SlotTable {
                next_id: 0,
                slots: Vec::new(),
            })),
        }
    }

    /// Connect a handler. It stays connected until the returned
    /// [`Subscription`] is dropped or disconnected, or the signal itself is
    /// dropped.
    pub fn connect(&self, handler: impl Fn(&T) + 'static) -> Subscription {
        let state = Rc::new(SlotState {
            connected: Cell::new(true),
            blocked: Cell::new(false),
        });
        let id = {
            let mut table = self.table.borrow_mut();
            let id = table.next_id;
            table.next_id += 1;
            table.slots.push(Slot {
                id,
                handler: Rc::new(handler),
                state: Rc::clone(&state),
            });
            id
        };

        let table: Weak<RefCell<SlotTable<T>>> = Rc::downgrade(&self.table);
        Subscription {
            state,
            disconnect: Some(Box::new(move || {
                if let Some(table) = table.upgrade() {
                    table.borrow_mut().slots.retain(|slot| slot.id != id);
                }
            })),
        }
    }

    /// Deliver `value` to every connected, unblocked handler.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(Handler<T>, Rc<SlotState>)> = self
            .table
            .borrow()
            .slots
            .iter()
            .map(|slot| (Rc::clone(&slot.handler), Rc::clone(&slot.state)))
            .collect();

        for (handler, state) in snapshot {
            if state.connected.get() && !state.blocked.get() {
                handler(value);
            }
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn num_connections(&self) -> usize {
        self.table.borrow().slots.len()
    }

    #[must_use]
    pub fn has_connections(&self) -> bool {
        self.num_connections() > 0
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Signal<T> {
    fn drop(&mut self) {
        if let Ok(table) = self.table.try_borrow() {
            for slot in &table.slots {
                slot.state.connected.set(false);
            }
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connections = self.table.try_borrow().map_or(0, |t| t.slots.len());
        f.debug_struct("Signal")
            .field("connections", &connections)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle for one connection. Dropping it disconnects the handler.
#[must_use = "dropping a Subscription disconnects its handler immediately"]
pub struct Subscription {
    state: Rc<SlotState>,
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Disconnect now. Idempotent.
    pub fn disconnect(&mut self) {
        self.state.connected.set(false);
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }

    /// Whether the handler is still connected. Becomes `false` when the
    /// signal is dropped.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.connected.get()
    }

    /// Suppress delivery without disconnecting.
    pub fn block(&self) {
        self.state.blocked.set(true);
    }

    pub fn unblock(&self) {
        self.state.blocked.set(false);
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.state.blocked.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("connected", &self.is_connected())
            .field("blocked", &self.is_blocked())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ScopedConnections
// ---------------------------------------------------------------------------

/// A group of subscriptions released together.
#[derive(Debug, Default)]
pub struct ScopedConnections {
    subscriptions: Vec<Subscription>,
}

impl ScopedConnections {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    pub fn add(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    /// Disconnect and release every subscription.
    pub fn disconnect(&mut self) {
        self.subscriptions.clear();
    }

    pub fn block(&self) {
        for subscription in &self.subscriptions {
            subscription.block();
        }
    }

    pub fn unblock(&self) {
        for subscription in &self.subscriptions {
            subscription.unblock();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
