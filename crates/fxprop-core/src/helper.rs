#![forbid(unsafe_code)]

//! Per-observable listener registration state and dispatch.
//!
//! # Design
//!
//! [`ListenerHelper`] is a sum type over the cheapest shape that fits the
//! current listeners:
//!
//! ```text
//!                add inv          add any
//!   Empty ───────────────▶ SingleInvalidation ─────────▶ Generic
//!     │   add change                                      ▲  │
//!     └──────────────────▶ SingleChange ──────────────────┘  │
//!                                 ▲            add any        │
//!                                 └──── remove (unlocked) ────┘
//! ```
//!
//! Every registration operation has a consuming form that returns the next
//! state (`add_*` / `remove_*`) and an in-place form (`register_*` /
//! `unregister_*`). Observables apply the in-place form to the helper
//! inside their `RefCell` through [`ListenerHelper::update`].
//!
//! Dispatch ([`ListenerHelper::fire`] / [`ListenerHelper::fire_with`]) works
//! on the `RefCell` that owns the helper. It captures a snapshot of both
//! listener arrays, raises the lock depth, releases the borrow and then
//! calls listeners, so a callback may freely add or remove listeners on the
//! same observable:
//!
//! - Listeners added during a pass are first notified on the next pass.
//! - Listeners removed during a pass are still notified in that pass.
//! - While locked, arrays are rebuilt instead of mutated, and a `Generic`
//!   state is never downgraded; the downgrade happens when the outermost
//!   pass finishes.
//!
//! # Failure Modes
//!
//! | Failure              | Behavior                                                 |
//! |----------------------|----------------------------------------------------------|
//! | Listener panics      | Remaining listeners of the pass are skipped; the lock is released by a drop guard during unwinding |
//! | Removing unknown     | No-op                                                    |
//! | Capacity overflow    | Panics (fatal resource exhaustion)                       |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::array::{ListenerArray, Snapshot};
use crate::config::RegistryConfig;
use crate::event::ListenerEvent;
use crate::listener::{ChangeRef, InvalidationRef, ListenerHandle};

/// The shape a [`ListenerHelper`] is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperShape {
    /// No listeners.
    Empty,
    /// Exactly one invalidation listener and no change listener.
    SingleInvalidation,
    /// Exactly one change listener and no invalidation listener.
    SingleChange,
    /// Any other combination, stored in listener arrays.
    Generic,
}

/// Listener arrays for the many-listener shape.
pub struct GenericListeners<O: ?Sized, E> {
    invalidation: ListenerArray<InvalidationRef<O>>,
    change: ListenerArray<ChangeRef<E>>,
    lock_depth: u32,
    config: RegistryConfig,
}

impl<O: ?Sized, E> GenericListeners<O, E> {
    fn new(
        config: &RegistryConfig,
        invalidation: Vec<InvalidationRef<O>>,
        change: Vec<ChangeRef<E>>,
    ) -> Box<Self> {
        Box::new(Self {
            invalidation: array_of(invalidation, config),
            change: array_of(change, config),
            lock_depth: 0,
            config: *config,
        })
    }

    /// Whether a dispatch pass is iterating these arrays.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock_depth > 0
    }

    /// Registered invalidation listeners.
    #[must_use]
    pub fn invalidation(&self) -> &ListenerArray<InvalidationRef<O>> {
        &self.invalidation
    }

    /// Registered change listeners.
    #[must_use]
    pub fn change(&self) -> &ListenerArray<ChangeRef<E>> {
        &self.change
    }

    fn push_invalidation(&mut self, listener: InvalidationRef<O>) {
        let locked = self.is_locked();
        self.invalidation.push(
            listener,
            locked,
            self.config.reap_expired,
            self.config.initial_capacity,
        );
    }

    fn push_change(&mut self, listener: ChangeRef<E>) {
        let locked = self.is_locked();
        self.change.push(
            listener,
            locked,
            self.config.reap_expired,
            self.config.initial_capacity,
        );
    }

    /// Pick the cheapest shape for the remaining listeners.
    fn into_cheapest(self: Box<Self>) -> ListenerHelper<O, E> {
        let cheaper = match (self.invalidation.len(), self.change.len()) {
            (0, 0) => Some(ListenerHelper::Empty),
            (1, 0) => self
                .invalidation
                .get(0)
                .cloned()
                .map(ListenerHelper::SingleInvalidation),
            (0, 1) => self.change.get(0).cloned().map(ListenerHelper::SingleChange),
            _ => None,
        };
        match cheaper {
            Some(next) => {
                trace!(to = ?next.shape(), "downgraded listener helper");
                next
            }
            None => ListenerHelper::Generic(self),
        }
    }
}

fn array_of<L: ListenerHandle>(items: Vec<L>, config: &RegistryConfig) -> ListenerArray<L> {
    if items.is_empty() {
        ListenerArray::new()
    } else {
        let capacity = config.initial_capacity.max(items.len());
        ListenerArray::from_listeners(items, capacity)
    }
}

/// Listener registration state owned by exactly one observable.
pub enum ListenerHelper<O: ?Sized, E> {
    /// No listeners.
    Empty,
    /// Exactly one invalidation listener and no change listener.
    SingleInvalidation(InvalidationRef<O>),
    /// Exactly one change listener and no invalidation listener.
    SingleChange(ChangeRef<E>),
    /// Any other combination, or any state reached while locked.
    Generic(Box<GenericListeners<O, E>>),
}

impl<O: ?Sized, E> Default for ListenerHelper<O, E> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<O: ?Sized, E> fmt::Debug for ListenerHelper<O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHelper")
            .field("shape", &self.shape())
            .field("invalidation", &self.invalidation_count())
            .field("change", &self.change_count())
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// What one dispatch pass will notify.
enum Pass<O: ?Sized, E> {
    Idle,
    Invalidation(InvalidationRef<O>),
    Change(ChangeRef<E>),
    Snapshot {
        invalidation: Snapshot<InvalidationRef<O>>,
        change: Snapshot<ChangeRef<E>>,
    },
}

/// Lowers the lock depth when a locked pass ends, including by unwinding.
struct PassGuard<'a, O: ?Sized, E> {
    cell: &'a RefCell<ListenerHelper<O, E>>,
}

impl<O: ?Sized, E> Drop for PassGuard<'_, O, E> {
    fn drop(&mut self) {
        match self.cell.try_borrow_mut() {
            Ok(mut helper) => helper.end_pass(),
            Err(_) => warn!("listener helper borrowed while ending a dispatch pass"),
        }
    }
}

impl<O: ?Sized, E> ListenerHelper<O, E> {
    /// Create an empty helper.
    #[must_use]
    pub fn new() -> Self {
        Self::Empty
    }

    /// Current shape.
    #[must_use]
    pub fn shape(&self) -> HelperShape {
        match self {
            Self::Empty => HelperShape::Empty,
            Self::SingleInvalidation(_) => HelperShape::SingleInvalidation,
            Self::SingleChange(_) => HelperShape::SingleChange,
            Self::Generic(_) => HelperShape::Generic,
        }
    }

    /// Number of invalidation registrations.
    #[must_use]
    pub fn invalidation_count(&self) -> usize {
        match self {
            Self::SingleInvalidation(_) => 1,
            Self::Generic(generic) => generic.invalidation.len(),
            Self::Empty | Self::SingleChange(_) => 0,
        }
    }

    /// Number of change registrations.
    #[must_use]
    pub fn change_count(&self) -> usize {
        match self {
            Self::SingleChange(_) => 1,
            Self::Generic(generic) => generic.change.len(),
            Self::Empty | Self::SingleInvalidation(_) => 0,
        }
    }

    /// Whether any listener is registered.
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.invalidation_count() + self.change_count() > 0
    }

    /// Whether any change listener is registered.
    #[must_use]
    pub fn has_change_listeners(&self) -> bool {
        self.change_count() > 0
    }

    /// Whether a dispatch pass is in progress.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        match self {
            Self::Generic(generic) => generic.is_locked(),
            _ => false,
        }
    }

    /// Apply an in-place registration change to the helper stored in `cell`.
    ///
    /// The `register_*` / `unregister_*` methods only mutate after every
    /// listener query (`identity_key`, `is_expired`) has returned, so a query
    /// that panics leaves the registrations untouched.
    pub fn update(cell: &RefCell<Self>, f: impl FnOnce(&mut Self)) {
        f(&mut cell.borrow_mut());
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register an invalidation listener using the global configuration.
    #[must_use]
    pub fn add_invalidation_listener(mut self, listener: InvalidationRef<O>) -> Self {
        self.register_invalidation_listener(listener);
        self
    }

    /// Register an invalidation listener.
    #[must_use]
    pub fn add_invalidation_listener_with(
        mut self,
        listener: InvalidationRef<O>,
        config: &RegistryConfig,
    ) -> Self {
        self.register_invalidation_listener_with(listener, config);
        self
    }

    /// Remove the first registration matching `listener`.
    #[must_use]
    pub fn remove_invalidation_listener(mut self, listener: &InvalidationRef<O>) -> Self {
        self.unregister_invalidation_listener(listener);
        self
    }

    /// Register a change listener using the global configuration.
    #[must_use]
    pub fn add_change_listener(mut self, listener: ChangeRef<E>) -> Self {
        self.register_change_listener(listener);
        self
    }

    /// Register a change listener.
    #[must_use]
    pub fn add_change_listener_with(mut self, listener: ChangeRef<E>, config: &RegistryConfig) -> Self {
        self.register_change_listener_with(listener, config);
        self
    }

    /// Remove the first registration matching `listener`.
    #[must_use]
    pub fn remove_change_listener(mut self, listener: &ChangeRef<E>) -> Self {
        self.unregister_change_listener(listener);
        self
    }

    /// In-place form of [`add_invalidation_listener`](Self::add_invalidation_listener).
    pub fn register_invalidation_listener(&mut self, listener: InvalidationRef<O>) {
        self.register_invalidation_listener_with(listener, RegistryConfig::global());
    }

    /// In-place form of [`add_invalidation_listener_with`](Self::add_invalidation_listener_with).
    pub fn register_invalidation_listener_with(
        &mut self,
        listener: InvalidationRef<O>,
        config: &RegistryConfig,
    ) {
        if let Self::Generic(generic) = self {
            generic.push_invalidation(listener);
            return;
        }
        *self = match std::mem::take(self) {
            Self::SingleInvalidation(first) => {
                trace!("listener helper: single invalidation -> generic");
                Self::Generic(GenericListeners::new(config, vec![first, listener], Vec::new()))
            }
            Self::SingleChange(change) => {
                trace!("listener helper: single change -> generic");
                Self::Generic(GenericListeners::new(config, vec![listener], vec![change]))
            }
            _ => {
                trace!("listener helper: empty -> single invalidation");
                Self::SingleInvalidation(listener)
            }
        };
    }

    /// In-place form of [`remove_invalidation_listener`](Self::remove_invalidation_listener).
    pub fn unregister_invalidation_listener(&mut self, listener: &InvalidationRef<O>) {
        match self {
            Self::SingleInvalidation(current) => {
                if current.same_listener(listener) {
                    trace!("listener helper: single invalidation -> empty");
                    *self = Self::Empty;
                }
            }
            Self::Generic(generic) => {
                let locked = generic.is_locked();
                if generic.invalidation.remove(listener, locked) && !locked {
                    self.downgrade();
                }
            }
            Self::Empty | Self::SingleChange(_) => {}
        }
    }

    /// In-place form of [`add_change_listener`](Self::add_change_listener).
    pub fn register_change_listener(&mut self, listener: ChangeRef<E>) {
        self.register_change_listener_with(listener, RegistryConfig::global());
    }

    /// In-place form of [`add_change_listener_with`](Self::add_change_listener_with).
    pub fn register_change_listener_with(&mut self, listener: ChangeRef<E>, config: &RegistryConfig) {
        if let Self::Generic(generic) = self {
            generic.push_change(listener);
            return;
        }
        *self = match std::mem::take(self) {
            Self::SingleChange(first) => {
                trace!("listener helper: single change -> generic");
                Self::Generic(GenericListeners::new(config, Vec::new(), vec![first, listener]))
            }
            Self::SingleInvalidation(invalidation) => {
                trace!("listener helper: single invalidation -> generic");
                Self::Generic(GenericListeners::new(config, vec![invalidation], vec![listener]))
            }
            _ => {
                trace!("listener helper: empty -> single change");
                Self::SingleChange(listener)
            }
        };
    }

    /// In-place form of [`remove_change_listener`](Self::remove_change_listener).
    pub fn unregister_change_listener(&mut self, listener: &ChangeRef<E>) {
        match self {
            Self::SingleChange(current) => {
                if current.same_listener(listener) {
                    trace!("listener helper: single change -> empty");
                    *self = Self::Empty;
                }
            }
            Self::Generic(generic) => {
                let locked = generic.is_locked();
                if generic.change.remove(listener, locked) && !locked {
                    self.downgrade();
                }
            }
            Self::Empty | Self::SingleInvalidation(_) => {}
        }
    }

    fn downgrade(&mut self) {
        if let Self::Generic(generic) = std::mem::take(self) {
            *self = generic.into_cheapest();
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn begin_pass(&mut self) -> Pass<O, E> {
        match self {
            Self::Empty => Pass::Idle,
            Self::SingleInvalidation(listener) => Pass::Invalidation(Rc::clone(listener)),
            Self::SingleChange(listener) => Pass::Change(Rc::clone(listener)),
            Self::Generic(generic) => {
                generic.lock_depth += 1;
                Pass::Snapshot {
                    invalidation: generic.invalidation.snapshot(),
                    change: generic.change.snapshot(),
                }
            }
        }
    }

    fn end_pass(&mut self) {
        let Self::Generic(generic) = self else {
            return;
        };
        generic.lock_depth = generic.lock_depth.saturating_sub(1);
        if generic.lock_depth == 0 {
            self.downgrade();
        }
    }
}

impl<O: ?Sized, E: ListenerEvent> ListenerHelper<O, E> {
    /// Notify every registered listener of `event`.
    ///
    /// Skipped entirely when `event` is not effective. Invalidation
    /// listeners run first, then change listeners, each in registration
    /// order.
    pub fn fire(cell: &RefCell<Self>, observable: &O, event: &E) {
        if !event.is_effective() {
            return;
        }
        Self::dispatch(cell, observable, || event);
    }

    /// Like [`fire`](Self::fire), but the event is only built when a change
    /// listener is about to receive it, after all invalidation listeners
    /// have run.
    ///
    /// Deferral needs [`ListenerEvent::ALWAYS_EFFECTIVE`]. For payloads that
    /// can be ineffective the event is built up front and checked, as in
    /// [`fire`](Self::fire).
    pub fn fire_with<F>(cell: &RefCell<Self>, observable: &O, make_event: F)
    where
        F: FnOnce() -> E,
    {
        if !E::ALWAYS_EFFECTIVE {
            let event = make_event();
            Self::fire(cell, observable, &event);
            return;
        }
        Self::dispatch(cell, observable, make_event);
    }

    fn dispatch<B, F>(cell: &RefCell<Self>, observable: &O, make_event: F)
    where
        B: std::borrow::Borrow<E>,
        F: FnOnce() -> B,
    {
        use std::borrow::Borrow;

        let pass = cell.borrow_mut().begin_pass();
        match pass {
            Pass::Idle => {}
            Pass::Invalidation(listener) => listener.invalidated(observable),
            Pass::Change(listener) => {
                let owned = make_event();
                let event: &E = owned.borrow();
                if delivers(event) {
                    listener.changed(event);
                }
            }
            Pass::Snapshot {
                invalidation,
                change,
            } => {
                let _guard = PassGuard { cell };
                for listener in invalidation.iter() {
                    listener.invalidated(observable);
                }
                if change.is_empty() {
                    return;
                }
                let owned = make_event();
                let event: &E = owned.borrow();
                if !delivers(event) {
                    return;
                }
                for listener in change.iter() {
                    listener.changed(event);
                }
            }
        }
    }
}

#[inline]
fn delivers<E: ListenerEvent>(event: &E) -> bool {
    event.is_effective() && event.reaches_change_listeners()
}
