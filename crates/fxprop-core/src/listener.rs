#![forbid(unsafe_code)]

//! Listener traits and the shared handles stored by a [`ListenerHelper`].
//!
//! Two listener kinds exist:
//!
//! - [`InvalidationListener`]: told only that an observable may have changed.
//! - [`ChangeListener`]: handed an event payload describing what changed.
//!
//! Listeners are registered as `Rc<dyn ...>` handles. A handle cannot be
//! null, so every registration call receives a usable listener by
//! construction.
//!
//! # Equality
//!
//! Removal matches a registration with [`ListenerHandle::same_listener`]:
//! two handles are the same listener when both report an
//! [`identity_key`](InvalidationListener::identity_key) and the keys are
//! equal, otherwise when they point at the same allocation. Keyed listeners
//! (see [`Keyed`]) let distinct allocations stand in for one another.
//!
//! [`ListenerHelper`]: crate::helper::ListenerHelper

use std::fmt;
use std::rc::Rc;

/// A listener notified that an observable has been invalidated.
pub trait InvalidationListener<O: ?Sized> {
    /// Called once per dispatch pass in which this listener is registered.
    fn invalidated(&self, observable: &O);

    /// True when this listener only forwards to a target that no longer
    /// exists. Expired entries are reclaimed on the add path.
    fn is_expired(&self) -> bool {
        false
    }

    /// Overridable equality. `None` means identity by allocation.
    fn identity_key(&self) -> Option<u64> {
        None
    }
}

/// A listener notified with an event payload.
pub trait ChangeListener<E: ?Sized> {
    /// Called once per dispatch pass in which this listener is registered.
    fn changed(&self, event: &E);

    /// See [`InvalidationListener::is_expired`].
    fn is_expired(&self) -> bool {
        false
    }

    /// See [`InvalidationListener::identity_key`].
    fn identity_key(&self) -> Option<u64> {
        None
    }
}

/// Shared handle to an invalidation listener.
pub type InvalidationRef<O> = Rc<dyn InvalidationListener<O>>;

/// Shared handle to a change listener.
pub type ChangeRef<E> = Rc<dyn ChangeListener<E>>;

/// Operations a listener array needs from the handles it stores.
pub trait ListenerHandle: Clone {
    /// Registration matching used by removal.
    fn same_listener(&self, other: &Self) -> bool;

    /// Whether the entry may be reclaimed by the reaper.
    fn expired(&self) -> bool;
}

fn keys_match(a: Option<u64>, b: Option<u64>) -> Option<bool> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a == b),
        _ => None,
    }
}

impl<O: ?Sized> ListenerHandle for InvalidationRef<O> {
    fn same_listener(&self, other: &Self) -> bool {
        keys_match((**self).identity_key(), (**other).identity_key())
            .unwrap_or_else(|| Rc::ptr_eq(self, other))
    }

    fn expired(&self) -> bool {
        (**self).is_expired()
    }
}

impl<E: ?Sized> ListenerHandle for ChangeRef<E> {
    fn same_listener(&self, other: &Self) -> bool {
        keys_match((**self).identity_key(), (**other).identity_key())
            .unwrap_or_else(|| Rc::ptr_eq(self, other))
    }

    fn expired(&self) -> bool {
        (**self).is_expired()
    }
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

struct FnInvalidation<F>(F);

impl<O: ?Sized, F> InvalidationListener<O> for FnInvalidation<F>
where
    F: Fn(&O),
{
    fn invalidated(&self, observable: &O) {
        (self.0)(observable);
    }
}

struct FnChange<F>(F);

impl<E: ?Sized, F> ChangeListener<E> for FnChange<F>
where
    F: Fn(&E),
{
    fn changed(&self, event: &E) {
        (self.0)(event);
    }
}

/// Wrap a closure as an invalidation listener handle.
///
/// Keep the returned handle to remove the registration later.
#[must_use]
pub fn invalidation_listener<O, F>(f: F) -> InvalidationRef<O>
where
    O: ?Sized,
    F: Fn(&O) + 'static,
{
    Rc::new(FnInvalidation(f))
}

/// Wrap a closure as a change listener handle.
#[must_use]
pub fn change_listener<E, F>(f: F) -> ChangeRef<E>
where
    E: ?Sized,
    F: Fn(&E) + 'static,
{
    Rc::new(FnChange(f))
}

/// A closure listener with an explicit identity key.
///
/// Two `Keyed` listeners with the same key are treated as one registration
/// by removal, even though they are separate allocations.
pub struct Keyed<F> {
    key: u64,
    f: F,
}

impl<F> Keyed<F> {
    /// Create a keyed listener.
    #[must_use]
    pub fn new(key: u64, f: F) -> Self {
        Self { key, f }
    }

    /// The identity key.
    #[must_use]
    pub fn key(&self) -> u64 {
        self.key
    }
}

impl<F> fmt::Debug for Keyed<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyed").field("key", &self.key).finish()
    }
}

impl<O: ?Sized, F> InvalidationListener<O> for Keyed<F>
where
    F: Fn(&O),
{
    fn invalidated(&self, observable: &O) {
        (self.f)(observable);
    }

    fn identity_key(&self) -> Option<u64> {
        Some(self.key)
    }
}

impl<E: ?Sized, F> ChangeListener<E> for Keyed<F>
where
    F: Fn(&E),
{
    fn changed(&self, event: &E) {
        (self.f)(event);
    }

    fn identity_key(&self) -> Option<u64> {
        Some(self.key)
    }
}
