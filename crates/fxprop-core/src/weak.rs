#![forbid(unsafe_code)]

//! Weak listener wrappers.
//!
//! A weak wrapper holds a non-owning reference to a target listener. While
//! the target is alive every notification is forwarded to it; once the last
//! strong handle to the target is dropped the wrapper reports
//! [`is_expired`](crate::InvalidationListener::is_expired) and becomes a
//! silent no-op until the reaper reclaims its slot.
//!
//! Explicit removal remains the primary way to unsubscribe. Weak wrappers
//! exist for observers whose lifetime is shorter than the observable's and
//! that cannot conveniently reach it again to unregister (a binding watching
//! long-lived properties, for example).

use std::fmt;
use std::rc::{Rc, Weak};

use crate::listener::{ChangeListener, ChangeRef, InvalidationListener, InvalidationRef};

/// Forwards invalidations to a weakly-held target.
pub struct WeakInvalidationListener<O: ?Sized> {
    target: Weak<dyn InvalidationListener<O>>,
}

impl<O: ?Sized + 'static> WeakInvalidationListener<O> {
    /// Create a wrapper that does not keep `target` alive.
    #[must_use]
    pub fn new(target: &InvalidationRef<O>) -> Self {
        Self {
            target: Rc::downgrade(target),
        }
    }

    /// Box the wrapper into a registrable handle.
    #[must_use]
    pub fn into_ref(self) -> InvalidationRef<O> {
        Rc::new(self)
    }
}

impl<O: ?Sized> fmt::Debug for WeakInvalidationListener<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakInvalidationListener")
            .field("alive", &(self.target.strong_count() > 0))
            .finish()
    }
}

impl<O: ?Sized> InvalidationListener<O> for WeakInvalidationListener<O> {
    fn invalidated(&self, observable: &O) {
        if let Some(target) = self.target.upgrade() {
            target.invalidated(observable);
        }
    }

    fn is_expired(&self) -> bool {
        self.target.strong_count() == 0
    }
}

/// Forwards change events to a weakly-held target.
pub struct WeakChangeListener<E: ?Sized> {
    target: Weak<dyn ChangeListener<E>>,
}

impl<E: ?Sized + 'static> WeakChangeListener<E> {
    /// Create a wrapper that does not keep `target` alive.
    #[must_use]
    pub fn new(target: &ChangeRef<E>) -> Self {
        Self {
            target: Rc::downgrade(target),
        }
    }

    /// Box the wrapper into a registrable handle.
    #[must_use]
    pub fn into_ref(self) -> ChangeRef<E> {
        Rc::new(self)
    }
}

impl<E: ?Sized> fmt::Debug for WeakChangeListener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakChangeListener")
            .field("alive", &(self.target.strong_count() > 0))
            .finish()
    }
}

impl<E: ?Sized> ChangeListener<E> for WeakChangeListener<E> {
    fn changed(&self, event: &E) {
        if let Some(target) = self.target.upgrade() {
            target.changed(event);
        }
    }

    fn is_expired(&self) -> bool {
        self.target.strong_count() == 0
    }
}
