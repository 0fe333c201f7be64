#![forbid(unsafe_code)]

//! The observation contract shared by properties, bindings and collections.
//!
//! Every observable accepts invalidation listeners typed over
//! [`AnyObservable`], so a single listener (a binding's dependency observer,
//! for example) can watch observables of unrelated value types. Value
//! observables additionally accept change listeners receiving
//! [`ValueChange<T>`].

use std::rc::Rc;

use fxprop_core::{ChangeRef, InvalidationRef, ValueChange, invalidation_listener};

/// Type-erased observable passed to invalidation listeners.
pub type AnyObservable = dyn Observable;

/// Invalidation listener handle accepted by every observable.
pub type ObservableListener = InvalidationRef<AnyObservable>;

/// Change listener handle for a value observable.
pub type ValueListener<T> = ChangeRef<ValueChange<T>>;

/// Identity of an observable's shared state.
///
/// Cloned handles to the same observable report the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservableId(usize);

impl ObservableId {
    /// Identity of the allocation behind `rc`.
    #[must_use]
    pub fn of<T>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc).cast::<()>() as usize)
    }
}

/// Something whose invalidation can be watched.
pub trait Observable {
    /// Register an invalidation listener.
    fn add_listener(&self, listener: ObservableListener);

    /// Remove the first registration matching `listener`.
    fn remove_listener(&self, listener: &ObservableListener);

    /// Identity of the underlying shared state.
    fn observable_id(&self) -> ObservableId;
}

/// An observable holding a single value.
pub trait ObservableValue<T>: Observable {
    /// Current value, recomputing it if it is stale.
    fn value(&self) -> T;

    /// Register a change listener.
    fn add_change_listener(&self, listener: ValueListener<T>);

    /// Remove the first registration matching `listener`.
    fn remove_change_listener(&self, listener: &ValueListener<T>);
}

/// Wrap a closure as an invalidation listener for any observable.
#[must_use]
pub fn observer<F>(f: F) -> ObservableListener
where
    F: Fn(&AnyObservable) + 'static,
{
    invalidation_listener(f)
}

/// Share a cloneable observable handle as a type-erased dependency.
#[must_use]
pub fn shared<S>(observable: &S) -> Rc<AnyObservable>
where
    S: Observable + Clone + 'static,
{
    Rc::new(observable.clone())
}
