#![forbid(unsafe_code)]

//! Lazily computed values derived from other observables.
//!
//! A [`Binding<T>`] registers one weak invalidation listener on each
//! dependency. A dependency invalidation marks the binding stale and
//! notifies its own listeners once; the value is recomputed on the next
//! [`Binding::get`].
//!
//! Dependencies hold only a weak wrapper, so dropping the last handle to a
//! binding stops its notifications. The expired wrappers are reclaimed by
//! the dependency's registry the next time it grows.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use fxprop_core::{ListenerHelper, ValueChange, WeakInvalidationListener};
use tracing::trace;

use crate::observable::{
    AnyObservable, Observable, ObservableId, ObservableListener, ObservableValue, ValueListener,
    observer, shared,
};
use crate::property::ValueHelper;

struct BindingInner<T> {
    compute: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
    valid: Cell<bool>,
    listeners: RefCell<ValueHelper<T>>,
    dependencies: RefCell<Vec<Rc<AnyObservable>>>,
    registration: ObservableListener,
    _observer: ObservableListener,
}

/// A value computed from dependencies and cached until they change.
pub struct Binding<T> {
    inner: Rc<BindingInner<T>>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("value", &*self.inner.value.borrow())
            .field("valid", &self.inner.valid.get())
            .field("dependencies", &self.inner.dependencies.borrow().len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> {
    /// Create a binding over `dependencies`.
    ///
    /// `compute` reads whatever it needs; the dependency list only decides
    /// when the cached value goes stale.
    pub fn new<F>(dependencies: Vec<Rc<AnyObservable>>, compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let inner = Rc::new_cyclic(|weak: &Weak<BindingInner<T>>| {
            let weak = weak.clone();
            let forward = observer(move |_| {
                if let Some(inner) = weak.upgrade() {
                    Binding { inner }.invalidate();
                }
            });
            BindingInner {
                compute: Box::new(compute),
                value: RefCell::new(None),
                valid: Cell::new(false),
                listeners: RefCell::new(ListenerHelper::new()),
                dependencies: RefCell::new(Vec::new()),
                registration: WeakInvalidationListener::new(&forward).into_ref(),
                _observer: forward,
            }
        });
        for dependency in &dependencies {
            dependency.add_listener(Rc::clone(&inner.registration));
        }
        *inner.dependencies.borrow_mut() = dependencies;
        Self { inner }
    }

    /// A binding applying `f` to the value of `source`.
    pub fn map<S, U, F>(source: &S, f: F) -> Self
    where
        S: ObservableValue<U> + Clone + 'static,
        U: 'static,
        F: Fn(U) -> T + 'static,
    {
        let dependency = source.clone();
        Self::new(vec![shared(source)], move || f(dependency.value()))
    }

    /// A binding applying `f` to the values of `a` and `b`.
    pub fn combine<A, B, U, V, F>(a: &A, b: &B, f: F) -> Self
    where
        A: ObservableValue<U> + Clone + 'static,
        B: ObservableValue<V> + Clone + 'static,
        U: 'static,
        V: 'static,
        F: Fn(U, V) -> T + 'static,
    {
        let (left, right) = (a.clone(), b.clone());
        Self::new(vec![shared(a), shared(b)], move || {
            f(left.value(), right.value())
        })
    }

    /// Current value, recomputed if stale.
    #[must_use]
    pub fn get(&self) -> T {
        if self.inner.valid.get() {
            if let Some(value) = self.inner.value.borrow().clone() {
                return value;
            }
        }
        let fresh = (self.inner.compute)();
        *self.inner.value.borrow_mut() = Some(fresh.clone());
        self.inner.valid.set(true);
        fresh
    }

    /// Whether the cached value is current.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.valid.get()
    }

    /// Mark the value stale and notify listeners.
    ///
    /// Does nothing when already stale.
    pub fn invalidate(&self) {
        if !self.inner.valid.get() {
            return;
        }
        self.inner.valid.set(false);
        trace!("binding invalidated");
        let has_change = self.inner.listeners.borrow().has_change_listeners();
        let old = if has_change {
            self.inner.value.borrow().clone()
        } else {
            None
        };
        let observable: &AnyObservable = self;
        ListenerHelper::fire_with(&self.inner.listeners, observable, move || {
            let new = self.get();
            let old = old.unwrap_or_else(|| new.clone());
            ValueChange::new(old, new)
        });
    }

    /// Detach from every dependency.
    ///
    /// The binding keeps its last computed value and stays usable, but no
    /// longer goes stale on its own.
    pub fn dispose(&self) {
        let dependencies = std::mem::take(&mut *self.inner.dependencies.borrow_mut());
        for dependency in &dependencies {
            dependency.remove_listener(&self.inner.registration);
        }
    }

    /// Number of observables this binding still listens to.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }
}

impl<T: Clone + PartialEq + 'static> Observable for Binding<T> {
    fn add_listener(&self, listener: ObservableListener) {
        ListenerHelper::update(&self.inner.listeners, |h| h.register_invalidation_listener(listener));
    }

    fn remove_listener(&self, listener: &ObservableListener) {
        ListenerHelper::update(&self.inner.listeners, |h| {
            h.unregister_invalidation_listener(listener)
        });
    }

    fn observable_id(&self) -> ObservableId {
        ObservableId::of(&self.inner)
    }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for Binding<T> {
    fn value(&self) -> T {
        self.get()
    }

    fn add_change_listener(&self, listener: ValueListener<T>) {
        let _ = self.get();
        ListenerHelper::update(&self.inner.listeners, |h| h.register_change_listener(listener));
    }

    fn remove_change_listener(&self, listener: &ValueListener<T>) {
        ListenerHelper::update(&self.inner.listeners, |h| h.unregister_change_listener(listener));
    }
}

// ============================================================================
// Boolean helpers
// ============================================================================

/// Logical negation of `source`.
pub fn not<S>(source: &S) -> Binding<bool>
where
    S: ObservableValue<bool> + Clone + 'static,
{
    Binding::map(source, |value: bool| !value)
}

/// Logical conjunction of `a` and `b`.
pub fn and<A, B>(a: &A, b: &B) -> Binding<bool>
where
    A: ObservableValue<bool> + Clone + 'static,
    B: ObservableValue<bool> + Clone + 'static,
{
    Binding::combine(a, b, |x: bool, y: bool| x && y)
}

/// Logical disjunction of `a` and `b`.
pub fn or<A, B>(a: &A, b: &B) -> Binding<bool>
where
    A: ObservableValue<bool> + Clone + 'static,
    B: ObservableValue<bool> + Clone + 'static,
{
    Binding::combine(a, b, |x: bool, y: bool| x || y)
}

/// Whether `a` and `b` currently hold equal values.
pub fn equal<A, B, V>(a: &A, b: &B) -> Binding<bool>
where
    A: ObservableValue<V> + Clone + 'static,
    B: ObservableValue<V> + Clone + 'static,
    V: PartialEq + 'static,
{
    Binding::combine(a, b, |x: V, y: V| x == y)
}
