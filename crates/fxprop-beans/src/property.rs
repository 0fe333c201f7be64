#![forbid(unsafe_code)]

//! Read/write properties with unidirectional and bidirectional binding.
//!
//! # Design
//!
//! [`SimpleProperty<T>`] is a cloneable handle to shared state
//! (`Rc<PropertyInner<T>>`). Cloning a property yields a second handle to
//! the **same** value and listeners.
//!
//! A property either holds its own value or follows a source observable
//! ([`SimpleProperty::bind`]). A bound property is lazy: a source
//! invalidation marks it invalid and notifies listeners once; the value is
//! pulled from the source the next time it is read. Change listeners force
//! that read, so they always see the new value.
//!
//! # Invariants
//!
//! 1. `set(v)` with `v == current` notifies nobody.
//! 2. A bound property rejects `set` with [`PropertyError::BoundValueSet`].
//! 3. An invalid property notifies at most once until it is read again.
//! 4. Bidirectional links never ping-pong: an update arriving through a
//!    link is not forwarded back through it.
//!
//! # Failure Modes
//!
//! | Failure                   | Behavior                                   |
//! |---------------------------|--------------------------------------------|
//! | Set while bound           | `Err(BoundValueSet)`, value unchanged      |
//! | Bind to self              | `Err(SelfBinding)`                         |
//! | Linked peer is bound      | Peer update rejected and logged at `warn`  |
//! | Source dropped while bound| Keeps the last value; source kept alive by the binding |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use fxprop_core::{ListenerHelper, ValueChange, WeakInvalidationListener, change_listener};
use tracing::{debug, warn};

use crate::error::{PropertyError, Result};
use crate::observable::{
    AnyObservable, Observable, ObservableId, ObservableListener, ObservableValue, ValueListener,
    observer,
};

/// Listener registry for single-valued observables.
pub(crate) type ValueHelper<T> = ListenerHelper<AnyObservable, ValueChange<T>>;

struct BoundSource<T> {
    source: Rc<dyn ObservableValue<T>>,
    /// Registered with the source; forwards to `_observer` while it lives.
    registration: ObservableListener,
    _observer: ObservableListener,
}

struct BidirectionalLink<T> {
    peer: ObservableId,
    listener: ValueListener<T>,
}

struct PropertyInner<T> {
    name: String,
    value: RefCell<T>,
    valid: Cell<bool>,
    listeners: RefCell<ValueHelper<T>>,
    bound: RefCell<Option<BoundSource<T>>>,
    links: RefCell<Vec<BidirectionalLink<T>>>,
}

/// A named, observable, bindable value.
pub struct SimpleProperty<T> {
    inner: Rc<PropertyInner<T>>,
}

impl<T> Clone for SimpleProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SimpleProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleProperty")
            .field("name", &self.inner.name)
            .field("value", &*self.inner.value.borrow())
            .field("valid", &self.inner.valid.get())
            .field("bound", &self.inner.bound.borrow().is_some())
            .field("listeners", &*self.inner.listeners.borrow())
            .finish()
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for SimpleProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> SimpleProperty<T> {
    /// Create an unnamed property.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::named("", value)
    }

    /// Create a property with a name used in errors and diagnostics.
    #[must_use]
    pub fn named(name: impl Into<String>, value: T) -> Self {
        Self {
            inner: Rc::new(PropertyInner {
                name: name.into(),
                value: RefCell::new(value),
                valid: Cell::new(true),
                listeners: RefCell::new(ListenerHelper::new()),
                bound: RefCell::new(None),
                links: RefCell::new(Vec::new()),
            }),
        }
    }

    fn from_inner(inner: Rc<PropertyInner<T>>) -> Self {
        Self { inner }
    }

    fn as_observable(&self) -> &AnyObservable {
        self
    }

    /// Property name (may be empty).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current value, pulling from the source if bound and stale.
    #[must_use]
    pub fn get(&self) -> T {
        if !self.inner.valid.get() {
            let source = self
                .inner
                .bound
                .borrow()
                .as_ref()
                .map(|bound| Rc::clone(&bound.source));
            if let Some(source) = source {
                let fresh = source.value();
                *self.inner.value.borrow_mut() = fresh;
            }
            self.inner.valid.set(true);
        }
        self.inner.value.borrow().clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        if !self.inner.valid.get() {
            let _ = self.get();
        }
        f(&self.inner.value.borrow())
    }

    /// Store a new value and notify listeners if it differs.
    pub fn set(&self, value: T) -> Result<()> {
        if self.is_bound() {
            return Err(PropertyError::BoundValueSet {
                name: self.inner.name.clone(),
            });
        }
        if *self.inner.value.borrow() == value {
            return Ok(());
        }
        let new = value.clone();
        let old = self.inner.value.replace(value);
        ListenerHelper::fire_with(&self.inner.listeners, self.as_observable(), move || {
            ValueChange::new(old, new)
        });
        Ok(())
    }

    /// Modify the value in place; listeners are notified if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Whether the property follows a source.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.bound.borrow().is_some()
    }

    /// Whether the cached value is current.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.valid.get()
    }

    /// Follow `source`, replacing any previous binding.
    pub fn bind<S>(&self, source: &S) -> Result<()>
    where
        S: ObservableValue<T> + Clone + 'static,
    {
        if source.observable_id() == self.observable_id() {
            return Err(PropertyError::SelfBinding {
                name: self.inner.name.clone(),
            });
        }
        self.detach_source();

        let weak: Weak<PropertyInner<T>> = Rc::downgrade(&self.inner);
        let forward = observer(move |_| {
            if let Some(inner) = weak.upgrade() {
                SimpleProperty::from_inner(inner).mark_invalid();
            }
        });
        let registration = WeakInvalidationListener::new(&forward).into_ref();
        source.add_listener(Rc::clone(&registration));

        *self.inner.bound.borrow_mut() = Some(BoundSource {
            source: Rc::new(source.clone()),
            registration,
            _observer: forward,
        });
        debug!(property = %self.inner.name, "bound property");
        self.mark_invalid();
        Ok(())
    }

    /// Stop following the source, keeping its latest value.
    pub fn unbind(&self) {
        if !self.is_bound() {
            return;
        }
        let current = self.get();
        self.detach_source();
        *self.inner.value.borrow_mut() = current;
        self.inner.valid.set(true);
        debug!(property = %self.inner.name, "unbound property");
    }

    fn detach_source(&self) {
        let previous = self.inner.bound.borrow_mut().take();
        if let Some(bound) = previous {
            bound.source.remove_listener(&bound.registration);
        }
    }

    fn mark_invalid(&self) {
        if !self.inner.valid.get() {
            return;
        }
        self.inner.valid.set(false);
        // Invalidation listeners may read the property before change
        // listeners run, so the old value is captured up front.
        let has_change = self.inner.listeners.borrow().has_change_listeners();
        let old = has_change.then(|| self.inner.value.borrow().clone());
        ListenerHelper::fire_with(&self.inner.listeners, self.as_observable(), move || {
            let new = self.get();
            let old = old.unwrap_or_else(|| new.clone());
            ValueChange::new(old, new)
        });
    }

    // ========================================================================
    // Bidirectional binding
    // ========================================================================

    /// Keep this property and `other` equal in both directions.
    ///
    /// This property first takes `other`'s value.
    pub fn bind_bidirectional(&self, other: &SimpleProperty<T>) -> Result<()> {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return Err(PropertyError::SelfBinding {
                name: self.inner.name.clone(),
            });
        }
        self.set(other.get())?;

        let updating = Rc::new(Cell::new(false));
        let forward = link_listener(&updating, Rc::downgrade(&other.inner));
        let backward = link_listener(&updating, Rc::downgrade(&self.inner));
        self.add_change_listener(Rc::clone(&forward));
        other.add_change_listener(Rc::clone(&backward));

        self.inner.links.borrow_mut().push(BidirectionalLink {
            peer: other.observable_id(),
            listener: forward,
        });
        other.inner.links.borrow_mut().push(BidirectionalLink {
            peer: self.observable_id(),
            listener: backward,
        });
        debug!(left = %self.inner.name, right = %other.inner.name, "linked properties");
        Ok(())
    }

    /// Remove a link created by [`bind_bidirectional`](Self::bind_bidirectional).
    ///
    /// Returns `false` when the two properties were not linked.
    pub fn unbind_bidirectional(&self, other: &SimpleProperty<T>) -> bool {
        let mine = self.take_link(other.observable_id());
        let theirs = other.take_link(self.observable_id());
        if let Some(listener) = &mine {
            self.remove_change_listener(listener);
        }
        if let Some(listener) = &theirs {
            other.remove_change_listener(listener);
        }
        mine.is_some() || theirs.is_some()
    }

    fn take_link(&self, peer: ObservableId) -> Option<ValueListener<T>> {
        let mut links = self.inner.links.borrow_mut();
        let index = links.iter().position(|link| link.peer == peer)?;
        Some(links.remove(index).listener)
    }

    /// A view exposing observation but not mutation.
    #[must_use]
    pub fn read_only(&self) -> ReadOnlyProperty<T> {
        ReadOnlyProperty {
            property: self.clone(),
        }
    }

    /// Number of registered listeners of both kinds.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let helper = self.inner.listeners.borrow();
        helper.invalidation_count() + helper.change_count()
    }
}

fn link_listener<T>(updating: &Rc<Cell<bool>>, target: Weak<PropertyInner<T>>) -> ValueListener<T>
where
    T: Clone + PartialEq + 'static,
{
    let updating = Rc::clone(updating);
    change_listener(move |event: &ValueChange<T>| {
        if updating.get() {
            return;
        }
        let Some(inner) = target.upgrade() else {
            return;
        };
        updating.set(true);
        let result = SimpleProperty::from_inner(inner).set(event.new.clone());
        updating.set(false);
        if let Err(err) = result {
            warn!(%err, "bidirectional update rejected");
        }
    })
}

impl<T: Clone + PartialEq + 'static> Observable for SimpleProperty<T> {
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

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for SimpleProperty<T> {
    fn value(&self) -> T {
        self.get()
    }

    fn add_change_listener(&self, listener: ValueListener<T>) {
        // Change listeners need a valid value to diff against.
        let _ = self.get();
        ListenerHelper::update(&self.inner.listeners, |h| h.register_change_listener(listener));
    }

    fn remove_change_listener(&self, listener: &ValueListener<T>) {
        ListenerHelper::update(&self.inner.listeners, |h| h.unregister_change_listener(listener));
    }
}

/// Observation-only view of a [`SimpleProperty`].
pub struct ReadOnlyProperty<T> {
    property: SimpleProperty<T>,
}

impl<T> Clone for ReadOnlyProperty<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadOnlyProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnlyProperty").field(&self.property).finish()
    }
}

impl<T: Clone + PartialEq + 'static> ReadOnlyProperty<T> {
    #[must_use]
    pub fn get(&self) -> T {
        self.property.get()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.property.name()
    }
}

impl<T: Clone + PartialEq + 'static> Observable for ReadOnlyProperty<T> {
    fn add_listener(&self, listener: ObservableListener) {
        self.property.add_listener(listener);
    }

    fn remove_listener(&self, listener: &ObservableListener) {
        self.property.remove_listener(listener);
    }

    fn observable_id(&self) -> ObservableId {
        self.property.observable_id()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for ReadOnlyProperty<T> {
    fn value(&self) -> T {
        self.property.get()
    }

    fn add_change_listener(&self, listener: ValueListener<T>) {
        self.property.add_change_listener(listener);
    }

    fn remove_change_listener(&self, listener: &ValueListener<T>) {
        self.property.remove_change_listener(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<u32>>, ObservableListener) {
        let hits = Rc::new(Cell::new(0u32));
        let hits_clone = Rc::clone(&hits);
        let listener = observer(move |_| hits_clone.set(hits_clone.get() + 1));
        (hits, listener)
    }

    fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<(T, T)>>>, ValueListener<T>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let listener = change_listener(move |e: &ValueChange<T>| {
            seen_clone.borrow_mut().push((e.old.clone(), e.new.clone()))
        });
        (seen, listener)
    }

    #[test]
    fn get_set_basic() {
        let prop = SimpleProperty::named("width", 10);
        assert_eq!(prop.get(), 10);
        prop.set(20).unwrap();
        assert_eq!(prop.get(), 20);
        assert_eq!(prop.name(), "width");
    }

    #[test]
    fn equal_set_notifies_nobody() {
        let prop = SimpleProperty::new(5);
        let (hits, inv) = counter();
        let (seen, change) = recorder::<i32>();
        prop.add_listener(inv);
        prop.add_change_listener(change);

        prop.set(5).unwrap();
        assert_eq!(hits.get(), 0);
        assert!(seen.borrow().is_empty());

        prop.set(6).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(*seen.borrow(), vec![(5, 6)]);
    }

    #[test]
    fn update_in_place() {
        let prop = SimpleProperty::new(vec![1, 2]);
        let (seen, change) = recorder::<Vec<i32>>();
        prop.add_change_listener(change);
        prop.update(|v| v.push(3)).unwrap();
        assert_eq!(prop.get(), vec![1, 2, 3]);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(prop.with(|v| v.len()), 3);
    }

    #[test]
    fn removed_listener_not_notified() {
        let prop = SimpleProperty::new(0);
        let (hits, inv) = counter();
        prop.add_listener(Rc::clone(&inv));
        prop.set(1).unwrap();
        prop.remove_listener(&inv);
        prop.set(2).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(prop.listener_count(), 0);
    }

    #[test]
    fn bound_property_follows_source() {
        let source = SimpleProperty::new(1);
        let target = SimpleProperty::named("target", 0);
        target.bind(&source).unwrap();
        assert!(target.is_bound());
        assert_eq!(target.get(), 1);

        source.set(7).unwrap();
        assert_eq!(target.get(), 7);
    }

    #[test]
    fn bound_property_rejects_set() {
        let source = SimpleProperty::new(1);
        let target = SimpleProperty::named("target", 0);
        target.bind(&source).unwrap();
        let err = target.set(3).unwrap_err();
        assert_eq!(
            err,
            PropertyError::BoundValueSet {
                name: "target".into()
            }
        );
        assert_eq!(target.get(), 1);
    }

    #[test]
    fn self_binding_rejected() {
        let prop = SimpleProperty::named("p", 1);
        assert!(matches!(
            prop.bind(&prop.clone()),
            Err(PropertyError::SelfBinding { .. })
        ));
        assert!(matches!(
            prop.bind_bidirectional(&prop),
            Err(PropertyError::SelfBinding { .. })
        ));
    }

    #[test]
    fn bound_change_listener_sees_each_source_change() {
        let source = SimpleProperty::new(1);
        let target = SimpleProperty::new(0);
        let (seen, change) = recorder::<i32>();
        target.add_change_listener(change);
        target.bind(&source).unwrap();
        source.set(2).unwrap();
        source.set(3).unwrap();
        assert_eq!(*seen.borrow(), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn lazy_invalidation_fires_once_until_read() {
        let source = SimpleProperty::new(1);
        let target = SimpleProperty::new(0);
        target.bind(&source).unwrap();
        let _ = target.get();
        let (hits, inv) = counter();
        target.add_listener(inv);

        source.set(2).unwrap();
        source.set(3).unwrap();
        assert_eq!(hits.get(), 1);
        assert!(!target.is_valid());

        assert_eq!(target.get(), 3);
        source.set(4).unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn unbind_keeps_last_value_and_detaches() {
        let source = SimpleProperty::new(1);
        let target = SimpleProperty::new(0);
        target.bind(&source).unwrap();
        source.set(5).unwrap();
        target.unbind();
        assert!(!target.is_bound());
        assert_eq!(target.get(), 5);

        source.set(9).unwrap();
        assert_eq!(target.get(), 5);
        assert_eq!(source.listener_count(), 0);
        target.set(11).unwrap();
    }

    #[test]
    fn dropped_target_registration_expires() {
        let source = SimpleProperty::new(1);
        {
            let target = SimpleProperty::new(0);
            target.bind(&source).unwrap();
            assert_eq!(source.listener_count(), 1);
        }
        // Firing through an expired wrapper is harmless.
        source.set(2).unwrap();
    }

    #[test]
    fn bidirectional_sync_both_ways() {
        let a = SimpleProperty::named("a", 1);
        let b = SimpleProperty::named("b", 2);
        a.bind_bidirectional(&b).unwrap();
        assert_eq!(a.get(), 2);

        a.set(10).unwrap();
        assert_eq!(b.get(), 10);
        b.set(20).unwrap();
        assert_eq!(a.get(), 20);

        assert!(a.unbind_bidirectional(&b));
        a.set(30).unwrap();
        assert_eq!(b.get(), 20);
        assert!(!a.unbind_bidirectional(&b));
    }

    #[test]
    fn bidirectional_notifies_each_side_once() {
        let a = SimpleProperty::new(0);
        let b = SimpleProperty::new(0);
        a.bind_bidirectional(&b).unwrap();
        let (hits_a, inv_a) = counter();
        let (hits_b, inv_b) = counter();
        a.add_listener(inv_a);
        b.add_listener(inv_b);

        a.set(1).unwrap();
        assert_eq!((hits_a.get(), hits_b.get()), (1, 1));
    }

    #[test]
    fn read_only_view_observes() {
        let prop = SimpleProperty::named("ro", 1);
        let view = prop.read_only();
        let (seen, change) = recorder::<i32>();
        view.add_change_listener(change);
        prop.set(2).unwrap();
        assert_eq!(view.get(), 2);
        assert_eq!(view.name(), "ro");
        assert_eq!(*seen.borrow(), vec![(1, 2)]);
        assert_eq!(view.observable_id(), prop.observable_id());
    }

    #[test]
    fn clone_shares_state() {
        let a = SimpleProperty::new(String::from("x"));
        let b = a.clone();
        b.set("y".into()).unwrap();
        assert_eq!(a.get(), "y");
    }

    #[test]
    fn debug_format() {
        let prop = SimpleProperty::named("dbg", 42);
        let dbg = format!("{prop:?}");
        assert!(dbg.contains("SimpleProperty"));
        assert!(dbg.contains("42"));
        assert!(dbg.contains("dbg"));
    }
}
