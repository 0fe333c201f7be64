#![forbid(unsafe_code)]

//! Observable hash map with per-entry notifications.
//!
//! Each touched entry is reported as its own [`MapChange`] dispatch, so
//! `clear` on a map of `n` entries notifies listeners `n` times. The map is
//! already updated for the entry when its notification runs, and entries
//! not yet reported may still be present.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use fxprop_core::{ChangeRef, ListenerHelper, MapChange};

use crate::observable::{AnyObservable, Observable, ObservableId, ObservableListener};

/// Change listener handle for an [`ObservableMap`].
pub type MapListener<K, V> = ChangeRef<MapChange<K, V>>;

struct MapInner<K, V> {
    entries: RefCell<HashMap<K, V>>,
    listeners: RefCell<ListenerHelper<AnyObservable, MapChange<K, V>>>,
}

/// A `HashMap` that reports entry changes.
pub struct ObservableMap<K, V> {
    inner: Rc<MapInner<K, V>>,
}

impl<K, V> Clone for ObservableMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ObservableMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableMap")
            .field("entries", &*self.inner.entries.borrow())
            .field("listeners", &*self.inner.listeners.borrow())
            .finish()
    }
}

impl<K, V> Default for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(MapInner {
                entries: RefCell::new(HashMap::new()),
                listeners: RefCell::new(ListenerHelper::new()),
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.entries.borrow().get(key).cloned()
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.entries.borrow().contains_key(key)
    }

    /// Store `value` under `key`, returning the previous value.
    ///
    /// Storing a value equal to the current one notifies nobody.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let previous = self
            .inner
            .entries
            .borrow_mut()
            .insert(key.clone(), value.clone());
        match &previous {
            Some(old) if *old == value => {}
            Some(old) => self.notify(MapChange::Replaced {
                key,
                old: old.clone(),
                new: value,
            }),
            None => self.notify(MapChange::Added { key, value }),
        }
        previous
    }

    /// Remove `key`, returning its value if present.
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.inner.entries.borrow_mut().remove(key)?;
        self.notify(MapChange::Removed {
            key: key.clone(),
            value: removed.clone(),
        });
        Some(removed)
    }

    /// Remove every entry present at the call, notifying once per entry.
    ///
    /// Entries inserted by listeners while clearing are kept.
    pub fn clear(&self) {
        let keys: Vec<K> = self.inner.entries.borrow().keys().cloned().collect();
        for key in keys {
            let removed = self.inner.entries.borrow_mut().remove_entry(&key);
            if let Some((key, value)) = removed {
                self.notify(MapChange::Removed { key, value });
            }
        }
    }

    /// Snapshot of the current entries.
    #[must_use]
    pub fn to_hash_map(&self) -> HashMap<K, V> {
        self.inner.entries.borrow().clone()
    }

    /// Register a listener for entry changes.
    pub fn add_map_listener(&self, listener: MapListener<K, V>) {
        ListenerHelper::update(&self.inner.listeners, |h| h.register_change_listener(listener));
    }

    /// Remove an entry change listener.
    pub fn remove_map_listener(&self, listener: &MapListener<K, V>) {
        ListenerHelper::update(&self.inner.listeners, |h| h.unregister_change_listener(listener));
    }

    fn notify(&self, change: MapChange<K, V>) {
        let observable: &AnyObservable = self;
        ListenerHelper::fire(&self.inner.listeners, observable, &change);
    }
}

impl<K, V> Observable for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
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
