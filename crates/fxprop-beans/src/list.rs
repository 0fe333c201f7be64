#![forbid(unsafe_code)]

//! Observable list with batched edit notifications.
//!
//! Every mutation produces one [`ListChange`] describing the edits in
//! order. Mutations that change nothing (clearing an empty list, a
//! `retain` that keeps everything) produce an empty change, which the
//! registry drops without notifying anyone.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fxprop_core::{ChangeRef, ListChange, ListenerHelper};

use crate::error::{PropertyError, Result};
use crate::observable::{AnyObservable, Observable, ObservableId, ObservableListener};

/// Change listener handle for an [`ObservableList`].
pub type ListListener<T> = ChangeRef<ListChange<T>>;

struct ListInner<T> {
    items: RefCell<Vec<T>>,
    listeners: RefCell<ListenerHelper<AnyObservable, ListChange<T>>>,
}

/// A `Vec`-backed list that reports its edits.
pub struct ObservableList<T> {
    inner: Rc<ListInner<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &*self.inner.items.borrow())
            .field("listeners", &*self.inner.listeners.borrow())
            .finish()
    }
}

impl<T: Clone + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> FromIterator<T> for ObservableList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Clone + 'static> ObservableList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Wrap existing items without notifying anyone.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(items),
                listeners: RefCell::new(ListenerHelper::new()),
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        let items = self.inner.items.borrow();
        items
            .get(index)
            .cloned()
            .ok_or(PropertyError::IndexOutOfBounds {
                index,
                len: items.len(),
            })
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    /// Append `value`.
    pub fn push(&self, value: T) {
        let from = {
            let mut items = self.inner.items.borrow_mut();
            items.push(value.clone());
            items.len() - 1
        };
        self.notify(ListChange::single(from, Vec::new(), vec![value]));
    }

    /// Insert `value` at `index`, shifting later elements.
    pub fn insert(&self, index: usize, value: T) -> Result<()> {
        {
            let mut items = self.inner.items.borrow_mut();
            if index > items.len() {
                return Err(PropertyError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, value.clone());
        }
        self.notify(ListChange::single(index, Vec::new(), vec![value]));
        Ok(())
    }

    /// Remove and return the element at `index`.
    pub fn remove(&self, index: usize) -> Result<T> {
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            if index >= items.len() {
                return Err(PropertyError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index)
        };
        self.notify(ListChange::single(index, vec![removed.clone()], Vec::new()));
        Ok(removed)
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: T) -> Result<T> {
        let previous = {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(PropertyError::IndexOutOfBounds { index, len })?;
            std::mem::replace(slot, value.clone())
        };
        self.notify(ListChange::single(index, vec![previous.clone()], vec![value]));
        Ok(previous)
    }

    /// Remove every element.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.inner.items.borrow_mut());
        self.notify(ListChange::single(0, removed, Vec::new()));
    }

    /// Replace the whole contents in one edit.
    pub fn replace_all(&self, values: impl IntoIterator<Item = T>) {
        let added: Vec<T> = values.into_iter().collect();
        let removed = self.inner.items.replace(added.clone());
        self.notify(ListChange::single(0, removed, added));
    }

    /// Keep only elements matching `keep`.
    ///
    /// `keep` runs against a snapshot with no borrow held, so it may read the
    /// list. Each run of consecutive removed elements becomes one edit.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) {
        let snapshot = self.inner.items.borrow().clone();
        let verdicts: Vec<bool> = snapshot.iter().map(&mut keep).collect();

        let mut change = ListChange::new();
        {
            let mut items = self.inner.items.borrow_mut();
            let current = std::mem::take(&mut *items);
            let mut kept = Vec::with_capacity(current.len());
            let mut run = Vec::new();
            for (index, item) in current.into_iter().enumerate() {
                if verdicts.get(index).copied().unwrap_or(true) {
                    if !run.is_empty() {
                        change.push_edit(kept.len(), std::mem::take(&mut run), Vec::new());
                    }
                    kept.push(item);
                } else {
                    run.push(item);
                }
            }
            change.push_edit(kept.len(), run, Vec::new());
            *items = kept;
        }
        self.notify(change);
    }

    /// Register a listener for list edits.
    pub fn add_list_listener(&self, listener: ListListener<T>) {
        ListenerHelper::update(&self.inner.listeners, |h| h.register_change_listener(listener));
    }

    /// Remove a list edit listener.
    pub fn remove_list_listener(&self, listener: &ListListener<T>) {
        ListenerHelper::update(&self.inner.listeners, |h| h.unregister_change_listener(listener));
    }

    fn notify(&self, change: ListChange<T>) {
        let observable: &AnyObservable = self;
        ListenerHelper::fire(&self.inner.listeners, observable, &change);
    }
}

impl<T: Clone + 'static> Observable for ObservableList<T> {
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
