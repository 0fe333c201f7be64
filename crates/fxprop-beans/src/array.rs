#![forbid(unsafe_code)]

//! Observable array of plain values.
//!
//! Notifications carry only the touched range `[from, to)` and whether the
//! length changed, never the values themselves; listeners read the array
//! back. Mutations touching nothing (an empty `push_all`, resizing to the
//! current length) are dropped by the registry.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fxprop_core::{ArrayChange, ChangeRef, ListenerHelper};
use tracing::trace;

use crate::error::{PropertyError, Result};
use crate::observable::{AnyObservable, Observable, ObservableId, ObservableListener};

/// Change listener handle for an [`ObservableArray`].
pub type ArrayListener = ChangeRef<ArrayChange>;

struct ArrayInner<T> {
    values: RefCell<Vec<T>>,
    listeners: RefCell<ListenerHelper<AnyObservable, ArrayChange>>,
}

/// A resizable array of `Copy` values that reports touched ranges.
pub struct ObservableArray<T> {
    inner: Rc<ArrayInner<T>>,
}

impl<T> Clone for ObservableArray<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableArray")
            .field("values", &*self.inner.values.borrow())
            .field("listeners", &*self.inner.listeners.borrow())
            .finish()
    }
}

impl<T: Copy + Default + 'static> Default for ObservableArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default + 'static> ObservableArray<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_slice(&[])
    }

    #[must_use]
    pub fn from_slice(values: &[T]) -> Self {
        Self {
            inner: Rc::new(ArrayInner {
                values: RefCell::new(values.to_vec()),
                listeners: RefCell::new(ListenerHelper::new()),
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.values.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.values.borrow().is_empty()
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        let values = self.inner.values.borrow();
        values
            .get(index)
            .copied()
            .ok_or(PropertyError::IndexOutOfBounds {
                index,
                len: values.len(),
            })
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.values.borrow().clone()
    }

    /// Change the length, filling new slots with `T::default()`.
    ///
    /// Reports `[min(old, new), new)`.
    pub fn resize(&self, len: usize) {
        let old = {
            let mut values = self.inner.values.borrow_mut();
            let old = values.len();
            values.resize(len, T::default());
            old
        };
        self.notify(ArrayChange::new(old != len, old.min(len), len));
    }

    /// Overwrite the value at `index`.
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        {
            let mut values = self.inner.values.borrow_mut();
            let len = values.len();
            let slot = values
                .get_mut(index)
                .ok_or(PropertyError::IndexOutOfBounds { index, len })?;
            *slot = value;
        }
        self.notify(ArrayChange::new(false, index, index + 1));
        Ok(())
    }

    /// Overwrite `src.len()` values starting at `from`.
    pub fn set_range(&self, from: usize, src: &[T]) -> Result<()> {
        let to = from.saturating_add(src.len());
        {
            let mut values = self.inner.values.borrow_mut();
            let len = values.len();
            let Some(target) = values.get_mut(from..to) else {
                return Err(PropertyError::InvalidRange { from, to, len });
            };
            target.copy_from_slice(src);
        }
        self.notify(ArrayChange::new(false, from, to));
        Ok(())
    }

    /// Append `src` to the end.
    pub fn push_all(&self, src: &[T]) {
        let old = {
            let mut values = self.inner.values.borrow_mut();
            let old = values.len();
            values.extend_from_slice(src);
            old
        };
        self.notify(ArrayChange::new(!src.is_empty(), old, old + src.len()));
    }

    /// Drop every value.
    pub fn clear(&self) {
        let old = {
            let mut values = self.inner.values.borrow_mut();
            let old = values.len();
            values.clear();
            old
        };
        self.notify(ArrayChange::new(old != 0, 0, 0));
    }

    /// Register a listener for array changes.
    pub fn add_array_listener(&self, listener: ArrayListener) {
        ListenerHelper::update(&self.inner.listeners, |h| h.register_change_listener(listener));
    }

    /// Remove an array change listener.
    pub fn remove_array_listener(&self, listener: &ArrayListener) {
        ListenerHelper::update(&self.inner.listeners, |h| h.unregister_change_listener(listener));
    }

    fn notify(&self, change: ArrayChange) {
        trace!(?change, "array change");
        let observable: &AnyObservable = self;
        ListenerHelper::fire(&self.inner.listeners, observable, &change);
    }
}

impl<T: Copy + Default + 'static> Observable for ObservableArray<T> {
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
