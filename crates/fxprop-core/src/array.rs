#![forbid(unsafe_code)]

//! Growable listener array with copy-on-write under dispatch.
//!
//! # Layout
//!
//! The backing store is a shared `Rc<Vec<Option<L>>>` whose length is the
//! array's *capacity*; only the first `len` slots are live. A dispatch pass
//! takes a [`Snapshot`] (a clone of the `Rc` plus the current `len`) and
//! iterates that, never the live fields.
//!
//! # Invariants
//!
//! 1. Slots `[0, len)` are `Some`, slots `[len, capacity)` are `None`.
//! 2. Registration order is preserved; removal slides the tail left.
//! 3. While `locked`, a mutation never writes into the current backing
//!    store: it builds a fresh one and swaps it in, so any snapshot taken
//!    before the mutation still sees exactly what it captured.
//! 4. Expired entries are reaped only on the add path, only when unlocked,
//!    and only when the array is full.
//! 5. When reaping frees nothing, capacity grows to `capacity * 3 / 2 + 1`.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::listener::ListenerHandle;

/// Capacity after growing a full array.
#[inline]
#[must_use]
pub fn grown_capacity(capacity: usize) -> usize {
    capacity
        .checked_mul(3)
        .map(|c| c / 2 + 1)
        .expect("listener array capacity overflow")
}

/// Ordered listener storage for one listener kind.
pub struct ListenerArray<L> {
    slots: Rc<Vec<Option<L>>>,
    len: usize,
}

/// Immutable view of a listener array captured at the start of a dispatch.
pub struct Snapshot<L> {
    slots: Rc<Vec<Option<L>>>,
    len: usize,
}

impl<L> Snapshot<L> {
    /// Number of captured listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Captured listeners in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.slots[..self.len].iter().flatten()
    }
}

impl<L> fmt::Debug for ListenerArray<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerArray")
            .field("len", &self.len)
            .field("capacity", &self.slots.len())
            .finish()
    }
}

impl<L> Default for ListenerArray<L> {
    fn default() -> Self {
        Self {
            slots: Rc::new(Vec::new()),
            len: 0,
        }
    }
}

impl<L: ListenerHandle> ListenerArray<L> {
    /// Create an empty array with no backing allocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an array holding `items` with at least `capacity` slots.
    #[must_use]
    pub fn from_listeners(items: impl IntoIterator<Item = L>, capacity: usize) -> Self {
        let mut slots: Vec<Option<L>> = items.into_iter().map(Some).collect();
        let len = slots.len();
        slots.resize(capacity.max(len), None);
        Self {
            slots: Rc::new(slots),
            len,
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing store.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Listener at `index`, if live.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&L> {
        if index < self.len {
            self.slots[index].as_ref()
        } else {
            None
        }
    }

    /// Capture the current listeners for a dispatch pass.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<L> {
        Snapshot {
            slots: Rc::clone(&self.slots),
            len: self.len,
        }
    }

    /// Whether the backing store is shared with an outstanding snapshot.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.slots) > 1
    }

    /// Append a listener.
    ///
    /// `locked` forces a fresh backing store. `reap` allows expired weak
    /// entries to be compacted out before growing a full, unlocked array.
    pub fn push(&mut self, listener: L, locked: bool, reap: bool, initial_capacity: usize) {
        let capacity = self.capacity();
        if capacity == 0 {
            self.reallocate(initial_capacity.max(1));
        } else if locked {
            let target = if self.len < capacity {
                capacity
            } else {
                grown_capacity(capacity)
            };
            self.reallocate(target);
        } else if self.len == capacity {
            if reap {
                self.reap_expired();
            }
            if self.len == capacity {
                let target = grown_capacity(capacity);
                debug!(from = capacity, to = target, "growing listener array");
                self.reallocate(target);
            }
        }

        let index = self.len;
        Rc::make_mut(&mut self.slots)[index] = Some(listener);
        self.len += 1;
    }

    /// Remove the first registration matching `listener`.
    ///
    /// Returns `false` (and changes nothing) when no registration matches.
    pub fn remove(&mut self, listener: &L, locked: bool) -> bool {
        let Some(index) = self.position(listener) else {
            return false;
        };

        if locked {
            let capacity = self.capacity();
            let mut fresh: Vec<Option<L>> = Vec::with_capacity(capacity);
            fresh.extend(self.slots[..index].iter().cloned());
            fresh.extend(self.slots[index + 1..self.len].iter().cloned());
            fresh.resize(capacity, None);
            self.slots = Rc::new(fresh);
        } else {
            let len = self.len;
            let slots = Rc::make_mut(&mut self.slots);
            slots[index..len].rotate_left(1);
            slots[len - 1] = None;
        }
        self.len -= 1;
        true
    }

    /// Compact expired entries out of the array, preserving order.
    ///
    /// Must only run when no dispatch is iterating this array. Returns the
    /// new length.
    pub fn reap_expired(&mut self) -> usize {
        let len = self.len;
        // Every entry is queried before any slot moves.
        let alive: Vec<bool> = self.slots[..len]
            .iter()
            .map(|slot| slot.as_ref().is_some_and(|listener| !listener.expired()))
            .collect();
        if alive.iter().all(|&a| a) {
            return len;
        }
        let slots = Rc::make_mut(&mut self.slots);
        let mut kept = 0;
        for (index, alive) in alive.into_iter().enumerate() {
            if alive {
                if kept != index {
                    slots[kept] = slots[index].take();
                }
                kept += 1;
            } else {
                slots[index] = None;
            }
        }
        if kept < len {
            debug!(reaped = len - kept, remaining = kept, "reaped expired listeners");
        }
        self.len = kept;
        kept
    }

    fn position(&self, listener: &L) -> Option<usize> {
        self.slots[..self.len].iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|registered| listener.same_listener(registered))
        })
    }

    fn reallocate(&mut self, capacity: usize) {
        let mut fresh: Vec<Option<L>> = Vec::with_capacity(capacity);
        fresh.extend(self.slots[..self.len].iter().cloned());
        fresh.resize(capacity, None);
        self.slots = Rc::new(fresh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{InvalidationRef, invalidation_listener};
    use crate::weak::WeakInvalidationListener;

    type Inv = InvalidationRef<()>;

    fn noop() -> Inv {
        invalidation_listener(|_: &()| {})
    }

    fn collect(snapshot: &Snapshot<Inv>) -> Vec<Inv> {
        snapshot.iter().cloned().collect()
    }

    #[test]
    fn growth_factor() {
        assert_eq!(grown_capacity(0), 1);
        assert_eq!(grown_capacity(1), 2);
        assert_eq!(grown_capacity(2), 4);
        assert_eq!(grown_capacity(4), 7);
        assert_eq!(grown_capacity(7), 11);
    }

    #[test]
    fn push_allocates_and_grows() {
        let mut array = ListenerArray::new();
        array.push(noop(), false, true, 1);
        assert_eq!(array.capacity(), 1);
        array.push(noop(), false, true, 1);
        assert_eq!(array.capacity(), 2);
        array.push(noop(), false, true, 1);
        assert_eq!(array.capacity(), 4);
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn remove_slides_tail_left() {
        let (a, b, c) = (noop(), noop(), noop());
        let mut array = ListenerArray::from_listeners([a.clone(), b.clone(), c.clone()], 3);
        assert!(array.remove(&b, false));
        assert_eq!(array.len(), 2);
        assert!(array.get(0).is_some_and(|l| l.same_listener(&a)));
        assert!(array.get(1).is_some_and(|l| l.same_listener(&c)));
        assert!(array.get(2).is_none());
        assert_eq!(array.capacity(), 3);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let a = noop();
        let mut array = ListenerArray::from_listeners([a.clone()], 1);
        assert!(!array.remove(&noop(), false));
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn remove_takes_first_duplicate_only() {
        let a = noop();
        let mut array = ListenerArray::from_listeners([a.clone(), a.clone()], 2);
        assert!(array.remove(&a, false));
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn locked_push_leaves_snapshot_untouched() {
        let (a, b) = (noop(), noop());
        let mut array = ListenerArray::from_listeners([a.clone()], 2);
        let snapshot = array.snapshot();

        array.push(b.clone(), true, true, 1);
        assert_eq!(array.len(), 2);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(collect(&snapshot).len(), 1);
        assert!(!array.is_shared());
    }

    #[test]
    fn locked_remove_leaves_snapshot_untouched() {
        let (a, b, c) = (noop(), noop(), noop());
        let mut array = ListenerArray::from_listeners([a.clone(), b.clone(), c.clone()], 3);
        let snapshot = array.snapshot();

        assert!(array.remove(&a, true));
        let seen = collect(&snapshot);
        assert_eq!(seen.len(), 3);
        assert!(seen[0].same_listener(&a));
        assert!(seen[1].same_listener(&b));
        assert!(seen[2].same_listener(&c));
        assert_eq!(array.len(), 2);
    }

    #[test]
    fn unlocked_push_reaps_before_growing() {
        let target = noop();
        let weak = WeakInvalidationListener::new(&target).into_ref();
        let live = noop();
        let mut array = ListenerArray::from_listeners([weak, live.clone()], 2);
        drop(target);

        array.push(noop(), false, true, 1);
        assert_eq!(array.len(), 2);
        assert_eq!(array.capacity(), 2);
        assert!(array.get(0).is_some_and(|l| l.same_listener(&live)));
    }

    #[test]
    fn reaping_disabled_grows_instead() {
        let target = noop();
        let weak = WeakInvalidationListener::new(&target).into_ref();
        let mut array = ListenerArray::from_listeners([weak, noop()], 2);
        drop(target);

        array.push(noop(), false, false, 1);
        assert_eq!(array.len(), 3);
        assert_eq!(array.capacity(), 4);
    }

    #[test]
    fn locked_push_never_reaps() {
        let target = noop();
        let weak = WeakInvalidationListener::new(&target).into_ref();
        let mut array = ListenerArray::from_listeners([weak, noop()], 2);
        drop(target);

        array.push(noop(), true, true, 1);
        assert_eq!(array.len(), 3);
        assert_eq!(array.capacity(), 4);
    }
}
