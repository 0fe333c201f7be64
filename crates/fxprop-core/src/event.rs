#![forbid(unsafe_code)]

//! Event payloads delivered to change listeners.
//!
//! Every payload shape runs through the same [`ListenerHelper`] engine; they
//! differ only in what they carry and in the two short-circuit predicates of
//! [`ListenerEvent`]:
//!
//! | Payload          | `is_effective`                  | `reaches_change_listeners` |
//! |------------------|---------------------------------|----------------------------|
//! | [`Invalidation`] | always                          | always                     |
//! | [`ArrayChange`]  | size changed or range non-empty | always                     |
//! | [`MapChange`]    | always                          | always                     |
//! | [`ValueChange`]  | always                          | `old != new`               |
//! | [`ListChange`]   | at least one edit               | always                     |
//!
//! [`ListenerHelper`]: crate::helper::ListenerHelper

use std::ops::Range;

/// Short-circuit predicates consulted by the dispatcher.
pub trait ListenerEvent {
    /// True when [`is_effective`](Self::is_effective) can never return
    /// false. Only such payloads may be built lazily by
    /// [`ListenerHelper::fire_with`](crate::helper::ListenerHelper::fire_with).
    const ALWAYS_EFFECTIVE: bool = false;

    /// When false the event describes no change at all and nobody is
    /// notified.
    fn is_effective(&self) -> bool {
        true
    }

    /// When false invalidation listeners still run but change listeners are
    /// skipped.
    fn reaches_change_listeners(&self) -> bool {
        true
    }
}

/// Payload for observables that only ever invalidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invalidation;

impl ListenerEvent for Invalidation {
    const ALWAYS_EFFECTIVE: bool = true;
}

// ---------------------------------------------------------------------------
// Array
// ---------------------------------------------------------------------------

/// Mutation of a primitive array: an optional size change plus the touched
/// index range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayChange {
    /// Whether the array length changed.
    pub size_changed: bool,
    /// First touched index.
    pub from: usize,
    /// One past the last touched index.
    pub to: usize,
}

impl ArrayChange {
    /// Create an array change event.
    #[must_use]
    pub fn new(size_changed: bool, from: usize, to: usize) -> Self {
        Self {
            size_changed,
            from,
            to,
        }
    }

    /// The touched range.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.from..self.to
    }
}

impl ListenerEvent for ArrayChange {
    fn is_effective(&self) -> bool {
        self.size_changed || self.from < self.to
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// One entry-level change to an observable map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapChange<K, V> {
    /// A new key was inserted.
    Added { key: K, value: V },
    /// A key and its value were removed.
    Removed { key: K, value: V },
    /// An existing key received a different value.
    Replaced { key: K, old: V, new: V },
}

impl<K, V> MapChange<K, V> {
    /// The key this change is about.
    #[must_use]
    pub fn key(&self) -> &K {
        match self {
            Self::Added { key, .. } | Self::Removed { key, .. } | Self::Replaced { key, .. } => key,
        }
    }

    /// Whether a value was added under the key.
    #[must_use]
    pub fn was_added(&self) -> bool {
        matches!(self, Self::Added { .. } | Self::Replaced { .. })
    }

    /// Whether a value was removed from under the key.
    #[must_use]
    pub fn was_removed(&self) -> bool {
        matches!(self, Self::Removed { .. } | Self::Replaced { .. })
    }

    /// The value now stored under the key, if this change stored one.
    #[must_use]
    pub fn value_added(&self) -> Option<&V> {
        match self {
            Self::Added { value, .. } => Some(value),
            Self::Replaced { new, .. } => Some(new),
            Self::Removed { .. } => None,
        }
    }

    /// The value no longer stored under the key, if any.
    #[must_use]
    pub fn value_removed(&self) -> Option<&V> {
        match self {
            Self::Removed { value, .. } => Some(value),
            Self::Replaced { old, .. } => Some(old),
            Self::Added { .. } => None,
        }
    }
}

impl<K, V> ListenerEvent for MapChange<K, V> {
    const ALWAYS_EFFECTIVE: bool = true;
}

// ---------------------------------------------------------------------------
// Single value
// ---------------------------------------------------------------------------

/// Old and new value of a single-valued observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange<T> {
    /// Value before the change.
    pub old: T,
    /// Value after the change. May equal `old`.
    pub new: T,
}

impl<T> ValueChange<T> {
    /// Pair an old and a new value.
    #[must_use]
    pub fn new(old: T, new: T) -> Self {
        Self { old, new }
    }
}

impl<T: PartialEq> ListenerEvent for ValueChange<T> {
    const ALWAYS_EFFECTIVE: bool = true;

    fn reaches_change_listeners(&self) -> bool {
        self.old != self.new
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// A contiguous replacement within a list.
///
/// `from` is an index into the list *after* this edit and every edit before
/// it in the same [`ListChange`] has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEdit<T> {
    pub from: usize,
    pub removed: Vec<T>,
    pub added: Vec<T>,
}

impl<T> ListEdit<T> {
    /// One past the last added index.
    #[must_use]
    pub fn to(&self) -> usize {
        self.from + self.added.len()
    }

    #[must_use]
    pub fn was_added(&self) -> bool {
        !self.added.is_empty()
    }

    #[must_use]
    pub fn was_removed(&self) -> bool {
        !self.removed.is_empty()
    }

    /// Elements were both removed and added at the same position.
    #[must_use]
    pub fn was_replaced(&self) -> bool {
        self.was_added() && self.was_removed()
    }
}

/// An ordered batch of list edits produced by one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChange<T> {
    edits: Vec<ListEdit<T>>,
}

impl<T> Default for ListChange<T> {
    fn default() -> Self {
        Self { edits: Vec::new() }
    }
}

impl<T> ListChange<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A change made of exactly one edit.
    #[must_use]
    pub fn single(from: usize, removed: Vec<T>, added: Vec<T>) -> Self {
        let mut change = Self::new();
        change.push_edit(from, removed, added);
        change
    }

    /// Append an edit. Edits that neither add nor remove are dropped.
    pub fn push_edit(&mut self, from: usize, removed: Vec<T>, added: Vec<T>) {
        if removed.is_empty() && added.is_empty() {
            return;
        }
        self.edits.push(ListEdit {
            from,
            removed,
            added,
        });
    }

    #[must_use]
    pub fn edits(&self) -> &[ListEdit<T>] {
        &self.edits
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

impl<T> ListenerEvent for ListChange<T> {
    fn is_effective(&self) -> bool {
        !self.edits.is_empty()
    }
}
