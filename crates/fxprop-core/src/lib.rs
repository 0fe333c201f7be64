#![forbid(unsafe_code)]

//! Core: listener registration and notification for observable values.
//!
//! # Role in fxprop
//! `fxprop-core` is the engine every property, binding and observable
//! collection in `fxprop-beans` delegates to. Each observable owns one
//! [`ListenerHelper`] inside a `RefCell`, forwards its `add`/`remove`
//! listener calls to it, and calls [`ListenerHelper::fire`] (or
//! [`ListenerHelper::fire_with`]) when its content changes.
//!
//! # Primary responsibilities
//! - **Listener Registry**: the `Empty | SingleInvalidation | SingleChange |
//!   Generic` state machine with allocation-free 0/1-listener shapes.
//! - **Dispatcher**: snapshot-based delivery tolerant of callbacks that add
//!   or remove listeners on the observable being dispatched.
//! - **Reaper**: reclaims slots held by expired [`weak`] wrappers on the add
//!   path.
//! - **Events**: one payload type per observable shape ([`event`]).
//!
//! # Threading
//! Everything here is `!Send`: an observable and its listeners live on one
//! thread. Reentrancy from the same thread is supported; concurrent access
//! is not.
//!
//! # Example
//!
//! ```
//! use std::cell::{Cell, RefCell};
//! use std::rc::Rc;
//! use fxprop_core::{ListenerHelper, ValueChange, change_listener};
//!
//! let helper: RefCell<ListenerHelper<(), ValueChange<i32>>> = RefCell::new(ListenerHelper::new());
//! let seen = Rc::new(Cell::new(0));
//! let seen_clone = Rc::clone(&seen);
//! ListenerHelper::update(&helper, |h| {
//!     h.register_change_listener(change_listener(move |e: &ValueChange<i32>| seen_clone.set(e.new)))
//! });
//!
//! ListenerHelper::fire(&helper, &(), &ValueChange::new(1, 2));
//! assert_eq!(seen.get(), 2);
//! ```

pub mod array;
pub mod config;
pub mod event;
pub mod helper;
pub mod listener;
pub mod weak;

pub use array::{ListenerArray, Snapshot};
pub use config::RegistryConfig;
pub use event::{
    ArrayChange, Invalidation, ListChange, ListEdit, ListenerEvent, MapChange, ValueChange,
};
pub use helper::{GenericListeners, HelperShape, ListenerHelper};
pub use listener::{
    ChangeListener, ChangeRef, InvalidationListener, InvalidationRef, Keyed, ListenerHandle,
    change_listener, invalidation_listener,
};
pub use weak::{WeakChangeListener, WeakInvalidationListener};
