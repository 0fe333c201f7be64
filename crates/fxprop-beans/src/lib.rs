#![forbid(unsafe_code)]

//! Observable properties, bindings and collections.
//!
//! # Role in fxprop
//! `fxprop-beans` is the user-facing layer. Every type here owns one
//! [`ListenerHelper`](fxprop_core::ListenerHelper) from `fxprop-core` and
//! delegates listener bookkeeping and dispatch to it.
//!
//! | Type                 | Change payload                   |
//! |----------------------|----------------------------------|
//! | [`SimpleProperty`]   | [`ValueChange`](fxprop_core::ValueChange) |
//! | [`Binding`]          | [`ValueChange`](fxprop_core::ValueChange) |
//! | [`ObservableList`]   | [`ListChange`](fxprop_core::ListChange)   |
//! | [`ObservableMap`]    | [`MapChange`](fxprop_core::MapChange)     |
//! | [`ObservableArray`]  | [`ArrayChange`](fxprop_core::ArrayChange) |
//!
//! All handles are cheap `Rc` clones sharing state, and all of them are
//! `!Send`.
//!
//! # Example
//!
//! ```
//! use fxprop_beans::{Binding, SimpleProperty};
//!
//! let width = SimpleProperty::named("width", 3);
//! let height = SimpleProperty::named("height", 4);
//! let area = Binding::combine(&width, &height, |w: i32, h: i32| w * h);
//! assert_eq!(area.get(), 12);
//!
//! width.set(5).unwrap();
//! assert_eq!(area.get(), 20);
//! ```

pub mod array;
pub mod binding;
pub mod error;
pub mod list;
pub mod map;
pub mod observable;
pub mod property;

pub use array::{ArrayListener, ObservableArray};
pub use binding::{Binding, and, equal, not, or};
pub use error::{PropertyError, Result};
pub use list::{ListListener, ObservableList};
pub use map::{MapListener, ObservableMap};
pub use observable::{
    AnyObservable, Observable, ObservableId, ObservableListener, ObservableValue, ValueListener,
    observer, shared,
};
pub use property::{ReadOnlyProperty, SimpleProperty};
