#![forbid(unsafe_code)]

//! fxprop public facade.
//!
//! Observable values with cheap listener registration and notification
//! that tolerates listeners changing the registry mid-dispatch.
//!
//! - [`registry`]: the listener registry, weak wrappers and event payloads.
//! - [`beans`]: properties, bindings and observable collections.
//!
//! Most applications only need the [`prelude`].
//!
//! # Example
//!
//! ```
//! use fxprop::prelude::*;
//!
//! let name = SimpleProperty::named("name", String::from("Ada"));
//! let greeting = Binding::map(&name, |n: String| format!("Hello, {n}"));
//! assert_eq!(greeting.get(), "Hello, Ada");
//!
//! name.set("Grace".into()).unwrap();
//! assert_eq!(greeting.get(), "Hello, Grace");
//! ```

pub use fxprop_beans as beans;
pub use fxprop_core as registry;

pub use fxprop_beans::{
    Binding, ObservableArray, ObservableList, ObservableMap, PropertyError, ReadOnlyProperty,
    SimpleProperty,
};
pub use fxprop_core::{RegistryConfig, ValueChange};

/// Everything needed to declare properties, bind them and listen to them.
pub mod prelude {
    pub use fxprop_beans::{
        Binding, Observable, ObservableArray, ObservableList, ObservableMap, ObservableValue,
        PropertyError, ReadOnlyProperty, SimpleProperty, and, equal, not, observer, or, shared,
    };
    pub use fxprop_core::{
        ArrayChange, ListChange, MapChange, ValueChange, change_listener, invalidation_listener,
    };
}
