//! Errors from property and collection operations.

use std::fmt;

/// Errors from property, binding and collection operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// `set` was called on a property that follows a binding.
    BoundValueSet { name: String },
    /// A property was asked to bind to itself.
    SelfBinding { name: String },
    /// An index was outside `0..len` (or `0..=len` for insertion).
    IndexOutOfBounds { index: usize, len: usize },
    /// A range was reversed or extended past the end.
    InvalidRange { from: usize, to: usize, len: usize },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundValueSet { name } => write!(f, "a bound value cannot be set: {name}"),
            Self::SelfBinding { name } => write!(f, "cannot bind property to itself: {name}"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::InvalidRange { from, to, len } => {
                write!(f, "invalid range {from}..{to} for length {len}")
            }
        }
    }
}

impl std::error::Error for PropertyError {}

/// Shorthand result type.
pub type Result<T> = std::result::Result<T, PropertyError>;
