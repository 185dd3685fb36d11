//! The slot a dispatch leaves its result in.

use std::{any::Any, error::Error as StdError, fmt};

use crate::Error;

/// The value a dispatch ended with.
///
/// Every dispatch returns a fresh `Captured`. Capturing routes fill it,
/// `pass` and `call` routes leave it empty. Retrieving a value from an empty
/// slot, or as a different type than was captured, is an error.
#[must_use]
pub struct Captured {
    value: Option<Box<dyn Any + Send>>,
    type_name: &'static str,
}

impl Captured {
    pub(crate) fn empty() -> Self {
        Captured {
            value: None,
            type_name: "nothing",
        }
    }

    pub(crate) fn of<T: Send + 'static>(value: T) -> Self {
        Captured {
            value: Some(Box::new(value)),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns true if the dispatch completed without capturing anything.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Returns true if a value of type `T` was captured.
    pub fn is<T: 'static>(&self) -> bool {
        self.value.as_ref().map_or(false, |value| value.is::<T>())
    }

    /// Takes the captured value out as `T`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::is_capture`] if nothing was captured or the value
    /// is not a `T`.
    pub fn to<T: 'static>(self) -> crate::Result<T> {
        let expected = std::any::type_name::<T>();
        let found = self.type_name;

        match self.value {
            Some(value) => value
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_| Error::capture(Mismatch { expected, found })),
            None => Err(Error::capture(Mismatch { expected, found })),
        }
    }
}

impl fmt::Debug for Captured {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Captured")
            .field("type", &self.type_name)
            .finish()
    }
}

#[derive(Debug)]
struct Mismatch {
    expected: &'static str,
    found: &'static str,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected {}, captured {}", self.expected, self.found)
    }
}

impl StdError for Mismatch {}
