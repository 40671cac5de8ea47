// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for cache reconciliation and dispatch.
//!
//! Two families of failures exist and they never mix:
//!
//! - [`Error`]: contract violations detected synchronously (missing key
//!   fields, type mismatches, unknown handlers). They are returned to the
//!   immediate caller and always leave the cache untouched.
//! - [`HandlerError`]: faults raised by user callbacks. They are isolated per
//!   handler and routed to the dispatcher's error callback; `dispatch()`
//!   itself still succeeds.

use crate::types::PropertySet;
use std::fmt;

/// Errors returned by statecast operations.
///
/// # Example
///
/// ```rust
/// use statecast::{Error, PropertySet};
///
/// let err = Error::MissingKeyFields {
///     type_name: "Sensor".into(),
///     missing: PropertySet::from_tag(1),
/// };
/// assert!(err.to_string().contains("Sensor"));
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Reconciliation Errors
    // ========================================================================
    /// The header attributes (or the instance itself) lack one or more key fields.
    MissingKeyFields {
        type_name: String,
        missing: PropertySet,
    },
    /// Header type name, registered descriptor and instance disagree, or a
    /// typed cast targeted the wrong type.
    TypeMismatch { expected: String, got: String },
    /// No descriptor is known for the given type name.
    UnknownType(String),
    /// Lookup of an instance that is not part of the container.
    NotInContainer(String),

    // ========================================================================
    // Subscription Errors
    // ========================================================================
    /// Handler id is not registered for the given type.
    UnknownHandler { type_name: String, id: u64 },

    // ========================================================================
    // Record Errors
    // ========================================================================
    /// Read of a property whose validity bit is not set.
    PropertyNotSet { type_name: String, property: String },
    /// Property name or tag does not exist on the type.
    UnknownProperty { type_name: String, property: String },
    /// Value kind does not fit the property's declared type.
    ValueMismatch {
        property: String,
        expected: String,
        got: String,
    },
    /// Descriptor construction failed (duplicate tag, tag out of range, ...).
    InvalidDescriptor(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration could not be read or parsed.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingKeyFields { type_name, missing } => write!(
                f,
                "Missing key fields for type '{}': {}",
                type_name, missing
            ),
            Error::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, got)
            }
            Error::UnknownType(name) => write!(f, "Unknown type: {}", name),
            Error::NotInContainer(name) => {
                write!(f, "Instance is not part of container for type: {}", name)
            }
            Error::UnknownHandler { type_name, id } => write!(
                f,
                "Cannot remove unknown handler {} for type: {}",
                id, type_name
            ),
            Error::PropertyNotSet {
                type_name,
                property,
            } => write!(f, "Property '{}.{}' is not set", type_name, property),
            Error::UnknownProperty {
                type_name,
                property,
            } => write!(f, "Unknown property '{}' on type '{}'", property, type_name),
            Error::ValueMismatch {
                property,
                expected,
                got,
            } => write!(
                f,
                "Value mismatch for property '{}': expected {}, got {}",
                property, expected, got
            ),
            Error::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for results using the crate [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Failure reported by a transmission or event handler.
#[derive(Debug)]
pub enum HandlerError {
    /// Handler returned an error.
    Failed(Box<dyn std::error::Error + Send + Sync>),
    /// Handler panicked; the payload message is preserved when it is a string.
    Panicked(String),
}

impl HandlerError {
    /// Wrap any error type.
    pub fn failed<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Failed(err.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(msg)
    }

    /// Returns true if the handler panicked instead of returning an error.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Failed(e) => write!(f, "Handler failed: {}", e),
            HandlerError::Panicked(msg) => write!(f, "Handler panicked: {}", msg),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Failed(e) => Some(e.as_ref()),
            HandlerError::Panicked(_) => None,
        }
    }
}

impl From<Error> for HandlerError {
    fn from(err: Error) -> Self {
        Self::Failed(Box::new(err))
    }
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        Self::Failed(msg.into())
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        Self::Failed(msg.into())
    }
}

/// Result type returned by handlers.
pub type HandlerResult = core::result::Result<(), HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_display() {
        let err = Error::MissingKeyFields {
            type_name: "Sensor".into(),
            missing: PropertySet::from_tag(1) + PropertySet::from_tag(3),
        };
        let msg = err.to_string();
        assert!(msg.contains("Sensor"));
        assert!(msg.contains("{1, 3}"));
    }

    #[test]
    fn test_handler_error_from_panic_payload() {
        let err = HandlerError::from_panic(Box::new("boom"));
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "Handler panicked: boom");

        let err = HandlerError::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(err.to_string(), "Handler panicked: owned boom");

        let err = HandlerError::from_panic(Box::new(42u32));
        assert_eq!(err.to_string(), "Handler panicked: non-string panic payload");
    }

    #[test]
    fn test_handler_error_source() {
        use std::error::Error as _;

        let err = HandlerError::from(Error::UnknownType("Foo".into()));
        assert!(!err.is_panic());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("Unknown type: Foo"));
    }
}
