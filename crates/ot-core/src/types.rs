//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// An interval ended at or before the moment it started.
    #[error("interval must end after it starts ({start} .. {end})")]
    NonPositiveDuration {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
}

/// Generates a validated string reference newtype with common trait implementations.
macro_rules! define_string_ref {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new reference after validation.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(value))
            }

            /// Returns the reference as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_ref!(
    /// A remote project reference taken from a `TOGGL_PID` property.
    ///
    /// The value is opaque to the core. Placeholder values such as `t` mark
    /// a headline as tracked without naming a concrete project.
    ProjectRef, "project reference"
);

define_string_ref!(
    /// A remote task reference taken from a `TOGGL_TID` property.
    TaskRef, "task reference"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_ref_rejects_empty() {
        assert_eq!(
            ProjectRef::new(""),
            Err(ValidationError::Empty {
                field: "project reference"
            })
        );
    }

    #[test]
    fn task_ref_serializes_as_plain_string() {
        let task = TaskRef::new("42").unwrap();
        assert_eq!(serde_json::to_string(&task).unwrap(), r#""42""#);

        let parsed: Result<TaskRef, _> = serde_json::from_str(r#""""#);
        assert!(parsed.is_err());
    }
}
