//! Core identifier types used throughout the service factory.
//!
//! Every identifier is a thin newtype over `String`. Keeping them distinct
//! means an implementation id can never be passed where a service type is
//! expected, even though both are plain strings on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generates a string-backed identifier newtype.
///
/// # Rust Learning Note
///
/// `macro_rules!` lets us stamp out the same boilerplate (constructors,
/// `From` conversions, `Display`) for several types without a trait object
/// or a generic wrapper. Each expansion is a distinct nominal type.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Module identifier - names a loadable plugin unit.
    ///
    /// # Example
    /// ```
    /// use hsu_common::ModuleID;
    ///
    /// let module_id = ModuleID::from("io_vtk");
    /// assert_eq!(module_id.as_str(), "io_vtk");
    /// ```
    ModuleID
}

string_id! {
    /// Implementation identifier - names one concrete service implementation.
    ///
    /// # Example
    /// ```
    /// use hsu_common::ImplementationID;
    ///
    /// let id = ImplementationID::from("Writer.VTK");
    /// assert_eq!(id.to_string(), "Writer.VTK");
    /// ```
    ImplementationID
}

string_id! {
    /// Service type - the abstract capability an implementation fulfills
    /// (e.g. `IWriter`).
    ServiceType
}

string_id! {
    /// Object type - the kind of data object a service operates on
    /// (e.g. `Image`, `Mesh`).
    ///
    /// The special value [`ObjectType::GENERIC`] means "any object type".
    ObjectType
}

impl ObjectType {
    /// Sentinel marking an implementation compatible with every object type.
    pub const GENERIC: &'static str = "Object";

    /// Returns the generic sentinel as an `ObjectType`.
    pub fn generic() -> Self {
        Self::from(Self::GENERIC)
    }

    /// Returns true if this is the generic sentinel rather than a concrete type.
    pub fn is_generic(&self) -> bool {
        self.as_str() == Self::GENERIC
    }
}
