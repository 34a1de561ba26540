//! Error types for the HSU service factory.
//!
//! # Rust Learning Note
//!
//! Rust doesn't have exceptions - it uses `Result<T, E>` for error handling.
//! Two error families live here:
//!
//! - [`Error`] is the general-purpose error returned by collaborators such as
//!   module loaders (`ModuleHandle::start`).
//! - [`FactoryError`] covers the failures of the service registry that can
//!   legitimately happen at runtime (a broken plugin, an unresolvable query
//!   built from user input). Configuration bugs are not represented here:
//!   the registry treats them as fatal and panics.
//!
//! ```rust
//! use hsu_common::{Error, Result};
//!
//! fn do_something() -> Result<()> {
//!     Err(Error::not_found("thing"))
//! }
//!
//! fn caller() -> Result<()> {
//!     // Caller uses ? operator (automatic propagation)
//!     do_something()?;
//!     Ok(())
//! }
//! # assert!(caller().is_err());
//! ```

use thiserror::Error;
use crate::types::{ImplementationID, ModuleID, ObjectType, ServiceType};

/// Result type alias for general HSU operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for HSU operations.
///
/// # Rust Learning Note
///
/// We use the `thiserror` crate to automatically derive error traits.
/// Each variant can carry additional context data.
#[derive(Debug, Error)]
pub enum Error {
    /// A requested resource was not found.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
    },

    /// A module was not found.
    #[error("Module not found: {module_id}")]
    ModuleNotFound {
        module_id: ModuleID,
    },

    /// Internal error (shouldn't happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with context.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a NotFound error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a module not found error.
    pub fn module_not_found(module_id: ModuleID) -> Self {
        Self::ModuleNotFound { module_id }
    }

    /// Adds context to an error.
    ///
    /// # Example
    /// ```
    /// use hsu_common::{Error, Result};
    ///
    /// fn inner() -> Result<()> {
    ///     Err(Error::not_found("library"))
    /// }
    ///
    /// fn outer() -> Result<()> {
    ///     inner().map_err(|e| e.context("Failed to load module"))
    /// }
    /// # assert!(outer().is_err());
    /// ```
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::WithContext {
            message: message.into(),
            source: Box::new(self),
        }
    }
}

// Convenience methods for Result types
pub trait ResultExt<T> {
    /// Adds context to an error result.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }
}

// ==============================================================================
// Service Factory Errors
// ==============================================================================

/// Which tier of a default-implementation lookup was ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// Implementations naming the object type verbatim.
    Specific,
    /// Implementations declaring the generic sentinel.
    Generic,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTier::Specific => write!(f, "specific"),
            MatchTier::Generic => write!(f, "generic"),
        }
    }
}

/// Recoverable service registry errors.
#[derive(Error, Debug, Clone)]
pub enum FactoryError {
    #[error("Module '{module}' was started but did not register a factory for '{implementation}'")]
    ModuleDidNotRegister {
        implementation: ImplementationID,
        module: ModuleID,
    },

    #[error("Module '{module}' failed to start: {reason}")]
    ModuleStartFailed { module: ModuleID, reason: String },

    #[error("Module '{module}' owning '{implementation}' is no longer loaded")]
    ModuleUnavailable {
        implementation: ImplementationID,
        module: ModuleID,
    },

    #[error("No implementation of '{service_type}' supports object type '{object_type}'")]
    NoImplementation {
        object_type: ObjectType,
        service_type: ServiceType,
    },

    #[error("Ambiguous {tier} implementations of '{service_type}' for '{object_type}': {candidates:?}")]
    AmbiguousImplementation {
        object_type: ObjectType,
        service_type: ServiceType,
        tier: MatchTier,
        candidates: Vec<ImplementationID>,
    },
}

impl FactoryError {
    pub fn module_did_not_register(implementation: ImplementationID, module: ModuleID) -> Self {
        Self::ModuleDidNotRegister {
            implementation,
            module,
        }
    }

    pub fn module_start_failed(module: ModuleID, reason: impl Into<String>) -> Self {
        Self::ModuleStartFailed {
            module,
            reason: reason.into(),
        }
    }

    pub fn module_unavailable(implementation: ImplementationID, module: ModuleID) -> Self {
        Self::ModuleUnavailable {
            implementation,
            module,
        }
    }

    pub fn no_implementation(object_type: ObjectType, service_type: ServiceType) -> Self {
        Self::NoImplementation {
            object_type,
            service_type,
        }
    }

    pub fn ambiguous(
        object_type: ObjectType,
        service_type: ServiceType,
        tier: MatchTier,
        candidates: Vec<ImplementationID>,
    ) -> Self {
        Self::AmbiguousImplementation {
            object_type,
            service_type,
            tier,
            candidates,
        }
    }
}

/// Result type for service registry operations.
pub type FactoryResult<T> = std::result::Result<T, FactoryError>;
