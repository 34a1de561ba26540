//! # HSU Common
//!
//! Common identifier and error types shared across the HSU service
//! factory crates.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{Error, Result, ResultExt, FactoryError, FactoryResult, MatchTier};
pub use types::{ImplementationID, ModuleID, ObjectType, ServiceType};
