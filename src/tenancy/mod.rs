//! Multi-tenancy subsystem.
//!
//! # Data Flow
//! ```text
//! request routing context (Host, /appid-<app>/<tenant> prefix)
//!     → identifier.rs (normalised AppIdentifier / TenantIdentifier)
//!     → resolver.rs (StorageRegistry lookup)
//!     → AppStorage / TenantStorage handle, or TenantError
//! ```

pub mod identifier;
pub mod resolver;

pub use identifier::{AppIdentifier, TenantIdentifier};
pub use resolver::{AppStorage, StorageRegistry, TenantError, TenantStorage};
