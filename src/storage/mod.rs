//! Pluggable storage backends.
//!
//! # Data Flow
//! ```text
//! handler
//!     → tenancy::StorageRegistry (resolve app/tenant → handle)
//!     → Storage (availability, capability lookup)
//!     → capability trait (e.g. IpHistoryStorage) → backend query
//! ```
//!
//! # Design Decisions
//! - Backends own no request concurrency; they are called from workers and
//!   may block them
//! - Every query takes the identifier it is scoped to as an explicit argument
//! - Feature capabilities are optional; a backend that lacks one reports
//!   `StorageError::Unsupported` instead of panicking
//! - "No rows" is `Ok(None)`, never an error

pub mod memory;

use std::fmt;

use thiserror::Error;

use crate::tenancy::AppIdentifier;

pub use memory::MemoryStorage;

/// Errors surfaced by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backend has been administratively disabled.
    #[error("storage backend '{0}' is disabled")]
    Disabled(&'static str),

    /// The backend does not implement the requested feature.
    #[error("storage backend '{kind}' does not support {capability}")]
    Unsupported {
        kind: &'static str,
        capability: &'static str,
    },

    /// A backend-specific query failure.
    #[error("storage query failed: {0}")]
    Query(String),
}

/// Per-user IP address history, scoped to an app.
pub trait IpHistoryStorage: Send + Sync {
    /// Most recently inserted address for the user, if any.
    fn get_last_ip_address(
        &self,
        app: &AppIdentifier,
        user_id: &str,
    ) -> Result<Option<String>, StorageError>;

    /// Append one history record. Never overwrites earlier records.
    fn insert_new_ip_address(
        &self,
        app: &AppIdentifier,
        user_id: &str,
        ip_address: &str,
    ) -> Result<(), StorageError>;
}

/// A storage backend the core can bind tenants to.
pub trait Storage: Send + Sync + fmt::Debug {
    /// Short backend name for logs and errors.
    fn kind(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    /// Enable or disable the backend. Disabled backends fail every call.
    fn set_enabled(&self, enabled: bool);

    /// Cheap availability probe.
    fn ping(&self) -> Result<(), StorageError>;

    /// The IP-history capability, when this backend provides it.
    fn ip_history(&self) -> Option<&dyn IpHistoryStorage> {
        None
    }
}
