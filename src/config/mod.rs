//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CoreConfig (validated, immutable)
//!     → shared via Arc inside CoreContext
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the worker budget and tenant bindings
//!   are fixed for the process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, CoreConfig, ObservabilityConfig};
