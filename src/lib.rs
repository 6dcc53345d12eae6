//! Multi-tenant authentication core: versioned HTTP API server library.

pub mod anomaly;
pub mod api;
pub mod config;
pub mod context;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod storage;
pub mod tenancy;

pub use config::schema::CoreConfig;
pub use context::CoreContext;
pub use http::Webserver;
pub use lifecycle::{LifecycleState, ProcessMonitor, Shutdown};
