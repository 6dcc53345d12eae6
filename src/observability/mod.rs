//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch, worker pool, lifecycle monitor
//!     → logging.rs (tracing events, pretty or JSON on stdout)
//!     → metrics.rs (request, worker slot and lifecycle series)
//!     → Prometheus exporter when `metrics_enabled`
//! ```
//!
//! # Design Decisions
//! - Pretty output by default; `log_format = "json"` for log shippers
//! - Dispatch log lines carry the request's `x-request-id`
//! - Without an installed recorder metric calls are no-ops

pub mod logging;
pub mod metrics;
