//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (server.rs):
//!     INIT → bind host:port → STARTED | INIT_FAILURE(cause)
//!
//! Shutdown (shutdown.rs):
//!     stop() / signal / fatal handler error → Shutdown::trigger
//!     → stop accepting → drain worker slots → STOPPED
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One ProcessMonitor per server instance, never global
//! - STOPPED always fires after STARTED or INIT_FAILURE once shutdown begins
//! - STOPPED means no request is mid-flight

pub mod shutdown;
pub mod signals;
pub mod state;

pub use shutdown::{Shutdown, ShutdownReason, ShutdownSignal};
pub use state::{LifecycleError, LifecycleEvent, LifecycleState, ProcessMonitor, WaitOutcome};
