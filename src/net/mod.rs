//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! CoreConfig { host, port }
//!     → listener.rs (resolve, bind, consolidated bind diagnostic)
//!     → accept loop (axum::serve in http::server)
//!     → worker.rs (acquire a worker slot per request)
//!     → Hand off to routing on a blocking worker
//! ```
//!
//! # Design Decisions
//! - The worker budget bounds handler execution, not open connections
//! - Each slot is released when its handler returns, success or failure
//! - Shutdown drains every slot before the server reports STOPPED

pub mod listener;
pub mod worker;

pub use listener::{bind, BindError, BIND_FAILURE_MESSAGE};
pub use worker::{PoolClosed, WorkerPool, WorkerSlot};
