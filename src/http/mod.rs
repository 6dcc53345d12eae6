//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request ID, worker slot)
//!     → routing (tenancy prefix, exact path, version)
//!     → request.rs (ApiRequest handed to the endpoint handler)
//!     → input.rs (JSON body / query parameter helpers)
//!     → response.rs (ApiResponse or ApiError → status + body)
//!     → Send to client
//! ```

pub mod input;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ApiMethod, ApiRequest, X_REQUEST_ID};
pub use response::{ApiError, ApiResponse, ApiResult, INTERNAL_ERROR_BODY};
pub use server::{StartError, Webserver};
