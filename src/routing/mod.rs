//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, method, cdi-version header)
//!     → router.rs (strip tenancy prefix, exact path lookup)
//!     → Return: handler, NotFound or MethodNotAllowed
//!     → version.rs (negotiate effective version)
//!     → handler invocation
//! ```
//!
//! # Design Decisions
//! - One registration per path; duplicates are configuration errors
//! - No regex or wildcard matching
//! - Deterministic: same input always matches same route
//! - Version negotiation is strict membership, latest when absent

pub mod router;
pub mod version;

pub use router::{ApiRouter, Endpoint, HandlerFn, RouteMatch, RouterError, RoutingTarget};
pub use version::{ApiVersion, VersionError, VersionSet, VERSION_HEADER};
