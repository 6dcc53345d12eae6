//! Built-in endpoints registered on every server.

pub mod anomaly;
pub mod hello;

use crate::routing::{ApiRouter, RouterError};

/// Register every built-in endpoint.
pub fn register_builtin(router: &ApiRouter) -> Result<(), RouterError> {
    router.register(hello::endpoint())?;
    router.register(anomaly::endpoint())?;
    Ok(())
}
