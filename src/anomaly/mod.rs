//! Per-user IP address history used for anomaly detection.

use crate::storage::StorageError;
use crate::tenancy::AppStorage;

/// Most recently recorded IP address of a user, or an empty string when the
/// user has no history in this app.
pub fn get_last_ip_address(app: &AppStorage, user_id: &str) -> Result<String, StorageError> {
    let last = app
        .ip_history()?
        .get_last_ip_address(app.identifier(), user_id)?;
    Ok(last.unwrap_or_default())
}

/// Record a new IP address for a user. Earlier records are kept.
pub fn insert_new_ip_address(
    app: &AppStorage,
    user_id: &str,
    ip_address: &str,
) -> Result<(), StorageError> {
    app.ip_history()?
        .insert_new_ip_address(app.identifier(), user_id, ip_address)?;
    tracing::debug!(app = %app.identifier(), user_id, "IP address recorded");
    Ok(())
}
