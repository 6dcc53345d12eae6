//! In-memory reference backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::storage::{IpHistoryStorage, Storage, StorageError};
use crate::tenancy::AppIdentifier;

const KIND: &str = "memory";

type HistoryKey = (AppIdentifier, String);

/// Thread-safe in-memory storage.
///
/// IP history is an append-only list per (app, user); insertion order
/// defines "most recent".
#[derive(Debug)]
pub struct MemoryStorage {
    enabled: AtomicBool,
    ip_history: Mutex<HashMap<HistoryKey, Vec<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            ip_history: Mutex::new(HashMap::new()),
        }
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(StorageError::Disabled(KIND))
        }
    }

    fn history(&self) -> Result<MutexGuard<'_, HashMap<HistoryKey, Vec<String>>>, StorageError> {
        self.check_enabled()?;
        self.ip_history
            .lock()
            .map_err(|_| StorageError::Query("ip history lock poisoned".to_string()))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(backend = KIND, enabled, "Storage availability changed");
    }

    fn ping(&self) -> Result<(), StorageError> {
        self.check_enabled()
    }

    fn ip_history(&self) -> Option<&dyn IpHistoryStorage> {
        Some(self)
    }
}

impl IpHistoryStorage for MemoryStorage {
    fn get_last_ip_address(
        &self,
        app: &AppIdentifier,
        user_id: &str,
    ) -> Result<Option<String>, StorageError> {
        let history = self.history()?;
        Ok(history
            .get(&(app.clone(), user_id.to_string()))
            .and_then(|records| records.last().cloned()))
    }

    fn insert_new_ip_address(
        &self,
        app: &AppIdentifier,
        user_id: &str,
        ip_address: &str,
    ) -> Result<(), StorageError> {
        let mut history = self.history()?;
        history
            .entry((app.clone(), user_id.to_string()))
            .or_default()
            .push(ip_address.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_insert_wins() {
        let storage = MemoryStorage::new();
        let app = AppIdentifier::default();
        assert_eq!(storage.get_last_ip_address(&app, "u1").unwrap(), None);

        storage.insert_new_ip_address(&app, "u1", "1.2.3.4").unwrap();
        storage.insert_new_ip_address(&app, "u1", "5.6.7.8").unwrap();
        assert_eq!(
            storage.get_last_ip_address(&app, "u1").unwrap().as_deref(),
            Some("5.6.7.8")
        );
    }

    #[test]
    fn insertion_order_not_value_order() {
        let storage = MemoryStorage::new();
        let app = AppIdentifier::default();
        storage.insert_new_ip_address(&app, "u1", "9.9.9.9").unwrap();
        storage.insert_new_ip_address(&app, "u1", "1.1.1.1").unwrap();
        assert_eq!(
            storage.get_last_ip_address(&app, "u1").unwrap().as_deref(),
            Some("1.1.1.1")
        );
    }

    #[test]
    fn disabled_backend_fails_every_call() {
        let storage = MemoryStorage::new();
        let app = AppIdentifier::default();
        storage.set_enabled(false);

        assert_eq!(storage.ping(), Err(StorageError::Disabled("memory")));
        assert!(storage.get_last_ip_address(&app, "u1").is_err());
        assert!(storage.insert_new_ip_address(&app, "u1", "1.2.3.4").is_err());

        storage.set_enabled(true);
        assert_eq!(storage.ping(), Ok(()));
    }
}
