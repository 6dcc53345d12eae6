//! Per-process core context.
//!
//! Everything that would otherwise be process-global (config, lifecycle
//! monitor, storage registry, shutdown coordinator, version set) lives here
//! and is handed to each component at construction. Several contexts can
//! coexist in one process, each backing its own server.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, CoreConfig};
use crate::lifecycle::{ProcessMonitor, Shutdown};
use crate::routing::version::{VersionError, VersionSet};
use crate::storage::{MemoryStorage, Storage};
use crate::tenancy::{StorageRegistry, TenantError, TenantIdentifier};

/// Failure to assemble a context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Tenant(#[from] TenantError),
}

/// Shared state of one server process.
#[derive(Debug, Clone)]
pub struct CoreContext {
    config: Arc<CoreConfig>,
    monitor: ProcessMonitor,
    storage: Arc<StorageRegistry>,
    shutdown: Shutdown,
    versions: Arc<VersionSet>,
}

impl CoreContext {
    /// Build a context whose tenants all share one in-memory backend.
    pub fn from_config(config: CoreConfig) -> Result<Self, ContextError> {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let registry = StorageRegistry::new();
        for tenant in configured_tenants(&config) {
            registry.register(tenant, Arc::clone(&storage))?;
        }
        Self::with_storage(config, registry)
    }

    /// Build a context around an already populated registry.
    pub fn with_storage(config: CoreConfig, registry: StorageRegistry) -> Result<Self, ContextError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let versions = VersionSet::parse(config.supported_versions.as_slice())?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            max_server_pool_size = config.max_server_pool_size,
            latest_version = %versions.latest(),
            tenants = registry.len(),
            "Core context ready"
        );

        Ok(Self {
            config: Arc::new(config),
            monitor: ProcessMonitor::new(),
            storage: Arc::new(registry),
            shutdown: Shutdown::new(),
            versions: Arc::new(versions),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn monitor(&self) -> &ProcessMonitor {
        &self.monitor
    }

    pub fn storage(&self) -> &Arc<StorageRegistry> {
        &self.storage
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn versions(&self) -> &VersionSet {
        &self.versions
    }
}

/// Default tenant plus every configured app's public and listed tenants.
fn configured_tenants(config: &CoreConfig) -> BTreeSet<TenantIdentifier> {
    let mut tenants = BTreeSet::new();
    tenants.insert(TenantIdentifier::default());
    for app in &config.apps {
        let base = TenantIdentifier::new(&app.connection_uri_domain, &app.app_id, "");
        tenants.insert(base.clone());
        for tenant in &app.tenants {
            tenants.insert(base.app().tenant(tenant));
        }
    }
    tenants
}
