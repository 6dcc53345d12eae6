//! Storage registry and identity resolution.
//!
//! # Responsibilities
//! - Hold the (tenant → storage backend) bindings created at startup
//! - Resolve an app or tenant to a storage handle, or fail explicitly
//!
//! # Design Decisions
//! - Read-mostly after startup; `DashMap` keeps lookups lock-free per shard
//! - No fallback tenant: an unknown identifier is always an error
//! - An app resolves through its `public` tenant binding

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::storage::{IpHistoryStorage, Storage, StorageError};
use crate::tenancy::identifier::{AppIdentifier, TenantIdentifier};

/// Identity resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    #[error("AppId or tenantId not found => {0}")]
    TenantNotFound(TenantIdentifier),

    #[error("AppId or tenantId not found => {0}")]
    AppNotFound(AppIdentifier),

    #[error("{0} is already bound to a storage backend")]
    AlreadyRegistered(TenantIdentifier),
}

/// Process-wide tenant → storage bindings.
#[derive(Debug, Default)]
pub struct StorageRegistry {
    bindings: DashMap<TenantIdentifier, Arc<dyn Storage>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a tenant to a backend. Startup-time only.
    pub fn register(
        &self,
        tenant: TenantIdentifier,
        storage: Arc<dyn Storage>,
    ) -> Result<(), TenantError> {
        use dashmap::mapref::entry::Entry;

        match self.bindings.entry(tenant) {
            Entry::Occupied(entry) => Err(TenantError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(tenant = %entry.key(), backend = storage.kind(), "Tenant storage bound");
                entry.insert(storage);
                Ok(())
            }
        }
    }

    /// Resolve a tenant to its storage handle.
    pub fn resolve_tenant(&self, tenant: &TenantIdentifier) -> Result<TenantStorage, TenantError> {
        self.bindings
            .get(tenant)
            .map(|binding| TenantStorage {
                tenant: tenant.clone(),
                storage: Arc::clone(binding.value()),
            })
            .ok_or_else(|| TenantError::TenantNotFound(tenant.clone()))
    }

    /// Resolve an app to its storage handle.
    pub fn resolve_app(&self, app: &AppIdentifier) -> Result<AppStorage, TenantError> {
        self.bindings
            .get(&app.public_tenant())
            .map(|binding| AppStorage {
                app: app.clone(),
                storage: Arc::clone(binding.value()),
            })
            .ok_or_else(|| TenantError::AppNotFound(app.clone()))
    }

    /// Resolve raw app and tenant ids on a domain.
    pub fn resolve(
        &self,
        connection_uri_domain: &str,
        app_id: &str,
        tenant_id: &str,
    ) -> Result<TenantStorage, TenantError> {
        self.resolve_tenant(&TenantIdentifier::new(connection_uri_domain, app_id, tenant_id))
    }

    /// Whether any binding lives on this (normalised) domain.
    pub fn knows_domain(&self, connection_uri_domain: &str) -> bool {
        self.bindings
            .iter()
            .any(|binding| binding.key().connection_uri_domain() == connection_uri_domain)
    }

    /// Every app that has at least one tenant bound.
    pub fn apps(&self) -> Vec<AppIdentifier> {
        let apps: BTreeSet<(String, String)> = self
            .bindings
            .iter()
            .map(|binding| {
                let key = binding.key();
                (key.connection_uri_domain().to_string(), key.app_id().to_string())
            })
            .collect();
        apps.into_iter()
            .map(|(domain, app_id)| AppIdentifier::new(&domain, &app_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A storage handle bound to an app.
#[derive(Debug, Clone)]
pub struct AppStorage {
    app: AppIdentifier,
    storage: Arc<dyn Storage>,
}

impl AppStorage {
    pub fn identifier(&self) -> &AppIdentifier {
        &self.app
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// The backend's IP-history capability.
    pub fn ip_history(&self) -> Result<&dyn IpHistoryStorage, StorageError> {
        self.storage.ip_history().ok_or(StorageError::Unsupported {
            kind: self.storage.kind(),
            capability: "ip history",
        })
    }
}

/// A storage handle bound to a tenant.
#[derive(Debug, Clone)]
pub struct TenantStorage {
    tenant: TenantIdentifier,
    storage: Arc<dyn Storage>,
}

impl TenantStorage {
    pub fn identifier(&self) -> &TenantIdentifier {
        &self.tenant
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Narrow to the owning app. App-scoped features go through this.
    pub fn app_storage(&self) -> AppStorage {
        AppStorage {
            app: self.tenant.app().clone(),
            storage: Arc::clone(&self.storage),
        }
    }
}
