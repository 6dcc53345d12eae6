//! App and tenant identifiers.
//!
//! Every persisted record is scoped by these keys. Raw routing input is
//! normalised once here (trimmed, lower-cased, empty → default) so the rest
//! of the core compares identifiers by value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Domain used when a request does not name one.
pub const DEFAULT_CONNECTION_URI_DOMAIN: &str = "";
/// App id used when a request does not name one.
pub const DEFAULT_APP_ID: &str = "public";
/// Tenant id used when a request does not name one.
pub const DEFAULT_TENANT_ID: &str = "public";

fn normalise(raw: &str, default: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Identifies a logical application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppIdentifier {
    connection_uri_domain: String,
    app_id: String,
}

impl AppIdentifier {
    pub fn new(connection_uri_domain: &str, app_id: &str) -> Self {
        Self {
            connection_uri_domain: normalise(connection_uri_domain, DEFAULT_CONNECTION_URI_DOMAIN),
            app_id: normalise(app_id, DEFAULT_APP_ID),
        }
    }

    pub fn connection_uri_domain(&self) -> &str {
        &self.connection_uri_domain
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The `public` tenant of this app.
    pub fn public_tenant(&self) -> TenantIdentifier {
        self.tenant(DEFAULT_TENANT_ID)
    }

    pub fn tenant(&self, tenant_id: &str) -> TenantIdentifier {
        TenantIdentifier {
            app: self.clone(),
            tenant_id: normalise(tenant_id, DEFAULT_TENANT_ID),
        }
    }
}

impl Default for AppIdentifier {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_URI_DOMAIN, DEFAULT_APP_ID)
    }
}

impl fmt::Display for AppIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app '{}' on domain '{}'", self.app_id, self.connection_uri_domain)
    }
}

/// Identifies a tenant within an app.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantIdentifier {
    app: AppIdentifier,
    tenant_id: String,
}

impl TenantIdentifier {
    pub fn new(connection_uri_domain: &str, app_id: &str, tenant_id: &str) -> Self {
        AppIdentifier::new(connection_uri_domain, app_id).tenant(tenant_id)
    }

    pub fn app(&self) -> &AppIdentifier {
        &self.app
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn connection_uri_domain(&self) -> &str {
        self.app.connection_uri_domain()
    }

    pub fn app_id(&self) -> &str {
        self.app.app_id()
    }
}

impl Default for TenantIdentifier {
    fn default() -> Self {
        AppIdentifier::default().public_tenant()
    }
}

impl fmt::Display for TenantIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tenant '{}' of app '{}' on domain '{}'",
            self.tenant_id,
            self.app.app_id(),
            self.app.connection_uri_domain()
        )
    }
}
