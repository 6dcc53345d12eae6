//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool size > 0, versions well-formed)
//! - Detect conflicting tenant bindings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CoreConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::CoreConfig;
use crate::routing::version::ApiVersion;
use crate::tenancy::{AppIdentifier, TenantIdentifier};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("max_server_pool_size must be at least 1")]
    EmptyWorkerPool,

    #[error("max_request_body_bytes must be at least 1")]
    EmptyBodyLimit,

    #[error("supported_versions must not be empty")]
    NoVersions,

    #[error("supported version '{0}' is not of the form major.minor")]
    MalformedVersion(String),

    #[error("supported version '{0}' is listed twice")]
    DuplicateVersion(String),

    #[error("app_id must not be empty")]
    EmptyAppId,

    #[error("tenant {0} is configured more than once")]
    DuplicateTenant(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &CoreConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.max_server_pool_size == 0 {
        errors.push(ValidationError::EmptyWorkerPool);
    }
    if config.max_request_body_bytes == 0 {
        errors.push(ValidationError::EmptyBodyLimit);
    }

    if config.supported_versions.is_empty() {
        errors.push(ValidationError::NoVersions);
    }
    let mut seen_versions = HashSet::new();
    for raw in &config.supported_versions {
        if ApiVersion::parse(raw).is_none() {
            errors.push(ValidationError::MalformedVersion(raw.clone()));
        } else if !seen_versions.insert(raw.as_str()) {
            errors.push(ValidationError::DuplicateVersion(raw.clone()));
        }
    }

    let mut seen_tenants = HashSet::new();
    for app in &config.apps {
        if app.app_id.trim().is_empty() {
            errors.push(ValidationError::EmptyAppId);
            continue;
        }
        let base = AppIdentifier::new(&app.connection_uri_domain, &app.app_id);
        let mut bindings: Vec<TenantIdentifier> =
            app.tenants.iter().map(|tenant| base.tenant(tenant)).collect();
        // every app is bound on its public tenant, listed or not
        if !bindings.contains(&base.public_tenant()) {
            bindings.push(base.public_tenant());
        }
        for id in bindings {
            if !seen_tenants.insert(id.clone()) {
                errors.push(ValidationError::DuplicateTenant(id.to_string()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
