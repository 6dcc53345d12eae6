//! Request handling.
//!
//! # Responsibilities
//! - Carry everything a handler may read: method, route path, negotiated
//!   version, tenant identity, query, headers, body
//! - Give handlers tenant storage only through the resolver
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing (outermost layer)
//! - The version is resolved before an `ApiRequest` exists, so handlers never
//!   see an unspecified version
//! - The tenant identity is explicit; storage is resolved per call

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};

use crate::http::response::ApiError;
use crate::routing::version::ApiVersion;
use crate::tenancy::{AppStorage, StorageRegistry, TenantIdentifier, TenantStorage};

/// Header carrying the request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Methods an endpoint can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl ApiMethod {
    /// `None` for methods no endpoint can implement.
    pub fn from_http(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(ApiMethod::Get),
            Method::POST => Some(ApiMethod::Post),
            Method::PUT => Some(ApiMethod::Put),
            Method::DELETE => Some(ApiMethod::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMethod::Get => "GET",
            ApiMethod::Post => "POST",
            ApiMethod::Put => "PUT",
            ApiMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A routed request as seen by an endpoint handler.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: ApiMethod,
    path: String,
    version: ApiVersion,
    tenant: TenantIdentifier,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
    registry: Arc<StorageRegistry>,
}

impl ApiRequest {
    pub fn new(
        method: ApiMethod,
        path: impl Into<String>,
        version: ApiVersion,
        tenant: TenantIdentifier,
        registry: Arc<StorageRegistry>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            version,
            tenant,
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            registry,
        }
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> ApiMethod {
        self.method
    }

    /// Route path, with any `/appid-…/<tenant>` prefix removed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Negotiated protocol version.
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Tenant this request is scoped to.
    pub fn tenant(&self) -> &TenantIdentifier {
        &self.tenant
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    /// Storage bound to this request's tenant.
    pub fn tenant_storage(&self) -> Result<TenantStorage, ApiError> {
        Ok(self.registry.resolve_tenant(&self.tenant)?)
    }

    /// Storage bound to this request's app. The tenant must still exist.
    pub fn app_storage(&self) -> Result<AppStorage, ApiError> {
        Ok(self.tenant_storage()?.app_storage())
    }
}
