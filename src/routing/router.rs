//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store one endpoint per exact path
//! - Strip the `/appid-<app>[/<tenant>]` tenancy prefix from request paths
//! - Return the handler, or an explicit NotFound / MethodNotAllowed
//!
//! # Design Decisions
//! - Exact path match only; no patterns in the hot path
//! - Append-only: endpoints may be added while serving, never replaced
//! - Readers load an immutable snapshot (`ArcSwap`), writers copy-on-write

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::http::request::{ApiMethod, ApiRequest};
use crate::http::response::ApiResult;

/// Path prefix that names an app ahead of the route path.
pub const APP_ID_PREFIX: &str = "appid-";

/// A handler for one method of one endpoint.
pub type HandlerFn = Arc<dyn Fn(&ApiRequest) -> ApiResult + Send + Sync>;

/// Startup-time routing configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("an endpoint is already registered for path '{0}'")]
    DuplicatePath(String),

    #[error("invalid endpoint path '{0}'")]
    InvalidPath(String),
}

/// One logical endpoint: a path plus an optional handler per method.
#[derive(Clone)]
pub struct Endpoint {
    path: String,
    get: Option<HandlerFn>,
    post: Option<HandlerFn>,
    put: Option<HandlerFn>,
    delete: Option<HandlerFn>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            get: None,
            post: None,
            put: None,
            delete: None,
        }
    }

    pub fn get<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> ApiResult + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(handler));
        self
    }

    pub fn post<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> ApiResult + Send + Sync + 'static,
    {
        self.post = Some(Arc::new(handler));
        self
    }

    pub fn put<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> ApiResult + Send + Sync + 'static,
    {
        self.put = Some(Arc::new(handler));
        self
    }

    pub fn delete<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> ApiResult + Send + Sync + 'static,
    {
        self.delete = Some(Arc::new(handler));
        self
    }

    /// Same handler for every method.
    pub fn any<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> ApiResult + Send + Sync + 'static,
    {
        let handler: HandlerFn = Arc::new(handler);
        self.get = Some(Arc::clone(&handler));
        self.post = Some(Arc::clone(&handler));
        self.put = Some(Arc::clone(&handler));
        self.delete = Some(handler);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self, method: ApiMethod) -> Option<&HandlerFn> {
        match method {
            ApiMethod::Get => self.get.as_ref(),
            ApiMethod::Post => self.post.as_ref(),
            ApiMethod::Put => self.put.as_ref(),
            ApiMethod::Delete => self.delete.as_ref(),
        }
    }

    pub fn methods(&self) -> Vec<ApiMethod> {
        [ApiMethod::Get, ApiMethod::Post, ApiMethod::Put, ApiMethod::Delete]
            .into_iter()
            .filter(|method| self.handler(*method).is_some())
            .collect()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path)
            .field("methods", &self.methods())
            .finish()
    }
}

/// Outcome of a route lookup.
#[derive(Clone)]
pub enum RouteMatch {
    Handler(HandlerFn),
    NotFound,
    MethodNotAllowed,
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMatch::Handler(_) => f.write_str("Handler"),
            RouteMatch::NotFound => f.write_str("NotFound"),
            RouteMatch::MethodNotAllowed => f.write_str("MethodNotAllowed"),
        }
    }
}

/// A request path split into tenancy routing info and the route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTarget {
    pub app_id: Option<String>,
    pub tenant_id: Option<String>,
    pub path: String,
}

type RouteTable = HashMap<String, Arc<Endpoint>>;

/// The endpoint registry.
#[derive(Debug)]
pub struct ApiRouter {
    routes: ArcSwap<RouteTable>,
    writer: Mutex<()>,
}

impl ApiRouter {
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    /// Add an endpoint. Each path may be registered once.
    pub fn register(&self, endpoint: Endpoint) -> Result<(), RouterError> {
        let path = endpoint.path().to_string();
        let reserved = path
            .strip_prefix('/')
            .map_or(true, |rest| rest.starts_with(APP_ID_PREFIX));
        if reserved {
            return Err(RouterError::InvalidPath(path));
        }

        let _guard = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = self.routes.load();
        if current.contains_key(&path) {
            return Err(RouterError::DuplicatePath(path));
        }

        let mut next = RouteTable::clone(&current);
        tracing::debug!(path = %path, methods = ?endpoint.methods(), "Endpoint registered");
        next.insert(path, Arc::new(endpoint));
        self.routes.store(Arc::new(next));
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.load().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the handler for an exact route path.
    pub fn route(&self, path: &str, method: ApiMethod) -> RouteMatch {
        let routes = self.routes.load();
        let Some(endpoint) = routes.get(path) else {
            return RouteMatch::NotFound;
        };
        match endpoint.handler(method) {
            Some(handler) => RouteMatch::Handler(Arc::clone(handler)),
            None => RouteMatch::MethodNotAllowed,
        }
    }

    /// Split a raw request path into app, tenant and route path.
    ///
    /// A segment after the optional `/appid-<app>` is read as a tenant only
    /// when the rest of the path is a registered route and the whole
    /// remainder is not.
    pub fn resolve_path(&self, raw_path: &str) -> RoutingTarget {
        let (app_id, rest) = match raw_path
            .strip_prefix('/')
            .and_then(|p| p.strip_prefix(APP_ID_PREFIX))
        {
            Some(after) => {
                let (app, rest) = split_first_segment(after);
                (Some(app.to_string()), rest)
            }
            None => (None, raw_path),
        };
        let rest = if rest.is_empty() { "/" } else { rest };

        if !self.contains(rest) {
            if let Some(trimmed) = rest.strip_prefix('/') {
                let (tenant, remainder) = split_first_segment(trimmed);
                let remainder = if remainder.is_empty() { "/" } else { remainder };
                if !tenant.is_empty() && self.contains(remainder) {
                    return RoutingTarget {
                        app_id,
                        tenant_id: Some(tenant.to_string()),
                        path: remainder.to_string(),
                    };
                }
            }
        }

        RoutingTarget {
            app_id,
            tenant_id: None,
            path: rest.to_string(),
        }
    }
}

impl Default for ApiRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// `"a/b/c"` → `("a", "/b/c")`, `"a"` → `("a", "")`.
fn split_first_segment(path: &str) -> (&str, &str) {
    match path.find('/') {
        Some(index) => path.split_at(index),
        None => (path, ""),
    }
}
