//! Webserver setup and request dispatch.
//!
//! # Responsibilities
//! - Bind the configured address and report the outcome to the lifecycle monitor
//! - Wire up middleware (request ID, tracing, body limit)
//! - Bound handler execution with the worker pool
//! - Dispatch: tenancy prefix → route → version → identity → handler
//! - Escalate fatal handler errors to a process shutdown
//!
//! # Design Decisions
//! - A single fallback handler owns dispatch; the route table is ours, not axum's
//! - Handlers are synchronous and run on the blocking pool, each holding a
//!   worker slot until it returns, even if the client has gone away
//! - `STOPPED` is reported only after graceful shutdown and a full pool drain

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api;
use crate::context::CoreContext;
use crate::http::request::{ApiMethod, ApiRequest, X_REQUEST_ID};
use crate::http::response::{ApiError, ApiResult};
use crate::lifecycle::{LifecycleError, LifecycleState, ShutdownReason};
use crate::net::listener::{self, BindError};
use crate::net::worker::{WorkerPool, WorkerSlot};
use crate::observability::metrics;
use crate::routing::{ApiRouter, Endpoint, RouteMatch, RouterError, VERSION_HEADER};
use crate::tenancy::TenantIdentifier;

/// Why a server did not start.
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Bind(#[from] BindError),

    /// A server starts at most once, and only from `INIT`.
    #[error("webserver cannot start from lifecycle state {0}")]
    NotStartable(LifecycleState),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ApiRouter>,
    pub context: CoreContext,
    pub pool: WorkerPool,
}

/// The request-handling server of one process context.
pub struct Webserver {
    context: CoreContext,
    router: Arc<ApiRouter>,
    pool: WorkerPool,
    task: Mutex<Option<JoinHandle<()>>>,
    local_addr: OnceLock<SocketAddr>,
}

impl Webserver {
    /// Create a server with the built-in endpoints registered.
    pub fn new(context: CoreContext) -> Result<Self, RouterError> {
        let router = Arc::new(ApiRouter::new());
        api::register_builtin(&router)?;
        let pool = WorkerPool::new(context.config().max_server_pool_size);
        Ok(Self {
            context,
            router,
            pool,
            task: Mutex::new(None),
            local_addr: OnceLock::new(),
        })
    }

    /// Register an additional endpoint. Allowed before and after `start`.
    pub fn add_api(&self, endpoint: Endpoint) -> Result<(), RouterError> {
        self.router.register(endpoint)
    }

    /// Bind and begin serving.
    ///
    /// Only a server still in `INIT` may start. On bind failure the monitor
    /// reports `INIT_FAILURE` carrying the diagnostic, then `STOPPED`.
    pub async fn start(&self) -> Result<SocketAddr, StartError> {
        let mut task = self.task.lock().await;
        let monitor = self.context.monitor().clone();
        let current = monitor.current();
        if current != LifecycleState::Init {
            tracing::warn!(state = %current, "Refusing to start webserver");
            return Err(StartError::NotStartable(current));
        }

        let config = self.context.config();
        let listener = match listener::bind(&config.host, config.port).await {
            Ok(listener) => listener,
            Err(e) => {
                self.fail_init(&e);
                return Err(e.into());
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(source) => {
                let e = BindError {
                    host: config.host.clone(),
                    port: config.port,
                    source,
                };
                self.fail_init(&e);
                return Err(e.into());
            }
        };

        // the listener is dropped unused if STARTED cannot be reported
        monitor.transition(LifecycleState::Started, None)?;

        let state = AppState {
            router: Arc::clone(&self.router),
            context: self.context.clone(),
            pool: self.pool.clone(),
        };
        let app = build_router(state, config.max_request_body_bytes);
        let shutdown = self.context.shutdown().subscribe();
        let pool = self.pool.clone();

        tracing::info!(
            address = %addr,
            max_workers = self.pool.max_workers(),
            "Webserver started"
        );

        *task = Some(tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let reason = shutdown.wait().await;
                    tracing::info!(reason = ?reason, "Webserver shutting down");
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Webserver terminated with error");
            }

            pool.drain().await;
            if let Err(e) = monitor.transition(LifecycleState::Stopped, None) {
                tracing::error!(error = %e, "Could not report STOPPED");
            }
            tracing::info!("Webserver stopped");
        }));
        let _ = self.local_addr.set(addr);
        Ok(addr)
    }

    /// Stop serving and wait for every in-flight request to finish.
    pub async fn stop(&self) {
        self.context.shutdown().trigger(ShutdownReason::Requested);
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Webserver task failed");
            }
        }
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    pub fn context(&self) -> &CoreContext {
        &self.context
    }

    pub fn router(&self) -> &ApiRouter {
        &self.router
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    fn fail_init(&self, err: &BindError) {
        let monitor = self.context.monitor();
        let transitions = monitor
            .transition(LifecycleState::InitFailure, Some(err.to_string()))
            .and_then(|()| monitor.transition(LifecycleState::Stopped, None));
        if let Err(e) = transitions {
            tracing::error!(error = %e, "Could not report INIT_FAILURE");
        }
    }
}

/// Build the axum router with all middleware layers.
fn build_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
}

/// Everything the blocking half of dispatch needs from the wire request.
struct Incoming {
    method: Method,
    path: String,
    host: Option<String>,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
}

async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let slot = match state.pool.acquire().await {
        Ok(slot) => slot,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request refused");
            return finish(&state, &method, &request_id, started, Err(ApiError::internal(e.to_string())));
        }
    };

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Request body rejected");
            drop(slot);
            return finish(&state, &method, &request_id, started, Err(ApiError::PayloadTooLarge));
        }
    };

    let incoming = Incoming {
        method: method.clone(),
        path: parts.uri.path().to_string(),
        host: parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query: parse_query(&parts.uri),
        headers: parts.headers,
        body,
    };

    let worker_state = state.clone();
    let result = tokio::task::spawn_blocking(move || execute(&worker_state, incoming, slot)).await;
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Handler task failed");
            Err(ApiError::internal(e.to_string()))
        }
    };

    finish(&state, &method, &request_id, started, result)
}

/// Route and run one request on the current (blocking) thread.
fn execute(state: &AppState, incoming: Incoming, slot: WorkerSlot) -> ApiResult {
    let _slot = slot;
    let target = state.router.resolve_path(&incoming.path);

    let (method, handler) = match ApiMethod::from_http(&incoming.method) {
        Some(method) => match state.router.route(&target.path, method) {
            RouteMatch::Handler(handler) => (method, handler),
            RouteMatch::NotFound => return Err(ApiError::NotFound),
            RouteMatch::MethodNotAllowed => return Err(ApiError::MethodNotAllowed),
        },
        None if state.router.contains(&target.path) => return Err(ApiError::MethodNotAllowed),
        None => return Err(ApiError::NotFound),
    };

    let requested = incoming
        .headers
        .get(VERSION_HEADER)
        .map(|v| v.to_str().unwrap_or_default().trim());
    let version = state.context.versions().negotiate(requested)?;

    let domain = connection_uri_domain(state, incoming.host.as_deref());
    let tenant = TenantIdentifier::new(
        &domain,
        target.app_id.as_deref().unwrap_or_default(),
        target.tenant_id.as_deref().unwrap_or_default(),
    );

    let request = ApiRequest::new(
        method,
        target.path,
        version,
        tenant,
        Arc::clone(state.context.storage()),
    )
    .with_query(incoming.query)
    .with_headers(incoming.headers)
    .with_body(incoming.body);

    tracing::debug!(
        method = %method,
        path = %request.path(),
        version = %version,
        tenant = %request.tenant(),
        "Dispatching request"
    );
    handler(&request)
}

/// Turn a handler outcome into the wire response.
fn finish(
    state: &AppState,
    method: &Method,
    request_id: &str,
    started: Instant,
    result: ApiResult,
) -> Response {
    let response = match result {
        Ok(response) => response.into_response(),
        Err(err) => {
            if err.is_fatal() {
                tracing::error!(request_id = %request_id, error = %err, "Fatal error, stopping process");
                state
                    .context
                    .shutdown()
                    .trigger(ShutdownReason::Fatal(err.to_string()));
            } else if err.status().is_server_error() {
                tracing::error!(request_id = %request_id, error = %err, "Request failed");
            } else {
                tracing::debug!(request_id = %request_id, status = %err.status(), error = %err, "Request rejected");
            }
            err.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), started);
    response
}

/// The Host header's domain when it names a configured domain, else the default.
fn connection_uri_domain(state: &AppState, host: Option<&str>) -> String {
    let Some(host) = host else {
        return String::new();
    };
    let domain = host
        .rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
        .map_or(host, |(name, _)| name)
        .trim()
        .to_lowercase();
    if !domain.is_empty() && state.context.storage().knows_domain(&domain) {
        domain
    } else {
        String::new()
    }
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(query)| query)
        .unwrap_or_default()
}
