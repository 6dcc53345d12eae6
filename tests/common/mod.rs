//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use authcore::config::{AppConfig, CoreConfig};
use authcore::lifecycle::WaitOutcome;
use authcore::{CoreContext, LifecycleState, Webserver};

pub const WAIT: Duration = Duration::from_secs(5);

/// Config bound to an ephemeral loopback port.
pub fn test_config() -> CoreConfig {
    CoreConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..CoreConfig::default()
    }
}

/// One app on the default domain with the listed tenants.
pub fn app(app_id: &str, tenants: &[&str]) -> AppConfig {
    AppConfig {
        connection_uri_domain: String::new(),
        app_id: app_id.into(),
        tenants: tenants.iter().map(|t| t.to_string()).collect(),
    }
}

/// A running server and the base URL it answers on.
pub struct TestServer {
    pub server: Webserver,
    pub addr: SocketAddr,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn context(&self) -> &CoreContext {
        self.server.context()
    }

    pub async fn wait_for(&self, state: LifecycleState) -> WaitOutcome {
        self.context().monitor().wait_for_event(state, WAIT).await
    }

    pub async fn stop(&self) {
        self.server.stop().await;
    }
}

/// Build a server without starting it, so tests can add endpoints first.
pub fn build_server(config: CoreConfig) -> Webserver {
    let context = CoreContext::from_config(config).unwrap();
    Webserver::new(context).unwrap()
}

/// Start an already built server.
pub async fn launch(server: Webserver) -> TestServer {
    let addr = server.start().await.unwrap();
    TestServer { server, addr }
}

/// Start a server with the given config.
pub async fn start_server(config: CoreConfig) -> TestServer {
    launch(build_server(config)).await
}

/// A client that opens a fresh connection per request.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Same as [`client`] with a total request timeout.
pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(timeout)
        .build()
        .unwrap()
}
