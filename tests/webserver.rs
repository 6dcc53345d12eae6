//! End-to-end tests for the webserver: versions, input errors, routing
//! misses, worker budget, bind failures and lifecycle reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use authcore::http::input::{parse_json_object, required_query_param};
use authcore::http::{
    ApiError, ApiRequest, ApiResponse, ApiResult, StartError, INTERNAL_ERROR_BODY,
};
use authcore::lifecycle::{ShutdownReason, WaitOutcome};
use authcore::net::BIND_FAILURE_MESSAGE;
use authcore::routing::{Endpoint, VERSION_HEADER};
use authcore::tenancy::TenantIdentifier;
use authcore::{CoreConfig, LifecycleState};
use futures_util::future::join;
use reqwest::StatusCode;

mod common;

fn version_echo(request: &ApiRequest) -> ApiResult {
    Ok(ApiResponse::text(request.version().to_string()))
}

fn json_echo(request: &ApiRequest) -> ApiResult {
    let input = parse_json_object(request)?;
    Ok(ApiResponse::json(serde_json::Value::Object(input)))
}

fn query_echo(request: &ApiRequest) -> ApiResult {
    let key = required_query_param(request, "key")?;
    Ok(ApiResponse::text(key))
}

fn slow(_: &ApiRequest) -> ApiResult {
    std::thread::sleep(Duration::from_secs(1));
    Ok(ApiResponse::text("done"))
}

#[tokio::test]
async fn test_every_supported_version_accepted() {
    let config = common::test_config();
    let versions = config.supported_versions.clone();
    let server = common::start_server(config).await;
    let client = common::client();

    for version in &versions {
        let res = client
            .get(server.url("/hello"))
            .header(VERSION_HEADER, version)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "version {version}");
        assert_eq!(res.text().await.unwrap(), "Hello");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_unsupported_version_rejected() {
    let server = common::start_server(common::test_config()).await;
    let client = common::client();

    for token in ["9.9", "3", "3.00", "latest"] {
        let res = client
            .get(server.url("/hello"))
            .header(VERSION_HEADER, token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.text().await.unwrap(), format!("cdi-version {token} not supported"));
    }

    server.stop().await;
}

#[tokio::test]
async fn test_missing_version_means_latest() {
    let server = common::build_server(common::test_config());
    server.add_api(Endpoint::new("/version").get(version_echo)).unwrap();
    let server = common::launch(server).await;
    let client = common::client();

    let latest = server.context().versions().latest().to_string();
    let implicit = client.get(server.url("/version")).send().await.unwrap();
    let explicit = client
        .get(server.url("/version"))
        .header(VERSION_HEADER, &latest)
        .send()
        .await
        .unwrap();

    assert_eq!(implicit.status(), explicit.status());
    assert_eq!(implicit.text().await.unwrap(), latest);
    assert_eq!(explicit.text().await.unwrap(), latest);

    server.stop().await;
}

#[tokio::test]
async fn test_json_body_validation() {
    let server = common::build_server(common::test_config());
    server.add_api(Endpoint::new("/json").post(json_echo)).unwrap();
    let server = common::launch(server).await;
    let client = common::client();

    for body in ["{", "not json", "", "[1, 2]"] {
        let res = client
            .post(server.url("/json"))
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(res.text().await.unwrap(), "Invalid Json Input");
    }

    let res = client.post(server.url("/json")).body("{}").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(server.url("/json"))
        .json(&serde_json::json!({ "a": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let echoed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(echoed["a"], 1);

    server.stop().await;
}

#[tokio::test]
async fn test_required_query_parameter() {
    let server = common::build_server(common::test_config());
    server.add_api(Endpoint::new("/query").get(query_echo)).unwrap();
    let server = common::launch(server).await;
    let client = common::client();

    for path in ["/query", "/query?other=value"] {
        let res = client.get(server.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            res.text().await.unwrap(),
            "Field name 'key' is missing in GET request"
        );
    }

    let res = client.get(server.url("/query?key=value")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "value");

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_path_and_wrong_method() {
    let server = common::start_server(common::test_config()).await;
    let client = common::client();

    let res = client.get(server.url("/randomPath")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "Not found");

    let res = client
        .delete(server.url("/recipe/anomaly/ip"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.text().await.unwrap(), "Method not supported");

    let res = client.patch(server.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    server.stop().await;
}

#[tokio::test]
async fn test_hello_answers_every_method() {
    let server = common::start_server(common::test_config()).await;
    let client = common::client();

    for method in [
        reqwest::Method::GET,
        reqwest::Method::POST,
        reqwest::Method::PUT,
        reqwest::Method::DELETE,
    ] {
        let res = client
            .request(method.clone(), server.url("/hello"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "method {method}");
        assert!(res.headers().contains_key("x-request-id"));
        assert_eq!(res.text().await.unwrap(), "Hello");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_disabled_storage_is_internal_error() {
    let server = common::start_server(common::test_config()).await;
    let client = common::client();

    server
        .context()
        .storage()
        .resolve_tenant(&TenantIdentifier::default())
        .unwrap()
        .storage()
        .set_enabled(false);

    let res = client.get(server.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), INTERNAL_ERROR_BODY);

    // not fatal: the server keeps serving
    assert_eq!(server.context().monitor().current(), LifecycleState::Started);
    server.stop().await;
}

#[tokio::test]
async fn test_unknown_app_is_rejected() {
    let server = common::start_server(common::test_config()).await;
    let client = common::client();

    let res = client
        .get(server.url("/appid-missing/hello"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res
        .text()
        .await
        .unwrap()
        .starts_with("AppId or tenantId not found"));

    server.stop().await;
}

#[tokio::test]
async fn test_endpoint_added_after_start() {
    let server = common::start_server(common::test_config()).await;
    let client = common::client();

    let res = client.get(server.url("/late")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server
        .server
        .add_api(Endpoint::new("/late").get(|_: &ApiRequest| Ok(ApiResponse::text("late"))))
        .unwrap();
    assert!(server
        .server
        .add_api(Endpoint::new("/late").get(|_: &ApiRequest| Ok(ApiResponse::text("again"))))
        .is_err());

    let res = client.get(server.url("/late")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "late");

    server.stop().await;
}

#[tokio::test]
async fn test_port_conflict_reports_init_failure() {
    let first = common::start_server(common::test_config()).await;
    assert!(first.wait_for(LifecycleState::Started).await.is_reached());

    let second = common::build_server(CoreConfig {
        port: first.addr.port(),
        ..common::test_config()
    });
    let err = second.start().await.unwrap_err();
    assert_eq!(err.to_string(), BIND_FAILURE_MESSAGE);

    let monitor = second.context().monitor();
    match monitor.wait_for_event(LifecycleState::InitFailure, common::WAIT).await {
        WaitOutcome::Reached(event) => {
            assert_eq!(event.cause.as_deref(), Some(BIND_FAILURE_MESSAGE));
        }
        other => panic!("expected INIT_FAILURE, got {other:?}"),
    }
    assert!(matches!(
        monitor.wait_for_event(LifecycleState::Started, common::WAIT).await,
        WaitOutcome::Superseded(_)
    ));
    assert!(monitor
        .wait_for_event(LifecycleState::Stopped, common::WAIT)
        .await
        .is_reached());

    assert_eq!(first.context().monitor().current(), LifecycleState::Started);
    first.stop().await;
}

#[tokio::test]
async fn test_no_restart_after_init_failure() {
    let first = common::start_server(common::test_config()).await;
    let port = first.addr.port();

    let second = common::build_server(CoreConfig {
        port,
        ..common::test_config()
    });
    assert!(matches!(second.start().await, Err(StartError::Bind(_))));
    assert_eq!(second.context().monitor().current(), LifecycleState::Stopped);

    // port is free again, but the second server has already failed
    first.stop().await;
    assert!(matches!(
        second.start().await,
        Err(StartError::NotStartable(LifecycleState::Stopped))
    ));
    assert_eq!(second.context().monitor().current(), LifecycleState::Stopped);
    assert_eq!(second.local_addr(), None);

    let res = common::client()
        .get(format!("http://127.0.0.1:{port}/hello"))
        .send()
        .await;
    assert!(res.is_err(), "nothing may serve on the freed port");
}

#[tokio::test]
async fn test_second_start_refused() {
    let server = common::start_server(common::test_config()).await;

    assert!(matches!(
        server.server.start().await,
        Err(StartError::NotStartable(LifecycleState::Started))
    ));
    assert_eq!(server.server.local_addr(), Some(server.addr));

    server.stop().await;
    assert!(matches!(
        server.server.start().await,
        Err(StartError::NotStartable(LifecycleState::Stopped))
    ));
}

#[tokio::test]
async fn test_unavailable_host_reports_init_failure() {
    let server = common::build_server(CoreConfig {
        host: "182.168.29.69".into(),
        ..common::test_config()
    });
    assert!(server.start().await.is_err());

    let outcome = server
        .context()
        .monitor()
        .wait_for_event(LifecycleState::InitFailure, common::WAIT)
        .await;
    assert!(outcome.is_reached());
    assert_eq!(
        outcome.event().and_then(|e| e.cause.as_deref()),
        Some(BIND_FAILURE_MESSAGE)
    );
}

async fn run_two_slow_requests(max_server_pool_size: usize) -> (bool, bool) {
    let server = common::build_server(CoreConfig {
        max_server_pool_size,
        ..common::test_config()
    });
    server.add_api(Endpoint::new("/slow").get(slow)).unwrap();
    let server = common::launch(server).await;

    let timeout = Duration::from_millis(1500);
    let a = common::client_with_timeout(timeout);
    let b = common::client_with_timeout(timeout);
    let (first, second) = join(
        a.get(server.url("/slow")).send(),
        b.get(server.url("/slow")).send(),
    )
    .await;

    let timed_out = |result: &Result<reqwest::Response, reqwest::Error>| {
        result.as_ref().err().is_some_and(reqwest::Error::is_timeout)
    };
    let outcome = (timed_out(&first), timed_out(&second));

    server.stop().await;
    outcome
}

#[tokio::test]
async fn test_single_worker_serialises_slow_requests() {
    let (first, second) = run_two_slow_requests(1).await;
    assert!(first || second, "one request should have timed out");
}

#[tokio::test]
async fn test_two_workers_serve_slow_requests_in_parallel() {
    let (first, second) = run_two_slow_requests(2).await;
    assert!(!first && !second, "neither request should time out");
}

#[tokio::test]
async fn test_fatal_error_stops_server() {
    let server = common::build_server(common::test_config());
    server
        .add_api(Endpoint::new("/fatal").get(|_: &ApiRequest| Err(ApiError::fatal("invariant broken"))))
        .unwrap();
    let server = common::launch(server).await;
    let client = common::client();

    let res = client.get(server.url("/fatal")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), INTERNAL_ERROR_BODY);

    assert!(server.wait_for(LifecycleState::Stopped).await.is_reached());
    assert_eq!(
        server.context().shutdown().reason(),
        Some(ShutdownReason::Fatal("invariant broken".into()))
    );
}

#[tokio::test]
async fn test_stop_reports_stopped_and_refuses_connections() {
    let server = common::start_server(common::test_config()).await;
    let client = common::client();

    let res = client.get(server.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.stop().await;
    assert_eq!(server.context().monitor().current(), LifecycleState::Stopped);
    assert!(server.server.pool().is_closed());

    let states: Vec<_> = server
        .context()
        .monitor()
        .history()
        .into_iter()
        .map(|event| event.state)
        .collect();
    assert_eq!(
        states,
        vec![LifecycleState::Init, LifecycleState::Started, LifecycleState::Stopped]
    );

    assert!(client.get(server.url("/hello")).send().await.is_err());
}

#[tokio::test]
async fn test_stop_waits_for_abandoned_handler() {
    let finished = Arc::new(AtomicBool::new(false));
    let server = common::build_server(common::test_config());
    let flag = Arc::clone(&finished);
    server
        .add_api(Endpoint::new("/slow").get(move |_: &ApiRequest| {
            std::thread::sleep(Duration::from_secs(1));
            flag.store(true, Ordering::SeqCst);
            Ok(ApiResponse::text("done"))
        }))
        .unwrap();
    let server = common::launch(server).await;

    let res = common::client_with_timeout(Duration::from_millis(200))
        .get(server.url("/slow"))
        .send()
        .await;
    assert!(res.is_err_and(|e| e.is_timeout()));
    assert!(!finished.load(Ordering::SeqCst));

    let observer = {
        let monitor = server.context().monitor().clone();
        let finished = Arc::clone(&finished);
        tokio::spawn(async move {
            let outcome = monitor
                .wait_for_event(LifecycleState::Stopped, common::WAIT)
                .await;
            (outcome.is_reached(), finished.load(Ordering::SeqCst))
        })
    };

    server.stop().await;
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(observer.await.unwrap(), (true, true));
}
