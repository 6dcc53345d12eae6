//! IP-history endpoint tests, including app isolation over the
//! `/appid-<app>` path prefix.

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

const PATH: &str = "/recipe/anomaly/ip";

async fn last_ip(client: &reqwest::Client, url: String) -> String {
    let res = client.get(url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "OK");
    body["ip"].as_str().unwrap().to_string()
}

async fn record_ip(client: &reqwest::Client, url: String, user_id: &str, ip: &str) {
    let res = client
        .post(url)
        .json(&json!({ "userId": user_id, "ip": ip }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "OK" }));
}

#[tokio::test]
async fn test_last_ip_follows_insertion_order() {
    let server = common::start_server(common::test_config()).await;
    let client = common::client();
    let query = |user: &str| server.url(&format!("{PATH}?userId={user}"));

    assert_eq!(last_ip(&client, query("alice")).await, "");

    record_ip(&client, server.url(PATH), "alice", "1.2.3.4").await;
    assert_eq!(last_ip(&client, query("alice")).await, "1.2.3.4");

    record_ip(&client, server.url(PATH), "alice", "5.6.7.8").await;
    assert_eq!(last_ip(&client, query("alice")).await, "5.6.7.8");

    assert_eq!(last_ip(&client, query("bob")).await, "");

    server.stop().await;
}

#[tokio::test]
async fn test_apps_do_not_share_history() {
    let server = common::start_server(authcore::CoreConfig {
        apps: vec![common::app("shop", &["eu"]), common::app("blog", &[])],
        ..common::test_config()
    })
    .await;
    let client = common::client();

    record_ip(&client, server.url(&format!("/appid-shop{PATH}")), "u1", "10.0.0.1").await;
    record_ip(&client, server.url(&format!("/appid-blog{PATH}")), "u1", "10.0.0.2").await;

    let shop = last_ip(&client, server.url(&format!("/appid-shop{PATH}?userId=u1"))).await;
    let blog = last_ip(&client, server.url(&format!("/appid-blog{PATH}?userId=u1"))).await;
    let public = last_ip(&client, server.url(&format!("{PATH}?userId=u1"))).await;
    assert_eq!(shop, "10.0.0.1");
    assert_eq!(blog, "10.0.0.2");
    assert_eq!(public, "");

    // tenants of one app share the app's history
    let eu = last_ip(&client, server.url(&format!("/appid-shop/eu{PATH}?userId=u1"))).await;
    assert_eq!(eu, "10.0.0.1");

    server.stop().await;
}

#[tokio::test]
async fn test_input_errors() {
    let server = common::start_server(common::test_config()).await;
    let client = common::client();

    let res = client.get(server.url(PATH)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.text().await.unwrap(),
        "Field name 'userId' is missing in GET request"
    );

    let res = client.post(server.url(PATH)).body("{").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "Invalid Json Input");

    let res = client
        .post(server.url(PATH))
        .json(&json!({ "userId": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.text().await.unwrap(),
        "Field name 'ip' is invalid in JSON input"
    );

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_tenant_is_not_defaulted() {
    let server = common::start_server(authcore::CoreConfig {
        apps: vec![common::app("shop", &["eu"])],
        ..common::test_config()
    })
    .await;
    let client = common::client();

    let res = client
        .get(server.url(&format!("/appid-shop/us{PATH}?userId=u1")))
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
