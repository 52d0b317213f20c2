mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::*;
use push_relay::api::{ApiServer, ApiServerConfig, AppState};

async fn wait_for(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn ping_answers_ok() {
    let (_ctx, dispatcher) = relay(FakeFactory::new([]), RecordingDevices::with_device(&device_key()));
    let router = ApiServer::new(ApiServerConfig::default(), AppState::new(dispatcher)).build_router();

    let response = router
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn push_accepts_stream_and_dispatches_each_line() {
    let transport = FakeTransport::new([]);
    let devices = RecordingDevices::with_device(&device_key());
    let (_ctx, dispatcher) = relay(FakeFactory::new([transport.clone()]), devices.clone());
    let router = ApiServer::new(ApiServerConfig::default(), AppState::new(dispatcher)).build_router();

    let body = concat!(
        r#"{"account_id":1001,"app":"cam.reaction.ReactionCam","data":{"aps":{"alert":"one"}},"device_token":"f00dfeed"}"#,
        "\n",
        "this line is garbage\n",
        "\n",
        r#"{"account_id":1001,"app":"cam.reaction.ReactionCam","data":{"aps":{"alert":"two"}},"device_token":"f00dfeed","environment":"development"}"#,
        "\n",
        r#"{"account_id":1001,"app":"com.example.Unknown","data":{},"device_token":"f00dfeed"}"#,
    );

    let response = router
        .oneshot(
            Request::post("/v1/push")
                .header("content-type", "application/x-ndjson")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let response_body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert!(response_body.is_empty());

    wait_for(|| devices.successes() == 2).await;
    assert_eq!(transport.sent_count(), 2);

    let mut urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            "https://api.development.push.apple.com/3/device/f00dfeed".to_string(),
            "https://api.push.apple.com/3/device/f00dfeed".to_string(),
        ]
    );
}

#[tokio::test]
async fn push_rejects_oversized_body() {
    let transport = FakeTransport::new([]);
    let (_ctx, dispatcher) = relay(
        FakeFactory::new([transport.clone()]),
        RecordingDevices::with_device(&device_key()),
    );
    let config = ApiServerConfig {
        body_limit: 16,
        ..ApiServerConfig::default()
    };
    let router = ApiServer::new(config, AppState::new(dispatcher)).build_router();

    let body = r#"{"account_id":1001,"app":"cam.reaction.ReactionCam","device_token":"f00dfeed"}"#;
    let response = router
        .oneshot(
            Request::post("/v1/push")
                .header("content-length", body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(transport.sent_count(), 0);
}
