use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use tower::ServiceExt;
use voxroom_server::{app, config::Config, AppState};
use voxroom_voice::RelayConfig;

const API_KEY: &str = "devkey";
const API_SECRET: &str = "devsecret";

#[derive(Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    nbf: u64,
    exp: u64,
    video: VideoClaims,
}

#[derive(Deserialize)]
struct VideoClaims {
    room: String,
    #[serde(rename = "roomJoin")]
    room_join: bool,
    #[serde(rename = "canPublish")]
    can_publish: bool,
    #[serde(rename = "canPublishData")]
    can_publish_data: bool,
}

fn test_app(api_secret: &str) -> axum::Router {
    let config = Config {
        relay: RelayConfig::new("ws://localhost:7880", API_KEY, api_secret),
        ..Config::default()
    };
    app(AppState::from_config(&config))
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn decode_claims(token: &str) -> Claims {
    let validation = Validation::new(Algorithm::HS256);
    let key = DecodingKey::from_secret(API_SECRET.as_bytes());
    decode::<Claims>(token, &key, &validation)
        .expect("token should verify with the API secret")
        .claims
}

#[tokio::test]
async fn test_get_token_for_identity_and_room() {
    let (status, json) = get_json(test_app(API_SECRET), "/getToken?identity=alice&room=demo").await;

    assert_eq!(status, StatusCode::OK);
    let claims = decode_claims(json["token"].as_str().expect("token string"));
    assert_eq!(claims.iss, API_KEY);
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.video.room, "demo");
    assert_eq!(claims.exp - claims.nbf, 3600);
    assert!(claims.video.room_join, "roomJoin should be true");
    assert!(claims.video.can_publish, "canPublish should be true");
    assert!(claims.video.can_publish_data, "canPublishData should be true");
}

#[tokio::test]
async fn test_get_token_applies_defaults() {
    let (status, json) = get_json(test_app(API_SECRET), "/getToken").await;
    assert_eq!(status, StatusCode::OK);
    let claims = decode_claims(json["token"].as_str().unwrap());
    assert_eq!(claims.sub, "flutter-user");
    assert_eq!(claims.video.room, "test-room");

    let (_, json) = get_json(test_app(API_SECRET), "/getToken?identity=&room=lobby").await;
    let claims = decode_claims(json["token"].as_str().unwrap());
    assert_eq!(claims.sub, "flutter-user");
    assert_eq!(claims.video.room, "lobby");
}

#[tokio::test]
async fn test_get_token_without_secret_is_generic_500() {
    let (status, json) = get_json(test_app(""), "/getToken?identity=alice&room=demo").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, serde_json::json!({ "error": "Failed to generate token" }));
}

#[tokio::test]
async fn test_get_token_with_oversized_ttl_is_generic_500() {
    let mut config = Config {
        relay: RelayConfig::new("ws://localhost:7880", API_KEY, API_SECRET),
        ..Config::default()
    };
    config.relay.token_ttl_seconds = u64::MAX;
    let app = app(AppState::from_config(&config));

    let (status, json) = get_json(app, "/getToken?identity=alice&room=demo").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, serde_json::json!({ "error": "Failed to generate token" }));
}

#[tokio::test]
async fn test_health_check_returns_ok() {
    let (status, json) = get_json(test_app(API_SECRET), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
