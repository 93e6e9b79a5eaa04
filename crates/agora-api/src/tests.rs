use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use k256::ecdsa::SigningKey;
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt;

use agora_crypto::{AUTH_MESSAGE, Address, hash_personal_message};
use agora_db::Database;

use crate::auth::AppStateInner;
use crate::router;

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    router(Arc::new(AppStateInner { db }))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register(app: &Router, wallet: &str) {
    let (status, _) = send(app, Method::POST, "/users", Some(json!({ "wallet_address": wallet }))).await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn create_post(app: &Router, wallet: &str, content: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/posts",
        Some(json!({ "walletAddress": wallet, "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

fn sign(key: &SigningKey, message: &str) -> String {
    let (sig, recid) = key.sign_prehash_recoverable(&hash_personal_message(message)).unwrap();
    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recid.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

fn address_of(key: &SigningKey) -> Address {
    Address::from_uncompressed_key(key.verifying_key().to_encoded_point(false).as_bytes()).unwrap()
}

// -- Health --

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// -- Auth --

#[tokio::test]
async fn verify_creates_user_on_valid_signature() {
    let app = app();
    let key = SigningKey::random(&mut OsRng);
    let wallet = address_of(&key).to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/verify",
        Some(json!({
            "message": AUTH_MESSAGE,
            "signedMessage": sign(&key, AUTH_MESSAGE),
            "walletAddress": wallet,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["wallet_address"], wallet);

    let (status, _) = send(&app, Method::GET, &format!("/users/{}", wallet), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn verify_twice_reuses_user() {
    let app = app();
    let key = SigningKey::random(&mut OsRng);
    let wallet = address_of(&key).to_lower_hex();
    let payload = json!({
        "message": AUTH_MESSAGE,
        "signedMessage": sign(&key, AUTH_MESSAGE),
        "walletAddress": wallet,
    });

    send(&app, Method::POST, "/auth/verify", Some(payload.clone())).await;
    send(
        &app,
        Method::PATCH,
        &format!("/users/{}", wallet),
        Some(json!({ "username": "alice" })),
    )
    .await;
    let (_, body) = send(&app, Method::POST, "/auth/verify", Some(payload)).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn verify_rejects_wrong_signer() {
    let app = app();
    let key = SigningKey::random(&mut OsRng);
    let other = SigningKey::random(&mut OsRng);
    let wallet = address_of(&other).to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/verify",
        Some(json!({
            "message": AUTH_MESSAGE,
            "signedMessage": sign(&key, AUTH_MESSAGE),
            "walletAddress": wallet,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid signature");
    assert!(body.get("user").is_none());

    let (status, _) = send(&app, Method::GET, &format!("/users/{}", wallet), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verify_rejects_other_messages_and_garbage() {
    let app = app();
    let key = SigningKey::random(&mut OsRng);
    let wallet = address_of(&key).to_string();

    let (_, body) = send(
        &app,
        Method::POST,
        "/auth/verify",
        Some(json!({
            "message": "something else",
            "signedMessage": sign(&key, "something else"),
            "walletAddress": wallet,
        })),
    )
    .await;
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/verify",
        Some(json!({
            "message": AUTH_MESSAGE,
            "signedMessage": "0xdeadbeef",
            "walletAddress": wallet,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}

// -- Users --

#[tokio::test]
async fn creating_user_twice_fails() {
    let app = app();
    register(&app, "0xabc").await;

    let (status, body) = send(&app, Method::POST, "/users", Some(json!({ "wallet_address": "0xabc" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
async fn blank_wallet_is_rejected() {
    let (status, _) = send(&app(), Method::POST, "/users", Some(json!({ "wallet_address": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_update_round_trip() {
    let app = app();
    register(&app, "0xabc").await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/users/0xabc",
        Some(json!({ "username": "alice", "profile_pic_url": "https://img.example/a.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["bio"], Value::Null);

    let (_, body) = send(&app, Method::PATCH, "/users/0xabc", Some(json!({ "bio": "gm" }))).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["bio"], "gm");
    assert_eq!(body["profile_pic_url"], "https://img.example/a.png");
}

#[tokio::test]
async fn unknown_users_are_not_found() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/users/0xnobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");

    let (status, _) = send(&app, Method::PATCH, "/users/0xnobody", Some(json!({ "bio": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_update_cannot_change_wallet() {
    let app = app();
    register(&app, "0xabc").await;

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/users/0xabc",
        Some(json!({ "wallet_address": "0xdef" })),
    )
    .await;
    assert!(status.is_client_error());
}

// -- Posts --

#[tokio::test]
async fn new_post_is_listed_first() {
    let app = app();
    register(&app, "0xabc").await;

    let older = create_post(&app, "0xabc", "older").await;
    let created = create_post(&app, "0xabc", "hi").await;
    assert!(created["id"].is_string());
    assert!(created["timestamp"].is_string());
    assert_eq!(created["user"]["wallet_address"], "0xabc");
    assert_eq!(created["likes"], json!([]));
    assert_eq!(created["comments"], json!([]));

    let (status, body) = send(&app, Method::GET, "/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    let posts = body.as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["id"], created["id"]);
    assert_eq!(posts[1]["id"], older["id"]);
}

#[tokio::test]
async fn post_requires_registered_author() {
    let (status, body) = send(
        &app(),
        Method::POST,
        "/posts",
        Some(json!({ "walletAddress": "0xnobody", "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn post_content_is_validated() {
    let app = app();
    register(&app, "0xabc").await;

    for content in ["".to_string(), "x".repeat(281)] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({ "walletAddress": "0xabc", "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn get_post_checks_id() {
    let app = app();
    register(&app, "0xabc").await;
    let post = create_post(&app, "0xabc", "hi").await;

    let (status, body) = send(&app, Method::GET, "/posts/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid post ID format");

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(&app, Method::GET, &format!("/posts/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, &format!("/posts/{}", post["id"].as_str().unwrap()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "hi");
}

#[tokio::test]
async fn feed_handles_more_posts_than_one_query_batch() {
    let db = Database::open_in_memory().unwrap();
    db.create_user("0xabc").unwrap();
    let mut first_id = String::new();
    for i in 0..1_200 {
        let id = uuid::Uuid::new_v4().to_string();
        db.insert_post(&id, "0xabc", &format!("post {}", i)).unwrap();
        if i == 0 {
            first_id = id;
        }
    }
    db.insert_comment(&uuid::Uuid::new_v4().to_string(), &first_id, "0xabc", "oldest post").unwrap();
    let app = router(Arc::new(AppStateInner { db }));

    let (status, body) = send(&app, Method::GET, "/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    let posts = body.as_array().unwrap();
    assert_eq!(posts.len(), 1_200);
    assert_eq!(posts[1_199]["id"], first_id.as_str());
    assert_eq!(posts[1_199]["comments"][0]["content"], "oldest post");
    assert_eq!(posts[0]["user"]["wallet_address"], "0xabc");
}

// -- Likes --

#[tokio::test]
async fn like_toggles() {
    let app = app();
    register(&app, "0xabc").await;
    let post = create_post(&app, "0xabc", "hi").await;
    let uri = format!("/posts/{}/like", post["id"].as_str().unwrap());
    let body = json!({ "walletAddress": "0xabc" });

    let (status, like) = send(&app, Method::POST, &uri, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(like["post_id"], post["id"]);
    assert_eq!(like["wallet_address"], "0xabc");

    let (_, listed) = send(&app, Method::GET, "/posts", None).await;
    assert_eq!(listed[0]["likes"].as_array().unwrap().len(), 1);

    let (status, unlike) = send(&app, Method::POST, &uri, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unlike, Value::Null);

    let (_, listed) = send(&app, Method::GET, "/posts", None).await;
    assert_eq!(listed[0]["likes"], json!([]));
}

#[tokio::test]
async fn like_requires_known_post_and_user() {
    let app = app();
    register(&app, "0xabc").await;
    let post = create_post(&app, "0xabc", "hi").await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/posts/{}/like", uuid::Uuid::new_v4()),
        Some(json!({ "walletAddress": "0xabc" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/posts/{}/like", post["id"].as_str().unwrap()),
        Some(json!({ "walletAddress": "0xnobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, "/posts/123/like", Some(json!({ "walletAddress": "0xabc" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Comments --

#[tokio::test]
async fn comment_returns_enriched_post() {
    let app = app();
    register(&app, "0xabc").await;
    register(&app, "0xdef").await;
    send(&app, Method::PATCH, "/users/0xdef", Some(json!({ "username": "bob" }))).await;
    let post = create_post(&app, "0xabc", "hi").await;
    let uri = format!("/posts/{}/comment", post["id"].as_str().unwrap());

    send(&app, Method::POST, &uri, Some(json!({ "walletAddress": "0xabc", "content": "first" }))).await;
    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "walletAddress": "0xdef", "content": "second" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "second");
    assert_eq!(body["wallet_address"], "0xdef");
    assert_eq!(body["post"]["id"], post["id"]);

    let comments = body["post"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "first");
    assert_eq!(comments[1]["id"], body["id"]);
    assert_eq!(comments[1]["commentedBy"]["username"], "bob");
    assert!(comments[0]["timestamp"].as_str() <= comments[1]["timestamp"].as_str());
}

#[tokio::test]
async fn feed_comments_are_in_timestamp_order() {
    let app = app();
    register(&app, "0xabc").await;
    let post = create_post(&app, "0xabc", "hi").await;
    let uri = format!("/posts/{}/comment", post["id"].as_str().unwrap());

    for i in 0..5 {
        let (status, _) = send(
            &app,
            Method::POST,
            &uri,
            Some(json!({ "walletAddress": "0xabc", "content": format!("c{}", i) })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, posts) = send(&app, Method::GET, "/posts", None).await;
    let comments = posts[0]["comments"].as_array().unwrap();
    let contents: Vec<_> = comments.iter().map(|c| c["content"].as_str().unwrap()).collect();
    assert_eq!(contents, ["c0", "c1", "c2", "c3", "c4"]);

    let stamps: Vec<_> = comments
        .iter()
        .map(|c| c["timestamp"].as_str().unwrap().parse::<chrono::DateTime<chrono::Utc>>().unwrap())
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn comment_validation() {
    let app = app();
    register(&app, "0xabc").await;
    let post = create_post(&app, "0xabc", "hi").await;
    let uri = format!("/posts/{}/comment", post["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::POST, &uri, Some(json!({ "walletAddress": "0xnobody", "content": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, &uri, Some(json!({ "walletAddress": "0xabc", "content": "x".repeat(300) }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/posts/{}/comment", uuid::Uuid::new_v4()),
        Some(json!({ "walletAddress": "0xabc", "content": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Deletion --

#[tokio::test]
async fn only_author_can_delete_and_children_go_too() {
    let app = app();
    register(&app, "0xabc").await;
    register(&app, "0xdef").await;
    let post = create_post(&app, "0xabc", "hi").await;
    let id = post["id"].as_str().unwrap();

    send(&app, Method::POST, &format!("/posts/{}/like", id), Some(json!({ "walletAddress": "0xdef" }))).await;
    send(
        &app,
        Method::POST,
        &format!("/posts/{}/comment", id),
        Some(json!({ "walletAddress": "0xdef", "content": "nice" })),
    )
    .await;

    let (status, _) = send(&app, Method::DELETE, &format!("/posts/{}", id), Some(json!({ "walletAddress": "0xdef" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &format!("/posts/{}", id), Some(json!({ "walletAddress": "0xabc" }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/posts/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, posts) = send(&app, Method::GET, "/posts", None).await;
    assert_eq!(posts, json!([]));
}
