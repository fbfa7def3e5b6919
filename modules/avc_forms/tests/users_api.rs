//! User endpoints and HTTP Basic authentication over the real router.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{basic, TestApp, PASSWORD};

#[tokio::test]
async fn users_are_listed_newest_first() {
    let app = TestApp::new().await;
    app.seed_user("first", false, &[]).await;
    app.seed_user("second", false, &[]).await;
    app.seed_user("third", false, &[]).await;

    let (status, list) = app.send(Method::GET, "/users", Some("first"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 3);

    let names: Vec<&str> = list["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn huge_user_offset_is_clamped() {
    let app = TestApp::new().await;
    app.seed_user("first", false, &[]).await;

    let (status, list) = app
        .send(
            Method::GET,
            "/users?offset=18446744073709551615",
            Some("first"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);
    assert!(list["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn user_payloads_never_carry_passwords() {
    let app = TestApp::new().await;
    let alice = app.seed_user("alice", false, &["add_patient"]).await;

    let (status, user) = app
        .send(Method::GET, &format!("/users/{}", alice.id), Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "alice");
    assert_eq!(user["permissions"], json!(["add_patient"]));
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());
    // the request itself authenticated alice
    assert!(user["last_login"].is_string());
}

#[tokio::test]
async fn missing_or_bad_credentials_get_a_challenge() {
    let app = TestApp::new().await;
    app.seed_user("alice", false, &[]).await;

    for auth in [None, Some(basic("alice", "wrong-password")), Some(basic("ghost", PASSWORD))] {
        let mut builder = Request::builder().uri("/users");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let resp = app
            .router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            r#"Basic realm="avc_forms""#
        );
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }
}

#[tokio::test]
async fn inactive_users_cannot_authenticate() {
    let app = TestApp::new().await;
    app.seed_user("admin", false, &[]).await;
    let bob = app.seed_user("bob", false, &[]).await;

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/users/{}", bob.id),
            Some("admin"),
            Some(json!({"is_active": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, problem) = app.send(Method::GET, "/users", Some("bob"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(problem["code"], "AVC_UNAUTHENTICATED");
}

#[tokio::test]
async fn create_update_and_delete_user() {
    let app = TestApp::new().await;
    app.seed_user("admin", false, &[]).await;

    let (status, created) = app
        .send(
            Method::POST,
            "/users",
            Some("admin"),
            Some(json!({
                "username": "nurse",
                "password": "another-long-one",
                "email": "nurse@clinic.org",
                "is_superuser": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["email"], "nurse@clinic.org");
    // privilege flags are not writable over HTTP
    assert_eq!(created["is_superuser"], false);

    let uri = format!("/users/{}", created["id"].as_str().unwrap());

    let (status, replaced) = app
        .send(
            Method::PUT,
            &uri,
            Some("admin"),
            Some(json!({"username": "head-nurse", "first_name": "Ada"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["username"], "head-nurse");
    assert_eq!(replaced["first_name"], "Ada");
    assert_eq!(replaced["email"], "nurse@clinic.org");

    // the new password works
    let (status, _) = app
        .send(
            Method::PATCH,
            &uri,
            Some("admin"),
            Some(json!({"password": "rotated-secret"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users")
                .header(header::AUTHORIZATION, basic("head-nurse", "rotated-secret"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = app.send(Method::DELETE, &uri, Some("admin"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, problem) = app.send(Method::GET, &uri, Some("admin"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], "AVC_USER_NOT_FOUND");
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = TestApp::new().await;
    app.seed_user("admin", false, &[]).await;
    let bob = app.seed_user("bob", false, &[]).await;

    let (status, problem) = app
        .send(
            Method::POST,
            "/users",
            Some("admin"),
            Some(json!({"username": "bob", "password": "long-enough-pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "AVC_USERNAME_CONFLICT");

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/users/{}", bob.id),
            Some("admin"),
            Some(json!({"username": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // renaming to the current name is not a conflict
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/users/{}", bob.id),
            Some("admin"),
            Some(json!({"username": "bob"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn user_validation_errors() {
    let app = TestApp::new().await;
    app.seed_user("admin", false, &[]).await;

    for (payload, pointer) in [
        (json!({"username": "has space", "password": "long-enough-pw"}), "/username"),
        (json!({"username": "ok", "password": "short"}), "/password"),
        (
            json!({"username": "ok", "password": "long-enough-pw", "email": "nope"}),
            "/email",
        ),
    ] {
        let (status, problem) = app
            .send(Method::POST, "/users", Some("admin"), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["errors"][0]["pointer"], pointer);
    }
}

#[tokio::test]
async fn deleting_owner_clears_patient_owner() {
    let app = TestApp::new().await;
    app.seed_user("alice", false, &["add_patient"]).await;
    let carer = app.seed_user("carer", false, &[]).await;

    let (status, patient) = app
        .send(
            Method::POST,
            "/patients",
            Some("alice"),
            Some(json!({"code": "A-1", "owner": carer.id})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let patient_uri = format!("/patients/{}", patient["id"].as_str().unwrap());

    let (status, _) = app
        .send(Method::DELETE, &format!("/users/{}", carer.id), Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, after) = app.send(Method::GET, &patient_uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["owner"], Value::Null);
    assert_eq!(after["code"], "A-1");
}

#[tokio::test]
async fn deleting_patient_author_is_refused() {
    let app = TestApp::new().await;
    app.seed_user("admin", false, &[]).await;
    let alice = app.seed_user("alice", false, &["add_patient"]).await;

    let (status, _) = app
        .send(Method::POST, "/patients", Some("alice"), Some(json!({"code": "A-1"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, problem) = app
        .send(Method::DELETE, &format!("/users/{}", alice.id), Some("admin"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "AVC_USER_IN_USE");

    let (status, _) = app.send(Method::GET, "/patients", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
}
