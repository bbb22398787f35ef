//! Access token validation on protected routes.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{TEST_SECRET, body_json, get_me, refresh, register, session_from, test_app};
use gatehouse::jwt::{AccessClaims, unix_now};
use jsonwebtoken::{EncodingKey, Header};
use tower::ServiceExt;

fn sign(claims: &AccessClaims, secret: &[u8]) -> String {
    jsonwebtoken::encode(&Header::default(), claims, &EncodingKey::from_secret(secret)).unwrap()
}

fn expired_claims(sub: &str) -> AccessClaims {
    let now = unix_now();
    AccessClaims {
        sub: sub.to_string(),
        roles: vec!["user".to_string()],
        iat: now - 120,
        exp: now - 60,
    }
}

#[tokio::test]
async fn test_me_returns_identity() {
    let t = test_app().await;
    let (user_id, cookies) = register(&t.app, "alice@example.com").await;

    let response = get_me(&t.app, &cookies.access).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["id"], user_id.as_str());
    assert_eq!(json["roles"], serde_json::json!(["user"]));
}

#[tokio::test]
async fn test_me_without_credential() {
    let t = test_app().await;

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    assert_eq!(body_json(response).await["code"], "missing_credential");
}

#[tokio::test]
async fn test_me_with_tampered_token() {
    let t = test_app().await;
    let (user_id, cookies) = register(&t.app, "alice@example.com").await;

    // Same header and signature, payload claiming the admin role
    let forged_payload = sign(
        &AccessClaims {
            sub: user_id,
            roles: vec!["admin".to_string()],
            iat: unix_now(),
            exp: unix_now() + 300,
        },
        b"attacker-secret",
    );
    let mut parts: Vec<&str> = cookies.access.split('.').collect();
    parts[1] = forged_payload.split('.').nth(1).unwrap();
    let tampered = parts.join(".");

    let response = get_me(&t.app, &tampered).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        r#"Bearer error="invalid_token""#
    );
    assert_eq!(body_json(response).await["code"], "invalid_token");
}

#[tokio::test]
async fn test_me_with_garbage_token() {
    let t = test_app().await;

    let response = get_me(&t.app, "not.a.jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "invalid_token");
}

#[tokio::test]
async fn test_expired_token_is_signalled() {
    let t = test_app().await;
    let (user_id, _) = register(&t.app, "alice@example.com").await;

    let response = get_me(&t.app, &sign(&expired_claims(&user_id), TEST_SECRET)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        r#"Bearer error="invalid_token", error_description="token_expired""#
    );
    assert_eq!(body_json(response).await["code"], "token_expired");
}

#[tokio::test]
async fn test_expired_token_with_wrong_signature_is_invalid() {
    let t = test_app().await;

    let response = get_me(&t.app, &sign(&expired_claims("someone"), b"other-secret")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "invalid_token");
}

#[tokio::test]
async fn test_bearer_header_accepted() {
    let t = test_app().await;
    let (user_id, cookies) = register(&t.app, "alice@example.com").await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", cookies.access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], user_id.as_str());
}

#[tokio::test]
async fn test_unauthenticated_me_does_not_clear_cookies() {
    let t = test_app().await;

    let response = get_me(&t.app, "garbage").await;
    assert!(common::set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_register_refresh_me_end_to_end() {
    let t = test_app().await;
    let (user_id, cookies) = register(&t.app, "alice@example.com").await;

    // Client notices an expired access token, refreshes, retries
    let expired = sign(&expired_claims(&user_id), TEST_SECRET);
    let response = get_me(&t.app, &expired).await;
    assert_eq!(body_json(response).await["code"], "token_expired");

    let response = refresh(&t.app, &cookies.refresh).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = session_from(&response);

    let response = get_me(&t.app, &rotated.access).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], user_id.as_str());

    // And the rotated refresh token works exactly once more
    assert_eq!(
        refresh(&t.app, &rotated.refresh).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        refresh(&t.app, &rotated.refresh).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_cookies_split_across_headers() {
    let t = test_app().await;
    let (user_id, cookies) = register(&t.app, "alice@example.com").await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(header::COOKIE, "theme=dark")
                .header(header::COOKIE, format!("accessToken={}", cookies.access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], user_id.as_str());
}
