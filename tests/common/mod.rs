#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use gatehouse::{
    ServerConfig, create_app, db::Database, jwt::JwtConfig, server_config::ServerSettings,
};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

/// Credentials handed out by /register, /login or /refresh.
#[derive(Debug, Clone)]
pub struct Cookies {
    pub access: String,
    pub refresh: String,
}

impl Cookies {
    pub fn header(&self) -> String {
        format!("accessToken={}; refreshToken={}", self.access, self.refresh)
    }
}

/// Settings for fast tests: minimum bcrypt cost, defaults otherwise.
pub fn test_settings() -> ServerSettings {
    ServerSettings {
        hash_cost: 4,
        ..Default::default()
    }
}

pub async fn test_app() -> TestApp {
    test_app_with(test_settings(), false).await
}

pub async fn test_app_with(settings: ServerSettings, rate_limit: bool) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
        settings,
        rate_limit,
    };
    TestApp {
        app: create_app(&config),
        db,
        jwt: JwtConfig::new(TEST_SECRET),
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn cookie_request(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn credentials_body(email: &str, password: &str) -> serde_json::Value {
    serde_json::json!({ "email": email, "password": password })
}

/// All Set-Cookie header values of a response.
pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value a response sets for the named cookie, if any.
pub fn cookie_value<B>(response: &Response<B>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    set_cookies(response).into_iter().find_map(|c| {
        c.split(';')
            .next()
            .and_then(|pair| pair.strip_prefix(&prefix))
            .map(str::to_string)
    })
}

/// Whether the response clears the named cookie.
pub fn clears_cookie<B>(response: &Response<B>, name: &str) -> bool {
    let prefix = format!("{}=;", name);
    set_cookies(response)
        .iter()
        .any(|c| c.starts_with(&prefix) && c.contains("Max-Age=0"))
}

pub fn session_from<B>(response: &Response<B>) -> Cookies {
    Cookies {
        access: cookie_value(response, "accessToken").expect("missing accessToken cookie"),
        refresh: cookie_value(response, "refreshToken").expect("missing refreshToken cookie"),
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Register a user and return (user id, cookies).
pub async fn register(app: &Router, email: &str) -> (String, Cookies) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/register",
            credentials_body(email, PASSWORD),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookies = session_from(&response);
    let json = body_json(response).await;
    (json["user"]["id"].as_str().unwrap().to_string(), cookies)
}

pub async fn login(app: &Router, email: &str) -> Cookies {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            credentials_body(email, PASSWORD),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    session_from(&response)
}

pub async fn refresh(app: &Router, refresh_value: &str) -> Response<Body> {
    app.clone()
        .oneshot(cookie_request(
            "POST",
            "/refresh",
            &format!("refreshToken={}", refresh_value),
        ))
        .await
        .unwrap()
}

pub async fn get_me(app: &Router, access: &str) -> Response<Body> {
    app.clone()
        .oneshot(cookie_request(
            "GET",
            "/me",
            &format!("accessToken={}", access),
        ))
        .await
        .unwrap()
}
