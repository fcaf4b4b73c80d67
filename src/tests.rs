//! Router-level tests against in-memory stores.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{app::build_app, state::AppState};

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(app: &Router, email: &str, role: Option<&str>) -> String {
    let mut body = json!({ "name": "A", "email": email, "password": "pw123" });
    if let Some(r) = role {
        body["role"] = json!(r);
    }
    let (status, v) = send(app, Method::POST, "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{v}");
    v["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn root_reports_running() {
    let app = build_app(AppState::fake());
    let res = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"API is running");
}

#[tokio::test]
async fn register_login_me_scenario() {
    let app = build_app(AppState::fake());

    let (status, v) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "A", "email": "a@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(v["token"].is_string());
    assert_eq!(v["user"]["email"], "a@x.com");
    assert_eq!(v["user"]["role"], "employee");

    let (status, v) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "Invalid credentials");

    let (status, unknown) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown, v);

    let (status, v) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = v["token"].as_str().unwrap().to_string();

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "a@x.com");
    assert_eq!(me["name"], "A");
    assert!(me.get("passwordHash").is_none());
    assert!(me.get("resetToken").is_none());

    let (status, _) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_missing_fields_and_duplicates() {
    let app = build_app(AppState::fake());

    let (status, v) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "a@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "Please provide name, email, password");

    register(&app, "a@x.com", None).await;
    let (status, v) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "B", "email": "a@x.com", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "User already exists");

    let token = register(&app, "admin@localhost", None).await;
    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "admin@localhost");
}

#[tokio::test]
async fn manager_listing_is_role_gated() {
    let app = build_app(AppState::fake());
    let employee = register(&app, "e@x.com", None).await;
    let manager = register(&app, "m@x.com", Some("manager")).await;

    let (status, v) = send(&app, Method::GET, "/api/expenses", Some(&employee), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(v["message"], "Forbidden");

    let (status, v) = send(&app, Method::GET, "/api/expenses", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(v.as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, "/api/expenses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/expenses/stats/totals-by-user",
        Some(&employee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expense_submit_approve_and_totals() {
    let app = build_app(AppState::fake());
    let employee = register(&app, "e@x.com", None).await;
    let manager = register(&app, "m@x.com", Some("manager")).await;

    let (status, expense) = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(&employee),
        Some(json!({ "title": "Hotel", "amount": 120.0, "date": "2024-05-03" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expense["status"], "pending");
    let id = expense["id"].as_str().unwrap().to_string();

    let (status, mine) = send(
        &app,
        Method::GET,
        "/api/expenses/me?month=5&year=2024",
        Some(&employee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, mine) = send(
        &app,
        Method::GET,
        "/api/expenses/me?month=&year=",
        Some(&employee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, v) = send(
        &app,
        Method::GET,
        "/api/expenses/me?month=abc&year=2024",
        Some(&employee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "Invalid month");

    let uri = format!("/api/expenses/{id}/decision");
    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        Some(&employee),
        Some(json!({ "decision": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, decided) = send(
        &app,
        Method::POST,
        &uri,
        Some(&manager),
        Some(json!({ "decision": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "approved");

    let (status, totals) = send(
        &app,
        Method::GET,
        "/api/expenses/stats/totals-by-user",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(totals[0]["email"], "e@x.com");
    assert_eq!(totals[0]["totalAmount"], 120.0);
    assert_eq!(totals[0]["count"], 1);

    let (status, v) = send(
        &app,
        Method::POST,
        &format!("/api/expenses/{}/decision", uuid::Uuid::new_v4()),
        Some(&manager),
        Some(json!({ "decision": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["message"], "Expense not found");
}

#[tokio::test]
async fn password_reset_over_http() {
    let app = build_app(AppState::fake());
    register(&app, "a@x.com", None).await;

    let (status, v) = send(
        &app,
        Method::POST,
        "/api/password/forgot",
        None,
        Some(json!({ "email": "nobody@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "No user found with this email");

    let (status, v) = send(
        &app,
        Method::POST,
        "/api/password/forgot",
        None,
        Some(json!({ "email": "a@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["message"], "Reset link generated");
    let link = v["resetLink"].as_str().unwrap();
    let token = link.rsplit_once("token=").unwrap().1.to_string();

    let reset = json!({ "token": token, "newPassword": "fresh" });
    let (status, v) =
        send(&app, Method::POST, "/api/password/reset", None, Some(reset.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["message"], "Password reset successful. Please login.");

    let (status, v) = send(&app, Method::POST, "/api/password/reset", None, Some(reset)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "Invalid or expired token");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "fresh" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
