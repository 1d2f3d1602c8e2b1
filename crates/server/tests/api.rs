use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::TimeDelta;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::Database;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

use engine::{Argon2Hasher, Argon2Settings, AuthManager, AuthSettings, Engine};
use migration::MigratorTrait;
use server::ServerState;

async fn state() -> ServerState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    let hasher = Argon2Hasher::new(Argon2Settings {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    let auth = AuthManager::new(
        engine.clone(),
        hasher,
        &AuthSettings {
            secret: "test-secret".to_string(),
            token_ttl: TimeDelta::minutes(60),
        },
    )
    .unwrap();

    ServerState {
        engine: Arc::new(engine),
        auth: Arc::new(auth),
        large_expense_threshold: Decimal::new(500, 0),
    }
}

async fn app() -> Router {
    server::router(state().await)
}

struct Reply {
    status: StatusCode,
    www_authenticate: Option<String>,
    body: Value,
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let www_authenticate = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        www_authenticate,
        body,
    }
}

async fn register_and_login(app: &Router, username: &str, password: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["token_type"], "bearer");
    reply.body["access_token"].as_str().unwrap().to_string()
}

async fn create_category(app: &Router, token: &str, name: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/categories",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn root_and_health_are_public() {
    let app = app().await;

    let reply = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["message"].as_str().unwrap().contains("/health"));

    let reply = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["app"], "expense-tracker");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "wonderland").await;

    let reply = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["username"], "alice");
    assert!(reply.body["id"].is_string());
    assert!(reply.body["created_at"].is_string());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app().await;
    register_and_login(&app, "alice", "pw").await;

    let reply = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "other" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert!(reply.body["error"].as_str().unwrap().contains("alice"));
}

#[tokio::test]
async fn bad_credentials_and_missing_tokens_are_unauthorized() {
    let app = app().await;
    register_and_login(&app, "alice", "pw").await;

    let reply = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "nope" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.www_authenticate.as_deref(), Some("Bearer"));

    let reply = send(&app, Method::GET, "/api/stats/summary", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.www_authenticate.as_deref(), Some("Bearer"));

    let reply = send(&app, Method::GET, "/auth/me", Some("garbage"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_logs_out_old_tokens() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "old-pw").await;

    let reply = send(
        &app,
        Method::POST,
        "/auth/change-password",
        Some(&token),
        Some(json!({ "current_password": "wrong", "new_password": "new-pw" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(
        &app,
        Method::POST,
        "/auth/change-password",
        Some(&token),
        Some(json!({ "current_password": "old-pw", "new_password": "new-pw" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "password-updated");

    let reply = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "new-pw" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn change_username_returns_a_fresh_token() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "pw").await;
    register_and_login(&app, "bob", "pw").await;

    let reply = send(
        &app,
        Method::POST,
        "/auth/change-username",
        Some(&token),
        Some(json!({ "new_username": "bob" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(
        &app,
        Method::POST,
        "/auth/change-username",
        Some(&token),
        Some(json!({ "new_username": "alicia" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "username-updated");
    assert_eq!(reply.body["token_type"], "bearer");
    let fresh = reply.body["access_token"].as_str().unwrap().to_string();

    let reply = send(&app, Method::GET, "/auth/me", Some(&fresh), None).await;
    assert_eq!(reply.body["username"], "alicia");

    let reply = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn categories_lifecycle() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "pw").await;

    let food = create_category(&app, &token, "Food").await;
    let reply = send(
        &app,
        Method::POST,
        "/api/categories",
        Some(&token),
        Some(json!({ "name": "FOOD" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(
        &app,
        Method::PATCH,
        &format!("/api/categories/{food}"),
        Some(&token),
        Some(json!({ "name": "Food & Dining" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["name"], "Food & Dining");

    let reply = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(&token),
        Some(json!({
            "name": "Lunch",
            "amount": 12.5,
            "date": "2025-03-01",
            "category_id": food,
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let lunch = reply.body["id"].as_str().unwrap().to_string();

    let reply = send(
        &app,
        Method::DELETE,
        &format!("/api/categories/{food}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(
        &app,
        Method::DELETE,
        &format!("/api/expenses/{lunch}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = send(
        &app,
        Method::DELETE,
        &format!("/api/categories/{food}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = send(&app, Method::GET, "/api/categories", Some(&token), None).await;
    assert_eq!(reply.body, json!([]));

    let reply = send(
        &app,
        Method::DELETE,
        &format!("/api/categories/{food}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_matches_stored_amounts() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "pw").await;
    let bills = create_category(&app, &token, "Bills").await;

    let reply = send(
        &app,
        Method::POST,
        "/api/income",
        Some(&token),
        Some(json!({ "name": "Salary", "amount": 1000, "date": "2025-01-01" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["type"], "income");
    assert!(reply.body.get("flags").is_none());

    for (name, amount) in [("Rent", json!(250)), ("Phone", json!(90.5))] {
        let reply = send(
            &app,
            Method::POST,
            "/api/expenses",
            Some(&token),
            Some(json!({
                "name": name,
                "amount": amount,
                "date": "2025-01-02",
                "category_id": bills,
            })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let reply = send(&app, Method::GET, "/api/stats/summary", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["income_total"].as_f64(), Some(1000.0));
    assert_eq!(reply.body["expense_total"].as_f64(), Some(340.5));
    assert_eq!(reply.body["total_expenses"].as_f64(), Some(340.5));
    assert_eq!(reply.body["balance"].as_f64(), Some(659.5));

    // Another user starts from zero.
    let other = register_and_login(&app, "bob", "pw").await;
    let reply = send(&app, Method::GET, "/api/stats/summary", Some(&other), None).await;
    assert_eq!(reply.body["balance"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn expenses_carry_flags() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "pw").await;
    let travel = create_category(&app, &token, "Travel").await;

    send(
        &app,
        Method::POST,
        "/api/income",
        Some(&token),
        Some(json!({ "name": "Salary", "amount": 100, "date": "2025-01-01" })),
    )
    .await;

    let reply = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(&token),
        Some(json!({
            "name": "Flight",
            "amount": 600,
            "date": "2025-01-02",
            "category_id": travel,
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["flags"], json!(["exceeds_balance", "large_expense"]));

    let reply = send(&app, Method::GET, "/api/expenses", Some(&token), None).await;
    assert_eq!(reply.body.as_array().unwrap().len(), 1);
    assert_eq!(reply.body[0]["flags"], json!(["exceeds_balance", "large_expense"]));
}

#[tokio::test]
async fn expense_within_balance_is_only_large() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "pw").await;
    let travel = create_category(&app, &token, "Travel").await;

    send(
        &app,
        Method::POST,
        "/api/income",
        Some(&token),
        Some(json!({ "name": "Salary", "amount": 1000, "date": "2025-01-01" })),
    )
    .await;

    let reply = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(&token),
        Some(json!({
            "name": "Flight",
            "amount": 600,
            "date": "2025-01-02",
            "category_id": travel,
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["flags"], json!(["large_expense"]));
    let id = reply.body["id"].as_str().unwrap().to_string();

    let reply = send(
        &app,
        Method::GET,
        &format!("/api/expenses/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.body["flags"], json!(["large_expense"]));

    let reply = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(&token),
        Some(json!({
            "name": "Hotel",
            "amount": 450,
            "date": "2025-01-03",
            "category_id": travel,
        })),
    )
    .await;
    assert_eq!(reply.body["flags"], json!(["exceeds_balance"]));
}

#[tokio::test]
async fn note_only_patch_keeps_the_rest() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "pw").await;

    let reply = send(
        &app,
        Method::POST,
        "/api/income",
        Some(&token),
        Some(json!({
            "name": "Salary",
            "amount": 1200.75,
            "date": "2025-02-28",
            "note": "february",
        })),
    )
    .await;
    let id = reply.body["id"].as_str().unwrap().to_string();

    let reply = send(
        &app,
        Method::PATCH,
        &format!("/api/income/{id}"),
        Some(&token),
        Some(json!({ "note": "paid late" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["note"], "paid late");
    assert_eq!(reply.body["name"], "Salary");
    assert_eq!(reply.body["amount"].as_f64(), Some(1200.75));
    assert_eq!(reply.body["date"], "2025-02-28");

    let reply = send(
        &app,
        Method::PATCH,
        &format!("/api/income/{id}"),
        Some(&token),
        Some(json!({ "note": null })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["note"], Value::Null);

    let reply = send(
        &app,
        Method::GET,
        &format!("/api/income/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.body["note"], Value::Null);
    assert_eq!(reply.body["name"], "Salary");
}

#[tokio::test]
async fn transactions_query_filters() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "pw").await;
    let food = create_category(&app, &token, "Food").await;

    for (name, date) in [("Salary", "2025-01-01"), ("Bonus", "2025-01-31")] {
        send(
            &app,
            Method::POST,
            "/api/income",
            Some(&token),
            Some(json!({ "name": name, "amount": 100, "date": date })),
        )
        .await;
    }
    for (name, date, note) in [
        ("Rent", "2025-01-05", "apartment rent"),
        ("Groceries", "2025-01-20", "food shopping"),
    ] {
        send(
            &app,
            Method::POST,
            "/api/expenses",
            Some(&token),
            Some(json!({
                "name": name,
                "amount": 10,
                "date": date,
                "note": note,
                "category_id": food,
            })),
        )
        .await;
    }

    let names = |body: &Value| -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|tx| tx["name"].as_str().unwrap().to_string())
            .collect()
    };

    let reply = send(&app, Method::GET, "/api/transactions", Some(&token), None).await;
    assert_eq!(names(&reply.body), vec!["Bonus", "Groceries", "Rent", "Salary"]);

    let reply = send(
        &app,
        Method::GET,
        "/api/transactions?type=expense&from=2025-01-05&to=2025-01-20",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(names(&reply.body), vec!["Groceries", "Rent"]);

    let reply = send(
        &app,
        Method::GET,
        "/api/transactions?q=RENT",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(names(&reply.body), vec!["Rent"]);

    let reply = send(
        &app,
        Method::GET,
        "/api/transactions?from=05-01-2025",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);

    let reply = send(&app, Method::GET, "/api/income", Some(&token), None).await;
    assert_eq!(names(&reply.body), vec!["Bonus", "Salary"]);
}

#[tokio::test]
async fn invalid_input_and_missing_records() {
    let app = app().await;
    let token = register_and_login(&app, "alice", "pw").await;
    let missing = uuid::Uuid::new_v4();

    let reply = send(
        &app,
        Method::POST,
        "/api/income",
        Some(&token),
        Some(json!({ "name": "Salary", "amount": -3, "date": "2025-01-01" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);

    let reply = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(&token),
        Some(json!({
            "name": "Lunch",
            "amount": 10,
            "date": "2025-01-01",
            "category_id": missing,
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        reply.body["error"]
            .as_str()
            .unwrap()
            .contains("Category not found")
    );

    let reply = send(
        &app,
        Method::PATCH,
        &format!("/api/income/{missing}"),
        Some(&token),
        Some(json!({ "name": "x" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = send(
        &app,
        Method::DELETE,
        &format!("/api/expenses/{missing}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn spawned_server_answers_over_tcp() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = server::spawn_with_listener(state().await, listener).unwrap();

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("\"status\":\"ok\""));
}
