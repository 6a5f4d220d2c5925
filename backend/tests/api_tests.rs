//! HTTP API tests driven through the router

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use butcher_backend::create_app;
use common::TestContext;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        post(
            "/api/v1/auth/login",
            None,
            json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new().await;
    let app = create_app(ctx.state());
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let ctx = TestContext::new().await;
    let app = create_app(ctx.state());

    let request = Request::builder()
        .uri("/api/v1/products")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, get("/api/v1/products", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_login_is_unauthorized() {
    let ctx = TestContext::new().await;
    let app = create_app(ctx.state());
    let (status, body) = send(
        &app,
        post(
            "/api/v1/auth/login",
            None,
            json!({ "username": "admin", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_checkout_flow_over_http() {
    let ctx = TestContext::new().await;
    let app = create_app(ctx.state());
    let token = login(&app, "admin", "admin123").await;

    let (status, product) = send(
        &app,
        post(
            "/api/v1/products",
            Some(&token),
            json!({ "code": "RIB", "name": "Rib", "price_per_kg": "1500" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    let product_id = product["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        post(
            &format!("/api/v1/products/{}/stock", product_id),
            Some(&token),
            json!({ "weight": "10", "direction": "increase" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, receipt) = send(
        &app,
        post(
            "/api/v1/sales",
            Some(&token),
            json!({
                "shift_label": "morning",
                "payment_method": "cash",
                "items": [{ "product_id": product_id, "weight": "3" }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["ticket_number"], 1);
    assert_eq!(receipt["total"], "4500.00");

    let (status, product) = send(
        &app,
        get(&format!("/api/v1/products/{}", product_id), &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["stock"], "7.000");

    let (status, error) = send(
        &app,
        post(
            "/api/v1/sales",
            Some(&token),
            json!({
                "shift_label": "morning",
                "payment_method": "cash",
                "items": [{ "product_id": product_id, "weight": "8" }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"]["code"], "INSUFFICIENT_STOCK");

    let (status, sale) = send(&app, get("/api/v1/sales/1", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_oversized_weight_in_body_is_rejected() {
    let ctx = TestContext::new().await;
    let rib = ctx.product("RIB", "Rib", "1500", "10").await;
    let app = create_app(ctx.state());
    let token = login(&app, "admin", "admin123").await;

    let (status, _) = send(
        &app,
        post(
            "/api/v1/sales",
            Some(&token),
            json!({
                "shift_label": "morning",
                "payment_method": "cash",
                "items": [{ "product_id": rib.id, "weight": "79228162514264337593543950335" }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        post(
            &format!("/api/v1/products/{}/stock", rib.id),
            Some(&token),
            json!({ "weight": "79228162514264337593543950335", "direction": "increase" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // The router keeps serving afterwards
    let (status, product) = send(&app, get(&format!("/api/v1/products/{}", rib.id), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["stock"], "10.000");
}

#[tokio::test]
async fn test_employee_cannot_use_admin_endpoints() {
    let ctx = TestContext::new().await;
    let app = create_app(ctx.state());
    let admin = login(&app, "admin", "admin123").await;

    let (status, _) = send(
        &app,
        post(
            "/api/v1/users",
            Some(&admin),
            json!({ "username": "clerk", "password": "counter1", "access_level": "employee" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let clerk = login(&app, "clerk", "counter1").await;

    let (status, body) = send(
        &app,
        post("/api/v1/sales/1/cancel", Some(&clerk), json!({ "reason": "oops" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = send(&app, get("/api/v1/activity", &clerk)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, get("/api/v1/users", &clerk)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Everyday counter work stays open to employees
    let (status, _) = send(&app, get("/api/v1/products/low-stock", &clerk)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deactivated_account_token_stops_working() {
    let ctx = TestContext::new().await;
    let app = create_app(ctx.state());
    let admin = login(&app, "admin", "admin123").await;

    let (_, clerk_user) = send(
        &app,
        post(
            "/api/v1/users",
            Some(&admin),
            json!({ "username": "clerk", "password": "counter1", "access_level": "employee" }),
        ),
    )
    .await;
    let clerk = login(&app, "clerk", "counter1").await;

    let (status, _) = send(
        &app,
        post(
            &format!("/api/v1/users/{}/deactivate", clerk_user["id"]),
            Some(&admin),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/api/v1/products", &clerk)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_shift_open_close_over_http() {
    let ctx = TestContext::new().await;
    let app = create_app(ctx.state());
    let token = login(&app, "admin", "admin123").await;

    let (status, shift) = send(
        &app,
        post(
            "/api/v1/shifts",
            Some(&token),
            json!({ "label": "morning", "starting_cash": "1000" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{shift}");
    let shift_id = shift["id"].as_i64().unwrap();

    let (status, current) = send(&app, get("/api/v1/shifts/current", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["id"].as_i64(), Some(shift_id));

    let (status, _) = send(
        &app,
        post(
            "/api/v1/shifts",
            Some(&token),
            json!({ "label": "afternoon", "starting_cash": "0" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, report) = send(
        &app,
        post(
            &format!("/api/v1/shifts/{}/close", shift_id),
            Some(&token),
            json!({ "counted_cash": "990" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["variance"], "-10.00");

    let (status, current) = send(&app, get("/api/v1/shifts/current", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(current.is_null());
}

#[tokio::test]
async fn test_reports_over_http() {
    let ctx = TestContext::new().await;
    let app = create_app(ctx.state());
    let token = login(&app, "admin", "admin123").await;

    let (status, summary) = send(&app, get("/api/v1/reports/revenue?period=today", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary[0]["sale_count"], 0);

    let (status, _) = send(&app, get("/api/v1/reports/revenue?period=decade", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        get("/api/v1/reports/top-products?by=weight&limit=5", &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(
            "/api/v1/reports/operators?start_date=2024-01-01&end_date=2024-01-31&format=csv",
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv"
    );
}

#[tokio::test]
async fn test_admin_backup_over_http() {
    let ctx = TestContext::new().await;
    let app = create_app(ctx.state());
    let token = login(&app, "admin", "admin123").await;

    let (status, body) = send(&app, post("/api/v1/admin/backup", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let path = body["path"].as_str().unwrap();
    assert!(std::path::Path::new(path).exists());
}
