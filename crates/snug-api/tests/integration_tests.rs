//! # Integration Tests for snug-api
//!
//! Drives the assembled router against the in-memory backend: health
//! probes, caller identity, the service token, the company and ledger
//! lifecycle, uniform access refusals, billing records, role changes,
//! and OpenAPI spec generation.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use snug_api::state::{AppConfig, AppState};
use snug_core::{NewUser, UserId};

/// Helper: register a user directly through the identity store.
async fn register(state: &AppState, email: &str) -> UserId {
    state
        .identity
        .register(NewUser::new(email, "argon2-hash", None).unwrap())
        .await
        .unwrap()
        .id
}

/// Helper: a fresh in-memory app with two registered users.
async fn test_app() -> (axum::Router, UserId, UserId) {
    let state = AppState::new();
    let owner = register(&state, "owner@acme.se").await;
    let stranger = register(&state, "stranger@example.se").await;
    (snug_api::app(state), owner, stranger)
}

/// Helper: send a request as `user` and decode the JSON body (`Null` if empty).
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<UserId>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user.get().to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

/// Helper: create a company as `user` and return its id.
async fn create_company(app: &axum::Router, user: UserId, name: &str, org: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/v1/companies",
        Some(user),
        Some(json!({ "name": name, "organization_number": org })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["company_id"].as_i64().unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_health_probes() {
    let (app, _, _) = test_app().await;
    let (status, body) = send(&app, "GET", "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (status, body) = send(&app, "GET", "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ready".into()));
}

// -- Caller Identity ----------------------------------------------------------

#[tokio::test]
async fn test_missing_or_unknown_caller_is_unauthorized() {
    let (app, _, _) = test_app().await;
    let (status, body) = send(&app, "GET", "/v1/companies", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, "GET", "/v1/companies", Some(UserId::new(9999)), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/v1/users/me")
        .header("X-User-Id", "not-a-number")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_me_hides_credential_hash() {
    let (app, owner, _) = test_app().await;
    let (status, body) = send(&app, "GET", "/v1/users/me", Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], owner.get());
    assert_eq!(body["email"], "owner@acme.se");
    assert_eq!(body["role"], "user");
    assert!(body.get("credential_hash").is_none());
}

// -- Service Token ------------------------------------------------------------

#[tokio::test]
async fn test_service_token_required_when_configured() {
    let config = AppConfig {
        auth_token: Some("svc-token".to_string()),
        ..AppConfig::default()
    };
    let state = AppState::with_config(config, snug_state::Backend::memory());
    let user = register(&state, "a@acme.se").await;
    let app = snug_api::app(state);

    let (status, _) = send(&app, "GET", "/v1/users/me", Some(user), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/v1/users/me")
        .header("Authorization", "Bearer svc-token")
        .header("X-User-Id", user.get().to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Health probes stay open.
    let (status, _) = send(&app, "GET", "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

// -- Companies & Ledger State -------------------------------------------------

#[tokio::test]
async fn test_company_and_ledger_lifecycle() {
    let (app, owner, _) = test_app().await;
    let id = create_company(&app, owner, "Acme AB", "556677-8899").await;

    let (status, body) = send(&app, "GET", "/v1/companies", Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Acme AB");

    let (status, body) = send(&app, "GET", &format!("/v1/companies/{id}/members"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["role"], "OWNER");
    assert_eq!(body[0]["status"], "ACTIVE");

    // Never written: empty snapshot, not an error.
    let uri = format!("/v1/companies/{id}/ledger-state");
    let (status, body) = send(&app, "GET", &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["content"].is_null());
    assert!(body["version"].is_null());

    let (status, body) = send(&app, "PUT", &uri, Some(owner), Some(json!({ "content": "{\"v\":1}" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 1);

    let (_, body) = send(&app, "PUT", &uri, Some(owner), Some(json!({ "content": "{\"v\":2}" }))).await;
    assert_eq!(body["version"], 2);

    let (_, body) = send(&app, "GET", &uri, Some(owner), None).await;
    assert_eq!(body["content"], "{\"v\":2}");
    assert_eq!(body["version"], 2);
    assert_eq!(body["updated_by"], owner.get());

    let (status, body) = send(&app, "DELETE", &format!("/v1/companies/{id}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, _) = send(&app, "GET", &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, "GET", "/v1/companies", Some(owner), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stranger_is_refused_uniformly() {
    let (app, owner, stranger) = test_app().await;
    let id = create_company(&app, owner, "Acme AB", "556677-8899").await;
    let uri = format!("/v1/companies/{id}/ledger-state");
    send(&app, "PUT", &uri, Some(owner), Some(json!({ "content": "secret" }))).await;

    let (read_status, read_body) = send(&app, "GET", &uri, Some(stranger), None).await;
    let (write_status, write_body) =
        send(&app, "PUT", &uri, Some(stranger), Some(json!({ "content": "overwrite" }))).await;
    let (delete_status, delete_body) = send(&app, "DELETE", &format!("/v1/companies/{id}"), Some(stranger), None).await;

    for status in [read_status, write_status, delete_status] {
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
    assert_eq!(read_body, write_body);
    assert_eq!(read_body, delete_body);
    assert_eq!(read_body["error"]["code"], "ACCESS_DENIED");

    // Nothing leaked or changed.
    let (_, body) = send(&app, "GET", &uri, Some(owner), None).await;
    assert_eq!(body["content"], "secret");
    assert_eq!(body["version"], 1);
}

#[tokio::test]
async fn test_unknown_company_is_not_found() {
    let (app, owner, _) = test_app().await;
    let (status, body) = send(&app, "GET", "/v1/companies/4242/ledger-state", Some(owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_ledger_content_is_stored_as_plain_text() {
    let (app, owner, _) = test_app().await;
    let id = create_company(&app, owner, "Acme AB", "556677-8899").await;
    let uri = format!("/v1/companies/{id}/ledger-state");

    let sie = "#FLAGGA 0\r\n#FNAMN \"Acme AB\"\r\n#KONTO 1910 \"Kassa\"\r\n#VER A 1 20240105 \"Försäljning\"\r\n{\r\n}";
    let (status, _) = send(&app, "PUT", &uri, Some(owner), Some(json!({ "content": sie }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", &uri, Some(owner), None).await;
    assert_eq!(body["content"], sie);
}

#[tokio::test]
async fn test_caller_membership_is_reported() {
    let (app, owner, stranger) = test_app().await;
    let id = create_company(&app, owner, "Acme AB", "556677-8899").await;
    let uri = format!("/v1/companies/{id}/membership");

    let (status, body) = send(&app, "GET", &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "OWNER");
    assert_eq!(body["user_id"], owner.get());

    let (status, body) = send(&app, "GET", &uri, Some(stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "ACCESS_DENIED");

    let (status, _) = send(&app, "GET", "/v1/companies/4242/membership", Some(owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_organization_number_conflicts() {
    let (app, owner, stranger) = test_app().await;
    create_company(&app, owner, "Acme AB", "556677-8899").await;

    let (status, body) = send(
        &app,
        "POST",
        "/v1/companies",
        Some(stranger),
        Some(json!({ "name": "Other AB", "organization_number": "556677-8899" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, body) = send(&app, "GET", "/v1/companies", Some(stranger), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_company_validation() {
    let (app, owner, _) = test_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/v1/companies",
        Some(owner),
        Some(json!({ "name": "Acme AB", "organization_number": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        "POST",
        "/v1/companies",
        Some(owner),
        Some(json!({ "name": "Acme AB", "organization_number": "1", "accounting_standard": "K9" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/companies")
        .header("X-User-Id", owner.get().to_string())
        .header("Content-Type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_company_keeps_number_when_omitted() {
    let (app, owner, _) = test_app().await;
    let id = create_company(&app, owner, "Acme AB", "556677-8899").await;
    let other = create_company(&app, owner, "Beta AB", "559900-1122").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/v1/companies/{id}"),
        Some(owner),
        Some(json!({ "name": "Acme Holding AB", "city": "Malmö", "accounting_standard": "K3" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acme Holding AB");
    assert_eq!(body["organization_number"], "556677-8899");
    assert_eq!(body["accounting_standard"], "K3");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/companies/{other}"),
        Some(owner),
        Some(json!({ "name": "Beta AB", "organization_number": "556677-8899" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// -- Records ------------------------------------------------------------------

#[tokio::test]
async fn test_company_scoped_records() {
    let (app, owner, stranger) = test_app().await;
    let id = create_company(&app, owner, "Acme AB", "556677-8899").await;

    let (status, customer) = send(
        &app,
        "POST",
        "/v1/customers",
        Some(owner),
        Some(json!({
            "type": "company",
            "name": "Kund AB",
            "organization_number": "556000-0001",
            "address": "Storgatan 1",
            "postal_code": "111 22",
            "city": "Stockholm",
            "country": "Sverige",
            "company_id": id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{customer}");
    assert_eq!(customer["type"], "company");
    assert_eq!(customer["company_id"], id);

    let (status, product) = send(
        &app,
        "POST",
        "/v1/products",
        Some(owner),
        Some(json!({ "name": "Konsulttimme", "price": 950.0, "unit": "tim", "company_id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    assert_eq!(product["vat_rate"], 25.0);
    assert_eq!(product["includes_vat"], false);

    let (status, body) = send(&app, "GET", &format!("/v1/customers?company_id={id}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", &format!("/v1/products?company_id={id}"), Some(stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let product_id = product["id"].as_i64().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/v1/products/{product_id}"), Some(stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Deleting the company detaches the records instead of removing them.
    send(&app, "DELETE", &format!("/v1/companies/{id}"), Some(owner), None).await;
    let (_, body) = send(&app, "GET", "/v1/customers", Some(owner), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert!(body[0]["company_id"].is_null());

    let (status, body) = send(&app, "DELETE", &format!("/v1/products/{product_id}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    let (status, _) = send(&app, "DELETE", &format!("/v1/products/{product_id}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_customer_by_owner() {
    let (app, owner, _) = test_app().await;
    let draft = json!({
        "type": "private",
        "name": "Anna Andersson",
        "address": "Gatan 2",
        "postal_code": "222 33",
        "city": "Lund",
        "country": "Sverige"
    });
    let (_, created) = send(&app, "POST", "/v1/customers", Some(owner), Some(draft.clone())).await;
    let id = created["id"].as_i64().unwrap();

    let mut changed = draft;
    changed["city"] = json!("Malmö");
    let (status, body) = send(&app, "PUT", &format!("/v1/customers/{id}"), Some(owner), Some(changed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Malmö");

    let mut bad = body;
    bad["type"] = json!("alien");
    let (status, _) = send(&app, "PUT", &format!("/v1/customers/{id}"), Some(owner), Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Role Changes -------------------------------------------------------------

#[tokio::test]
async fn test_role_change_requires_admin_token() {
    let config = AppConfig {
        admin_token: Some("adm-secret".to_string()),
        ..AppConfig::default()
    };
    let state = AppState::with_config(config, snug_state::Backend::memory());
    let user = register(&state, "u@acme.se").await;
    let app = snug_api::app(state);
    let uri = format!("/v1/users/{}/role", user.get());

    let (status, _) = send(&app, "PATCH", &uri, Some(user), Some(json!({ "role": "admin" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("PATCH")
        .uri(&uri)
        .header("X-User-Id", user.get().to_string())
        .header("X-Admin-Token", "adm-secret")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "role": "admin" }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, body) = send(&app, "GET", "/v1/users/me", Some(user), None).await;
    assert_eq!(body["role"], "admin");
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_spec_served() {
    let (app, _, _) = test_app().await;
    let (status, body) = send(&app, "GET", "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["openapi"].as_str().unwrap().starts_with("3."));
    assert!(body["paths"]["/v1/companies/{id}/ledger-state"].is_object());
}
