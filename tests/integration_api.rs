//! API integration tests over the in-memory store

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

mod common;

use common::{TestApp, ADMIN_KEY, USER_KEY};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

fn promotion_body(game_id: &str, percentage: u32) -> Value {
    json!({
        "title": "Summer Sale",
        "discountPercentage": percentage,
        "startDate": now(),
        "endDate": now() + Duration::days(7),
        "gameId": game_id,
    })
}

async fn create_game(app: &TestApp, title: &str, price: f64) -> String {
    let (status, json) = app
        .admin_post("/api/game", json!({ "title": title, "price": price }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "game creation failed: {json}");
    json["id"].as_str().unwrap().to_string()
}

async fn create_user(app: &TestApp, email: &str) -> String {
    let (status, json) = app
        .send(
            Method::POST,
            "/api/user",
            None,
            Some(json!({ "name": "Ana Lima", "email": email, "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "user creation failed: {json}");
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new(now());
    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_missing_or_unknown_api_key_rejected() {
    let app = TestApp::new(now());

    let (status, body) = app.send(Method::GET, "/api/game", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "missing_api_key");

    let (status, body) = app.send(Method::GET, "/api/game", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "invalid_api_key");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = TestApp::new(now());
    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.app.clone(), request).await.unwrap();
    let request_id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(Uuid::parse_str(request_id).is_ok());
}

#[tokio::test]
async fn test_game_catalog_endpoints() {
    let app = TestApp::new(now());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/game",
            Some(USER_KEY),
            Some(json!({ "title": "Hades", "price": 24.99 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "forbidden");

    let game_id = create_game(&app, "Hades", 24.99).await;

    let (status, game) = app.get(&format!("/api/game/{game_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["title"], "Hades");
    assert_eq!(game["price"], "24.99");

    let (status, games) = app.get("/api/game").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(games.as_array().unwrap().len(), 1);

    let (status, body) = app.get(&format!("/api/game/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "game_not_found");
}

#[tokio::test]
async fn test_invalid_game_rejected() {
    let app = TestApp::new(now());

    let (status, body) = app
        .admin_post("/api/game", json!({ "title": "Hades", "price": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "validation_failed");

    let (status, body) = app.admin_post("/api/game", json!({ "price": 10 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn test_promotion_lifecycle_and_pricing() {
    let app = TestApp::new(now());
    let game_id = create_game(&app, "Celeste", 59.99).await;

    let (status, body) = app
        .get(&format!("/api/promotion/game/{game_id}/discounted-price"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["discountedPrice"], "59.99");

    let (status, promotion) = app
        .admin_post("/api/promotion", promotion_body(&game_id, 10))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{promotion}");
    assert_eq!(promotion["game"]["id"], game_id.as_str());
    let promotion_id = promotion["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .get(&format!("/api/promotion/game/{game_id}/discounted-price"))
        .await;
    assert_eq!(body["gameId"], game_id.as_str());
    assert_eq!(body["discountedPrice"], "53.99");

    let (status, active) = app.get("/api/promotion/active").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/api/promotion/{promotion_id}"),
            Some(ADMIN_KEY),
            Some(promotion_body(&game_id, 50)),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["id"], promotion_id.as_str());

    let (_, body) = app
        .get(&format!("/api/promotion/game/{game_id}/discounted-price"))
        .await;
    assert_eq!(body["discountedPrice"], "30.00");

    let uri = format!("/api/promotion/{promotion_id}");
    let (status, _) = app.send(Method::DELETE, &uri, Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::DELETE, &uri, Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fourth_active_promotion_rejected() {
    let app = TestApp::new(now());
    let game_id = create_game(&app, "Celeste", 19.99).await;

    for _ in 0..3 {
        let (status, _) = app
            .admin_post("/api/promotion", promotion_body(&game_id, 10))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .admin_post("/api/promotion", promotion_body(&game_id, 10))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().unwrap().contains("maximum"));

    let (_, active) = app
        .get(&format!("/api/promotion/game/{game_id}/active"))
        .await;
    assert_eq!(active.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_promotion_starting_yesterday_rejected() {
    let app = TestApp::new(now());
    let game_id = create_game(&app, "Celeste", 19.99).await;

    let mut body = promotion_body(&game_id, 10);
    body["startDate"] = json!(now() - Duration::days(1));

    let (status, response) = app.admin_post("/api/promotion", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["details"].as_str().unwrap().contains("past"));
}

#[tokio::test]
async fn test_user_registration() {
    let app = TestApp::new(now());
    let user_id = create_user(&app, "ana@example.com").await;

    let (status, user) = app.get(&format!("/api/user/{user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "ana@example.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("passwordHash").is_none());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/user",
            None,
            Some(json!({ "name": "Ana", "email": "ana@example.com", "password": "longenough" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "conflict");

    let long_email = format!("{}@example.com", "a".repeat(300));
    let (status, body) = app
        .send(
            Method::POST,
            "/api/user",
            None,
            Some(json!({ "name": "Ana", "email": long_email, "password": "longenough" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "validation_failed");
}

#[tokio::test]
async fn test_promotion_discount_bounds_rejected() {
    let app = TestApp::new(now());
    let game_id = create_game(&app, "Celeste", 19.99).await;

    let mut body = promotion_body(&game_id, 10);
    body["discountPercentage"] = json!(null);
    body["discountAmount"] = json!("100000000000");
    let (status, response) = app.admin_post("/api/promotion", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error_code"], "validation_failed");

    let mut body = promotion_body(&game_id, 10);
    body["discountPercentage"] = json!("12.345");
    let (status, response) = app.admin_post("/api/promotion", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["details"].as_str().unwrap().contains("decimal places"));
}

#[tokio::test]
async fn test_purchase_and_library_views() {
    let app = TestApp::new(now());
    let game_id = create_game(&app, "Celeste", 59.99).await;
    let user_id = create_user(&app, "ana@example.com").await;
    app.admin_post("/api/promotion", promotion_body(&game_id, 10))
        .await;

    let purchase = json!({ "userId": user_id, "gameId": game_id });

    let (status, _) = app
        .send(
            Method::POST,
            "/api/library/purchase",
            Some(USER_KEY),
            Some(purchase.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, entry) = app.admin_post("/api/library/purchase", purchase.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");
    assert_eq!(entry["purchasePrice"], "53.99");

    let (status, body) = app.admin_post("/api/library/purchase", purchase).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "conflict");
    assert_eq!(app.store.library_len(), 1);

    let (status, library) = app.get(&format!("/api/library/user/{user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(library[0]["gameTitle"], "Celeste");
    assert_eq!(library[0]["userName"], "Ana Lima");

    let entry_id = entry["id"].as_str().unwrap();
    let (status, fetched) = app.get(&format!("/api/library/{entry_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["userEmail"], "ana@example.com");

    let (status, items) = app.get(&format!("/{user_id}/library")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        items,
        json!([{
            "userEmail": "ana@example.com",
            "userName": "Ana Lima",
            "gameId": game_id,
            "gameTitle": "Celeste",
        }])
    );

    let (status, _) = app.get(&format!("/api/library/user/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/api/library/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_purchase_unknown_user_not_found() {
    let app = TestApp::new(now());
    let game_id = create_game(&app, "Celeste", 9.99).await;

    let (status, body) = app
        .admin_post(
            "/api/library/purchase",
            json!({ "userId": Uuid::new_v4(), "gameId": game_id }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "user_not_found");
}
