//! Integration tests for the `/api/v1/quiet-hours` resource.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, get, send, send_raw, token_for};
use quiet_db::overlap::CONFLICT_MESSAGE;
use serde_json::json;

const BASE: &str = "/api/v1/quiet-hours";

fn window(title: &str, start: &str, end: &str) -> serde_json::Value {
    json!({ "title": title, "start_time": start, "end_time": end })
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_returns_401() {
    let app = build_test_app();
    let response = get(app.router, BASE).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_token_returns_401() {
    let app = build_test_app();
    let response = send(app.router, Method::GET, BASE, "not-a-jwt", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Create / read
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_with_normalized_fields() {
    let app = build_test_app();
    let token = token_for(1);

    let response = send(
        app.router.clone(),
        Method::POST,
        BASE,
        &token,
        Some(json!({
            "title": "  Deep work  ",
            "description": " no meetings ",
            "start_time": "2099-01-01T09:00:00Z",
            "end_time": "2099-01-01T10:00:00Z",
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["title"], "Deep work");
    assert_eq!(json["description"], "no meetings");
    assert_eq!(json["user_id"], 1);
    assert_eq!(json["is_active"], true);
    assert_eq!(json["is_notified"], false);
    assert!(json.get("claim_token").is_none());

    let id = json["id"].as_i64().unwrap();
    let response = send(app.router, Method::GET, &format!("{BASE}/{id}"), &token, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], id);
}

#[tokio::test]
async fn list_is_scoped_to_owner_and_ordered_by_start() {
    let app = build_test_app();
    let alice = token_for(1);
    let bob = token_for(2);

    for (token, title, start, end) in [
        (&alice, "late", "2099-01-01T15:00:00Z", "2099-01-01T16:00:00Z"),
        (&alice, "early", "2099-01-01T08:00:00Z", "2099-01-01T09:00:00Z"),
        (&bob, "bob", "2099-01-01T08:00:00Z", "2099-01-01T09:00:00Z"),
    ] {
        let response = send(
            app.router.clone(),
            Method::POST,
            BASE,
            token,
            Some(window(title, start, end)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(app.router, Method::GET, BASE, &alice, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["early", "late"]);
}

#[tokio::test]
async fn foreign_window_is_not_found() {
    let app = build_test_app();
    let response = send(
        app.router.clone(),
        Method::POST,
        BASE,
        &token_for(1),
        Some(window("mine", "2099-01-01T09:00:00Z", "2099-01-01T10:00:00Z")),
    )
    .await;
    let id = body_json(response).await["id"].as_i64().unwrap();

    let bob = token_for(2);
    let uri = format!("{BASE}/{id}");

    let response = send(app.router.clone(), Method::GET, &uri, &bob, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    let response = send(
        app.router.clone(),
        Method::PUT,
        &uri,
        &bob,
        Some(window("stolen", "2099-01-01T09:00:00Z", "2099-01-01T10:00:00Z")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(app.router, Method::DELETE, &uri, &bob, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_window_returns_409() {
    let app = build_test_app();
    let token = token_for(1);

    let response = send(
        app.router.clone(),
        Method::POST,
        BASE,
        &token,
        Some(window("first", "2099-01-01T09:00:00Z", "2099-01-01T10:00:00Z")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        app.router,
        Method::POST,
        BASE,
        &token,
        Some(window("second", "2099-01-01T09:30:00Z", "2099-01-01T10:30:00Z")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
    assert!(json["error"].as_str().unwrap().starts_with(CONFLICT_MESSAGE));
}

#[tokio::test]
async fn adjacent_windows_and_other_owners_do_not_conflict() {
    let app = build_test_app();
    let alice = token_for(1);

    let cases = [
        (&alice, "09:00-10:00", "2099-01-01T09:00:00Z", "2099-01-01T10:00:00Z"),
        (&alice, "10:00-11:00", "2099-01-01T10:00:00Z", "2099-01-01T11:00:00Z"),
        (&token_for(2), "other owner", "2099-01-01T09:30:00Z", "2099-01-01T10:30:00Z"),
    ];
    for (token, title, start, end) in cases {
        let response = send(
            app.router.clone(),
            Method::POST,
            BASE,
            token,
            Some(window(title, start, end)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED, "{title}");
    }
}

#[tokio::test]
async fn update_may_keep_its_own_slot_but_not_take_a_neighbours() {
    let app = build_test_app();
    let token = token_for(1);

    let first = send(
        app.router.clone(),
        Method::POST,
        BASE,
        &token,
        Some(window("first", "2099-01-01T09:00:00Z", "2099-01-01T10:00:00Z")),
    )
    .await;
    let first_id = body_json(first).await["id"].as_i64().unwrap();
    let second = send(
        app.router.clone(),
        Method::POST,
        BASE,
        &token,
        Some(window("second", "2099-01-01T11:00:00Z", "2099-01-01T12:00:00Z")),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CREATED);

    let uri = format!("{BASE}/{first_id}");
    let response = send(
        app.router.clone(),
        Method::PUT,
        &uri,
        &token,
        Some(window("first, longer", "2099-01-01T09:00:00Z", "2099-01-01T10:30:00Z")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "first, longer");

    let response = send(
        app.router,
        Method::PUT,
        &uri,
        &token,
        Some(window("first", "2099-01-01T09:00:00Z", "2099-01-01T11:30:00Z")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_payloads_return_400() {
    let app = build_test_app();
    let token = token_for(1);

    let cases = [
        window("", "2099-01-01T09:00:00Z", "2099-01-01T10:00:00Z"),
        window("backwards", "2099-01-01T10:00:00Z", "2099-01-01T09:00:00Z"),
        window("empty", "2099-01-01T09:00:00Z", "2099-01-01T09:00:00Z"),
        window("past", "2000-01-01T09:00:00Z", "2000-01-01T10:00:00Z"),
        json!({ "title": "missing times" }),
    ];
    for body in cases {
        let response = send(app.router.clone(), Method::POST, BASE, &token, Some(body.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn past_window_message_is_explicit() {
    let app = build_test_app();
    let response = send(
        app.router,
        Method::POST,
        BASE,
        &token_for(1),
        Some(window("past", "2000-01-01T09:00:00Z", "2000-01-01T10:00:00Z")),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["error"], "Cannot schedule quiet hours in the past");
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let app = build_test_app();
    let response = send_raw(app.router, Method::POST, BASE, &token_for(1), "{\"title\": ").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_returns_204_then_window_is_gone() {
    let app = build_test_app();
    let token = token_for(1);

    let response = send(
        app.router.clone(),
        Method::POST,
        BASE,
        &token,
        Some(window("short lived", "2099-01-01T09:00:00Z", "2099-01-01T10:00:00Z")),
    )
    .await;
    let id = body_json(response).await["id"].as_i64().unwrap();
    let uri = format!("{BASE}/{id}");

    let response = send(app.router.clone(), Method::DELETE, &uri, &token, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(app.router.clone(), Method::GET, &uri, &token, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(app.router.clone(), Method::DELETE, &uri, &token, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The slot is free again once cancelled.
    let response = send(
        app.router,
        Method::POST,
        BASE,
        &token,
        Some(window("replacement", "2099-01-01T09:00:00Z", "2099-01-01T10:00:00Z")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(app.store.snapshot(id).is_some_and(|w| !w.is_active));
}
