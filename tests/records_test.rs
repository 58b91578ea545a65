// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CRUD tests for users, history, objects and flags over the in-memory store.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{create_test_app, send};
use serde_json::{json, Value};
use tralio_api::db::WriteMode;
use tralio_api::ingest::{coerce::coerce_row, ingest, Collection, IngestOptions};

fn history_entry(user: &str, text: &str, ts: &str) -> Value {
    json!({
        "userId": user,
        "sourceLang": "es",
        "targetLang": "en",
        "inputType": "text",
        "text": text,
        "result": "translated",
        "ts": ts,
    })
}

fn item_texts(body: &Value) -> Vec<&str> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["text"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_healthz() {
    let (app, _) = create_test_app();
    let (status, body) = send(&app, Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn test_user_lifecycle() {
    let (app, _) = create_test_app();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/v1/users",
        Some(json!({"email": "ana@example.com", "displayName": "Ana"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(created["role"], "student");
    assert!(created["createdAt"].as_str().unwrap().ends_with('Z'));

    let uri = format!("/api/v1/users/{id}");
    let (status, fetched) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"displayName": "Ana B", "id": "ignored"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["displayName"], "Ana B");
    assert_eq!(updated["email"], "ana@example.com");

    let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    // Deleting again still succeeds
    let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_user_invalid_email_rejected() {
    let (app, _) = create_test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/users",
        Some(json!({"email": "not-an-email"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let (_, list) = send(&app, Method::GET, "/api/v1/users", None, None).await;
    assert_eq!(list["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let (app, _) = create_test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/history",
        Some(json!({"userId": "u1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_update_missing_record_is_not_found() {
    let (app, _) = create_test_app();
    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/v1/objects/nope",
        Some(json!({"label": "cat"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_filtered_newest_first() {
    let (app, _) = create_test_app();

    let entries = [
        ("u1", "hola", "2026-01-01T10:00:00Z"),
        ("u1", "adios", "2026-01-03T10:00:00Z"),
        ("u2", "gracias", "2026-01-04T10:00:00Z"),
        ("u1", "buenos dias", "2026-01-02T10:00:00Z"),
    ];
    for (user, text, ts) in entries {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/history",
            Some(history_entry(user, text, ts)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/history?userId=u1&limit=2",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_texts(&body), vec!["adios", "buenos dias"]);

    // An empty filter value is ignored rather than matched literally
    let (status, body) = send(&app, Method::GET, "/api/v1/history?userId=", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        item_texts(&body),
        vec!["gracias", "adios", "buenos dias", "hola"]
    );
}

#[tokio::test]
async fn test_every_collection_lifecycle() {
    let (app, _) = create_test_app();

    let cases = [
        ("users", json!({"email": "ana@example.com", "displayName": "Ana"})),
        ("history", history_entry("u1", "hola", "2026-01-01T10:00:00.000Z")),
        (
            "objects",
            json!({"label": "cup", "confidence": 0.9, "langs": ["es", "en"], "createdBy": "u1"}),
        ),
        ("flags", json!({"key": "dark_mode", "value": true, "type": "bool"})),
    ];

    for (collection, payload) in cases {
        let (status, created) = send(
            &app,
            Method::POST,
            &format!("/api/v1/{collection}"),
            Some(payload),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{collection}");
        let id = created["id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/{collection}/{id}");
        let (status, fetched) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{collection}");
        assert_eq!(fetched, created, "{collection}");

        let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "{collection}");

        let (status, body) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{collection}");
        assert_eq!(body["error"], "not_found");

        let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "{collection}");
    }
}

#[tokio::test]
async fn test_history_get_returns_payload_plus_id() {
    let (app, _) = create_test_app();
    let payload = history_entry("u1", "hola", "2024-01-01T10:00:00.000Z");

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/v1/history",
        Some(payload.clone()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) =
        send(&app, Method::GET, &format!("/api/v1/history/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let mut expected = payload.as_object().cloned().unwrap();
    expected.insert("id".to_string(), json!(id));
    assert_eq!(fetched, Value::Object(expected));
}

#[tokio::test]
async fn test_ingested_history_sorts_with_api_history() {
    let (app, state) = create_test_app();

    // 08:00Z written with an offset, older than the 09:00Z entry below
    let rows = vec![coerce_row(
        Collection::History,
        history_entry("u1", "ingested-older", "2024-05-01T10:00:00+02:00")
            .as_object()
            .cloned()
            .unwrap(),
        Utc::now(),
    )];
    let opts = IngestOptions {
        collection: Collection::History,
        batch_size: 500,
        id_field: None,
        mode: WriteMode::Overwrite,
        dry_run: false,
    };
    ingest(state.db.as_ref(), rows, &opts).await.unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/history",
        Some(history_entry("u1", "api-newer", "2024-05-01T09:00:00Z")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&app, Method::GET, "/api/v1/history?userId=u1", None, None).await;
    assert_eq!(item_texts(&body), vec!["api-newer", "ingested-older"]);
}

#[tokio::test]
async fn test_history_without_ts_gets_stamped() {
    let (app, _) = create_test_app();
    let (status, created) = send(
        &app,
        Method::POST,
        "/api/v1/history",
        Some(json!({
            "userId": "u1",
            "sourceLang": "fr",
            "targetLang": "en",
            "inputType": "voice",
            "text": "bonjour",
            "result": "hello",
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["ts"].is_string());
    assert_eq!(created["inputType"], "voice");
}

#[tokio::test]
async fn test_list_limit_bounds() {
    let (app, _) = create_test_app();
    for uri in ["/api/v1/objects?limit=0", "/api/v1/objects?limit=101"] {
        let (status, body) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(body["error"], "validation_error");
    }
    let (status, _) = send(&app, Method::GET, "/api/v1/objects?limit=100", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_object_list_default_limit() {
    let (app, _) = create_test_app();
    for i in 0..25 {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/objects",
            Some(json!({"label": format!("thing-{i}"), "confidence": 0.5, "langs": ["es"]})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, body) = send(&app, Method::GET, "/api/v1/objects", None, None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_flag_values_and_filters() {
    let (app, _) = create_test_app();

    let flags = [
        json!({"key": "dark_mode", "value": true, "type": "bool"}),
        json!({"key": "greeting", "value": "hi", "type": "str", "scope": "user"}),
        json!({"key": "limits", "value": {"daily": 5}, "type": "json"}),
    ];
    for flag in flags {
        let (status, created) =
            send(&app, Method::POST, "/api/v1/flags", Some(flag.clone()), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["value"], flag["value"]);
        assert!(created["updatedAt"].is_string());
    }

    let (_, body) = send(&app, Method::GET, "/api/v1/flags?scope=global", None, None).await;
    let keys: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["dark_mode", "limits"]);

    let (_, body) = send(&app, Method::GET, "/api/v1/flags?key=greeting", None, None).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["scope"], "user");
}

#[tokio::test]
async fn test_flag_value_defaults_to_null() {
    let (app, _) = create_test_app();
    for body in [json!({"key": "missing_value"}), json!({"key": "null_value", "value": null})] {
        let (status, created) =
            send(&app, Method::POST, "/api/v1/flags", Some(body.clone()), None).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert!(created["value"].is_null());
        assert_eq!(created["scope"], "global");
    }
}

#[tokio::test]
async fn test_security_headers_present() {
    let (app, _) = create_test_app();
    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .uri("/api/v1/users")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
}
