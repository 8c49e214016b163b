//! Case CRUD integration tests.
//!
//! Run with: `cargo test -p casetrack-api --test cases_test`

mod helpers;

use axum::http::StatusCode;
use casetrack_api::DEGRADED_HEADER;
use helpers::fixtures::{case_body, create_case};
use helpers::offline_store::OfflineCaseStore;
use helpers::{setup_test_app, setup_test_app_with_store};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_create_case() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post("/api/cases")
        .json(&json!({
            "code": "1042",
            "title": "Robo en tienda",
            "crimeType": "Robo",
            "date": "2024-01-01",
            "hour": "10:00",
            "status": "Open",
            "latitude": "4.711",
            "longitude": -74.0721,
            "cuadrante": ""
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["code"], 1042);
    assert_eq!(body["title"], "Robo en tienda");
    assert_eq!(body["hour"], "10:00");
    assert_eq!(body["latitude"], 4.711);
    assert!(body.get("cuadrante").is_none());
    assert_eq!(body["media"], json!([]));
    assert_eq!(body["createdAt"], body["updatedAt"]);
}

#[tokio::test]
async fn test_create_case_missing_fields() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post("/api/cases")
        .json(&json!({ "title": "Sin datos", "status": "Open", "latitude": 1.0 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<String> = serde_json::from_value(body["fields"].clone()).unwrap();
    assert_eq!(fields, vec!["code", "crimeType", "date", "hour", "longitude"]);
}

#[tokio::test]
async fn test_create_case_out_of_range_latitude() {
    let app = setup_test_app().await;
    let client = app.client();

    let mut body = case_body(7, "Fuera de rango");
    body["latitude"] = json!(95.0);
    let response = client.post("/api/cases").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_case() {
    let app = setup_test_app().await;
    let client = app.client();

    let created = create_case(client, 1, "Hurto de celular").await;
    let id = created["id"].as_str().unwrap();

    let response = client.get(&format!("/api/cases/{}", id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, created);
}

#[tokio::test]
async fn test_get_unknown_case() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&format!("/api/cases/{}", uuid::Uuid::new_v4()))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_case_id() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/cases/not-a-uuid").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_update_case() {
    let app = setup_test_app().await;
    let client = app.client();

    let created = create_case(client, 3, "Asalto").await;
    let id = created["id"].as_str().unwrap();

    let response = client
        .put(&format!("/api/cases/{}", id))
        .json(&json!({ "status": "Closed", "place": "" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "Closed");
    assert_eq!(body["title"], "Asalto");
    assert!(body.get("place").is_none());
    assert_eq!(body["createdAt"], created["createdAt"]);
    assert_ne!(body["updatedAt"], created["updatedAt"]);
}

#[tokio::test]
async fn test_update_case_rejects_blank_title() {
    let app = setup_test_app().await;
    let client = app.client();

    let created = create_case(client, 4, "Vandalismo").await;
    let id = created["id"].as_str().unwrap();

    let response = client
        .put(&format!("/api/cases/{}", id))
        .json(&json!({ "title": "   " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_unknown_case_with_malformed_body() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .put(&format!("/api/cases/{}", uuid::Uuid::new_v4()))
        .json(&json!({ "title": "  ", "latitude": "north" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_case_rejects_out_of_range_code() {
    let app = setup_test_app().await;

    let mut body = case_body(1, "Código enorme");
    body["code"] = json!("1e30");
    let response = app.client().post("/api/cases").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_hour_with_seconds_round_trips() {
    let app = setup_test_app().await;
    let client = app.client();

    let mut body = case_body(2, "Con segundos");
    body["hour"] = json!("10:00:30");
    let response = client.post("/api/cases").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["hour"], "10:00:30");

    let fetched: Value = client
        .get(&format!("/api/cases/{}", created["id"].as_str().unwrap()))
        .await
        .json();
    assert_eq!(fetched["hour"], "10:00:30");
}

#[tokio::test]
async fn test_list_cases_degrades_when_store_is_offline() {
    let app = setup_test_app_with_store(Arc::new(OfflineCaseStore)).await;

    let response = app.client().get("/api/cases").await;

    response.assert_status_ok();
    let degraded = response.headers().get(DEGRADED_HEADER).unwrap();
    assert_eq!(degraded.to_str().unwrap(), "true");
    let body: Vec<Value> = response.json();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_update_unknown_case() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .put(&format!("/api/cases/{}", uuid::Uuid::new_v4()))
        .json(&json!({ "status": "Closed" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_cases_newest_first() {
    let app = setup_test_app().await;
    let client = app.client();

    let first = create_case(client, 10, "Primero").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = create_case(client, 10, "Segundo").await;

    let response = client.get("/api/cases").await;
    response.assert_status_ok();
    assert!(response.headers().get(DEGRADED_HEADER).is_none());

    let body: Vec<Value> = response.json();
    assert_eq!(body.len(), 2);
    assert_eq!(body[0]["id"], second["id"]);
    assert_eq!(body[1]["id"], first["id"]);
    // Codes are display labels and may repeat.
    assert_eq!(body[0]["code"], body[1]["code"]);
}

#[tokio::test]
async fn test_delete_case() {
    let app = setup_test_app().await;
    let client = app.client();

    let created = create_case(client, 5, "Estafa").await;
    let path = format!("/api/cases/{}", created["id"].as_str().unwrap());

    let response = client.delete(&path).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    client.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    client.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
}
