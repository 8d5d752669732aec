//! HTTP surface integration tests.
//!
//! Starts an axum server on an ephemeral port and exercises it with reqwest.

use serde_json::{json, Value};
use shelter_core::{AnimalRepository, AnimalShelter, Dashboard, PatchPolicy, Query, Record};
use shelter_web::SharedDashboard;
use std::sync::{Arc, Mutex};

fn seeded_dashboard() -> SharedDashboard<AnimalShelter> {
    let repo = AnimalShelter::open_in_memory("animals").unwrap();
    for (id, animal_type, breed) in [("A1", "Dog", "Beagle"), ("A2", "Cat", "Tabby")] {
        let record = Record::new()
            .with("animal_id", id)
            .with("animal_type", animal_type)
            .with("breed", breed);
        assert_eq!(repo.create(Some(&record)), Ok(true));
    }
    Arc::new(Mutex::new(
        Dashboard::load(repo, PatchPolicy::Unconditional).unwrap(),
    ))
}

/// Bind to port 0 and return the base URL.
async fn start_server(dashboard: SharedDashboard<AnimalShelter>) -> String {
    let app = shelter_web::router(dashboard);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post_event(client: &reqwest::Client, base: &str, event: Value) -> Value {
    let resp = client
        .post(format!("{base}/api/events"))
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

fn fragment<'a>(outcome: &'a Value, view: &str) -> Option<&'a Value> {
    outcome["fragments"]
        .as_array()
        .unwrap()
        .iter()
        .find(|fragment| fragment["view"] == view)
        .map(|fragment| &fragment["data"])
}

#[tokio::test]
async fn health_reports_record_count() {
    let base = start_server(seeded_dashboard()).await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(body["records"], 2);
    assert!(body["version"].as_str().is_some_and(|v| !v.is_empty()));
}

#[tokio::test]
async fn index_serves_dashboard_page() {
    let base = start_server(seeded_dashboard()).await;
    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Animal Shelter Dashboard"));
}

#[tokio::test]
async fn views_expose_every_surface() {
    let base = start_server(seeded_dashboard()).await;
    let views: Value = reqwest::get(format!("{base}/api/views"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(views["stats"]["count"], 2);
    assert_eq!(views["type_options"], json!(["Cat", "Dog"]));
    assert_eq!(views["table"]["page_size"], 15);
    assert_eq!(views["map"]["fallback"], true);
    assert_eq!(views["theme"]["toggle_label"], "🌙 Dark Mode");
}

#[tokio::test]
async fn filter_event_returns_recomputed_fragments() {
    let base = start_server(seeded_dashboard()).await;
    let client = reqwest::Client::new();

    let outcome = post_event(
        &client,
        &base,
        json!({ "type": "set_filter", "types": ["Dog"], "breeds": [] }),
    )
    .await;

    assert_eq!(outcome["changed"], json!(["filter"]));
    let stats = fragment(&outcome, "stats").unwrap();
    assert_eq!(stats["count"], 1);
    assert_eq!(stats["breeds"], 1);
    assert_eq!(
        fragment(&outcome, "breed_options").unwrap(),
        &json!(["Beagle"])
    );
    assert!(fragment(&outcome, "edit_form").is_none());
}

#[tokio::test]
async fn edit_flow_persists_through_the_store() {
    let dashboard = seeded_dashboard();
    let base = start_server(dashboard.clone()).await;
    let client = reqwest::Client::new();

    let outcome = post_event(&client, &base, json!({ "type": "select_for_edit", "row": 0 })).await;
    let form = fragment(&outcome, "edit_form").unwrap();
    assert_eq!(form["open"], true);

    let resp = client
        .post(format!("{base}/api/edit"))
        .json(&json!({ "animal_id": "A1", "animal_type": "Dog", "breed": "Mixed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(fragment(&outcome, "edit_form").unwrap()["open"], false);

    let guard = dashboard.lock().unwrap();
    let stored = guard
        .repository()
        .read(Some(&Query::new().with("animal_id", "A1")));
    assert_eq!(stored[0].text("breed").as_deref(), Some("Mixed"));
}

#[tokio::test]
async fn malformed_event_is_rejected() {
    let base = start_server(seeded_dashboard()).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/events"))
        .json(&json!({ "type": "launch_rocket" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}
