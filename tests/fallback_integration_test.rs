use chrono::NaiveDate;
use country_tracker::domain::model::BackendKind;
use country_tracker::{
    build_store, Country, NewTrip, TrackerConfig, TrackerError, Traveler, TripTracker,
};
use httpmock::prelude::*;
use tempfile::TempDir;

fn config_for(server: &MockServer, dir: &TempDir) -> TrackerConfig {
    let toml_content = format!(
        r#"
[storage]
data_dir = "{}"
write_through = true

[remote]
endpoint = "{}"
timeout_seconds = 5

[defaults]
user = "integration"
"#,
        dir.path().display(),
        server.url("/api/trips")
    );
    TrackerConfig::from_toml_str(&toml_content).unwrap()
}

fn greece_trip() -> NewTrip {
    NewTrip {
        traveler: Traveler::PersonOne,
        country: Country::Greece,
        departure_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        arrival_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        notes: None,
    }
}

#[tokio::test]
async fn test_remote_outage_falls_back_to_local() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();

    let load_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/trips")
            .query_param("action", "load");
        then.status(500)
            .json_body(serde_json::json!({"error": "database unavailable"}));
    });
    let save_mock = server.mock(|when, then| {
        when.method(POST).path("/api/trips");
        then.status(500)
            .json_body(serde_json::json!({"error": "database unavailable"}));
    });

    let config = config_for(&server, &dir);
    let store = build_store(&config).unwrap();
    assert_eq!(
        store.backend_kinds(),
        vec![BackendKind::Remote, BackendKind::Local]
    );
    let tracker = TripTracker::new(store, "integration");

    let added = tracker.add_trip(greece_trip()).await.unwrap();
    assert_eq!(added.served_by, BackendKind::Local);
    assert!(added.is_degraded());
    assert!(added
        .failures
        .iter()
        .all(|failure| failure.backend == BackendKind::Remote));

    let listed = tracker.trips(None).await.unwrap();
    assert_eq!(listed.served_by, BackendKind::Local);
    assert_eq!(listed.value.len(), 1);

    load_mock.assert_hits(2);
    assert!(save_mock.hits() >= 1);

    // The local copy is on disk for the next run
    assert!(dir.path().join("country-tracker.trips.json").exists());
}

#[tokio::test]
async fn test_remote_success_writes_through_to_local() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET)
            .path("/api/trips")
            .query_param("action", "load");
        then.status(200).json_body(serde_json::json!({
            "trips": [],
            "lastUpdated": null,
            "status": "connected"
        }));
    });
    let save_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/trips")
            .json_body_partial(r#"{"action": "save"}"#);
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "lastUpdated": "2024-06-11T09:00:00.000Z"
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/trips")
            .json_body_partial(r#"{"action": "log-activity"}"#);
        then.status(200).json_body(serde_json::json!({"success": true}));
    });

    let config = config_for(&server, &dir);
    let tracker = TripTracker::new(build_store(&config).unwrap(), "integration");

    let added = tracker.add_trip(greece_trip()).await.unwrap();
    assert_eq!(added.served_by, BackendKind::Remote);
    assert!(!added.is_degraded());
    save_mock.assert();

    let local = std::fs::read_to_string(dir.path().join("country-tracker.trips.json")).unwrap();
    let trips: serde_json::Value = serde_json::from_str(&local).unwrap();
    assert_eq!(trips[0]["id"], added.value.id.as_str());
    assert_eq!(trips[0]["country"], "Greece");
}

#[tokio::test]
async fn test_rejected_password_stops_clear() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();

    let clear_mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/api/trips")
            .query_param("action", "clear-all")
            .json_body(serde_json::json!({"adminPassword": "wrong"}));
        then.status(401)
            .json_body(serde_json::json!({"error": "Invalid admin password"}));
    });

    // Seed the local store through a local-only chain
    let mut local_only = config_for(&server, &dir);
    local_only.remote = None;
    let seeding = TripTracker::new(build_store(&local_only).unwrap(), "integration");
    seeding.add_trip(greece_trip()).await.unwrap();

    let config = config_for(&server, &dir);
    let tracker = TripTracker::new(build_store(&config).unwrap(), "integration");
    let result = tracker.clear_all(Some("wrong"), &[]).await;

    clear_mock.assert();
    match result {
        Err(TrackerError::Unauthorized { message }) => {
            assert_eq!(message, "Invalid admin password")
        }
        other => panic!("expected Unauthorized, got {:?}", other.map(|r| r.cleared)),
    }

    // The local copy was not touched
    assert_eq!(seeding.trips(None).await.unwrap().value.len(), 1);
}

#[tokio::test]
async fn test_fallback_read_is_not_written_over_the_remote() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET)
            .path("/api/trips")
            .query_param("action", "load");
        then.status(500)
            .json_body(serde_json::json!({"error": "database unavailable"}));
    });
    let save_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/trips")
            .json_body_partial(r#"{"action": "save"}"#);
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "lastUpdated": "2024-06-11T09:00:00.000Z"
        }));
    });
    let activity_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/trips")
            .json_body_partial(r#"{"action": "log-activity"}"#);
        then.status(200).json_body(serde_json::json!({"success": true}));
    });

    let config = config_for(&server, &dir);
    let tracker = TripTracker::new(build_store(&config).unwrap(), "integration");

    let added = tracker.add_trip(greece_trip()).await.unwrap();

    assert_eq!(added.served_by, BackendKind::Local);
    assert!(added.is_degraded());
    save_mock.assert_hits(0);
    activity_mock.assert();
    assert!(dir.path().join("country-tracker.trips.json").exists());
}

fn github_config_for(server: &MockServer, dir: &TempDir) -> TrackerConfig {
    let toml_content = format!(
        r#"
[storage]
data_dir = "{}"
write_through = true

[github]
token = "secret"
owner = "alex"
repo = "travel"
api_base = "{}"
"#,
        dir.path().display(),
        server.base_url()
    );
    TrackerConfig::from_toml_str(&toml_content).unwrap()
}

const GITHUB_FILE: &str = "/repos/alex/travel/contents/country-tracker-data.json";

#[tokio::test]
async fn test_github_file_ranks_above_local_and_survives_kept_clear() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();

    let get_mock = server.mock(|when, then| {
        when.method(GET)
            .path(GITHUB_FILE)
            .header("authorization", "token secret");
        then.status(404).json_body(serde_json::json!({"message": "Not Found"}));
    });
    let put_mock = server.mock(|when, then| {
        when.method(PUT)
            .path(GITHUB_FILE)
            .body_contains("Update country tracker data - ");
        then.status(201).json_body(serde_json::json!({"content": {"sha": "abc123"}}));
    });
    let delete_mock = server.mock(|when, then| {
        when.method(DELETE).path(GITHUB_FILE);
        then.status(200);
    });

    let config = github_config_for(&server, &dir);
    let store = build_store(&config).unwrap();
    assert_eq!(
        store.backend_kinds(),
        vec![BackendKind::Github, BackendKind::Local]
    );
    let tracker = TripTracker::new(store, "integration");

    let added = tracker.add_trip(greece_trip()).await.unwrap();
    assert_eq!(added.served_by, BackendKind::Github);
    put_mock.assert();
    assert!(get_mock.hits() >= 2);

    // Activity lives in the local store, written through trips are there too
    let activity = tracker.activity().await.unwrap();
    assert_eq!(activity.served_by, BackendKind::Local);
    assert_eq!(activity.value.len(), 1);
    assert!(dir.path().join("country-tracker.trips.json").exists());

    let report = tracker
        .clear_all(None, &[BackendKind::Github])
        .await
        .unwrap();
    assert_eq!(report.cleared, vec![BackendKind::Local]);
    assert_eq!(report.kept, vec![BackendKind::Github]);
    delete_mock.assert_hits(0);
    assert!(!dir.path().join("country-tracker.trips.json").exists());
}

#[tokio::test]
async fn test_pull_from_github_fills_local_store() {
    use base64::Engine;

    let dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let document = serde_json::json!({
        "trips": [
            {"id": "7", "traveler": "Person 2", "country": "UK", "departureDate": "2024-07-01", "arrivalDate": "2024-07-03"}
        ],
        "lastUpdated": "2024-07-04T08:00:00.000Z"
    });
    let content = base64::engine::general_purpose::STANDARD.encode(document.to_string());

    server.mock(|when, then| {
        when.method(GET).path(GITHUB_FILE);
        then.status(200)
            .json_body(serde_json::json!({"sha": "abc123", "content": content}));
    });
    let put_mock = server.mock(|when, then| {
        when.method(PUT)
            .path(GITHUB_FILE)
            .json_body_partial(r#"{"sha": "abc123"}"#);
        then.status(200);
    });

    let config = github_config_for(&server, &dir);
    let tracker = TripTracker::new(build_store(&config).unwrap(), "integration");

    let pulled = tracker.pull_from(BackendKind::Github).await.unwrap();
    assert_eq!(pulled.value, 1);
    put_mock.assert();

    let local = std::fs::read_to_string(dir.path().join("country-tracker.trips.json")).unwrap();
    let trips: serde_json::Value = serde_json::from_str(&local).unwrap();
    assert_eq!(trips[0]["id"], "7");

    let missing = tracker.push_to(BackendKind::Remote).await;
    assert!(matches!(missing, Err(TrackerError::ConfigError { .. })));
}
