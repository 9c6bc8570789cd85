use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::migration::{decode_trips, encode_trips};
use crate::domain::model::{ActivityEntry, BackendKind, StoreSnapshot, Trip};
use crate::domain::ports::TripStore;
use crate::utils::error::{Result, TrackerError};

/// Client for the remote key-value API (`?action=load|activity|clear-all`, POST `save|log-activity`).
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadResponse {
    #[serde(default)]
    trips: Vec<Value>,
    last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveResponse {
    last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActivityResponse {
    #[serde(default)]
    activity: Vec<ActivityEntry>,
}

impl RemoteStore {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(body);

        if status == StatusCode::UNAUTHORIZED {
            return Err(TrackerError::Unauthorized { message });
        }
        Err(TrackerError::RemoteStatus {
            status: status.as_u16(),
            message,
        })
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|stamp| stamp.with_timezone(&Utc))
}

#[async_trait]
impl TripStore for RemoteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn load(&self) -> Result<StoreSnapshot> {
        tracing::debug!("Loading trips from {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("action", "load")])
            .send()
            .await?;
        let body: LoadResponse = Self::check(response).await?.json().await?;

        let report = decode_trips(body.trips);
        Ok(StoreSnapshot {
            trips: report.trips,
            unparsed: report.unparsed,
            last_updated: parse_timestamp(body.last_updated.as_deref()),
        })
    }

    async fn save(&self, trips: &[Trip], unparsed: &[Value]) -> Result<DateTime<Utc>> {
        tracing::debug!("Saving {} trips to {}", trips.len(), self.endpoint);
        let records = encode_trips(trips, unparsed)?;
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "action": "save", "trips": records }))
            .send()
            .await?;
        let body: SaveResponse = Self::check(response).await?.json().await?;

        Ok(parse_timestamp(body.last_updated.as_deref()).unwrap_or_else(Utc::now))
    }

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<()> {
        // The server stamps the entry itself.
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "action": "log-activity",
                "activity": {
                    "action": entry.action,
                    "user": entry.user,
                    "details": entry.details,
                }
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn activity(&self) -> Result<Vec<ActivityEntry>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("action", "activity")])
            .send()
            .await?;
        let body: ActivityResponse = Self::check(response).await?.json().await?;
        Ok(body.activity)
    }

    async fn clear(&self, admin_password: Option<&str>) -> Result<()> {
        let body = match admin_password {
            Some(password) => json!({ "adminPassword": password }),
            None => json!({}),
        };
        let response = self
            .client
            .delete(&self.endpoint)
            .query(&[("action", "clear-all")])
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Country, Traveler};
    use httpmock::prelude::*;

    fn store(server: &MockServer) -> RemoteStore {
        RemoteStore::new(server.url("/api/trips"), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_load_migrates_legacy_records() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/trips")
                .query_param("action", "load");
            then.status(200).json_body(serde_json::json!({
                "trips": [
                    {"id": "1", "country": "UK", "departureDate": "2024-07-01", "arrivalDate": "2024-07-03"},
                    {"id": "2", "traveler": "Person 2", "country": "Greece", "departureDate": "bad", "arrivalDate": "2024-07-03"}
                ],
                "lastUpdated": "2024-07-04T08:00:00.000Z",
                "status": "connected"
            }));
        });

        let snapshot = store(&server).load().await.unwrap();

        mock.assert();
        assert_eq!(snapshot.trips.len(), 1);
        assert_eq!(snapshot.trips[0].traveler, Traveler::PersonOne);
        assert_eq!(snapshot.trips[0].country, Country::Uk);
        assert_eq!(snapshot.unparsed.len(), 1);
        assert_eq!(snapshot.unparsed[0]["id"], "2");
        assert!(snapshot.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_save_posts_trips() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/trips")
                .body_contains("\"action\":\"save\"")
                .body_contains("\"departureDate\":\"2024-07-01\"");
            then.status(200).json_body(serde_json::json!({
                "status": "connected",
                "lastUpdated": "2024-07-04T08:00:00Z"
            }));
        });

        let trip = Trip {
            id: "1".to_string(),
            traveler: Traveler::PersonOne,
            country: Country::Uk,
            departure_date: chrono::NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            arrival_date: chrono::NaiveDate::from_ymd_opt(2024, 7, 3).unwrap(),
            notes: None,
        };
        let stamp = store(&server).save(&[trip], &[]).await.unwrap();

        mock.assert();
        assert_eq!(stamp.to_rfc3339(), "2024-07-04T08:00:00+00:00");
    }

    #[tokio::test]
    async fn test_clear_with_wrong_password_is_unauthorized() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/api/trips")
                .query_param("action", "clear-all")
                .body_contains("\"adminPassword\":\"nope\"");
            then.status(401)
                .json_body(serde_json::json!({"error": "Unauthorized: Invalid admin password"}));
        });

        let err = store(&server).clear(Some("nope")).await.unwrap_err();

        mock.assert();
        assert!(matches!(err, TrackerError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_remote_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/trips");
            then.status(500).json_body(serde_json::json!({
                "error": "Internal server error",
                "message": "connection refused"
            }));
        });

        let err = store(&server).activity().await.unwrap_err();

        match err {
            TrackerError::RemoteStatus { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal server error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
