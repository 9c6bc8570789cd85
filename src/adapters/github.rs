use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::migration::{decode_app_data, encode_trips};
use crate::domain::model::{ActivityEntry, AppData, BackendKind, GithubTarget, StoreSnapshot, Trip};
use crate::domain::ports::TripStore;
use crate::utils::error::{Result, TrackerError};

/// Keeps the exported document as a single file in a GitHub repository,
/// through the contents API.
#[derive(Debug, Clone)]
pub struct GithubStore {
    client: Client,
    target: GithubTarget,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

impl GithubStore {
    pub fn new(target: GithubTarget, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("country-tracker")
            .build()?;
        Ok(Self { client, target })
    }

    pub fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.target.api_base.trim_end_matches('/'),
            self.target.owner,
            self.target.repo,
            self.target.path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", self.target.token))
            .header(ACCEPT, "application/vnd.github.v3+json")
    }

    /// The current file, or `None` when it does not exist yet.
    async fn fetch(&self) -> Result<Option<ContentsResponse>> {
        let response = self
            .authorized(self.client.get(self.contents_url()))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
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

fn decode_content(content: &str) -> Result<String> {
    // The API wraps base64 content at 60 columns.
    let packed: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(packed)
        .map_err(|e| TrackerError::validation(format!("GitHub file is not base64: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| TrackerError::validation(format!("GitHub file is not UTF-8: {}", e)))
}

#[async_trait]
impl TripStore for GithubStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Github
    }

    async fn load(&self) -> Result<StoreSnapshot> {
        tracing::debug!("Loading trips from {}", self.contents_url());
        let Some(file) = self.fetch().await? else {
            tracing::info!("📭 No data file in {}/{} yet", self.target.owner, self.target.repo);
            return Ok(StoreSnapshot::default());
        };

        let report = decode_app_data(&decode_content(&file.content)?)?;
        Ok(StoreSnapshot {
            trips: report.trips,
            unparsed: report.unparsed,
            last_updated: report.last_updated,
        })
    }

    async fn save(&self, trips: &[Trip], unparsed: &[Value]) -> Result<DateTime<Utc>> {
        let sha = self.fetch().await?.map(|file| file.sha);
        let last_updated = Utc::now();
        let data = AppData {
            trips: encode_trips(trips, unparsed)?,
            last_updated,
        };
        let content = STANDARD.encode(serde_json::to_string_pretty(&data)?);

        let mut body = json!({
            "message": format!(
                "Update country tracker data - {}",
                last_updated.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            "content": content,
        });
        if let Some(sha) = sha {
            body["sha"] = Value::String(sha);
        }

        tracing::debug!("Saving {} trips to {}", trips.len(), self.contents_url());
        let response = self
            .authorized(self.client.put(self.contents_url()))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(last_updated)
    }

    fn keeps_activity(&self) -> bool {
        false
    }

    // Only the trip file is synced.
    async fn append_activity(&self, _entry: &ActivityEntry) -> Result<()> {
        Ok(())
    }

    async fn activity(&self) -> Result<Vec<ActivityEntry>> {
        Ok(Vec::new())
    }

    /// Deletes the data file. The repository token is the credential here, so
    /// the admin password is not used.
    async fn clear(&self, _admin_password: Option<&str>) -> Result<()> {
        let Some(file) = self.fetch().await? else {
            return Ok(());
        };
        let response = self
            .authorized(self.client.delete(self.contents_url()))
            .json(&json!({
                "message": "Delete country tracker data - Reset all data",
                "sha": file.sha,
            }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }
}
