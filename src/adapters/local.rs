use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::migration::{decode_trips, encode_trips};
use crate::domain::model::{ActivityEntry, BackendKind, StoreSnapshot, Trip};
use crate::domain::ports::TripStore;
use crate::utils::error::Result;

/// Only the most recent activity entries are kept.
pub const ACTIVITY_LIMIT: usize = 100;

const KEY_TRIPS: &str = "trips";
const KEY_LAST_UPDATED: &str = "lastUpdated";
const KEY_ACTIVITY: &str = "activity";

/// File-backed key-value store: one JSON file per key under `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("country-tracker.{}.json", key))
    }

    async fn read_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match tokio::fs::read(self.key_path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 先寫入暫存檔再改名，避免中斷時留下半個檔案
    async fn write_key<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl TripStore for LocalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn load(&self) -> Result<StoreSnapshot> {
        let records: Vec<Value> = self.read_key(KEY_TRIPS).await?.unwrap_or_default();
        let last_updated: Option<DateTime<Utc>> = self.read_key(KEY_LAST_UPDATED).await?;

        let report = decode_trips(records);
        tracing::debug!(
            "Loaded {} trips from {} ({} skipped)",
            report.trips.len(),
            self.base_path.display(),
            report.skipped.len()
        );

        Ok(StoreSnapshot {
            trips: report.trips,
            unparsed: report.unparsed,
            last_updated,
        })
    }

    async fn save(&self, trips: &[Trip], unparsed: &[Value]) -> Result<DateTime<Utc>> {
        let timestamp = Utc::now();
        self.write_key(KEY_TRIPS, &encode_trips(trips, unparsed)?).await?;
        self.write_key(KEY_LAST_UPDATED, &timestamp).await?;
        tracing::debug!("Saved {} trips to {}", trips.len(), self.base_path.display());
        Ok(timestamp)
    }

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<()> {
        let mut entries = self.activity().await?;
        entries.push(entry.clone());
        if entries.len() > ACTIVITY_LIMIT {
            entries.drain(..entries.len() - ACTIVITY_LIMIT);
        }
        self.write_key(KEY_ACTIVITY, &entries).await
    }

    async fn activity(&self) -> Result<Vec<ActivityEntry>> {
        Ok(self.read_key(KEY_ACTIVITY).await?.unwrap_or_default())
    }

    async fn clear(&self, _admin_password: Option<&str>) -> Result<()> {
        for key in [KEY_TRIPS, KEY_LAST_UPDATED, KEY_ACTIVITY] {
            self.remove_key(key).await?;
        }
        Ok(())
    }
}
