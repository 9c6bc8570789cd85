use crate::domain::model::{
    ActivityEntry, BackendKind, GithubTarget, StoreSnapshot, ThresholdRule, Trip,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

/// One storage backend. Backends are ranked and tried in order by
/// [`crate::adapters::fallback::FallbackStore`].
#[async_trait]
pub trait TripStore: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn load(&self) -> Result<StoreSnapshot>;

    /// Replaces the stored trip list and returns the new `lastUpdated` stamp.
    /// `unparsed` records are stored after the trips, unchanged.
    async fn save(&self, trips: &[Trip], unparsed: &[Value]) -> Result<DateTime<Utc>>;

    /// Backends without an activity log are skipped for activity calls.
    fn keeps_activity(&self) -> bool {
        true
    }

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<()>;

    async fn activity(&self) -> Result<Vec<ActivityEntry>>;

    async fn clear(&self, admin_password: Option<&str>) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn data_dir(&self) -> &str;
    fn remote_endpoint(&self) -> Option<&str>;
    fn github(&self) -> Option<GithubTarget>;
    fn request_timeout(&self) -> Duration;
    fn write_through(&self) -> bool;
    fn thresholds(&self) -> Vec<ThresholdRule>;
    fn user(&self) -> &str;
}
