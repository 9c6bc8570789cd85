use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::model::{ActivityEntry, BackendFailure, BackendKind, Served, StoreSnapshot, Trip};
use crate::domain::ports::TripStore;
use crate::utils::error::{Result, TrackerError};

/// Ranked storage backends. Each request goes to the first backend that answers.
pub struct FallbackStore {
    backends: Vec<Box<dyn TripStore>>,
    write_through: bool,
}

#[derive(Debug, Clone)]
pub struct ClearReport {
    pub cleared: Vec<BackendKind>,
    pub kept: Vec<BackendKind>,
    pub failures: Vec<BackendFailure>,
}

impl FallbackStore {
    pub fn new(backends: Vec<Box<dyn TripStore>>) -> Self {
        Self {
            backends,
            write_through: false,
        }
    }

    /// After a successful save, also copy the trips to every lower-ranked backend.
    pub fn with_write_through(mut self, enabled: bool) -> Self {
        self.write_through = enabled;
        self
    }

    pub fn backend_kinds(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|backend| backend.kind()).collect()
    }

    pub fn backend(&self, kind: BackendKind) -> Option<&dyn TripStore> {
        self.backends
            .iter()
            .find(|backend| backend.kind() == kind)
            .map(|backend| backend.as_ref())
    }

    fn rank_of(&self, kind: BackendKind) -> usize {
        self.backends
            .iter()
            .position(|backend| backend.kind() == kind)
            .unwrap_or(0)
    }

    fn record_failure(
        failures: &mut Vec<BackendFailure>,
        backend: &dyn TripStore,
        op: &str,
        error: TrackerError,
    ) {
        tracing::warn!("⚠️ {} backend failed to {}: {}", backend.kind(), op, error);
        failures.push(BackendFailure {
            backend: backend.kind(),
            error: error.to_string(),
        });
    }

    fn exhausted(failures: Vec<BackendFailure>) -> TrackerError {
        TrackerError::AllBackendsFailed {
            attempts: failures.iter().map(ToString::to_string).collect(),
        }
    }

    pub async fn load(&self) -> Result<Served<StoreSnapshot>> {
        let mut failures = Vec::new();
        for backend in &self.backends {
            match backend.load().await {
                Ok(value) => {
                    return Ok(Served {
                        value,
                        served_by: backend.kind(),
                        failures,
                    })
                }
                Err(e) => Self::record_failure(&mut failures, backend.as_ref(), "load", e),
            }
        }
        Err(Self::exhausted(failures))
    }

    /// Saves to the highest-ranked backend that accepts the write.
    pub async fn save(&self, trips: &[Trip], unparsed: &[Value]) -> Result<Served<DateTime<Utc>>> {
        self.save_ranked(0, trips, unparsed).await
    }

    /// Saves the result of a read-modify-write. Backends ranked above `origin`
    /// (the one that served the read) are skipped: their copy was not read and
    /// may hold trips that `trips` lacks.
    pub async fn save_from(
        &self,
        origin: BackendKind,
        trips: &[Trip],
        unparsed: &[Value],
    ) -> Result<Served<DateTime<Utc>>> {
        let start = self.rank_of(origin);
        if start > 0 {
            tracing::warn!(
                "⚠️ Data was read from the {} store; not writing to higher-ranked stores",
                origin
            );
        }
        self.save_ranked(start, trips, unparsed).await
    }

    async fn save_ranked(
        &self,
        start: usize,
        trips: &[Trip],
        unparsed: &[Value],
    ) -> Result<Served<DateTime<Utc>>> {
        let mut failures = Vec::new();
        for (rank, backend) in self.backends.iter().enumerate().skip(start) {
            match backend.save(trips, unparsed).await {
                Ok(value) => {
                    if self.write_through {
                        self.copy_down(rank + 1, trips, unparsed).await;
                    }
                    return Ok(Served {
                        value,
                        served_by: backend.kind(),
                        failures,
                    });
                }
                Err(e) => Self::record_failure(&mut failures, backend.as_ref(), "save", e),
            }
        }
        Err(Self::exhausted(failures))
    }

    async fn copy_down(&self, from_rank: usize, trips: &[Trip], unparsed: &[Value]) {
        for backend in self.backends.iter().skip(from_rank) {
            if let Err(e) = backend.save(trips, unparsed).await {
                tracing::warn!("⚠️ Write-through to {} backend failed: {}", backend.kind(), e);
            }
        }
    }

    pub async fn append_activity(&self, entry: &ActivityEntry) -> Result<Served<()>> {
        let mut failures = Vec::new();
        for backend in self.backends.iter().filter(|backend| backend.keeps_activity()) {
            match backend.append_activity(entry).await {
                Ok(()) => {
                    return Ok(Served {
                        value: (),
                        served_by: backend.kind(),
                        failures,
                    })
                }
                Err(e) => {
                    Self::record_failure(&mut failures, backend.as_ref(), "log activity", e)
                }
            }
        }
        Err(Self::exhausted(failures))
    }

    pub async fn activity(&self) -> Result<Served<Vec<ActivityEntry>>> {
        let mut failures = Vec::new();
        for backend in self.backends.iter().filter(|backend| backend.keeps_activity()) {
            match backend.activity().await {
                Ok(value) => {
                    return Ok(Served {
                        value,
                        served_by: backend.kind(),
                        failures,
                    })
                }
                Err(e) => {
                    Self::record_failure(&mut failures, backend.as_ref(), "read activity", e)
                }
            }
        }
        Err(Self::exhausted(failures))
    }

    /// Clears every backend not listed in `keep`. A rejected admin password
    /// aborts before any lower-ranked backend is touched.
    pub async fn clear(
        &self,
        admin_password: Option<&str>,
        keep: &[BackendKind],
    ) -> Result<ClearReport> {
        let mut cleared = Vec::new();
        let mut kept = Vec::new();
        let mut failures = Vec::new();

        for backend in &self.backends {
            if keep.contains(&backend.kind()) {
                kept.push(backend.kind());
                continue;
            }
            match backend.clear(admin_password).await {
                Ok(()) => cleared.push(backend.kind()),
                Err(e @ TrackerError::Unauthorized { .. }) => return Err(e),
                Err(e) => Self::record_failure(&mut failures, backend.as_ref(), "clear", e),
            }
        }

        if cleared.is_empty() && !failures.is_empty() {
            return Err(Self::exhausted(failures));
        }
        Ok(ClearReport {
            cleared,
            kept,
            failures,
        })
    }
}
