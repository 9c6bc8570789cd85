use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapters::fallback::{ClearReport, FallbackStore};
use crate::core::days::{aggregate_country_totals, enumerate_available_years};
use crate::core::report::{organize_by_year, YearSummary};
use crate::core::thresholds::{default_rules, evaluate, ThresholdStatus};
use crate::domain::migration::{decode_app_data, encode_trips, ImportReport};
use crate::domain::model::{
    generate_trip_id, ActivityEntry, AppData, BackendKind, CountryTotals, NewTrip, Served,
    StoreSnapshot, ThresholdRule, Traveler, Trip, TripUpdate,
};
use crate::domain::ports::TripStore;
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::validate_trip_dates;

#[derive(Debug, Clone, Serialize)]
pub struct TravelerStats {
    pub traveler: Traveler,
    pub year: i32,
    pub totals: CountryTotals,
    pub trip_count: usize,
    pub thresholds: Vec<ThresholdStatus>,
}

/// Trip bookkeeping on top of an injected backend chain.
///
/// Every mutation is load, modify, save. The save starts at the backend that
/// served the load, and records that did not decode are written back with it.
/// The acting `user` is recorded in the activity log, which is written
/// best-effort after each mutation.
pub struct TripTracker {
    store: FallbackStore,
    user: String,
    thresholds: Vec<ThresholdRule>,
}

fn chain<A, T>(first: Served<A>, then: Served<T>) -> Served<T> {
    let mut failures = first.failures;
    failures.extend(then.failures);
    Served {
        value: then.value,
        served_by: then.served_by,
        failures,
    }
}

impl TripTracker {
    pub fn new(store: FallbackStore, user: impl Into<String>) -> Self {
        Self {
            store,
            user: user.into(),
            thresholds: default_rules(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Vec<ThresholdRule>) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn store(&self) -> &FallbackStore {
        &self.store
    }

    pub async fn load(&self) -> Result<Served<StoreSnapshot>> {
        self.store.load().await
    }

    /// Trips for one traveler (or everyone), most recent departure first.
    pub async fn trips(&self, traveler: Option<Traveler>) -> Result<Served<Vec<Trip>>> {
        let served = self.store.load().await?;
        Ok(served.map(|snapshot| {
            let mut trips: Vec<Trip> = snapshot
                .trips
                .into_iter()
                .filter(|trip| traveler.map_or(true, |t| trip.traveler == t))
                .collect();
            trips.sort_by(|a, b| b.departure_date.cmp(&a.departure_date));
            trips
        }))
    }

    pub async fn add_trip(&self, new_trip: NewTrip) -> Result<Served<Trip>> {
        validate_trip_dates(new_trip.departure_date, new_trip.arrival_date)?;

        let loaded = self.store.load().await?;
        let mut trips = loaded.value.trips.clone();
        let trip = Trip {
            id: generate_trip_id(Utc::now(), &trips),
            traveler: new_trip.traveler,
            country: new_trip.country,
            departure_date: new_trip.departure_date,
            arrival_date: new_trip.arrival_date,
            notes: new_trip.notes.filter(|notes| !notes.trim().is_empty()),
        };
        trips.push(trip.clone());

        let saved = self.save_loaded(&loaded, &trips).await?;
        tracing::info!("✅ Added trip {} ({} days)", trip.id, trip.total_days());
        self.log(
            "add",
            format!(
                "{} {} {} to {}",
                trip.traveler, trip.country, trip.departure_date, trip.arrival_date
            ),
        )
        .await;

        Ok(chain(loaded, saved).map(|_| trip))
    }

    pub async fn update_trip(&self, id: &str, update: TripUpdate) -> Result<Served<Trip>> {
        let loaded = self.store.load().await?;
        let mut trips = loaded.value.trips.clone();
        let slot = trips
            .iter_mut()
            .find(|trip| trip.id == id)
            .ok_or_else(|| TrackerError::TripNotFound { id: id.to_string() })?;

        let updated = update.apply_to(slot);
        validate_trip_dates(updated.departure_date, updated.arrival_date)?;
        *slot = updated.clone();

        let saved = self.save_loaded(&loaded, &trips).await?;
        tracing::info!("✅ Updated trip {}", id);
        self.log("update", format!("trip {}", id)).await;

        Ok(chain(loaded, saved).map(|_| updated))
    }

    pub async fn delete_trip(&self, id: &str) -> Result<Served<Trip>> {
        let loaded = self.store.load().await?;
        let mut trips = loaded.value.trips.clone();
        let position = trips
            .iter()
            .position(|trip| trip.id == id)
            .ok_or_else(|| TrackerError::TripNotFound { id: id.to_string() })?;
        let removed = trips.remove(position);

        let saved = self.save_loaded(&loaded, &trips).await?;
        tracing::info!("🗑️ Deleted trip {}", id);
        self.log("delete", format!("trip {}", id)).await;

        Ok(chain(loaded, saved).map(|_| removed))
    }

    /// Replaces the whole collection with the decodable records of `text`.
    pub async fn import_json(&self, text: &str) -> Result<Served<ImportReport>> {
        let report = decode_app_data(text)?;
        let saved = self.store.save(&report.trips, &report.unparsed).await?;

        tracing::info!(
            "📥 Imported {} trips ({} skipped, {} defaulted to {})",
            report.trips.len(),
            report.skipped.len(),
            report.defaulted_travelers,
            Traveler::default()
        );
        self.log(
            "import",
            format!("{} trips, {} skipped", report.trips.len(), report.skipped.len()),
        )
        .await;

        Ok(saved.map(|_| report))
    }

    pub async fn export_json(&self) -> Result<Served<String>> {
        let served = self.store.load().await?;
        let data = AppData {
            trips: encode_trips(&served.value.trips, &served.value.unparsed)?,
            last_updated: Utc::now(),
        };
        let text = serde_json::to_string_pretty(&data)?;
        Ok(served.map(|_| text))
    }

    /// Clears every backend except those listed in `keep`.
    pub async fn clear_all(
        &self,
        admin_password: Option<&str>,
        keep: &[BackendKind],
    ) -> Result<ClearReport> {
        let report = self.store.clear(admin_password, keep).await?;
        tracing::info!(
            "🧹 Cleared {} backend(s), kept {}, {} failed",
            report.cleared.len(),
            report.kept.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Copies the current collection to one backend, replacing its copy.
    pub async fn push_to(&self, target: BackendKind) -> Result<Served<usize>> {
        let loaded = self.store.load().await?;
        let backend = self.backend(target)?;
        backend
            .save(&loaded.value.trips, &loaded.value.unparsed)
            .await?;

        let count = loaded.value.trips.len();
        tracing::info!("📤 Pushed {} trips to the {} store", count, target);
        self.log("sync", format!("pushed {} trips to {}", count, target))
            .await;
        Ok(loaded.map(|_| count))
    }

    /// Replaces the collection with the copy held by one backend.
    pub async fn pull_from(&self, source: BackendKind) -> Result<Served<usize>> {
        let snapshot = self.backend(source)?.load().await?;
        let saved = self.store.save(&snapshot.trips, &snapshot.unparsed).await?;

        let count = snapshot.trips.len();
        tracing::info!("📥 Pulled {} trips from the {} store", count, source);
        self.log("sync", format!("pulled {} trips from {}", count, source))
            .await;
        Ok(saved.map(|_| count))
    }

    fn backend(&self, kind: BackendKind) -> Result<&dyn TripStore> {
        self.store.backend(kind).ok_or_else(|| TrackerError::ConfigError {
            message: format!("no {} store is configured", kind),
        })
    }

    pub async fn activity(&self) -> Result<Served<Vec<ActivityEntry>>> {
        self.store.activity().await
    }

    pub async fn stats(&self, traveler: Traveler, year: i32) -> Result<Served<TravelerStats>> {
        let served = self.store.load().await?;
        Ok(served.map(|snapshot| {
            let totals = aggregate_country_totals(&snapshot.trips, traveler, year);
            TravelerStats {
                traveler,
                year,
                trip_count: snapshot
                    .trips
                    .iter()
                    .filter(|trip| trip.traveler == traveler)
                    .count(),
                thresholds: evaluate(&totals, &self.thresholds),
                totals,
            }
        }))
    }

    pub async fn available_years(&self, current_year: i32) -> Result<Served<Vec<i32>>> {
        let served = self.store.load().await?;
        Ok(served.map(|snapshot| enumerate_available_years(&snapshot.trips, current_year)))
    }

    pub async fn report(&self) -> Result<Served<Vec<YearSummary>>> {
        let served = self.store.load().await?;
        Ok(served.map(|snapshot| organize_by_year(&snapshot.trips)))
    }

    async fn save_loaded(
        &self,
        loaded: &Served<StoreSnapshot>,
        trips: &[Trip],
    ) -> Result<Served<DateTime<Utc>>> {
        self.store
            .save_from(loaded.served_by, trips, &loaded.value.unparsed)
            .await
    }

    async fn log(&self, action: &str, details: String) {
        let entry = ActivityEntry {
            timestamp: Utc::now(),
            action: action.to_string(),
            user: self.user.clone(),
            details,
        };
        if let Err(e) = self.store.append_activity(&entry).await {
            tracing::warn!("⚠️ Failed to log activity '{}': {}", action, e);
        }
    }
}
