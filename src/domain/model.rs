use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::error::TrackerError;

/// Records written before travelers were tracked belong to the first traveler,
/// hence the default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Traveler {
    #[default]
    #[serde(rename = "Person 1")]
    PersonOne,
    #[serde(rename = "Person 2")]
    PersonTwo,
}

impl Traveler {
    pub const ALL: [Traveler; 2] = [Traveler::PersonOne, Traveler::PersonTwo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Traveler::PersonOne => "Person 1",
            Traveler::PersonTwo => "Person 2",
        }
    }
}

impl fmt::Display for Traveler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Traveler {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "person1" | "1" => Ok(Traveler::PersonOne),
            "person2" | "2" => Ok(Traveler::PersonTwo),
            _ => Err(TrackerError::validation(format!("unknown traveler '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Country {
    Greece,
    #[serde(rename = "UK")]
    Uk,
}

impl Country {
    /// Every tracked country. Totals are seeded with a zero for each entry.
    pub const ALL: [Country; 2] = [Country::Greece, Country::Uk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Greece => "Greece",
            Country::Uk => "UK",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Country {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Country::ALL
            .into_iter()
            .find(|country| country.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TrackerError::validation(format!("unknown country '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub traveler: Traveler,
    pub country: Country,
    pub departure_date: NaiveDate,
    pub arrival_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Trip {
    /// Departure and arrival in chronological order.
    pub fn span(&self) -> (NaiveDate, NaiveDate) {
        if self.departure_date <= self.arrival_date {
            (self.departure_date, self.arrival_date)
        } else {
            (self.arrival_date, self.departure_date)
        }
    }

    /// Arrival before departure. Such records still count, but are suspect.
    pub fn is_reversed(&self) -> bool {
        self.arrival_date < self.departure_date
    }

    pub fn total_days(&self) -> i64 {
        crate::core::days::inclusive_day_count(self.departure_date, self.arrival_date)
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        let (start, end) = self.span();
        start.year()..=end.year()
    }
}

/// The full trip list for all travelers, in insertion order.
pub type TripCollection = Vec<Trip>;

/// Trip ids are epoch milliseconds, bumped until they are unused.
pub fn generate_trip_id(now: DateTime<Utc>, existing: &[Trip]) -> String {
    let mut candidate = now.timestamp_millis();
    while existing.iter().any(|trip| trip.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrip {
    pub traveler: Traveler,
    pub country: Country,
    pub departure_date: NaiveDate,
    pub arrival_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripUpdate {
    pub traveler: Option<Traveler>,
    pub country: Option<Country>,
    pub departure_date: Option<NaiveDate>,
    pub arrival_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl TripUpdate {
    pub fn apply_to(self, trip: &Trip) -> Trip {
        Trip {
            id: trip.id.clone(),
            traveler: self.traveler.unwrap_or(trip.traveler),
            country: self.country.unwrap_or(trip.country),
            departure_date: self.departure_date.unwrap_or(trip.departure_date),
            arrival_date: self.arrival_date.unwrap_or(trip.arrival_date),
            notes: match self.notes {
                Some(notes) if notes.trim().is_empty() => None,
                Some(notes) => Some(notes),
                None => trip.notes.clone(),
            },
        }
    }
}

/// Per-country day totals for one traveler and one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryTotals(BTreeMap<Country, i64>);

impl CountryTotals {
    pub fn zeroed() -> Self {
        Self(Country::ALL.into_iter().map(|country| (country, 0)).collect())
    }

    pub fn add(&mut self, country: Country, days: i64) {
        *self.0.entry(country).or_insert(0) += days;
    }

    pub fn get(&self, country: Country) -> i64 {
        self.0.get(&country).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Country, i64)> + '_ {
        self.0.iter().map(|(country, days)| (*country, *days))
    }
}

impl Default for CountryTotals {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub country: Country,
    pub max_days: u32,
}

/// The persisted document: `{ "trips": [...], "lastUpdated": "..." }`.
///
/// `trips` holds the records as stored, including any that did not decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub trips: Vec<serde_json::Value>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub user: String,
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub trips: TripCollection,
    /// Stored records that did not decode. They are written back untouched
    /// on every save and never reach the totals.
    pub unparsed: Vec<serde_json::Value>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Where the GitHub sync file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubTarget {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Remote,
    Github,
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Remote => "remote",
            BackendKind::Github => "github",
            BackendKind::Local => "local",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub backend: BackendKind,
    pub error: String,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.error)
    }
}

/// A value plus the backend that produced it and the backends that failed before it.
#[derive(Debug, Clone)]
pub struct Served<T> {
    pub value: T,
    pub served_by: BackendKind,
    pub failures: Vec<BackendFailure>,
}

impl<T> Served<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Served<U> {
        Served {
            value: f(self.value),
            served_by: self.served_by,
            failures: self.failures,
        }
    }

    /// True when a higher-ranked backend failed and a fallback answered.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}
