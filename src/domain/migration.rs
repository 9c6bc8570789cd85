//! Lenient decoding of stored and imported trip records.
//!
//! Older exports have no `traveler` field, ids may be numbers or missing, and
//! dates may be full timestamps. Each record is validated on its own: a bad
//! record is skipped with a warning and never reaches the day totals, but its
//! raw JSON is kept in [`ImportReport::unparsed`] so a later save writes it back.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::model::{Country, Traveler, Trip, TripCollection};
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::parse_date;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub trips: TripCollection,
    pub last_updated: Option<DateTime<Utc>>,
    pub skipped: Vec<SkippedRecord>,
    /// Raw JSON of the skipped records, in their original order.
    pub unparsed: Vec<Value>,
    pub defaulted_travelers: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrip {
    id: Option<Value>,
    traveler: Option<String>,
    country: Option<String>,
    departure_date: Option<String>,
    arrival_date: Option<String>,
    notes: Option<String>,
}

/// Decodes an exported document: either `{ "trips": [...], "lastUpdated": ... }`
/// or a bare array of trips.
pub fn decode_app_data(text: &str) -> Result<ImportReport> {
    let document: Value = serde_json::from_str(text)?;

    let (records, last_updated) = match document {
        Value::Array(records) => (records, None),
        Value::Object(mut object) => {
            let last_updated = object
                .get("lastUpdated")
                .and_then(Value::as_str)
                .and_then(parse_timestamp);
            let records = match object.remove("trips") {
                Some(Value::Array(records)) => records,
                Some(Value::Null) | None => Vec::new(),
                Some(_) => {
                    return Err(TrackerError::validation("'trips' must be an array"));
                }
            };
            (records, last_updated)
        }
        _ => {
            return Err(TrackerError::validation(
                "expected an object with a 'trips' array, or an array of trips",
            ))
        }
    };

    let mut report = decode_trips(records);
    report.last_updated = last_updated;
    Ok(report)
}

pub fn decode_trips(records: Vec<Value>) -> ImportReport {
    let mut report = ImportReport::default();

    for (index, record) in records.into_iter().enumerate() {
        let raw: RawTrip = match RawTrip::deserialize(&record) {
            Ok(raw) => raw,
            Err(e) => {
                skip(&mut report, index, None, record, format!("not a trip record: {}", e));
                continue;
            }
        };

        let id = raw.id.as_ref().and_then(id_to_string);
        match migrate(index, raw, &report.trips) {
            Ok((trip, defaulted)) => {
                if defaulted {
                    report.defaulted_travelers += 1;
                }
                report.trips.push(trip);
            }
            Err(e) => skip(&mut report, index, id, record, e.to_string()),
        }
    }

    report
}

/// The stored form of a collection: decoded trips first, then the records
/// that did not decode, unchanged.
pub fn encode_trips(trips: &[Trip], unparsed: &[Value]) -> Result<Vec<Value>> {
    let mut records = trips
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    records.extend(unparsed.iter().cloned());
    Ok(records)
}

fn migrate(index: usize, raw: RawTrip, accepted: &[Trip]) -> Result<(Trip, bool)> {
    let departure_date = parse_date(
        "departureDate",
        raw.departure_date.as_deref().unwrap_or_default(),
    )?;
    let arrival_date = parse_date(
        "arrivalDate",
        raw.arrival_date.as_deref().unwrap_or_default(),
    )?;
    let country: Country = raw
        .country
        .as_deref()
        .ok_or_else(|| TrackerError::validation("country is missing"))?
        .parse()?;

    let (traveler, defaulted) = match raw.traveler.as_deref() {
        Some(name) if !name.trim().is_empty() => (name.parse::<Traveler>()?, false),
        _ => (Traveler::default(), true),
    };

    let id = match raw.id.as_ref().and_then(id_to_string) {
        Some(id) if !accepted.iter().any(|trip| trip.id == id) => id,
        _ => derived_trip_id(index, departure_date, accepted),
    };

    let notes = raw.notes.filter(|notes| !notes.trim().is_empty());

    Ok((
        Trip {
            id,
            traveler,
            country,
            departure_date,
            arrival_date,
            notes,
        },
        defaulted,
    ))
}

/// Id for a record stored without a usable one. It depends only on the record's
/// position and departure, so it is the same on every load until the next save
/// persists it.
fn derived_trip_id(index: usize, departure: NaiveDate, accepted: &[Trip]) -> String {
    let base = format!("legacy-{}-{}", departure.format("%Y%m%d"), index);
    let mut candidate = base.clone();
    let mut suffix = 1;
    while accepted.iter().any(|trip| trip.id == candidate) {
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
    candidate
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|stamp| stamp.with_timezone(&Utc))
}

fn skip(
    report: &mut ImportReport,
    index: usize,
    id: Option<String>,
    record: Value,
    reason: String,
) {
    tracing::warn!(
        "⚠️ Skipping trip record #{} ({}): {}",
        index,
        id.as_deref().unwrap_or("no id"),
        reason
    );
    report.skipped.push(SkippedRecord { index, id, reason });
    report.unparsed.push(record);
}
