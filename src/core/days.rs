//! Day accounting over trip date ranges.
//!
//! All functions here are pure. Two counting conventions coexist and callers
//! depend on both:
//!
//! * [`inclusive_day_count`] counts both the departure and the arrival day, so a
//!   same-day trip is 1 day.
//! * [`days_overlapping_year`] counts the *difference* between the clamped
//!   endpoints with no `+1`, so a trip contained in one year yields one day less
//!   than its inclusive count. Yearly totals are sums of this value.

use chrono::{Datelike, Local, NaiveDate};
use std::collections::BTreeSet;

use crate::domain::model::{CountryTotals, Traveler, Trip};

/// Calendar days spanned by `start..=end`, in either argument order.
///
/// Reversed ranges are accepted and counted by magnitude. Such a trip is
/// flagged by [`Trip::is_reversed`] rather than rejected here.
pub fn inclusive_day_count(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().abs() + 1
}

/// Days of `start..end` that fall inside calendar `year`, without the inclusive `+1`.
///
/// The range is clamped to `[Jan 1, Dec 31]` of `year`. An empty clamp yields 0.
pub fn days_overlapping_year(start: NaiveDate, end: NaiveDate, year: i32) -> i64 {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };

    let (Some(year_start), Some(year_end)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return 0;
    };

    let overlap_start = start.max(year_start);
    let overlap_end = end.min(year_end);

    if overlap_start > overlap_end {
        return 0;
    }

    (overlap_end - overlap_start).num_days()
}

/// Per-country overlap totals for one traveler in one year.
///
/// Every country in [`crate::domain::model::Country::ALL`] is present, even at zero.
pub fn aggregate_country_totals(trips: &[Trip], traveler: Traveler, year: i32) -> CountryTotals {
    let mut totals = CountryTotals::zeroed();

    for trip in trips.iter().filter(|trip| trip.traveler == traveler) {
        let days = days_overlapping_year(trip.departure_date, trip.arrival_date, year);
        if days > 0 {
            totals.add(trip.country, days);
        }
    }

    totals
}

/// Every year touched by any trip plus `current_year`, most recent first.
pub fn enumerate_available_years(trips: &[Trip], current_year: i32) -> Vec<i32> {
    let mut years: BTreeSet<i32> = trips.iter().flat_map(Trip::years).collect();
    years.insert(current_year);
    years.into_iter().rev().collect()
}

pub fn current_year() -> i32 {
    Local::now().year()
}
