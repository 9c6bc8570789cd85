//! Per-year travel summaries, rendered as a plain-text report or CSV.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::days::days_overlapping_year;
use crate::domain::model::{Country, CountryTotals, Traveler, Trip};
use crate::utils::error::{Result, TrackerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub country: Country,
    pub departure: NaiveDate,
    pub arrival: NaiveDate,
    pub days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TravelerYear {
    pub trips: Vec<ReportLine>,
    pub totals: CountryTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub travelers: BTreeMap<Traveler, TravelerYear>,
}

impl YearSummary {
    fn new(year: i32) -> Self {
        Self {
            year,
            travelers: Traveler::ALL
                .into_iter()
                .map(|traveler| (traveler, TravelerYear::default()))
                .collect(),
        }
    }
}

/// Groups trips by every calendar year they touch, newest year first.
///
/// A trip contributes a line to a year only when it overlaps that year by at
/// least one day. Years touched with zero overlap still get an (empty) summary.
pub fn organize_by_year(trips: &[Trip]) -> Vec<YearSummary> {
    let years: BTreeSet<i32> = trips.iter().flat_map(Trip::years).collect();
    let mut summaries: BTreeMap<i32, YearSummary> = years
        .into_iter()
        .map(|year| (year, YearSummary::new(year)))
        .collect();

    for trip in trips {
        for year in trip.years() {
            let days = days_overlapping_year(trip.departure_date, trip.arrival_date, year);
            if days <= 0 {
                continue;
            }
            let Some(entry) = summaries
                .get_mut(&year)
                .and_then(|summary| summary.travelers.get_mut(&trip.traveler))
            else {
                continue;
            };
            entry.trips.push(ReportLine {
                country: trip.country,
                departure: trip.departure_date,
                arrival: trip.arrival_date,
                days,
            });
            entry.totals.add(trip.country, days);
        }
    }

    let mut summaries: Vec<YearSummary> = summaries.into_values().rev().collect();
    for summary in &mut summaries {
        for traveler_year in summary.travelers.values_mut() {
            traveler_year.trips.sort_by_key(|line| line.departure);
        }
    }
    summaries
}

/// `1 Jun 2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

fn breakdown(totals: &CountryTotals) -> String {
    totals
        .iter()
        .map(|(country, days)| format!("{}: {} days", country, days))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_text(summaries: &[YearSummary], generated_on: NaiveDate) -> String {
    let mut out = String::new();
    out.push_str("Travel Day Summary Report\n");
    out.push_str(&format!("Generated on {}\n", generated_on.format("%d/%m/%Y")));

    if summaries.is_empty() {
        out.push_str("\nNo trips recorded.\n");
        return out;
    }

    if summaries.len() > 1 {
        let mut headers = vec!["Year".to_string()];
        for traveler in Traveler::ALL {
            headers.push(traveler.to_string());
            headers.push(format!("{} Total", traveler));
        }
        let mut table = TextTable::new(headers);
        for summary in summaries {
            let mut row = vec![summary.year.to_string()];
            for traveler in Traveler::ALL {
                let totals = summary
                    .travelers
                    .get(&traveler)
                    .map(|t| t.totals.clone())
                    .unwrap_or_default();
                row.push(breakdown(&totals));
                row.push(format!("{} days", totals.total()));
            }
            table.push(row);
        }
        out.push_str("\nOverall Summary\n");
        out.push_str(&table.render());
    }

    for summary in summaries {
        out.push_str(&format!("\n{}\n", summary.year));
        let mut table = TextTable::new(vec![
            "Traveler".to_string(),
            "Country".to_string(),
            "Departure".to_string(),
            "Arrival".to_string(),
            format!("Days in {}", summary.year),
        ]);

        for (traveler, traveler_year) in &summary.travelers {
            table.push(vec![
                traveler.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ]);

            if traveler_year.trips.is_empty() {
                table.push(vec![
                    String::new(),
                    "No trips".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                ]);
            }
            for line in &traveler_year.trips {
                table.push(vec![
                    String::new(),
                    line.country.to_string(),
                    format_date(line.departure),
                    format_date(line.arrival),
                    format!("{} days", line.days),
                ]);
            }

            for (country, days) in traveler_year.totals.iter() {
                table.push(vec![
                    String::new(),
                    format!("TOTAL {}", country),
                    String::new(),
                    String::new(),
                    format!("{} days", days),
                ]);
            }
            table.push(vec![
                String::new(),
                "TOTAL".to_string(),
                String::new(),
                String::new(),
                format!("{} days", traveler_year.totals.total()),
            ]);
        }
        out.push_str(&table.render());
    }

    out
}

pub fn render_csv(summaries: &[YearSummary]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["year", "traveler", "country", "departure", "arrival", "days"])?;

    for summary in summaries {
        for (traveler, traveler_year) in &summary.travelers {
            for line in &traveler_year.trips {
                writer.write_record([
                    summary.year.to_string(),
                    traveler.to_string(),
                    line.country.to_string(),
                    line.departure.to_string(),
                    line.arrival.to_string(),
                    line.days.to_string(),
                ])?;
            }
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TrackerError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| TrackerError::ValidationError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };
        let rule = widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-");

        let mut out = String::new();
        out.push_str(&line(&self.headers));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}
