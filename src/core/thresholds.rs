use serde::Serialize;

use crate::domain::model::{Country, CountryTotals, ThresholdRule};

/// The usual residency test: more than 183 days in a calendar year.
pub const DEFAULT_RESIDENCY_DAYS: u32 = 183;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdStatus {
    pub country: Country,
    pub used: i64,
    pub limit: u32,
    pub remaining: i64,
    pub exceeded: bool,
}

pub fn default_rules() -> Vec<ThresholdRule> {
    Country::ALL
        .into_iter()
        .map(|country| ThresholdRule {
            country,
            max_days: DEFAULT_RESIDENCY_DAYS,
        })
        .collect()
}

/// One status per rule, in rule order. Countries without a rule are not reported.
pub fn evaluate(totals: &CountryTotals, rules: &[ThresholdRule]) -> Vec<ThresholdStatus> {
    rules
        .iter()
        .map(|rule| {
            let used = totals.get(rule.country);
            let limit = i64::from(rule.max_days);
            ThresholdStatus {
                country: rule.country,
                used,
                limit: rule.max_days,
                remaining: (limit - used).max(0),
                exceeded: used > limit,
            }
        })
        .collect()
}
