//! Age Calculation
//!
//! Whole-month ages between calendar dates. Invalid input never fails:
//! it yields an age of zero so age-dependent views degrade to newborn
//! behavior instead of erroring.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parse an ISO-8601 calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (the calendar date in the
/// timestamp's own offset) and naive `YYYY-MM-DDTHH:MM:SS[.fff]`.
pub fn parse_iso_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Parse an ISO-8601 date or timestamp into a point in time for ordering.
///
/// Bare dates are taken at midnight. RFC 3339 timestamps are normalized to
/// UTC so offsets compare correctly; naive timestamps are used as given.
pub fn parse_iso_instant(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.naive_utc()))
        .or_else(|| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

/// Whole months from `birth` to `reference`.
///
/// A month is counted once the reference date reaches the day-of-month of
/// the birth anniversary. A reference date before the birth date gives 0.
pub fn months_between_dates(birth: NaiveDate, reference: NaiveDate) -> u32 {
    let mut months = (reference.year() - birth.year()) * 12
        + (reference.month() as i32 - birth.month() as i32);
    if reference.day() < birth.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Whole months between two ISO date strings, 0 if either is unparseable.
pub fn months_between(birth_iso: &str, reference_iso: &str) -> u32 {
    match (parse_iso_date(birth_iso), parse_iso_date(reference_iso)) {
        (Some(birth), Some(reference)) => months_between_dates(birth, reference),
        _ => {
            debug!(birth = birth_iso, reference = reference_iso, "unparseable date, age defaults to 0");
            0
        }
    }
}

/// Age in months on `today` for an optional birth date.
pub fn age_in_months_on(birth_iso: Option<&str>, today: NaiveDate) -> u32 {
    match birth_iso.and_then(parse_iso_date) {
        Some(birth) => months_between_dates(birth, today),
        None => {
            debug!(birth = ?birth_iso, "missing or unparseable birth date, age defaults to 0");
            0
        }
    }
}

/// Years-and-months split of a whole-month age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBreakdown {
    pub years: u32,
    pub months: u32,
}

impl AgeBreakdown {
    pub fn from_months(total_months: u32) -> Self {
        AgeBreakdown {
            years: total_months / 12,
            months: total_months % 12,
        }
    }

    pub fn total_months(&self) -> u32 {
        self.years * 12 + self.months
    }

    /// Less than one whole month old
    pub fn is_newborn(&self) -> bool {
        self.total_months() == 0
    }
}
