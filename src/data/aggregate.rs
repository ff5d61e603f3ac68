//! Per-day training volume.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};

use super::models::{AggregatedPoint, WorkoutRecord, DATE_FORMAT};

/// Parse a stored date string into a calendar date.
///
/// Stored dates are `YYYY-MM-DD`, but documents written by other clients may
/// carry a full timestamp or a US-style date.
pub fn parse_calendar_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(date).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDate::parse_from_str(date, "%m/%d/%Y"))
        .ok()
}

/// Group records by their exact `date` string and sum `sets * reps * weight`.
///
/// Output is ordered by calendar date. Groups whose date cannot be parsed go
/// last. Equal keys keep the order in which their date first appeared.
pub fn aggregate(records: &[WorkoutRecord]) -> Vec<AggregatedPoint> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut points: Vec<AggregatedPoint> = Vec::new();

    for record in records {
        let slot = *index.entry(record.date.as_str()).or_insert_with(|| {
            points.push(AggregatedPoint {
                date: record.date.clone(),
                total_volume: 0,
            });
            points.len() - 1
        });
        points[slot].total_volume += record.volume();
    }

    // Option<NaiveDate> orders None first, so flip the flag to put unparseable dates last
    points.sort_by_cached_key(|p| {
        let parsed = parse_calendar_date(&p.date);
        (parsed.is_none(), parsed)
    });
    points
}
