//! Data models for workouts, users and derived chart points.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::store::Document;
use crate::error::{TrackerError, TrackerResult};

/// Date format accepted from the form and stored on new records
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A persisted workout entry.
///
/// Serialized field names match the stored document shape:
/// `date, exercise, sets, reps, weight, userId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    /// Store-assigned document id (not part of the document body)
    #[serde(skip)]
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: u32,
}

impl WorkoutRecord {
    /// Decode a store document into a record
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        let mut record: WorkoutRecord =
            serde_json::from_value(serde_json::Value::Object(doc.data))?;
        record.id = doc.id;
        Ok(record)
    }

    /// Training volume: sets × reps × weight
    pub fn volume(&self) -> u64 {
        u64::from(self.sets) * u64::from(self.reps) * u64::from(self.weight)
    }

    /// Stringified value of one column, as shown in the table
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Date => self.date.clone(),
            Column::Exercise => self.exercise.clone(),
            Column::Sets => self.sets.to_string(),
            Column::Reps => self.reps.to_string(),
            Column::Weight => self.weight.to_string(),
        }
    }
}

/// A workout that has not been persisted yet (no id, no owner)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkout {
    pub date: String,
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: u32,
}

impl From<&WorkoutRecord> for NewWorkout {
    fn from(record: &WorkoutRecord) -> Self {
        NewWorkout {
            date: record.date.clone(),
            exercise: record.exercise.clone(),
            sets: record.sets,
            reps: record.reps,
            weight: record.weight,
        }
    }
}

/// Partial update of a workout. `None` fields are left untouched.
///
/// Has no `user_id`: ownership is fixed when the workout is added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkoutPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

impl WorkoutPatch {
    /// Build a single-field patch from raw cell text, validating it for the column
    pub fn for_cell(column: Column, raw: &str) -> TrackerResult<Self> {
        let mut patch = WorkoutPatch::default();
        match column {
            Column::Date => patch.date = Some(parse_date(raw)?),
            Column::Exercise => patch.exercise = Some(parse_exercise(raw)?),
            Column::Sets => patch.sets = Some(parse_count("sets", raw)?),
            Column::Reps => patch.reps = Some(parse_count("reps", raw)?),
            Column::Weight => patch.weight = Some(parse_count("weight", raw)?),
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.exercise.is_none()
            && self.sets.is_none()
            && self.reps.is_none()
            && self.weight.is_none()
    }
}

impl From<NewWorkout> for WorkoutPatch {
    fn from(workout: NewWorkout) -> Self {
        WorkoutPatch {
            date: Some(workout.date),
            exercise: Some(workout.exercise),
            sets: Some(workout.sets),
            reps: Some(workout.reps),
            weight: Some(workout.weight),
        }
    }
}

/// How a column's values compare when sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Integer,
}

/// Table columns, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Date,
    Exercise,
    Sets,
    Reps,
    Weight,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::Date,
        Column::Exercise,
        Column::Sets,
        Column::Reps,
        Column::Weight,
    ];

    /// Stable identifier, also the document field name
    pub fn id(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Exercise => "exercise",
            Column::Sets => "sets",
            Column::Reps => "reps",
            Column::Weight => "weight",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Exercise => "Exercise",
            Column::Sets => "Sets",
            Column::Reps => "Reps",
            Column::Weight => "Weight",
        }
    }

    pub fn value_type(self) -> ValueType {
        match self {
            Column::Date | Column::Exercise => ValueType::Text,
            Column::Sets | Column::Reps | Column::Weight => ValueType::Integer,
        }
    }

    /// Position in [`Column::ALL`]
    #[cfg(test)]
    pub fn index(self) -> usize {
        Column::ALL.iter().position(|c| *c == self).unwrap_or(0)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Column {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                TrackerError::validation(format!(
                    "unknown column '{s}' (expected one of: date, exercise, sets, reps, weight)"
                ))
            })
    }
}

/// Total training volume for one date. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPoint {
    pub date: String,
    pub total_volume: u64,
}

/// A signed-up user as seen by the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub display_name: String,
}

/// Validate a `YYYY-MM-DD` date string
pub fn parse_date(raw: &str) -> TrackerResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::validation("date is required"));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .map_err(|_| TrackerError::validation(format!("date '{trimmed}' is not YYYY-MM-DD")))
}

/// Validate a free-text exercise label
pub fn parse_exercise(raw: &str) -> TrackerResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::validation("exercise is required"));
    }
    Ok(trimmed.to_string())
}

/// Validate a non-negative whole number field (sets, reps, weight)
pub fn parse_count(field: &str, raw: &str) -> TrackerResult<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::validation(format!("{field} is required")));
    }
    trimmed.parse::<u32>().map_err(|_| {
        TrackerError::validation(format!(
            "{field} must be a non-negative whole number, got '{trimmed}'"
        ))
    })
}
