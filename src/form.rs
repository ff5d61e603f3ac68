//! Entry form state for adding a workout or rewriting an existing one.

use chrono::Local;

use crate::data::{parse_count, parse_date, parse_exercise, NewWorkout, WorkoutRecord, DATE_FORMAT};
use crate::error::TrackerResult;

/// Form fields in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Date,
    Exercise,
    Sets,
    Reps,
    Weight,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Date,
        FormField::Exercise,
        FormField::Sets,
        FormField::Reps,
        FormField::Weight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Date => "Date",
            FormField::Exercise => "Exercise",
            FormField::Sets => "Sets",
            FormField::Reps => "Reps",
            FormField::Weight => "Weight",
        }
    }

    pub fn next(self) -> Self {
        let i = FormField::ALL.iter().position(|f| *f == self).unwrap_or(0);
        FormField::ALL[(i + 1) % FormField::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = FormField::ALL.iter().position(|f| *f == self).unwrap_or(0);
        FormField::ALL[(i + FormField::ALL.len() - 1) % FormField::ALL.len()]
    }
}

/// Raw text of the entry form plus the record being rewritten, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutForm {
    pub date: String,
    pub exercise: String,
    pub sets: String,
    pub reps: String,
    pub weight: String,
    /// Id of the workout loaded by `load`; `None` means the form adds a new one
    pub editing_id: Option<String>,
    pub focused: FormField,
}

impl Default for WorkoutForm {
    fn default() -> Self {
        WorkoutForm {
            date: Local::now().date_naive().format(DATE_FORMAT).to_string(),
            exercise: String::new(),
            sets: String::new(),
            reps: String::new(),
            weight: String::new(),
            editing_id: None,
            focused: FormField::Date,
        }
    }
}

impl WorkoutForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the form from an existing workout so submitting rewrites it
    pub fn load(&mut self, record: &WorkoutRecord) {
        self.date = record.date.clone();
        self.exercise = record.exercise.clone();
        self.sets = record.sets.to_string();
        self.reps = record.reps.to_string();
        self.weight = record.weight.to_string();
        self.editing_id = Some(record.id.clone());
        self.focused = FormField::Date;
    }

    /// Reset to an empty add form
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Date => &self.date,
            FormField::Exercise => &self.exercise,
            FormField::Sets => &self.sets,
            FormField::Reps => &self.reps,
            FormField::Weight => &self.weight,
        }
    }

    fn value_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Date => &mut self.date,
            FormField::Exercise => &mut self.exercise,
            FormField::Sets => &mut self.sets,
            FormField::Reps => &mut self.reps,
            FormField::Weight => &mut self.weight,
        }
    }

    pub fn push_char(&mut self, c: char) {
        let focused = self.focused;
        self.value_mut(focused).push(c);
    }

    pub fn pop_char(&mut self) {
        let focused = self.focused;
        self.value_mut(focused).pop();
    }

    /// Validate every field. The first invalid field (in tab order) is reported.
    pub fn parse(&self) -> TrackerResult<NewWorkout> {
        Ok(NewWorkout {
            date: parse_date(&self.date)?,
            exercise: parse_exercise(&self.exercise)?,
            sets: parse_count("sets", &self.sets)?,
            reps: parse_count("reps", &self.reps)?,
            weight: parse_count("weight", &self.weight)?,
        })
    }
}
