//! Table presentation state: per-column filters, single-column sort and
//! in-place cell editing.
//!
//! Edits are tracked by record id rather than row position so that an edit
//! survives snapshot refreshes that reorder or resize the list.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::data::{Column, DocumentStore, ValueType, WorkoutPatch, WorkoutRecord, WorkoutRepository};
use crate::error::{TrackerError, TrackerResult};

/// Sort direction of one column. Cycles none → ascending → descending → none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn next(self) -> Self {
        match self {
            SortDirection::None => SortDirection::Ascending,
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::None,
        }
    }

    /// Marker appended to the column header
    pub fn indicator(self) -> &'static str {
        match self {
            SortDirection::None => "",
            SortDirection::Ascending => " ▲",
            SortDirection::Descending => " ▼",
        }
    }
}

/// Declared shape of one table column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub column: Column,
    pub value_type: ValueType,
    pub editable: bool,
}

impl ColumnSchema {
    /// Schema for the workout table: every column visible and editable
    pub fn workouts() -> Vec<ColumnSchema> {
        Column::ALL
            .into_iter()
            .map(|column| ColumnSchema {
                column,
                value_type: column.value_type(),
                editable: true,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct ColumnState {
    filter: Option<String>,
    sort: SortDirection,
}

/// Uncommitted text typed into one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEdit {
    pub column: Column,
    pub value: String,
}

#[derive(Debug, Clone)]
struct ActiveEdit {
    record_id: String,
    edit: CellEdit,
}

/// One visible row: a record plus the edit buffer of the cell being typed into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub record: WorkoutRecord,
    pub edit: Option<CellEdit>,
}

impl TableRow {
    /// Text to show for a cell: the edit buffer if the cell is being edited
    pub fn value(&self, column: Column) -> String {
        match &self.edit {
            Some(edit) if edit.column == column => edit.value.clone(),
            _ => self.record.cell(column),
        }
    }

    pub fn is_editing(&self, column: Column) -> bool {
        self.edit.as_ref().is_some_and(|e| e.column == column)
    }
}

fn compare_cells(value_type: ValueType, a: &str, b: &str) -> Ordering {
    match value_type {
        ValueType::Integer => match (a.parse::<i64>(), b.parse::<i64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.cmp(b),
        },
        ValueType::Text => a.cmp(b),
    }
}

/// Presentation model over the current workout list
#[derive(Debug, Clone)]
pub struct TableModel {
    schema: Vec<ColumnSchema>,
    state: HashMap<Column, ColumnState>,
    records: Vec<WorkoutRecord>,
    active: Option<ActiveEdit>,
}

impl Default for TableModel {
    fn default() -> Self {
        Self::new(ColumnSchema::workouts())
    }
}

impl TableModel {
    pub fn new(schema: Vec<ColumnSchema>) -> Self {
        TableModel {
            schema,
            state: HashMap::new(),
            records: Vec::new(),
            active: None,
        }
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    fn column_schema(&self, column: Column) -> Option<&ColumnSchema> {
        self.schema.iter().find(|s| s.column == column)
    }

    /// Replace the underlying list with a fresh snapshot.
    ///
    /// Cells not under edit show the new values right away. An active edit is
    /// kept as typed unless its record disappeared.
    pub fn set_records(&mut self, records: Vec<WorkoutRecord>) {
        if let Some(active) = &self.active {
            if !records.iter().any(|r| r.id == active.record_id) {
                tracing::debug!(id = %active.record_id, "edited workout removed, dropping edit");
                self.active = None;
            }
        }
        self.records = records;
    }

    #[cfg(test)]
    pub fn records(&self) -> &[WorkoutRecord] {
        &self.records
    }

    /// Set or clear (`None`) the substring filter of a column
    pub fn set_filter(&mut self, column: Column, text: Option<&str>) {
        let filter = text.filter(|t| !t.is_empty()).map(str::to_string);
        tracing::debug!(column = %column, filter = ?filter, "filter changed");
        self.state.entry(column).or_default().filter = filter;
    }

    pub fn filter(&self, column: Column) -> Option<&str> {
        self.state.get(&column).and_then(|s| s.filter.as_deref())
    }

    /// Advance a column's sort direction; any other sorted column is reset
    pub fn toggle_sort(&mut self, column: Column) {
        let next = self.sort_direction(column).next();
        for (other, state) in self.state.iter_mut() {
            if *other != column {
                state.sort = SortDirection::None;
            }
        }
        self.state.entry(column).or_default().sort = next;
        tracing::debug!(column = %column, direction = ?next, "sort changed");
    }

    pub fn sort_direction(&self, column: Column) -> SortDirection {
        self.state.get(&column).map(|s| s.sort).unwrap_or_default()
    }

    /// The column currently sorted, if any
    pub fn sorted_column(&self) -> Option<(Column, SortDirection)> {
        self.state
            .iter()
            .find(|(_, s)| s.sort != SortDirection::None)
            .map(|(c, s)| (*c, s.sort))
    }

    /// Records passing every filter, then stably sorted by the sorted column
    fn visible_records(&self) -> Vec<&WorkoutRecord> {
        let filters: Vec<(Column, &str)> = self
            .state
            .iter()
            .filter_map(|(c, s)| s.filter.as_deref().map(|f| (*c, f)))
            .collect();

        let mut rows: Vec<&WorkoutRecord> = self
            .records
            .iter()
            .filter(|r| filters.iter().all(|(c, f)| r.cell(*c).contains(f)))
            .collect();

        if let Some((column, direction)) = self.sorted_column() {
            let value_type = self
                .column_schema(column)
                .map(|s| s.value_type)
                .unwrap_or(ValueType::Text);
            rows.sort_by(|a, b| {
                let ord = compare_cells(value_type, &a.cell(column), &b.cell(column));
                if direction == SortDirection::Descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        rows
    }

    /// Filtered, then sorted rows with any active edit buffer attached
    pub fn visible_rows(&self) -> Vec<TableRow> {
        self.visible_records()
            .into_iter()
            .map(|record| TableRow {
                record: record.clone(),
                edit: self
                    .active
                    .as_ref()
                    .filter(|a| a.record_id == record.id)
                    .map(|a| a.edit.clone()),
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.visible_records().len()
    }

    fn record_at(&self, row_index: usize) -> TrackerResult<WorkoutRecord> {
        self.visible_records()
            .get(row_index)
            .map(|r| (*r).clone())
            .ok_or_else(|| TrackerError::validation(format!("no row at position {row_index}")))
    }

    fn ensure_editable(&self, column: Column) -> TrackerResult<()> {
        match self.column_schema(column) {
            Some(schema) if schema.editable => Ok(()),
            _ => Err(TrackerError::validation(format!("column {column} is not editable"))),
        }
    }

    /// Start editing a cell, seeding the buffer with its current value
    pub fn begin_edit(&mut self, row_index: usize, column: Column) -> TrackerResult<()> {
        self.ensure_editable(column)?;
        let record = self.record_at(row_index)?;
        self.active = Some(ActiveEdit {
            edit: CellEdit {
                column,
                value: record.cell(column),
            },
            record_id: record.id,
        });
        Ok(())
    }

    /// Keystroke-level update of a cell buffer. Nothing is persisted.
    pub fn edit_cell(&mut self, row_index: usize, column: Column, value: &str) -> TrackerResult<()> {
        self.ensure_editable(column)?;
        let record = self.record_at(row_index)?;
        self.active = Some(ActiveEdit {
            record_id: record.id,
            edit: CellEdit {
                column,
                value: value.to_string(),
            },
        });
        Ok(())
    }

    /// Abandon the active edit; the cell shows the stored value again
    pub fn cancel_edit(&mut self) {
        self.active = None;
    }

    /// The cell being edited: `(row index, column, buffer)`, if it is visible
    pub fn active_edit(&self) -> Option<(usize, Column, &str)> {
        let active = self.active.as_ref()?;
        let row = self
            .visible_records()
            .iter()
            .position(|r| r.id == active.record_id)?;
        Some((row, active.edit.column, active.edit.value.as_str()))
    }

    /// Persist `new_value` for one cell.
    ///
    /// The buffer is validated and closed either way. The row keeps showing
    /// the record from the last snapshot; the saved value appears when the
    /// store delivers the next one through `set_records`. On any failure the
    /// error is returned and nothing is written.
    pub fn commit_cell_edit<S: DocumentStore + ?Sized>(
        &mut self,
        repo: &WorkoutRepository<S>,
        user_id: &str,
        row_index: usize,
        column: Column,
        new_value: &str,
    ) -> TrackerResult<()> {
        self.edit_cell(row_index, column, new_value)?;
        let record = self.record_at(row_index)?;
        self.active = None;

        if record.cell(column) == new_value {
            return Ok(());
        }

        let patch = WorkoutPatch::for_cell(column, new_value)?;
        if let Err(e) = repo.update(user_id, &record.id, &patch) {
            tracing::warn!(id = %record.id, column = %column, "cell commit failed: {e}");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::FlakyStore;
    use crate::data::{NewWorkout, WorkoutRepository};
    use std::sync::Arc;

    fn rec(id: &str, date: &str, exercise: &str, sets: u32, reps: u32, weight: u32) -> WorkoutRecord {
        WorkoutRecord {
            id: id.to_string(),
            user_id: "u1".to_string(),
            date: date.to_string(),
            exercise: exercise.to_string(),
            sets,
            reps,
            weight,
        }
    }

    fn sample() -> Vec<WorkoutRecord> {
        vec![
            rec("a", "2024-01-03", "Squat", 5, 5, 100),
            rec("b", "2024-01-01", "Bench", 3, 8, 60),
            rec("c", "2024-01-02", "Squat", 3, 5, 9),
            rec("d", "2024-01-01", "Deadlift", 1, 5, 100),
        ]
    }

    fn model() -> TableModel {
        let mut model = TableModel::default();
        model.set_records(sample());
        model
    }

    fn ids(rows: &[TableRow]) -> Vec<String> {
        rows.iter().map(|r| r.record.id.clone()).collect()
    }

    /// Repository over a flaky store seeded with the sample workouts.
    /// Returns the records as stored (with store-assigned ids).
    fn seeded_repo() -> (Arc<FlakyStore>, WorkoutRepository<FlakyStore>, Vec<WorkoutRecord>) {
        let store = Arc::new(FlakyStore::new());
        let repo = WorkoutRepository::new(Arc::clone(&store));
        for r in sample() {
            repo.add("u1", &NewWorkout::from(&r)).unwrap();
        }
        let stored = repo.list("u1").unwrap();
        (store, repo, stored)
    }

    #[test]
    fn test_unsorted_unfiltered_keeps_list_order() {
        let model = model();
        assert_eq!(ids(&model.visible_rows()), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_sort_cycle() {
        let mut model = model();
        assert_eq!(model.sort_direction(Column::Weight), SortDirection::None);
        model.toggle_sort(Column::Weight);
        assert_eq!(model.sort_direction(Column::Weight), SortDirection::Ascending);
        model.toggle_sort(Column::Weight);
        assert_eq!(model.sort_direction(Column::Weight), SortDirection::Descending);
        model.toggle_sort(Column::Weight);
        assert_eq!(model.sort_direction(Column::Weight), SortDirection::None);
        assert_eq!(model.sorted_column(), None);
    }

    #[test]
    fn test_sorting_new_column_resets_previous() {
        let mut model = model();
        model.toggle_sort(Column::Date);
        model.toggle_sort(Column::Date);
        model.toggle_sort(Column::Sets);
        assert_eq!(model.sort_direction(Column::Date), SortDirection::None);
        assert_eq!(model.sort_direction(Column::Sets), SortDirection::Ascending);
        assert_eq!(model.sorted_column(), Some((Column::Sets, SortDirection::Ascending)));
    }

    #[test]
    fn test_integer_columns_sort_numerically() {
        let mut model = model();
        model.toggle_sort(Column::Weight);
        // 9 < 60 < 100, and the two 100s keep their original order (a before d)
        assert_eq!(ids(&model.visible_rows()), vec!["c", "b", "a", "d"]);
    }

    #[test]
    fn test_descending_sort_is_stable() {
        let mut model = model();
        model.toggle_sort(Column::Weight);
        model.toggle_sort(Column::Weight);
        assert_eq!(ids(&model.visible_rows()), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn test_text_sort_with_ties() {
        let mut model = model();
        model.toggle_sort(Column::Date);
        assert_eq!(ids(&model.visible_rows()), vec!["b", "d", "c", "a"]);
        model.toggle_sort(Column::Exercise);
        assert_eq!(ids(&model.visible_rows()), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_filter_is_substring_and_case_sensitive() {
        let mut model = model();
        model.set_filter(Column::Exercise, Some("quat"));
        let rows = model.visible_rows();
        assert_eq!(ids(&rows), vec!["a", "c"]);
        assert!(rows.iter().all(|r| r.record.cell(Column::Exercise).contains("quat")));

        model.set_filter(Column::Exercise, Some("squat"));
        assert!(model.visible_rows().is_empty());

        model.set_filter(Column::Exercise, None);
        assert_eq!(model.visible_rows().len(), 4);
    }

    #[test]
    fn test_filter_on_integer_column_uses_string_form() {
        let mut model = model();
        model.set_filter(Column::Weight, Some("10"));
        assert_eq!(ids(&model.visible_rows()), vec!["a", "d"]);
    }

    #[test]
    fn test_filters_combine_and_apply_before_sort() {
        let mut model = model();
        model.set_filter(Column::Weight, Some("100"));
        model.set_filter(Column::Date, Some("2024-01-0"));
        model.toggle_sort(Column::Date);
        assert_eq!(ids(&model.visible_rows()), vec!["d", "a"]);
        assert_eq!(model.row_count(), 2);
    }

    #[test]
    fn test_empty_filter_clears() {
        let mut model = model();
        model.set_filter(Column::Exercise, Some("Bench"));
        model.set_filter(Column::Exercise, Some(""));
        assert_eq!(model.filter(Column::Exercise), None);
        assert_eq!(model.visible_rows().len(), 4);
    }

    #[test]
    fn test_edit_buffer_shows_typed_value() {
        let mut model = model();
        model.begin_edit(1, Column::Reps).unwrap();
        assert_eq!(model.active_edit(), Some((1, Column::Reps, "8")));

        model.edit_cell(1, Column::Reps, "1").unwrap();
        model.edit_cell(1, Column::Reps, "12").unwrap();
        let rows = model.visible_rows();
        assert_eq!(rows[1].value(Column::Reps), "12");
        assert!(rows[1].is_editing(Column::Reps));
        // Other cells and the record itself are untouched
        assert_eq!(rows[1].record.reps, 8);
        assert_eq!(rows[0].value(Column::Reps), "5");

        model.cancel_edit();
        assert_eq!(model.visible_rows()[1].value(Column::Reps), "8");
    }

    #[test]
    fn test_snapshot_resyncs_rows_not_under_edit() {
        let mut model = model();
        let mut updated = sample();
        updated[0].weight = 105;
        model.set_records(updated);
        assert_eq!(model.visible_rows()[0].value(Column::Weight), "105");
    }

    #[test]
    fn test_active_edit_survives_external_update() {
        let mut model = model();
        model.edit_cell(0, Column::Weight, "110").unwrap();

        let mut updated = sample();
        updated[0].weight = 105;
        updated[0].reps = 6;
        model.set_records(updated);

        let rows = model.visible_rows();
        assert_eq!(rows[0].value(Column::Weight), "110");
        // A different field of the same row still resyncs
        assert_eq!(rows[0].value(Column::Reps), "6");
    }

    #[test]
    fn test_active_edit_dropped_when_record_deleted() {
        let mut model = model();
        model.edit_cell(0, Column::Weight, "110").unwrap();
        model.set_records(sample().into_iter().skip(1).collect());
        assert_eq!(model.active_edit(), None);
    }

    #[test]
    fn test_edit_out_of_range_row() {
        let mut model = model();
        assert!(matches!(
            model.edit_cell(10, Column::Sets, "1"),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn test_read_only_column_rejects_edits() {
        let schema = vec![ColumnSchema {
            column: Column::Date,
            value_type: ValueType::Text,
            editable: false,
        }];
        let mut model = TableModel::new(schema);
        model.set_records(sample());
        assert!(model.begin_edit(0, Column::Date).is_err());
    }

    #[test]
    fn test_commit_persists_and_updates_row() {
        let (_store, repo, stored) = seeded_repo();
        let mut model = TableModel::default();
        model.set_records(stored.clone());

        model.commit_cell_edit(&repo, "u1", 0, Column::Weight, "120").unwrap();

        assert_eq!(model.active_edit(), None);
        let persisted = repo.list("u1").unwrap();
        assert_eq!(persisted[0].id, stored[0].id);
        assert_eq!(persisted[0].weight, 120);

        // The model's list changes only through the next snapshot
        assert_eq!(model.records()[0].weight, 100);
        model.set_records(persisted);
        assert_eq!(model.visible_rows()[0].value(Column::Weight), "120");
    }

    #[test]
    fn test_failed_commit_reverts_to_persisted_value() {
        let (store, repo, stored) = seeded_repo();
        let mut model = TableModel::default();
        model.set_records(stored);

        model.edit_cell(0, Column::Weight, "12").unwrap();
        store.fail_writes(true);
        let err = model
            .commit_cell_edit(&repo, "u1", 0, Column::Weight, "120")
            .unwrap_err();

        assert!(matches!(err, TrackerError::Persistence(_)));
        assert_eq!(model.active_edit(), None);
        assert_eq!(model.visible_rows()[0].value(Column::Weight), "100");
        assert_eq!(repo.list("u1").unwrap()[0].weight, 100);
    }

    #[test]
    fn test_invalid_value_reverts_without_persisting() {
        let (_store, repo, stored) = seeded_repo();
        let mut model = TableModel::default();
        model.set_records(stored);

        let err = model
            .commit_cell_edit(&repo, "u1", 1, Column::Sets, "three")
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
        assert_eq!(model.visible_rows()[1].value(Column::Sets), "3");
    }

    #[test]
    fn test_commit_of_deleted_record_is_not_found() {
        let (_store, repo, stored) = seeded_repo();
        let mut model = TableModel::default();
        model.set_records(stored.clone());
        repo.delete("u1", &stored[2].id).unwrap();

        let err = model
            .commit_cell_edit(&repo, "u1", 2, Column::Reps, "10")
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
        assert_eq!(model.visible_rows()[2].value(Column::Reps), "5");
    }

    #[test]
    fn test_unchanged_commit_does_not_write() {
        let (store, repo, stored) = seeded_repo();
        let mut model = TableModel::default();
        model.set_records(stored);
        store.fail_writes(true);
        model.commit_cell_edit(&repo, "u1", 0, Column::Sets, "5").unwrap();
    }
}
