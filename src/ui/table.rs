//! Workout table widget with sort markers, filter hints and in-cell editing.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::data::Column;
use crate::table::{TableModel, TableRow};
use super::theme::Theme;

/// Filter text being typed for one column
pub struct FilterInput<'a> {
    pub column: Column,
    pub text: &'a str,
}

pub struct WorkoutTable<'a> {
    rows: &'a [TableRow],
    model: &'a TableModel,
    selected_row: usize,
    selected_column: Column,
    filter_input: Option<FilterInput<'a>>,
    theme: &'a Theme,
}

impl<'a> WorkoutTable<'a> {
    pub fn new(
        rows: &'a [TableRow],
        model: &'a TableModel,
        selected_row: usize,
        selected_column: Column,
        theme: &'a Theme,
    ) -> Self {
        WorkoutTable {
            rows,
            model,
            selected_row,
            selected_column,
            filter_input: None,
            theme,
        }
    }

    pub fn filter_input(mut self, input: Option<FilterInput<'a>>) -> Self {
        self.filter_input = input;
        self
    }

    fn header_cell(&self, column: Column, focused: bool) -> Cell<'a> {
        let mut spans = vec![Span::raw(format!(
            "{}{}",
            column.header(),
            self.model.sort_direction(column).indicator()
        ))];

        let typing = self.filter_input.as_ref().filter(|f| f.column == column);
        if let Some(input) = typing {
            spans.push(Span::styled(
                format!(" /{}▏", input.text),
                self.theme.editing_style(),
            ));
        } else if let Some(filter) = self.model.filter(column) {
            spans.push(Span::styled(
                format!(" /{filter}"),
                Style::default().add_modifier(Modifier::ITALIC),
            ));
        }

        let style = if focused && column == self.selected_column {
            self.theme.title_style().add_modifier(Modifier::UNDERLINED)
        } else {
            self.theme.title_style()
        };
        Cell::from(Line::from(spans)).style(style)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let (border_style, title_style) = self.theme.panel_styles(focused);

        let columns: Vec<Column> = self.model.schema().iter().map(|s| s.column).collect();
        let header = Row::new(
            columns
                .iter()
                .map(|&c| self.header_cell(c, focused))
                .collect::<Vec<_>>(),
        );

        let rows: Vec<Row> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cells: Vec<Cell> = columns
                    .iter()
                    .map(|&column| {
                        if row.is_editing(column) {
                            Cell::from(format!("{}▏", row.value(column)))
                                .style(self.theme.editing_style())
                        } else if focused && i == self.selected_row && column == self.selected_column {
                            Cell::from(row.value(column))
                                .style(Style::default().add_modifier(Modifier::REVERSED))
                        } else {
                            Cell::from(row.value(column))
                        }
                    })
                    .collect();
                Row::new(cells)
            })
            .collect();

        let widths = [
            Constraint::Length(12),
            Constraint::Min(12),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(8),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(
                Block::default()
                    .title(format!(" Workouts ({}) ", self.rows.len()))
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title_style(title_style),
            )
            .style(self.theme.normal_style())
            .row_highlight_style(self.theme.highlight_style())
            .highlight_symbol("> ");

        let mut state = TableState::default();
        if !self.rows.is_empty() {
            state.select(Some(self.selected_row.min(self.rows.len() - 1)));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }
}
