//! Entry form panel.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::form::{FormField, WorkoutForm};
use super::theme::Theme;

pub struct FormPanel<'a> {
    form: &'a WorkoutForm,
    inserting: bool,
    theme: &'a Theme,
}

impl<'a> FormPanel<'a> {
    pub fn new(form: &'a WorkoutForm, inserting: bool, theme: &'a Theme) -> Self {
        FormPanel {
            form,
            inserting,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let (border_style, title_style) = self.theme.panel_styles(focused);
        let title = match self.form.editing_id {
            Some(_) => " Edit workout ",
            None => " Add workout ",
        };

        let mut lines: Vec<Line> = FormField::ALL
            .iter()
            .map(|&field| {
                let active = self.inserting && field == self.form.focused;
                let value = self.form.value(field);
                let value_span = if active {
                    Span::styled(format!("{value}▏"), self.theme.editing_style())
                } else {
                    Span::styled(value.to_string(), self.theme.normal_style())
                };
                let marker = if field == self.form.focused && focused { "> " } else { "  " };
                Line::from(vec![
                    Span::raw(marker),
                    Span::styled(
                        format!("{:<9}", field.label()),
                        Style::default().add_modifier(Modifier::DIM),
                    ),
                    value_span,
                ])
            })
            .collect();

        let hint = if self.inserting {
            "  Enter save · Esc leave form"
        } else {
            "  i edit form · n new"
        };
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().add_modifier(Modifier::DIM),
        )));

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style)
                .title_style(title_style),
        );

        frame.render_widget(paragraph, area);
    }
}
