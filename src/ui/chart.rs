//! Training volume chart: total volume per day as a line plot.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use crate::data::AggregatedPoint;
use super::theme::Theme;

/// Volume chart widget. Points are plotted in series order, one x step per day.
pub struct VolumeChart<'a> {
    series: &'a [AggregatedPoint],
    theme: &'a Theme,
}

impl<'a> VolumeChart<'a> {
    pub fn new(series: &'a [AggregatedPoint], theme: &'a Theme) -> Self {
        VolumeChart { series, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let (border_style, title_style) = self.theme.panel_styles(focused);
        let block = Block::default()
            .title(" Volume per day ")
            .borders(Borders::ALL)
            .border_style(border_style)
            .title_style(title_style);

        if self.series.is_empty() {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            let message = ratatui::widgets::Paragraph::new("No workouts yet")
                .style(Style::default().add_modifier(Modifier::DIM))
                .alignment(ratatui::layout::Alignment::Center);
            frame.render_widget(message, inner);
            return;
        }

        let points = chart_points(self.series);
        let (x_bounds, y_bounds) = bounds(&points);

        let dataset = Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(self.theme.chart_style())
            .data(&points);

        let first = &self.series[0].date;
        let middle = &self.series[self.series.len() / 2].date;
        let last = &self.series[self.series.len() - 1].date;
        let x_labels = vec![
            Span::raw(first.clone()),
            Span::raw(middle.clone()),
            Span::raw(last.clone()),
        ];

        let y_labels = vec![
            Span::raw(format_volume(y_bounds[0])),
            Span::raw(format_volume((y_bounds[0] + y_bounds[1]) / 2.0)),
            Span::raw(format_volume(y_bounds[1])),
        ];

        let chart = Chart::new(vec![dataset])
            .block(block)
            .x_axis(
                Axis::default()
                    .title(Span::styled("date", Style::default().add_modifier(Modifier::DIM)))
                    .style(self.theme.normal_style())
                    .bounds(x_bounds)
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .title(Span::styled("kg", Style::default().add_modifier(Modifier::DIM)))
                    .style(self.theme.normal_style())
                    .bounds(y_bounds)
                    .labels(y_labels),
            );

        frame.render_widget(chart, area);
    }
}

/// (index, volume) pairs in series order
fn chart_points(series: &[AggregatedPoint]) -> Vec<(f64, f64)> {
    series
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.total_volume as f64))
        .collect()
}

/// Axis bounds with a zero baseline and a little headroom
fn bounds(points: &[(f64, f64)]) -> ([f64; 2], [f64; 2]) {
    let x_max = (points.len().saturating_sub(1) as f64).max(1.0);
    let y_max = points.iter().map(|(_, y)| *y).fold(0.0_f64, f64::max);
    let y_max = if y_max <= 0.0 { 1.0 } else { y_max * 1.05 };
    ([0.0, x_max], [0.0, y_max])
}

/// Format a volume for axis labels
fn format_volume(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 10_000.0 {
        format!("{:.1}k", value / 1_000.0)
    } else {
        format!("{:.0}", value)
    }
}
