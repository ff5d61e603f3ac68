//! Theme configuration for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the application
#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub highlight_bg: Color,
    pub highlight_fg: Color,
    pub border: Color,
    pub title: Color,
    pub error: Color,
    pub notice: Color,
    pub editing: Color,
    pub chart_line: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            bg: Color::Reset,
            fg: Color::White,
            highlight_bg: Color::Rgb(60, 60, 80),
            highlight_fg: Color::White,
            border: Color::Rgb(100, 100, 120),
            title: Color::Cyan,
            error: Color::Red,
            notice: Color::Green,
            editing: Color::Yellow,
            // Named color for better terminal compatibility
            chart_line: Color::LightGreen,
        }
    }
}

impl Theme {
    /// Look up a theme by name, falling back to the default
    pub fn from_name(name: &str) -> Self {
        match name {
            "high-contrast" => Theme {
                bg: Color::Black,
                fg: Color::White,
                highlight_bg: Color::White,
                highlight_fg: Color::Black,
                border: Color::White,
                title: Color::LightYellow,
                error: Color::LightRed,
                notice: Color::LightGreen,
                editing: Color::LightYellow,
                chart_line: Color::LightCyan,
            },
            "default" => Theme::default(),
            other => {
                tracing::warn!(theme = other, "unknown theme, using default");
                Theme::default()
            }
        }
    }

    /// Base surface style used to paint widget backgrounds
    pub fn surface_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Convenience helper returning (border_style, title_style) for focus state
    pub fn panel_styles(&self, focused: bool) -> (Style, Style) {
        if focused {
            (self.focused_border_style(), self.focused_border_style())
        } else {
            (self.border_style(), self.dimmed_title_style())
        }
    }

    /// Get style for normal text
    pub fn normal_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Get style for highlighted/selected items
    pub fn highlight_style(&self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for borders
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Get style for focused panel borders (distinct from normal borders)
    pub fn focused_border_style(&self) -> Style {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for titles
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.title)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for unfocused/dimmed titles
    pub fn dimmed_title_style(&self) -> Style {
        Style::default()
            .fg(self.border)
            .add_modifier(Modifier::DIM)
    }

    /// Style for a cell or field that is being typed into
    pub fn editing_style(&self) -> Style {
        Style::default()
            .fg(self.editing)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }

    pub fn notice_style(&self) -> Style {
        Style::default().fg(self.notice)
    }

    pub fn chart_style(&self) -> Style {
        Style::default().fg(self.chart_line)
    }
}
