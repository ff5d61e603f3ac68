//! Status bar and session gate widgets.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::data::User;
use super::theme::Theme;

/// Message shown in the status bar until the next one replaces it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Notice(String),
    Error(String),
}

/// Status bar widget
pub struct StatusBar<'a> {
    user: Option<&'a User>,
    mode: &'a str,
    message: Option<&'a StatusMessage>,
    theme: &'a Theme,
}

impl<'a> StatusBar<'a> {
    pub fn new(
        user: Option<&'a User>,
        mode: &'a str,
        message: Option<&'a StatusMessage>,
        theme: &'a Theme,
    ) -> Self {
        StatusBar {
            user,
            mode,
            message,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            format!(" {} ", self.mode),
            self.theme.highlight_style(),
        )];

        match self.message {
            Some(StatusMessage::Error(e)) => {
                spans.push(Span::styled(format!(" Error: {e}"), self.theme.error_style()));
            }
            Some(StatusMessage::Notice(n)) => {
                spans.push(Span::styled(format!(" {n}"), self.theme.notice_style()));
            }
            None => {
                let who = match self.user {
                    Some(u) => format!(" liftlog: {} <{}>", u.display_name, u.email),
                    None => " liftlog: signed out".to_string(),
                };
                spans.push(Span::styled(who, self.theme.normal_style()));
            }
        }
        spans.push(Span::styled(
            "  | [?] Help [q] Quit",
            Style::default().add_modifier(Modifier::DIM),
        ));

        let paragraph = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::TOP));
        frame.render_widget(paragraph, area);
    }
}

/// Shown instead of the workout screen when nobody is signed in
pub struct SessionGate<'a> {
    theme: &'a Theme,
}

impl<'a> SessionGate<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        SessionGate { theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled("Not signed in", self.theme.title_style())),
            Line::from(""),
            Line::from("Create an account:"),
            Line::from(Span::styled(
                "  liftlog signup --email you@example.com --password ... --name You",
                Style::default().add_modifier(Modifier::DIM),
            )),
            Line::from("or sign in:"),
            Line::from(Span::styled(
                "  liftlog signin --email you@example.com --password ...",
                Style::default().add_modifier(Modifier::DIM),
            )),
            Line::from(""),
            Line::from("then press r to reload."),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(" liftlog ")
                    .borders(Borders::ALL)
                    .border_style(self.theme.border_style())
                    .title_style(self.theme.title_style()),
            );
        frame.render_widget(paragraph, area);
    }
}
