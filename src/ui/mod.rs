//! Terminal User Interface components for liftlog.

pub mod chart;
pub mod form;
mod help;
pub mod table;
mod theme;
pub mod widgets;

pub use help::HelpOverlay;
pub use theme::Theme;
