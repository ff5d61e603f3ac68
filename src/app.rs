//! Main application logic and TUI event loop.

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::cli::AppConfig;
use crate::data::{
    aggregate, AggregatedPoint, Column, Database, DocumentStore, IdentityProvider, SqliteIdentity,
    SqliteStore, Subscription, User, WorkoutPatch, WorkoutRecord, WorkoutRepository,
};
use crate::error::{TrackerError, TrackerResult};
use crate::form::WorkoutForm;
use crate::table::{TableModel, TableRow};
use crate::ui::{
    chart::VolumeChart,
    form::FormPanel,
    table::{FilterInput, WorkoutTable},
    widgets::{SessionGate, StatusBar, StatusMessage},
    HelpOverlay, Theme,
};

/// Which panel is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPanel {
    Form,
    Table,
}

impl FocusedPanel {
    fn next(self) -> Self {
        match self {
            FocusedPanel::Form => FocusedPanel::Table,
            FocusedPanel::Table => FocusedPanel::Form,
        }
    }
}

/// What keystrokes currently go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing into the entry form
    Form,
    /// Typing into a table cell
    CellEdit,
    /// Typing a filter for one column; `previous` is restored on Esc
    Filter {
        column: Column,
        text: String,
        previous: Option<String>,
    },
}

impl InputMode {
    fn label(&self) -> &'static str {
        match self {
            InputMode::Normal => "NORMAL",
            InputMode::Form => "FORM",
            InputMode::CellEdit => "EDIT",
            InputMode::Filter { .. } => "FILTER",
        }
    }
}

/// Everything the screen needs from the current snapshot
#[derive(Debug, Clone)]
pub struct RenderData {
    pub rows: Vec<TableRow>,
    pub aggregated_series: Vec<AggregatedPoint>,
}

/// Application state
pub struct App<S: DocumentStore + ?Sized + 'static, I: IdentityProvider> {
    // Configuration
    config: AppConfig,
    theme: Theme,

    // Backends
    repo: WorkoutRepository<S>,
    identity: I,

    // Session
    user: Option<User>,
    subscription: Option<Subscription>,
    snapshots: Option<Receiver<Vec<WorkoutRecord>>>,

    // Derived from the latest snapshot by `apply_snapshot`
    series: Vec<AggregatedPoint>,

    // UI state
    table: TableModel,
    form: WorkoutForm,
    focused: FocusedPanel,
    mode: InputMode,
    selected_row: usize,
    selected_column: usize,
    show_help: bool,

    // Timing
    last_refresh: Instant,

    // Exit flag
    should_quit: bool,

    status: Option<StatusMessage>,
}

impl<S: DocumentStore + ?Sized + 'static, I: IdentityProvider> App<S, I> {
    /// Create a new App and attach to whoever is signed in
    pub fn new(config: AppConfig, repo: WorkoutRepository<S>, identity: I) -> Result<Self> {
        let theme = Theme::from_name(&config.theme);

        let mut app = App {
            config,
            theme,
            repo,
            identity,
            user: None,
            subscription: None,
            snapshots: None,
            series: Vec::new(),
            table: TableModel::default(),
            form: WorkoutForm::new(),
            focused: FocusedPanel::Form,
            mode: InputMode::Normal,
            selected_row: 0,
            selected_column: 0,
            show_help: false,
            last_refresh: Instant::now(),
            should_quit: false,
            status: None,
        };

        let user = app.identity.current_user().context("Failed to read session")?;
        app.attach_session(user).context("Failed to load workouts")?;
        Ok(app)
    }

    fn require_user(&self) -> TrackerResult<String> {
        self.user
            .as_ref()
            .map(|u| u.uid.clone())
            .ok_or_else(|| TrackerError::auth("not signed in"))
    }

    /// Point the live query at `user`'s workouts.
    ///
    /// The previous subscription is released before a new one is opened, and
    /// all per-user state is reset so nothing from the old account lingers.
    fn attach_session(&mut self, user: Option<User>) -> TrackerResult<()> {
        let unchanged = match (&self.user, &user) {
            (Some(current), Some(next)) => current.uid == next.uid && self.subscription.is_some(),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            self.user = user;
            return Ok(());
        }

        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.snapshots = None;
        self.table = TableModel::default();
        self.form.clear();
        self.mode = InputMode::Normal;
        self.apply_snapshot(Vec::new());
        self.user = user;

        let Some(uid) = self.user.as_ref().map(|u| u.uid.clone()) else {
            tracing::info!("session closed");
            return Ok(());
        };

        let (tx, rx) = mpsc::channel();
        let subscription = self.repo.subscribe(&uid, move |records| {
            // The receiver is gone only while the app is shutting down
            let _ = tx.send(records);
        })?;
        self.subscription = Some(subscription);
        self.snapshots = Some(rx);
        tracing::info!(uid = %uid, "session attached");

        self.drain_snapshots();
        Ok(())
    }

    /// Apply queued snapshots. Each one is complete, so only the newest counts.
    fn drain_snapshots(&mut self) {
        let Some(rx) = &self.snapshots else {
            return;
        };
        let latest = rx.try_iter().last();
        if let Some(records) = latest {
            self.apply_snapshot(records);
        }
    }

    fn apply_snapshot(&mut self, records: Vec<WorkoutRecord>) {
        tracing::debug!(count = records.len(), "snapshot applied");
        self.series = aggregate(&records);
        self.table.set_records(records);
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let count = self.table.row_count();
        if self.selected_row >= count {
            self.selected_row = count.saturating_sub(1);
        }
    }

    /// Pick up commits from other processes and session changes made by the CLI
    fn refresh(&mut self) -> TrackerResult<()> {
        self.last_refresh = Instant::now();
        self.repo.store().poll_remote_changes()?;
        let user = self.identity.current_user()?;
        self.attach_session(user)?;
        self.drain_snapshots();
        Ok(())
    }

    fn sign_out(&mut self) -> TrackerResult<()> {
        self.identity.sign_out()?;
        self.attach_session(None)?;
        self.notice("Signed out");
        Ok(())
    }

    fn notice(&mut self, message: impl Into<String>) {
        self.status = Some(StatusMessage::Notice(message.into()));
    }

    fn report(&mut self, err: TrackerError) {
        tracing::warn!(kind = err.kind(), "{err}");
        self.status = Some(StatusMessage::Error(format!("{}: {err}", err.kind())));
    }

    fn column(&self) -> Column {
        Column::ALL[self.selected_column % Column::ALL.len()]
    }

    // View boundary

    /// Submit the entry form: rewrite the loaded workout or add a new one
    pub fn on_add_or_update(&mut self) -> TrackerResult<()> {
        let uid = self.require_user()?;
        let workout = self.form.parse()?;
        match self.form.editing_id.clone() {
            Some(id) => {
                self.repo.update(&uid, &id, &WorkoutPatch::from(workout))?;
                self.notice("Workout updated");
            }
            None => {
                self.repo.add(&uid, &workout)?;
                self.notice("Workout added");
            }
        }
        self.form.clear();
        self.drain_snapshots();
        Ok(())
    }

    pub fn on_delete(&mut self, id: &str) -> TrackerResult<()> {
        let uid = self.require_user()?;
        self.repo.delete(&uid, id)?;
        if self.form.editing_id.as_deref() == Some(id) {
            self.form.clear();
        }
        self.notice("Workout deleted");
        self.drain_snapshots();
        Ok(())
    }

    /// Load a workout into the form for rewriting
    pub fn on_edit_start(&mut self, record: &WorkoutRecord) {
        self.form.load(record);
        self.focused = FocusedPanel::Form;
    }

    /// Save one cell. The table and the chart both change only through the
    /// snapshot the write produces, and the cursor follows the edited record.
    pub fn on_cell_commit(&mut self, row_index: usize, column: Column, value: &str) -> TrackerResult<()> {
        let uid = self.require_user()?;
        let record_id = self
            .table
            .visible_rows()
            .into_iter()
            .nth(row_index)
            .map(|row| row.record.id);

        let result = self
            .table
            .commit_cell_edit(&self.repo, &uid, row_index, column, value);
        self.drain_snapshots();
        if let Some(id) = record_id {
            self.select_record(&id);
        }
        result
    }

    fn select_record(&mut self, id: &str) {
        if let Some(position) = self
            .table
            .visible_rows()
            .iter()
            .position(|row| row.record.id == id)
        {
            self.selected_row = position;
        }
    }

    pub fn on_sort(&mut self, column: Column) {
        self.table.toggle_sort(column);
        self.clamp_selection();
    }

    pub fn on_filter_change(&mut self, column: Column, text: Option<&str>) {
        self.table.set_filter(column, text);
        self.clamp_selection();
    }

    pub fn render_data(&self) -> RenderData {
        RenderData {
            rows: self.table.visible_rows(),
            aggregated_series: self.series.clone(),
        }
    }

    /// Handle keyboard input; failures end up in the status bar
    fn handle_key(&mut self, key: KeyEvent) {
        let result = match self.mode {
            InputMode::Normal => self.handle_normal(key.code),
            InputMode::Form => self.handle_form_input(key.code),
            InputMode::CellEdit => self.handle_cell_input(key.code),
            InputMode::Filter { .. } => {
                self.handle_filter_input(key.code);
                Ok(())
            }
        };
        if let Err(e) = result {
            self.report(e);
        }
    }

    fn handle_normal(&mut self, key: KeyCode) -> TrackerResult<()> {
        // Global shortcuts
        match key {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return Ok(());
            }
            KeyCode::Char('?') | KeyCode::F(1) => {
                self.show_help = !self.show_help;
                return Ok(());
            }
            KeyCode::Esc if self.show_help => {
                self.show_help = false;
                return Ok(());
            }
            KeyCode::Char('r') => {
                self.status = None;
                return self.refresh();
            }
            KeyCode::Char('O') => return self.sign_out(),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focused = self.focused.next();
                return Ok(());
            }
            _ => {}
        }

        if self.show_help || self.user.is_none() {
            return Ok(());
        }

        match self.focused {
            FocusedPanel::Form => self.handle_form_navigation(key),
            FocusedPanel::Table => self.handle_table_navigation(key),
        }
    }

    fn handle_form_navigation(&mut self, key: KeyCode) -> TrackerResult<()> {
        match key {
            KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Enter => {
                self.mode = InputMode::Form;
            }
            KeyCode::Char('n') => self.form.clear(),
            _ => {}
        }
        Ok(())
    }

    fn handle_table_navigation(&mut self, key: KeyCode) -> TrackerResult<()> {
        let count = self.table.row_count();
        match key {
            KeyCode::Down | KeyCode::Char('j') => {
                if count > 0 {
                    self.selected_row = (self.selected_row + 1) % count;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if count > 0 {
                    self.selected_row = self.selected_row.checked_sub(1).unwrap_or(count - 1);
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.selected_column = (self.selected_column + 1) % Column::ALL.len();
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_column = self
                    .selected_column
                    .checked_sub(1)
                    .unwrap_or(Column::ALL.len() - 1);
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                self.table.begin_edit(self.selected_row, self.column())?;
                self.mode = InputMode::CellEdit;
            }
            KeyCode::Char('s') => self.on_sort(self.column()),
            KeyCode::Char('/') => {
                let column = self.column();
                let previous = self.table.filter(column).map(str::to_string);
                self.mode = InputMode::Filter {
                    column,
                    text: previous.clone().unwrap_or_default(),
                    previous,
                };
            }
            KeyCode::Char('c') => self.on_filter_change(self.column(), None),
            KeyCode::Char('E') => {
                if let Some(row) = self.table.visible_rows().into_iter().nth(self.selected_row) {
                    self.on_edit_start(&row.record);
                    self.mode = InputMode::Form;
                }
            }
            KeyCode::Char('d') => {
                if let Some(row) = self.table.visible_rows().into_iter().nth(self.selected_row) {
                    self.on_delete(&row.record.id)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_form_input(&mut self, key: KeyCode) -> TrackerResult<()> {
        match key {
            KeyCode::Esc => self.mode = InputMode::Normal,
            KeyCode::Enter => self.on_add_or_update()?,
            KeyCode::Tab | KeyCode::Down => self.form.focused = self.form.focused.next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focused = self.form.focused.prev(),
            KeyCode::Backspace => self.form.pop_char(),
            KeyCode::Char(c) => self.form.push_char(c),
            _ => {}
        }
        Ok(())
    }

    fn handle_cell_input(&mut self, key: KeyCode) -> TrackerResult<()> {
        let Some((row, column, buffer)) = self
            .table
            .active_edit()
            .map(|(row, column, buffer)| (row, column, buffer.to_string()))
        else {
            // The record vanished or was filtered out under the cursor
            self.mode = InputMode::Normal;
            return Ok(());
        };

        match key {
            KeyCode::Esc => {
                self.table.cancel_edit();
                self.mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                self.mode = InputMode::Normal;
                self.on_cell_commit(row, column, &buffer)?;
            }
            // Leaving the cell saves it
            KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                self.mode = InputMode::Normal;
                let result = self.on_cell_commit(row, column, &buffer);
                match key {
                    KeyCode::Tab => {
                        self.selected_column = (self.selected_column + 1) % Column::ALL.len();
                    }
                    other => self.handle_table_navigation(other)?,
                }
                result?;
            }
            KeyCode::Backspace => {
                let mut value = buffer;
                value.pop();
                self.table.edit_cell(row, column, &value)?;
            }
            KeyCode::Char(c) => {
                let mut value = buffer;
                value.push(c);
                self.table.edit_cell(row, column, &value)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_filter_input(&mut self, key: KeyCode) {
        let InputMode::Filter {
            column,
            text,
            previous,
        } = &mut self.mode
        else {
            return;
        };
        let column = *column;
        match key {
            KeyCode::Esc => {
                let previous = previous.take();
                self.mode = InputMode::Normal;
                self.on_filter_change(column, previous.as_deref());
            }
            KeyCode::Enter => self.mode = InputMode::Normal,
            KeyCode::Backspace => {
                text.pop();
                let text = text.clone();
                self.on_filter_change(column, Some(&text));
            }
            KeyCode::Char(c) => {
                text.push(c);
                let text = text.clone();
                self.on_filter_change(column, Some(&text));
            }
            _ => {}
        }
    }

    /// Render the UI
    fn render(&self, frame: &mut ratatui::Frame) {
        let size = frame.area();

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Body
                Constraint::Length(2), // Status bar
            ])
            .split(size);

        if self.user.is_none() {
            SessionGate::new(&self.theme).render(frame, main_chunks[0]);
        } else {
            // Body layout: form and table (left), volume chart (right)
            let body_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(main_chunks[0]);

            let left_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(8), Constraint::Min(5)])
                .split(body_chunks[0]);

            FormPanel::new(&self.form, self.mode == InputMode::Form, &self.theme).render(
                frame,
                left_chunks[0],
                self.focused == FocusedPanel::Form,
            );

            let data = self.render_data();
            let filter_input = match &self.mode {
                InputMode::Filter { column, text, .. } => Some(FilterInput {
                    column: *column,
                    text,
                }),
                _ => None,
            };
            WorkoutTable::new(
                &data.rows,
                &self.table,
                self.selected_row,
                self.column(),
                &self.theme,
            )
            .filter_input(filter_input)
            .render(frame, left_chunks[1], self.focused == FocusedPanel::Table);

            VolumeChart::new(&data.aggregated_series, &self.theme).render(frame, body_chunks[1], false);
        }

        let status_bar = StatusBar::new(
            self.user.as_ref(),
            self.mode.label(),
            self.status.as_ref(),
            &self.theme,
        );
        status_bar.render(frame, main_chunks[1]);

        if self.show_help {
            HelpOverlay::new(&self.theme).render(frame, size);
        }
    }
}

/// Restore terminal to normal state
fn restore_terminal() {
    // Best effort: we may be unwinding from a panic
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

/// Run the TUI application
pub fn run(config: AppConfig, db: Database) -> Result<()> {
    let store = Arc::new(SqliteStore::new(db.clone()).context("Failed to open workout store")?);
    let repo = WorkoutRepository::new(store);
    let identity = SqliteIdentity::new(db);

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        restore_terminal();
        return Err(e).context("Failed to setup terminal");
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(t) => t,
        Err(e) => {
            restore_terminal();
            return Err(e).context("Failed to create terminal");
        }
    };

    let mut app = match App::new(config, repo, identity) {
        Ok(a) => a,
        Err(e) => {
            restore_terminal();
            return Err(e).context("Failed to initialize application");
        }
    };
    let tick_rate = Duration::from_secs(app.config.refresh_interval_secs);
    tracing::info!(tick_secs = app.config.refresh_interval_secs, "tui started");

    let result = run_main_loop(&mut terminal, &mut app, tick_rate);

    // Always restore terminal, regardless of result
    restore_terminal();
    terminal.show_cursor().ok();

    result
}

/// Main application loop
fn run_main_loop<S: DocumentStore + ?Sized + 'static, I: IdentityProvider>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<S, I>,
    tick_rate: Duration,
) -> Result<()> {
    loop {
        app.drain_snapshots();
        terminal.draw(|f| app.render(f))?;

        if app.last_refresh.elapsed() >= tick_rate {
            if let Err(e) = app.refresh() {
                app.report(e);
            }
        }

        let timeout = tick_rate.saturating_sub(app.last_refresh.elapsed());
        if event::poll(timeout.min(Duration::from_millis(100)))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            tracing::info!("tui stopped");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::FlakyStore;
    use crate::data::NewWorkout;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    type TestApp = App<FlakyStore, SqliteIdentity>;

    fn config() -> AppConfig {
        AppConfig::new(Some("/tmp/liftlog-app-test".to_string()), None, 2)
    }

    /// App over a fresh store with `alice` signed in (if `signed_in`)
    fn setup(signed_in: bool) -> (Arc<FlakyStore>, TestApp) {
        let store = Arc::new(FlakyStore::new());
        let identity = SqliteIdentity::new(Database::open_in_memory().unwrap());
        if signed_in {
            identity
                .sign_up("alice@example.com", "secret1", "Alice")
                .unwrap();
        }
        let repo = WorkoutRepository::new(Arc::clone(&store));
        let app = App::new(config(), repo, identity).unwrap();
        (store, app)
    }

    fn press(app: &mut TestApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
        app.drain_snapshots();
    }

    fn type_text(app: &mut TestApp, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn fill_form(app: &mut TestApp, date: &str, exercise: &str, sets: &str, reps: &str, weight: &str) {
        app.form.date = date.to_string();
        app.form.exercise = exercise.to_string();
        app.form.sets = sets.to_string();
        app.form.reps = reps.to_string();
        app.form.weight = weight.to_string();
    }

    fn uid(app: &TestApp) -> String {
        app.user.as_ref().unwrap().uid.clone()
    }

    #[test]
    fn test_signed_out_app_has_no_data() {
        let (_, mut app) = setup(false);
        assert!(app.user.is_none());
        assert!(app.render_data().rows.is_empty());

        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        let err = app.on_add_or_update().unwrap_err();
        assert!(matches!(err, TrackerError::Auth(_)));
    }

    #[test]
    fn test_add_via_form_updates_rows_and_series() {
        let (_, mut app) = setup(true);

        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();
        fill_form(&mut app, "2024-05-01", "Bench", "3", "10", "30");
        app.on_add_or_update().unwrap();
        app.drain_snapshots();

        let data = app.render_data();
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.aggregated_series.len(), 1);
        assert_eq!(data.aggregated_series[0].date, "2024-05-01");
        assert_eq!(data.aggregated_series[0].total_volume, 2400);

        // Submitting clears the form
        assert!(app.form.exercise.is_empty());
        assert_eq!(app.form.editing_id, None);
    }

    #[test]
    fn test_invalid_form_is_rejected_without_writing() {
        let (_, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "three", "5", "100");

        let err = app.on_add_or_update().unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
        app.drain_snapshots();
        assert!(app.render_data().rows.is_empty());
        // Typed values stay for correction
        assert_eq!(app.form.sets, "three");
    }

    #[test]
    fn test_form_keys_submit_workout() {
        let (_, mut app) = setup(true);
        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.mode, InputMode::Form);

        // Date defaults to today; skip it
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Deadlift");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "1");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "5");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "140");
        press(&mut app, KeyCode::Enter);

        let rows = app.render_data().rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.exercise, "Deadlift");
        assert_eq!(rows[0].record.volume(), 700);
        assert!(matches!(app.status, Some(StatusMessage::Notice(_))));
    }

    #[test]
    fn test_edit_start_rewrites_existing_workout() {
        let (_, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();
        app.drain_snapshots();

        app.focused = FocusedPanel::Table;
        press(&mut app, KeyCode::Char('E'));
        assert_eq!(app.mode, InputMode::Form);
        assert_eq!(app.form.weight, "100");
        assert!(app.form.editing_id.is_some());

        app.form.weight = "110".to_string();
        press(&mut app, KeyCode::Enter);

        let rows = app.render_data().rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.weight, 110);
    }

    #[test]
    fn test_cell_edit_commit_via_keys() {
        let (_, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();
        app.drain_snapshots();

        app.focused = FocusedPanel::Table;
        app.selected_column = Column::Weight.index();
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, InputMode::CellEdit);
        for _ in 0..3 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "120");
        assert_eq!(app.render_data().rows[0].value(Column::Weight), "120");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, InputMode::Normal);
        let rows = app.render_data().rows;
        assert_eq!(rows[0].record.weight, 120);
        assert_eq!(rows[0].edit, None);
        assert_eq!(app.series[0].total_volume, 1800);
    }

    #[test]
    fn test_commit_keeps_rows_and_series_in_step() {
        let (_, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();

        app.on_cell_commit(0, Column::Weight, "120").unwrap();

        let data = app.render_data();
        assert_eq!(data.rows[0].record.weight, 120);
        assert_eq!(data.aggregated_series[0].total_volume, 1800);
    }

    #[test]
    fn test_cursor_follows_record_after_sorted_commit() {
        let (_, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "1", "1", "90");
        app.on_add_or_update().unwrap();
        fill_form(&mut app, "2024-05-01", "Bench", "1", "1", "100");
        app.on_add_or_update().unwrap();
        app.on_sort(Column::Weight);

        app.focused = FocusedPanel::Table;
        app.selected_row = 0;
        app.selected_column = Column::Weight.index();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "120");
        press(&mut app, KeyCode::Enter);

        let rows = app.render_data().rows;
        let weights: Vec<u32> = rows.iter().map(|r| r.record.weight).collect();
        assert_eq!(weights, vec![100, 120]);
        assert_eq!(app.selected_row, 1);
        assert_eq!(rows[app.selected_row].record.exercise, "Squat");
    }

    #[test]
    fn test_failed_cell_commit_reverts_and_reports() {
        let (store, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();
        app.drain_snapshots();

        store.fail_writes(true);
        app.focused = FocusedPanel::Table;
        app.selected_column = Column::Weight.index();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('5'));
        press(&mut app, KeyCode::Enter);

        let rows = app.render_data().rows;
        assert_eq!(rows[0].value(Column::Weight), "100");
        assert_eq!(rows[0].edit, None);
        match &app.status {
            Some(StatusMessage::Error(message)) => assert!(message.starts_with("Save failed")),
            other => panic!("expected error status, got {other:?}"),
        }
    }

    #[test]
    fn test_escape_discards_cell_edit() {
        let (_, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();
        app.drain_snapshots();

        app.focused = FocusedPanel::Table;
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "xyz");
        press(&mut app, KeyCode::Esc);

        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.render_data().rows[0].value(Column::Date), "2024-05-01");
    }

    #[test]
    fn test_external_change_reaches_table_and_chart() {
        let (store, mut app) = setup(true);
        let owner = uid(&app);
        let other_device = WorkoutRepository::new(Arc::clone(&store));

        other_device
            .add(
                &owner,
                &NewWorkout {
                    date: "2024-05-02".to_string(),
                    exercise: "Row".to_string(),
                    sets: 4,
                    reps: 8,
                    weight: 50,
                },
            )
            .unwrap();
        app.drain_snapshots();

        let data = app.render_data();
        assert_eq!(data.rows.len(), 1);
        assert_eq!(data.aggregated_series[0].total_volume, 1600);
    }

    #[test]
    fn test_other_users_workouts_are_hidden() {
        let (store, mut app) = setup(true);
        let repo = WorkoutRepository::new(Arc::clone(&store));
        repo.add(
            "someone-else",
            &NewWorkout {
                date: "2024-05-02".to_string(),
                exercise: "Row".to_string(),
                sets: 4,
                reps: 8,
                weight: 50,
            },
        )
        .unwrap();
        app.drain_snapshots();
        assert!(app.render_data().rows.is_empty());
    }

    #[test]
    fn test_switching_users_releases_previous_subscription() {
        let (store, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();
        app.drain_snapshots();
        assert_eq!(store.listener_count(), 1);

        let bob = app.identity.sign_up("bob@example.com", "hunter22", "Bob").unwrap();
        app.refresh().unwrap();

        assert_eq!(app.user.as_ref().map(|u| u.uid.as_str()), Some(bob.uid.as_str()));
        assert_eq!(store.listener_count(), 1);
        assert!(app.render_data().rows.is_empty());
        assert!(app.render_data().aggregated_series.is_empty());
    }

    #[test]
    fn test_sign_out_clears_everything() {
        let (store, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();
        app.drain_snapshots();

        press(&mut app, KeyCode::Char('O'));

        assert!(app.user.is_none());
        assert_eq!(store.listener_count(), 0);
        assert!(app.table.records().is_empty());
        assert!(app.render_data().rows.is_empty());
        assert!(app.identity.current_user().unwrap().is_none());
    }

    #[test]
    fn test_filter_and_sort_keys() {
        let (_, mut app) = setup(true);
        for (exercise, weight) in [("Squat", "100"), ("Bench", "60"), ("Squat", "90")] {
            fill_form(&mut app, "2024-05-01", exercise, "1", "1", weight);
            app.on_add_or_update().unwrap();
        }
        app.drain_snapshots();
        app.focused = FocusedPanel::Table;

        app.selected_column = Column::Exercise.index();
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "Squ");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.table.filter(Column::Exercise), Some("Squ"));
        assert_eq!(app.render_data().rows.len(), 2);

        app.selected_column = Column::Weight.index();
        press(&mut app, KeyCode::Char('s'));
        let weights: Vec<u32> = app.render_data().rows.iter().map(|r| r.record.weight).collect();
        assert_eq!(weights, vec![90, 100]);

        app.selected_column = Column::Exercise.index();
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.render_data().rows.len(), 3);
    }

    #[test]
    fn test_escape_restores_previous_filter() {
        let (_, mut app) = setup(true);
        for exercise in ["Squat", "Bench"] {
            fill_form(&mut app, "2024-05-01", exercise, "1", "1", "50");
            app.on_add_or_update().unwrap();
        }
        app.on_filter_change(Column::Exercise, Some("Squ"));
        app.focused = FocusedPanel::Table;
        app.selected_column = Column::Exercise.index();

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "x");
        assert!(app.render_data().rows.is_empty());
        press(&mut app, KeyCode::Esc);

        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.table.filter(Column::Exercise), Some("Squ"));
        assert_eq!(app.render_data().rows.len(), 1);
    }

    #[test]
    fn test_delete_key_removes_row() {
        let (_, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();
        app.drain_snapshots();

        app.focused = FocusedPanel::Table;
        press(&mut app, KeyCode::Char('d'));
        assert!(app.render_data().rows.is_empty());
        assert!(app.render_data().aggregated_series.is_empty());
    }

    #[test]
    fn test_render_smoke() {
        let (_, mut app) = setup(true);
        fill_form(&mut app, "2024-05-01", "Squat", "3", "5", "100");
        app.on_add_or_update().unwrap();
        app.drain_snapshots();
        app.show_help = true;

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();

        let (_, signed_out) = setup(false);
        terminal.draw(|f| signed_out.render(f)).unwrap();
    }
}
