//! liftlog: a keyboard-driven terminal workout log.
//!
//! Workouts are stored per user in a local SQLite document store. The `show`
//! command opens a dashboard with an entry form, an editable table and a
//! chart of total training volume per day; the other commands cover the same
//! ground from the shell.

mod app;
mod cli;
mod data;
mod error;
mod form;
mod table;
mod ui;

use std::fs::{self, OpenOptions};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{parse_filter_arg, AppConfig, Cli, Commands};
use data::{aggregate, Column, Database, IdentityProvider, SqliteIdentity, SqliteStore, User, WorkoutRepository};
use form::WorkoutForm;
use table::TableModel;

/// Send logs to the log file; the terminal belongs to the TUI
fn init_logging(config: &AppConfig) -> Result<()> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_file())
        .with_context(|| format!("Failed to open log file {:?}", config.log_file()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

fn open_database(config: &AppConfig) -> Result<Database> {
    Database::open(&config.database_file())
        .with_context(|| format!("Failed to open database at {:?}", config.database_file()))
}

fn workout_repository(db: &Database) -> Result<WorkoutRepository<SqliteStore>> {
    let store = SqliteStore::new(db.clone()).context("Failed to open workout store")?;
    Ok(WorkoutRepository::new(Arc::new(store)))
}

fn signed_in_user(identity: &SqliteIdentity) -> Result<User> {
    match identity.current_user().context("Failed to read session")? {
        Some(user) => Ok(user),
        None => bail!("Not signed in. Run `liftlog signin` or `liftlog signup` first."),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let (theme, interval) = match &cli.command {
        Commands::Show { theme, interval } => (theme.clone(), *interval),
        _ => (None, 2),
    };
    let config = AppConfig::new(cli.db_path, theme, interval);
    init_logging(&config)?;
    tracing::debug!(data_dir = ?config.data_dir, "configuration loaded");

    let db = open_database(&config)?;
    let identity = SqliteIdentity::new(db.clone());

    match cli.command {
        Commands::Show { .. } => app::run(config, db)?,
        Commands::Signup {
            email,
            password,
            name,
        } => {
            let user = identity
                .sign_up(&email, &password, &name)
                .context("Sign-up failed")?;
            println!("Signed up and signed in as {} <{}>", user.display_name, user.email);
        }
        Commands::Signin { email, password } => {
            let user = identity
                .sign_in(&email, &password)
                .context("Sign-in failed")?;
            println!("Signed in as {} <{}>", user.display_name, user.email);
        }
        Commands::Signout => {
            identity.sign_out().context("Sign-out failed")?;
            println!("Signed out");
        }
        Commands::Whoami => match identity.current_user().context("Failed to read session")? {
            Some(user) => println!("{} <{}> ({})", user.display_name, user.email, user.uid),
            None => println!("Not signed in"),
        },
        Commands::Add {
            date,
            exercise,
            sets,
            reps,
            weight,
        } => {
            let user = signed_in_user(&identity)?;
            let repo = workout_repository(&db)?;
            let mut form = WorkoutForm::new();
            if let Some(date) = date {
                form.date = date;
            }
            form.exercise = exercise;
            form.sets = sets;
            form.reps = reps;
            form.weight = weight;

            let workout = form.parse().context("Invalid workout")?;
            let id = repo.add(&user.uid, &workout).context("Failed to add workout")?;
            println!(
                "Added {} on {}: {} x {} @ {} (volume {})",
                workout.exercise,
                workout.date,
                workout.sets,
                workout.reps,
                workout.weight,
                u64::from(workout.sets) * u64::from(workout.reps) * u64::from(workout.weight),
            );
            tracing::debug!(id = %id, "added from command line");
        }
        Commands::List { filter, sort, desc } => {
            let user = signed_in_user(&identity)?;
            let repo = workout_repository(&db)?;
            let mut table = TableModel::default();
            table.set_records(repo.list(&user.uid).context("Failed to load workouts")?);

            for arg in &filter {
                let Some((column, text)) = parse_filter_arg(arg) else {
                    bail!("Invalid filter {arg:?}, expected column=text");
                };
                let column: Column = column.parse()?;
                table.set_filter(column, Some(text));
            }
            if let Some(sort) = sort {
                let column: Column = sort.parse()?;
                table.toggle_sort(column);
                if desc {
                    table.toggle_sort(column);
                }
            }

            println!(
                "{:<12} {:<24} {:>5} {:>5} {:>7}",
                Column::Date.header(),
                Column::Exercise.header(),
                Column::Sets.header(),
                Column::Reps.header(),
                Column::Weight.header(),
            );
            for row in table.visible_rows() {
                let r = &row.record;
                println!(
                    "{:<12} {:<24} {:>5} {:>5} {:>7}",
                    r.date, r.exercise, r.sets, r.reps, r.weight
                );
            }
        }
        Commands::Volume => {
            let user = signed_in_user(&identity)?;
            let records = workout_repository(&db)?
                .list(&user.uid)
                .context("Failed to load workouts")?;
            for point in aggregate(&records) {
                println!("{:<12} {:>10}", point.date, point.total_volume);
            }
        }
    }

    Ok(())
}
