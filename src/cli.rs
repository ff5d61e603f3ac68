//! Command-line interface argument parsing for liftlog.
//!
//! - `liftlog signup --email a@b.co --password ... --name Ada`
//! - `liftlog show` to open the dashboard
//! - `liftlog add --exercise Squat --sets 3 --reps 5 --weight 100`

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// File name of the database inside the data directory
pub const DATABASE_FILE: &str = "liftlog.db";
/// File name of the log inside the data directory
pub const LOG_FILE: &str = "liftlog.log";

/// A keyboard-driven terminal workout log.
#[derive(Parser, Debug)]
#[command(name = "liftlog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding liftlog.db and liftlog.log.
    /// Defaults to $LIFTLOG_DIR, then the platform data directory.
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the TUI dashboard
    Show {
        /// Theme for the dashboard ("default" or "high-contrast")
        #[arg(short, long)]
        theme: Option<String>,

        /// Interval in seconds between checks for changes made elsewhere
        #[arg(short, long, default_value = "2")]
        interval: u64,
    },

    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Display name
        #[arg(long)]
        name: String,
    },

    /// Sign in to an existing account
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign out of the current session
    Signout,

    /// Show the signed-in user
    Whoami,

    /// Record a workout for the signed-in user
    Add {
        /// Date as YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        exercise: String,
        #[arg(short, long)]
        sets: String,
        #[arg(short, long)]
        reps: String,
        #[arg(short, long)]
        weight: String,
    },

    /// Print the signed-in user's workouts
    List {
        /// Substring filter as column=text (repeatable)
        #[arg(short, long)]
        filter: Vec<String>,

        /// Column to sort by
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
    },

    /// Print total volume (sets × reps × weight) per day
    Volume,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Configuration derived from CLI arguments and environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub theme: String,
    pub refresh_interval_secs: u64,
}

impl AppConfig {
    pub fn new(db_path: Option<String>, theme: Option<String>, interval: u64) -> Self {
        // Determine data directory
        let data_dir = db_path.map(PathBuf::from).unwrap_or_else(|| {
            // Check LIFTLOG_DIR environment variable first
            if let Ok(dir) = std::env::var("LIFTLOG_DIR") {
                PathBuf::from(dir)
            } else {
                dirs::data_dir()
                    .or_else(dirs::home_dir)
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("liftlog")
            }
        });

        AppConfig {
            data_dir,
            theme: theme.unwrap_or_else(|| "default".to_string()),
            refresh_interval_secs: interval.max(1),
        }
    }

    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }
}

/// Split a `column=text` filter argument
pub fn parse_filter_arg(arg: &str) -> Option<(&str, &str)> {
    arg.split_once('=')
}
