use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::{WeekSettings, WeekStartDay};

/// File name of the persisted preferences inside the data directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Log drinks against a weekly limit
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bottlecap",
    about = "Log drinks against a weekly limit",
    version
)]
pub struct Settings {
    /// Timezone used to decide calendar days (auto-detected if not specified)
    #[arg(long, global = true, default_value = "auto")]
    pub timezone: String,

    /// Directory holding drinks and settings (defaults to ~/.bottlecap)
    #[arg(long, global = true, env = "BOTTLECAP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Actions the command line can perform.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show this week's total against the limit
    Status,

    /// Log one or more drinks
    Log {
        /// Number of drinks (fractions allowed, up to 20)
        #[arg(default_value = "1")]
        drinks: f64,

        /// Day the drinks were had (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List this week's days and previous weeks
    History,

    /// Show the days of one week
    Week {
        /// First day of the week (YYYY-MM-DD)
        start: NaiveDate,
    },

    /// Delete every drink logged on a day
    DeleteDay {
        /// Day to clear (YYYY-MM-DD)
        date: NaiveDate,
    },

    /// Delete every drink logged in a week
    DeleteWeek {
        /// First day of the week (YYYY-MM-DD)
        start: NaiveDate,
    },

    /// Show or change the week start day and weekly limit
    Config {
        /// Day each week starts on
        #[arg(long)]
        week_start: Option<WeekStartDay>,

        /// Weekly drink limit
        #[arg(long)]
        limit: Option<f64>,
    },

    /// Grant or revoke access to the drink store
    Authorize {
        /// Deny access instead of granting it
        #[arg(long)]
        revoke: bool,
    },
}

impl Settings {
    /// Resolved data directory: `--data-dir` when given, else `~/.bottlecap`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Effective log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// The subcommand to run, `status` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Status)
    }
}

/// `~/.bottlecap`, or `./.bottlecap` when no home directory is known.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bottlecap")
}

// ── SettingsFile ───────────────────────────────────────────────────────────────

/// JSON persistence for [`WeekSettings`].
pub struct SettingsFile;

impl SettingsFile {
    /// Settings path rooted at `data_dir`.
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE_NAME)
    }

    /// Load settings from `path`.
    ///
    /// Returns defaults when the file is absent, unreadable, or holds an
    /// invalid limit.
    pub fn load_from(path: &Path) -> WeekSettings {
        let Ok(content) = std::fs::read_to_string(path) else {
            return WeekSettings::default();
        };
        match serde_json::from_str::<WeekSettings>(&content) {
            Ok(settings) if settings.validate().is_ok() => settings,
            Ok(settings) => {
                warn!(limit = settings.drink_limit, "ignoring invalid drink limit in settings file");
                WeekSettings {
                    drink_limit: WeekSettings::default().drink_limit,
                    ..settings
                }
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "unreadable settings file; using defaults");
                WeekSettings::default()
            }
        }
    }

    /// Atomically write settings to `path`, creating parent directories if
    /// needed.
    pub fn save_to(settings: &WeekSettings, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
