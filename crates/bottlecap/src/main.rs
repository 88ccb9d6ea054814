mod bootstrap;
mod render;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use bottlecap_core::error::BottleCapError;
use bottlecap_core::formatting::{format_day_label, format_drinks, format_week_range};
use bottlecap_core::models::{AuthorizationStatus, WeekSettings};
use bottlecap_core::settings::{Command, Settings, SettingsFile};
use bottlecap_core::time_utils::{week_start_for_day, Calendar, Clock, SystemClock};
use bottlecap_data::json_store::JsonHealthStore;
use bottlecap_runtime::history::HistoryManager;
use bottlecap_runtime::settings_store::SettingsStore;
use bottlecap_runtime::tracker::DrinkTracker;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();
    let data_dir = settings.data_dir();

    bootstrap::ensure_directories(&data_dir)?;
    bootstrap::setup_logging(settings.effective_log_level())?;

    tracing::info!("Bottle Cap v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(data_dir = %data_dir.display(), timezone = %settings.timezone, "configuration");

    let calendar = Calendar::try_new(&settings.timezone)?;
    let store = Arc::new(JsonHealthStore::open(JsonHealthStore::path_in(&data_dir))?);
    let preferences = SettingsStore::open(SettingsFile::path_in(&data_dir));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tracker = DrinkTracker::new(store.clone(), calendar, clock);

    let result = run(settings.command(), &store, &tracker, &preferences, &calendar).await;
    if let Err(BottleCapError::AuthorizationDenied) = &result {
        eprintln!("Access to the drink store is turned off. Run `bottlecap authorize` to allow it.");
    }
    Ok(result?)
}

async fn run(
    command: Command,
    store: &Arc<JsonHealthStore>,
    tracker: &DrinkTracker,
    preferences: &SettingsStore,
    calendar: &Calendar,
) -> bottlecap_core::Result<()> {
    let now = tracker.now();
    let today = calendar.day_of(now);

    match command {
        Command::Status => {
            tracker.ensure_authorized().await?;
            let summary = tracker.refresh(&preferences.get()).await?;
            print!("{}", render::summary(&summary));
        }

        Command::Log { drinks, date } => {
            tracker.ensure_authorized().await?;
            let entry = tracker.log_drinks(drinks, date).await?;
            println!(
                "Logged {} for {}.",
                format_drinks(entry.quantity),
                format_day_label(calendar.day_of(entry.timestamp), today)
            );

            let summary = tracker.refresh(&preferences.get()).await?;
            if summary.is_limit_hit() {
                println!("Weekly limit hit.");
            }
            print!("{}", render::summary(&summary));
        }

        Command::History => {
            tracker.ensure_authorized().await?;
            let mut history = HistoryManager::new(store.clone(), *calendar);
            history.load().await?;
            let buckets = history.buckets(preferences.get().week_start_day, now);
            print!("{}", render::history(&buckets, today));
        }

        Command::Week { start } => {
            tracker.ensure_authorized().await?;
            let week_start = week_start_for_day(start, preferences.get().week_start_day);
            let mut history = HistoryManager::new(store.clone(), *calendar);
            history.load().await?;
            print!(
                "{}",
                render::week(week_start, &history.week_detail(week_start), today)
            );
        }

        Command::DeleteDay { date } => {
            tracker.ensure_authorized().await?;
            let mut history = HistoryManager::new(store.clone(), *calendar);
            history.load().await?;
            history.delete_day(date).await?;
            println!("Deleted drinks for {}.", format_day_label(date, today));
        }

        Command::DeleteWeek { start } => {
            tracker.ensure_authorized().await?;
            let week_start = week_start_for_day(start, preferences.get().week_start_day);
            let mut history = HistoryManager::new(store.clone(), *calendar);
            history.load().await?;

            let report = history.delete_week(week_start).await;
            if report.deleted.is_empty() && report.is_complete() {
                println!("No drinks logged for {}.", format_week_range(week_start));
                return Ok(());
            }
            if !report.deleted.is_empty() {
                println!(
                    "Deleted drinks for {} ({} days).",
                    format_week_range(week_start),
                    report.deleted.len()
                );
            }
            report.into_result()?;
        }

        Command::Config { week_start, limit } => {
            if week_start.is_some() || limit.is_some() {
                let current = preferences.get();
                preferences.set(WeekSettings {
                    week_start_day: week_start.unwrap_or(current.week_start_day),
                    drink_limit: limit.unwrap_or(current.drink_limit),
                })?;
            }
            print!("{}", render::settings(&preferences.get()));
        }

        Command::Authorize { revoke } => {
            let status = if revoke {
                AuthorizationStatus::Denied
            } else {
                AuthorizationStatus::Authorized
            };
            store.set_authorization(status).await?;
            if revoke {
                println!("Access to the drink store revoked.");
            } else {
                println!("Access to the drink store granted.");
            }
        }
    }

    Ok(())
}
