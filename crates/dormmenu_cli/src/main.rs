//! Operator CLI for the dormitory menu store.
//!
//! # Responsibility
//! - Import parsed draft batches and print the import summary.
//! - Print today's menu, a month, or a calendar month from the store.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dormmenu_core::db::open_db;
use dormmenu_core::{
    default_log_level, init_logging, parse_draft_batch, Clock, EvictionPolicy, FixedClock,
    MenuItem, MenuService, MenuStore, MonthKey, SqliteDayRowRepository, SqliteSnapshotBackend,
    StoreSettings, SystemClock,
};
use log::warn;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dormmenu")]
#[command(about = "Dormitory cafeteria menu store", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args)]
struct StoreArgs {
    /// SQLite database holding the menu snapshot and day rows
    #[arg(long, global = true, default_value = "dormmenu.sqlite3")]
    db: PathBuf,

    /// Absolute directory for rolling log files (logging is off when unset)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Number of months retained in the store
    #[arg(long, global = true, default_value_t = dormmenu_core::settings::DEFAULT_MAX_MONTHS)]
    max_months: usize,

    /// Eviction policy: oldest_first|drop_past
    #[arg(long, global = true, default_value = "oldest_first")]
    eviction: EvictionPolicy,

    /// Pin "today" (YYYY-MM-DD) instead of reading the wall clock
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSON array of {date, breakfast, dinner} drafts
    Import {
        file: PathBuf,
    },
    /// Show today's menu
    Today,
    /// Show the stored items of one month (YYYY-MM)
    Month {
        month: MonthKey,
    },
    /// Show every day of a month (YYYY-MM), marking days without service
    Calendar {
        month: MonthKey,
    },
    /// List stored months
    Months,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(log_dir) = &cli.store.log_dir {
        let level = cli
            .store
            .log_level
            .as_deref()
            .unwrap_or(default_log_level());
        init_logging(level, &log_dir.to_string_lossy())
            .map_err(anyhow::Error::msg)
            .context("failed to initialize logging")?;
    }

    let settings = StoreSettings::new(
        cli.store.max_months,
        cli.store.eviction,
        dormmenu_core::settings::DEFAULT_STORAGE_KEY,
    )?;
    let clock: Arc<dyn Clock> = match cli.store.today {
        Some(date) => Arc::new(FixedClock::at_date(date)),
        None => Arc::new(SystemClock),
    };

    let snapshot_conn = open_db(&cli.store.db)
        .with_context(|| format!("failed to open {}", cli.store.db.display()))?;
    let (store, load_error) =
        MenuStore::open(Box::new(SqliteSnapshotBackend::new(snapshot_conn)), clock, settings);
    if let Some(err) = load_error {
        warn!("event=cli_store_open module=cli status=error error={err}");
        eprintln!("warning: stored menu data was unreadable and has been ignored: {err}");
    }

    let rows_conn = open_db(&cli.store.db)
        .with_context(|| format!("failed to open {}", cli.store.db.display()))?;
    let authority = SqliteDayRowRepository::try_new(&rows_conn)?;
    let service = MenuService::new(&store).with_authority(&authority);

    match cli.command {
        Commands::Import { file } => {
            let json = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let drafts = parse_draft_batch(&json)
                .with_context(|| format!("{} is not a JSON array of drafts", file.display()))?;
            let result = service.import_from_drafts(&drafts)?;
            println!(
                "success={} skipped={} failed={}",
                result.success, result.skipped, result.failed
            );
        }
        Commands::Today => match service.fetch_current_menu() {
            Some(item) => print_item(&item),
            None => println!("{}: no menu data for today", store.clock().today()),
        },
        Commands::Month { month } => {
            let items = service.fetch_monthly_menu(month.year(), month.month());
            if items.is_empty() {
                println!("{month}: no menu data");
            }
            for item in &items {
                print_item(item);
            }
        }
        Commands::Calendar { month } => {
            for cell in service.fetch_calendar_month(month.year(), month.month()) {
                let marker = if cell.is_today { "*" } else { " " };
                if cell.item.no_menu {
                    println!("{marker}{:>2}  no dormitory meal service", cell.day);
                } else {
                    println!(
                        "{marker}{:>2}  breakfast: {} / dinner: {}",
                        cell.day,
                        cell.item.breakfast.join(" "),
                        cell.item.dinner.join(" ")
                    );
                }
            }
        }
        Commands::Months => {
            for month in store.month_keys() {
                if let Some(bucket) = store.get_month(month) {
                    println!(
                        "{month}  days={}  last_updated={}",
                        bucket.items().len(),
                        bucket.last_updated().to_rfc3339()
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_item(item: &MenuItem) {
    println!("{}", item.date);
    println!("  breakfast: {}", dishes_or_dash(&item.breakfast));
    println!("  dinner:    {}", dishes_or_dash(&item.dinner));
}

fn dishes_or_dash(dishes: &[String]) -> String {
    if dishes.is_empty() {
        "-".to_string()
    } else {
        dishes.join(" ")
    }
}
