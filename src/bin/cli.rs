//! Command-line driver for the scraping and open-API pipelines.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use boatrace_stats::bulk::{BulkOrchestrator, BulkScrapeRequest, ScrapeProgress, ScrapeStatus};
use boatrace_stats::models::{DataKind, OddsEntry, RaceData, TimeWindow};
use boatrace_stats::open_api::{OpenApiFetcher, OpenApiProgress, OpenApiStatus};
use boatrace_stats::progress::CancelToken;
use boatrace_stats::scraper::{
    parse_stats_page, parse_trifecta_odds, parse_win_place_odds, venue_name, ClientConfig,
    PageClient,
};
use boatrace_stats::store::{FileStore, RaceStore, StoreKey};
use boatrace_stats::unit::fetch_unit;

const DEFAULT_DATA_DIR: &str = "data/races";

#[derive(Parser)]
#[command(name = "boatrace-stats")]
#[command(author, version, about = "Boatrace stats/odds scraper", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the record store directory
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and show the stats record for a single race
    Stats {
        /// Race date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Venue number (1-24)
        #[arg(short, long)]
        place: u8,

        /// Race number (1-12)
        #[arg(short, long)]
        race: u8,
    },

    /// Fetch and show odds for a single race
    Odds {
        /// Race date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Venue number (1-24)
        #[arg(short, long)]
        place: u8,

        /// Race number (1-12)
        #[arg(short, long)]
        race: u8,

        /// Scrape the trifecta table instead of win/place
        #[arg(long)]
        trifecta: bool,
    },

    /// Bulk scrape a date range across venues and races
    Bulk {
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        end: String,

        /// Venue numbers, comma separated (e.g. 1,12,24)
        #[arg(long, value_delimiter = ',')]
        places: Vec<u8>,

        /// Race numbers, comma separated (default: all 12)
        #[arg(long, value_delimiter = ',')]
        races: Vec<u8>,
    },

    /// Bulk fetch open-API day files for a date range
    OpenApi {
        /// Data kind: previews, results or programs
        #[arg(long)]
        kind: String,

        /// Start date (YYYYMMDD, inclusive)
        #[arg(long)]
        start: String,

        /// End date (YYYYMMDD, inclusive)
        #[arg(long)]
        end: String,
    },

    /// List stored record keys
    Keys,

    /// Delete every stored record
    Clear {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting tracing subscriber")?;

    let cli = Cli::parse();
    let store = FileStore::new(&cli.data_dir)
        .with_context(|| format!("opening store at {}", cli.data_dir.display()))?;

    match cli.command {
        Commands::Stats { date, place, race } => cmd_stats(&store, &date, place, race).await,
        Commands::Odds {
            date,
            place,
            race,
            trifecta,
        } => cmd_odds(&store, &date, place, race, trifecta).await,
        Commands::Bulk {
            start,
            end,
            places,
            races,
        } => cmd_bulk(&store, start, end, places, races).await,
        Commands::OpenApi { kind, start, end } => cmd_open_api(&store, &kind, &start, &end).await,
        Commands::Keys => cmd_keys(&store),
        Commands::Clear { yes } => cmd_clear(&store, yes),
    }
}

fn compact_date(date: &str) -> String {
    date.replace('-', "")
}

/// Cancel token wired to Ctrl-C, so a long bulk run aborts cleanly.
fn ctrl_c_token() -> CancelToken {
    let cancel = CancelToken::new();
    let handler = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "cancelling after in-flight units...".yellow());
            handler.cancel();
        }
    });
    cancel
}

async fn cmd_stats(store: &FileStore, date: &str, place: u8, race: u8) -> Result<()> {
    let client = PageClient::new(ClientConfig::default())?;
    let date_compact = compact_date(date);

    let fetched = fetch_unit(
        store,
        &StoreKey::stats(date, place, race),
        || client.fetch_stats_page(&date_compact, place, race),
        parse_stats_page,
    )
    .await?;

    let source = if fetched.from_cache() { "cache" } else { "network" };
    println!(
        "{} {} {}R ({})",
        date.bold(),
        venue_name(place),
        race,
        source.dimmed()
    );
    print_race_data(&fetched.record);
    Ok(())
}

fn print_race_data(data: &RaceData) {
    let info = &data.player_basic_info;
    println!(
        "lane 1: {} [{}] {} {} {}",
        info.name.bold(),
        info.class_level,
        info.registration_number,
        info.period,
        info.support_group
    );

    let pct = |v: f64| format!("{:.1}%", v * 100.0);
    println!(
        "escape {} / {}  allow-escape {} / {}",
        pct(data.escape_last_year).green(),
        pct(data.escape_last_half_year),
        pct(data.allow_escape_last_year),
        pct(data.allow_escape_last_half_year)
    );
    println!(
        "pierced {} / {}  overtaken {} / {}  wins in last 10: {}",
        pct(data.pierce_last_year),
        pct(data.pierce_last_half_year),
        pct(data.overtake_last_year),
        pct(data.overtake_last_half_year),
        data.first_place_last_10
    );

    if let Some(rate) = data.detailed_performance.first_place_rate.get(TimeWindow::ThisPeriod) {
        println!("1st-place rate this period: {}", pct(rate).cyan());
    }
    if let Some(st) = data.st_data.average_st.get(TimeWindow::ThisPeriod) {
        println!("average ST this period: {:.2}", st);
    }
}

async fn cmd_odds(store: &FileStore, date: &str, place: u8, race: u8, trifecta: bool) -> Result<()> {
    let client = PageClient::new(ClientConfig::default())?;
    let date_compact = compact_date(date);

    let odds = if trifecta {
        let html = client.fetch_trifecta_page(&date_compact, place, race).await?;
        parse_trifecta_odds(&html)?
    } else {
        let fetched = fetch_unit(
            store,
            &StoreKey::odds(date, place, race),
            || client.fetch_odds_page(&date_compact, place, race),
            parse_win_place_odds,
        )
        .await?;
        fetched.record
    };

    println!(
        "{} {} {}R: {} {} entries",
        date.bold(),
        venue_name(place),
        race,
        odds.entries.len(),
        odds.betting_type.as_str()
    );

    for entry in &odds.entries {
        let combo = entry
            .boats()
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join("-");
        match entry {
            OddsEntry::Win { odds, .. } => println!("  win   {}  {:.1}", combo, odds),
            OddsEntry::Place { odds, .. } => match odds.range_text() {
                Some(text) => println!("  place {}  {}", combo, text),
                None => println!("  place {}  {:.1}", combo, odds.value()),
            },
            OddsEntry::Duo { odds, .. } | OddsEntry::Trio { odds, .. } => {
                println!("  {}  {:.1}", combo, odds.value())
            }
        }
    }
    Ok(())
}

async fn cmd_bulk(
    store: &FileStore,
    start: String,
    end: String,
    places: Vec<u8>,
    races: Vec<u8>,
) -> Result<()> {
    let client = PageClient::new(ClientConfig::default())?;
    let races = if races.is_empty() {
        (1..=12).collect()
    } else {
        races
    };

    let request = BulkScrapeRequest {
        start_date: start,
        end_date: end,
        place_numbers: places,
        race_numbers: races,
    };

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("static progress template"),
    );
    let bar_sink = bar.clone();
    let sink = move |event: ScrapeProgress| {
        bar_sink.set_length(event.total as u64);
        bar_sink.set_position(event.current as u64);
        if event.status != ScrapeStatus::Scraping {
            bar_sink.set_message(event.message);
        }
    };

    let results = BulkOrchestrator::new(&client, store)
        .run(&request, &sink, &ctrl_c_token())
        .await?;
    bar.finish_and_clear();

    let errors: Vec<_> = results.iter().filter(|u| u.error.is_some()).collect();
    println!(
        "{} units: {} ok, {} failed",
        results.len(),
        (results.len() - errors.len()).to_string().green(),
        errors.len().to_string().red()
    );
    for unit in errors {
        println!(
            "  {} {}-{:02}R: {}",
            "failed".red(),
            unit.date,
            unit.race_number,
            unit.error.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

async fn cmd_open_api(store: &FileStore, kind: &str, start: &str, end: &str) -> Result<()> {
    let Some(kind) = DataKind::parse(kind) else {
        bail!("unknown data kind {:?}; expected previews, results or programs", kind);
    };
    let client = PageClient::new(ClientConfig::default())?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("static progress template"),
    );
    let bar_sink = bar.clone();
    let sink = move |event: OpenApiProgress| {
        bar_sink.set_length(event.total as u64);
        bar_sink.set_position(event.current as u64);
        if event.status != OpenApiStatus::Fetching {
            bar_sink.set_message(event.message);
        }
    };

    let summary = OpenApiFetcher::new(&client, store)
        .fetch_data_bulk(kind, start, end, &sink, &ctrl_c_token())
        .await?;
    bar.finish_and_clear();

    println!(
        "{} days: {} saved, {} skipped, {} failed",
        summary.total_days,
        summary.success_count.to_string().green(),
        summary.skipped_count,
        summary.error_count.to_string().red()
    );
    for error in &summary.errors {
        println!("  {} {}: {}", "failed".red(), error.date, error.error_message);
    }
    Ok(())
}

fn cmd_keys(store: &FileStore) -> Result<()> {
    let keys = store.list_keys()?;
    if keys.is_empty() {
        println!("store is empty");
        return Ok(());
    }
    for key in keys {
        println!("{}", key);
    }
    Ok(())
}

fn cmd_clear(store: &FileStore, yes: bool) -> Result<()> {
    let count = store.list_keys()?.len();
    if !yes {
        bail!(
            "refusing to delete {} records without --yes",
            count
        );
    }
    store.clear_all()?;
    println!("deleted {} records", count);
    Ok(())
}
