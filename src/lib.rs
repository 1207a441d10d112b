//! Boatrace stats/odds scraping pipeline.
//!
//! This library provides:
//! - Parsers for the stats-preview page and the win/place and trifecta odds
//!   tables, producing typed records from loosely-structured markup
//! - A cache-first single-unit fetcher over a composite-key record store
//! - Bulk orchestration across date x venue x race ranges with progress
//!   reporting, cancellation, and partial-failure tolerance
//! - An open-API client for previews/results/programs day files
//!
//! # Example
//!
//! ```no_run
//! use boatrace_stats::bulk::{BulkOrchestrator, BulkScrapeRequest};
//! use boatrace_stats::progress::{CancelToken, NullSink};
//! use boatrace_stats::scraper::{ClientConfig, PageClient};
//! use boatrace_stats::store::FileStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PageClient::new(ClientConfig::default())?;
//!     let store = FileStore::new("data/races")?;
//!
//!     let request = BulkScrapeRequest {
//!         start_date: "2024-12-01".to_string(),
//!         end_date: "2024-12-03".to_string(),
//!         place_numbers: vec![12],
//!         race_numbers: vec![1, 2, 3],
//!     };
//!
//!     let results = BulkOrchestrator::new(&client, &store)
//!         .run(&request, &NullSink, &CancelToken::new())
//!         .await?;
//!     println!("{} units processed", results.len());
//!
//!     Ok(())
//! }
//! ```

pub mod bulk;
pub mod error;
pub mod extract;
pub mod models;
pub mod open_api;
pub mod progress;
pub mod scraper;
pub mod store;
pub mod unit;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used types
pub use error::{BulkConfigError, FetchError, ParseError, StoreError};
pub use models::{
    BettingType, BulkFetchSummary, BulkRaceData, DataKind, OddsData, OddsEntry, OddsValue,
    RaceData, TimeWindow,
};
pub use scraper::{parse_stats_page, parse_trifecta_odds, parse_win_place_odds};
