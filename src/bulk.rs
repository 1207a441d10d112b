//! Bulk scrape orchestration over a date × venue × race cross-product.
//!
//! Units are iterated in a deterministic order (dates ascending, then venues,
//! then races) and processed through the single-unit fetcher. A unit's
//! failure is recorded on that unit and never aborts the batch; only
//! configuration errors fail the run up front. The result enumerates every
//! unit in scope, populated or carrying an error.

use crate::error::{BulkConfigError, FetchError};
use crate::models::race::{BulkRaceData, RaceData};
use crate::models::OddsData;
use crate::progress::{CancelToken, ProgressSink};
use crate::scraper::{parse_stats_page, parse_win_place_odds};
use crate::store::{RaceStore, StoreKey};
use crate::unit::{fetch_unit, Fetched};
use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Source of raw page text for the two scraped page kinds.
///
/// `PageClient` is the production implementation; tests substitute canned
/// documents.
pub trait PageSource: Sync {
    fn stats_page(
        &self,
        date_compact: &str,
        place_number: u8,
        race_number: u8,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;

    fn odds_page(
        &self,
        date_compact: &str,
        place_number: u8,
        race_number: u8,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

impl PageSource for crate::scraper::PageClient {
    fn stats_page(
        &self,
        date_compact: &str,
        place_number: u8,
        race_number: u8,
    ) -> impl Future<Output = Result<String, FetchError>> + Send {
        self.fetch_stats_page(date_compact, place_number, race_number)
    }

    fn odds_page(
        &self,
        date_compact: &str,
        place_number: u8,
        race_number: u8,
    ) -> impl Future<Output = Result<String, FetchError>> + Send {
        self.fetch_odds_page(date_compact, place_number, race_number)
    }
}

/// Per-unit status of a bulk scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    CacheHit,
    Scraping,
    Saved,
    Error,
    Completed,
}

/// Progress event for one bulk-scrape unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeProgress {
    pub message: String,
    pub current: usize,
    pub total: usize,
    pub date: String,
    pub place_number: u8,
    pub race_number: u8,
    pub status: ScrapeStatus,
}

/// Cross-product request: every (date, place, race) combination in the
/// range is one unit.
#[derive(Debug, Clone)]
pub struct BulkScrapeRequest {
    /// Inclusive start date, YYYY-MM-DD.
    pub start_date: String,
    /// Inclusive end date, YYYY-MM-DD.
    pub end_date: String,
    pub place_numbers: Vec<u8>,
    pub race_numbers: Vec<u8>,
}

/// Validated iteration plan: ascending dates, venues, races.
struct ScrapePlan {
    dates: Vec<NaiveDate>,
    places: Vec<u8>,
    races: Vec<u8>,
}

impl ScrapePlan {
    fn build(request: &BulkScrapeRequest) -> Result<Self, BulkConfigError> {
        let start = NaiveDate::parse_from_str(&request.start_date, "%Y-%m-%d")
            .map_err(|e| BulkConfigError::InvalidDateRange(format!("start date: {}", e)))?;
        let end = NaiveDate::parse_from_str(&request.end_date, "%Y-%m-%d")
            .map_err(|e| BulkConfigError::InvalidDateRange(format!("end date: {}", e)))?;
        if start > end {
            return Err(BulkConfigError::InvalidDateRange(format!(
                "{} is after {}",
                request.start_date, request.end_date
            )));
        }

        if request.place_numbers.is_empty() {
            return Err(BulkConfigError::EmptySelection("venue"));
        }
        if request.race_numbers.is_empty() {
            return Err(BulkConfigError::EmptySelection("race"));
        }
        for &place in &request.place_numbers {
            if !(1..=24).contains(&place) {
                return Err(BulkConfigError::OutOfRange {
                    what: "place number",
                    value: place,
                });
            }
        }
        for &race in &request.race_numbers {
            if !(1..=12).contains(&race) {
                return Err(BulkConfigError::OutOfRange {
                    what: "race number",
                    value: race,
                });
            }
        }

        let mut dates = Vec::new();
        let mut current = start;
        while current <= end {
            dates.push(current);
            current += ChronoDuration::days(1);
        }

        let mut places = request.place_numbers.clone();
        places.sort_unstable();
        places.dedup();
        let mut races = request.race_numbers.clone();
        races.sort_unstable();
        races.dedup();

        Ok(ScrapePlan {
            dates,
            places,
            races,
        })
    }

    fn total(&self) -> usize {
        self.dates.len() * self.places.len() * self.races.len()
    }
}

/// Drives the cross-product bulk scrape.
pub struct BulkOrchestrator<'a, S> {
    source: &'a S,
    store: &'a dyn RaceStore,
    unit_timeout: Duration,
}

impl<'a, S: PageSource> BulkOrchestrator<'a, S> {
    pub fn new(source: &'a S, store: &'a dyn RaceStore) -> Self {
        BulkOrchestrator {
            source,
            store,
            unit_timeout: Duration::from_secs(60),
        }
    }

    /// Upper bound on one unit's fetch+parse+cache work; a hung unit is
    /// recorded as that unit's error instead of stalling the batch.
    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = timeout;
        self
    }

    /// Run the bulk scrape. The returned vector has exactly one element per
    /// cross-product unit, in iteration order.
    pub async fn run(
        &self,
        request: &BulkScrapeRequest,
        sink: &dyn ProgressSink<ScrapeProgress>,
        cancel: &CancelToken,
    ) -> Result<Vec<BulkRaceData>, BulkConfigError> {
        let plan = ScrapePlan::build(request)?;
        let total = plan.total();

        let mut results = Vec::with_capacity(total);
        let mut current = 0;

        for date in &plan.dates {
            let date_str = date.format("%Y-%m-%d").to_string();
            let date_compact = date.format("%Y%m%d").to_string();

            for &place_number in &plan.places {
                for &race_number in &plan.races {
                    current += 1;

                    let mut unit = BulkRaceData {
                        date: date_str.clone(),
                        place_number,
                        race_number,
                        race_data: None,
                        odds_data: None,
                        error: None,
                    };

                    if cancel.is_cancelled() {
                        unit.error = Some("cancelled".to_string());
                        sink.report(self.unit_event(
                            &unit,
                            current,
                            total,
                            ScrapeStatus::Error,
                            "cancelled".to_string(),
                        ));
                        results.push(unit);
                        continue;
                    }

                    sink.report(self.unit_event(
                        &unit,
                        current,
                        total,
                        ScrapeStatus::Scraping,
                        format!("scraping {}-{:02}-{:02}", date_str, place_number, race_number),
                    ));

                    let outcome = tokio::time::timeout(
                        self.unit_timeout,
                        self.fetch_pair(&date_str, &date_compact, place_number, race_number),
                    )
                    .await;

                    match outcome {
                        Err(_) => {
                            unit.error = Some(format!(
                                "unit timed out after {:?}",
                                self.unit_timeout
                            ));
                        }
                        Ok(Err(e)) => {
                            unit.error = Some(e.to_string());
                        }
                        Ok(Ok((stats, odds))) => {
                            let all_cached = stats.from_cache() && odds.from_cache();
                            unit.race_data = Some(stats.record);
                            unit.odds_data = Some(odds.record);

                            let (status, message) = if all_cached {
                                (
                                    ScrapeStatus::CacheHit,
                                    format!(
                                        "cache hit {}-{:02}-{:02}",
                                        date_str, place_number, race_number
                                    ),
                                )
                            } else {
                                (
                                    ScrapeStatus::Saved,
                                    format!(
                                        "saved {}-{:02}-{:02}",
                                        date_str, place_number, race_number
                                    ),
                                )
                            };
                            sink.report(self.unit_event(&unit, current, total, status, message));
                            results.push(unit);
                            continue;
                        }
                    }

                    // failure path: no partial data survives on the unit
                    let message = unit.error.clone().unwrap_or_default();
                    tracing::warn!(
                        "bulk unit {}-{:02}-{:02} failed: {}",
                        date_str,
                        place_number,
                        race_number,
                        message
                    );
                    sink.report(self.unit_event(
                        &unit,
                        current,
                        total,
                        ScrapeStatus::Error,
                        message,
                    ));
                    results.push(unit);
                }
            }
        }

        sink.report(ScrapeProgress {
            message: format!("bulk scrape completed: {} units", total),
            current: total,
            total,
            date: request.end_date.clone(),
            place_number: 0,
            race_number: 0,
            status: ScrapeStatus::Completed,
        });

        Ok(results)
    }

    async fn fetch_pair(
        &self,
        date: &str,
        date_compact: &str,
        place_number: u8,
        race_number: u8,
    ) -> Result<(Fetched<RaceData>, Fetched<OddsData>), FetchError> {
        let stats_key = StoreKey::stats(date, place_number, race_number);
        let stats = fetch_unit(
            self.store,
            &stats_key,
            || self.source.stats_page(date_compact, place_number, race_number),
            parse_stats_page,
        )
        .await?;

        let odds_key = StoreKey::odds(date, place_number, race_number);
        let odds = fetch_unit(
            self.store,
            &odds_key,
            || self.source.odds_page(date_compact, place_number, race_number),
            parse_win_place_odds,
        )
        .await?;

        Ok((stats, odds))
    }

    fn unit_event(
        &self,
        unit: &BulkRaceData,
        current: usize,
        total: usize,
        status: ScrapeStatus,
        message: String,
    ) -> ScrapeProgress {
        ScrapeProgress {
            message,
            current,
            total,
            date: unit.date.clone(),
            place_number: unit.place_number,
            race_number: unit.race_number,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{stats_page_html, win_place_html};
    use crate::progress::NullSink;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockSource {
        stats_html: String,
        odds_html: String,
        /// (date_compact, place, race) whose stats page comes back broken
        broken_unit: Option<(String, u8, u8)>,
        fetch_calls: AtomicUsize,
    }

    impl MockSource {
        fn new() -> Self {
            MockSource {
                stats_html: stats_page_html(),
                odds_html: win_place_html(),
                broken_unit: None,
                fetch_calls: AtomicUsize::new(0),
            }
        }

        fn with_broken_unit(mut self, date_compact: &str, place: u8, race: u8) -> Self {
            self.broken_unit = Some((date_compact.to_string(), place, race));
            self
        }

        fn calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }
    }

    impl PageSource for MockSource {
        fn stats_page(
            &self,
            date_compact: &str,
            place_number: u8,
            race_number: u8,
        ) -> impl Future<Output = Result<String, FetchError>> + Send {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let broken = self.broken_unit.as_ref().is_some_and(|(d, p, r)| {
                d == date_compact && *p == place_number && *r == race_number
            });
            let html = if broken {
                "<html><body><p>maintenance page</p></body></html>".to_string()
            } else {
                self.stats_html.clone()
            };
            std::future::ready(Ok(html))
        }

        fn odds_page(
            &self,
            _date_compact: &str,
            _place_number: u8,
            _race_number: u8,
        ) -> impl Future<Output = Result<String, FetchError>> + Send {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(self.odds_html.clone()))
        }
    }

    fn request(start: &str, end: &str, places: Vec<u8>, races: Vec<u8>) -> BulkScrapeRequest {
        BulkScrapeRequest {
            start_date: start.to_string(),
            end_date: end.to_string(),
            place_numbers: places,
            race_numbers: races,
        }
    }

    #[tokio::test]
    async fn test_cross_product_shape_and_order() {
        let source = MockSource::new();
        let store = MemoryStore::new();
        let orchestrator = BulkOrchestrator::new(&source, &store);

        let results = orchestrator
            .run(
                &request("2024-12-01", "2024-12-02", vec![12, 1], vec![2, 1]),
                &NullSink,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        // 2 dates x 2 venues x 2 races
        assert_eq!(results.len(), 8);

        // deterministic order: dates, then venues, then races, all ascending
        let head: Vec<(String, u8, u8)> = results
            .iter()
            .take(4)
            .map(|u| (u.date.clone(), u.place_number, u.race_number))
            .collect();
        assert_eq!(
            head,
            vec![
                ("2024-12-01".to_string(), 1, 1),
                ("2024-12-01".to_string(), 1, 2),
                ("2024-12-01".to_string(), 12, 1),
                ("2024-12-01".to_string(), 12, 2),
            ]
        );
        assert_eq!(results[4].date, "2024-12-02");

        // every unit populated, none errored
        assert!(results.iter().all(|u| u.has_data() && u.error.is_none()));
    }

    #[tokio::test]
    async fn test_partial_failure_never_aborts_batch() {
        let source = MockSource::new().with_broken_unit("20241201", 1, 2);
        let store = MemoryStore::new();
        let orchestrator = BulkOrchestrator::new(&source, &store);

        let results = orchestrator
            .run(
                &request("2024-12-01", "2024-12-01", vec![1], vec![1, 2, 3]),
                &NullSink,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 3);

        let failed: Vec<&BulkRaceData> =
            results.iter().filter(|u| u.error.is_some()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].race_number, 2);
        // exactly-one-of invariant: the failed unit carries no partial data
        assert!(!failed[0].has_data());

        for unit in results.iter().filter(|u| u.error.is_none()) {
            assert!(unit.race_data.is_some());
            assert!(unit.odds_data.is_some());
        }
    }

    #[tokio::test]
    async fn test_exactly_one_of_data_or_error_holds_for_all_units() {
        let source = MockSource::new().with_broken_unit("20241202", 1, 1);
        let store = MemoryStore::new();
        let orchestrator = BulkOrchestrator::new(&source, &store);

        let results = orchestrator
            .run(
                &request("2024-12-01", "2024-12-03", vec![1], vec![1]),
                &NullSink,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        for unit in &results {
            assert!(
                unit.has_data() != unit.error.is_some(),
                "unit {}-{} violates exactly-one-of",
                unit.date,
                unit.race_number
            );
        }
    }

    #[tokio::test]
    async fn test_cached_units_skip_network_and_report_cache_hit() {
        let source = MockSource::new();
        let store = MemoryStore::new();
        let orchestrator = BulkOrchestrator::new(&source, &store);
        let req = request("2024-12-01", "2024-12-01", vec![1], vec![1]);

        let first = orchestrator
            .run(&req, &NullSink, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(source.calls(), 2); // one stats + one odds fetch

        let events: Mutex<Vec<ScrapeProgress>> = Mutex::new(Vec::new());
        let sink = |event: ScrapeProgress| events.lock().unwrap().push(event);
        let second = orchestrator
            .run(&req, &sink, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(second.len(), 1);
        assert!(second[0].has_data());
        // zero additional network calls on the warm cache
        assert_eq!(source.calls(), 2);

        let statuses: Vec<ScrapeStatus> =
            events.lock().unwrap().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                ScrapeStatus::Scraping,
                ScrapeStatus::CacheHit,
                ScrapeStatus::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_counter_is_monotonic_and_complete() {
        let source = MockSource::new();
        let store = MemoryStore::new();
        let orchestrator = BulkOrchestrator::new(&source, &store);

        let events: Mutex<Vec<ScrapeProgress>> = Mutex::new(Vec::new());
        let sink = |event: ScrapeProgress| events.lock().unwrap().push(event);

        orchestrator
            .run(
                &request("2024-12-01", "2024-12-01", vec![1], vec![1, 2]),
                &sink,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        let events = events.lock().unwrap();
        // per unit: Scraping + Saved, then one Completed
        assert_eq!(events.len(), 5);
        assert!(events.windows(2).all(|w| w[0].current <= w[1].current));
        let last = events.last().unwrap();
        assert_eq!(last.status, ScrapeStatus::Completed);
        assert_eq!(last.current, last.total);
        assert!(events.iter().all(|e| e.total == 2));
    }

    #[tokio::test]
    async fn test_cancellation_stops_new_units_but_enumerates_all() {
        let source = MockSource::new();
        let store = MemoryStore::new();
        let orchestrator = BulkOrchestrator::new(&source, &store);

        let cancel = CancelToken::new();
        let cancel_from_sink = cancel.clone();
        let sink = move |event: ScrapeProgress| {
            if event.status == ScrapeStatus::Saved {
                cancel_from_sink.cancel();
            }
        };

        let results = orchestrator
            .run(
                &request("2024-12-01", "2024-12-01", vec![1], vec![1, 2, 3, 4]),
                &sink,
                &cancel,
            )
            .await
            .unwrap();

        // every in-scope unit still appears in the result
        assert_eq!(results.len(), 4);
        assert!(results[0].has_data());
        for unit in &results[1..] {
            assert_eq!(unit.error.as_deref(), Some("cancelled"));
            assert!(!unit.has_data());
        }
        // only the first unit reached the network
        assert_eq!(source.calls(), 2);
    }

    /// Source whose stats page never resolves.
    struct HangingSource;

    impl PageSource for HangingSource {
        fn stats_page(
            &self,
            _date_compact: &str,
            _place_number: u8,
            _race_number: u8,
        ) -> impl Future<Output = Result<String, FetchError>> + Send {
            std::future::pending()
        }

        fn odds_page(
            &self,
            _date_compact: &str,
            _place_number: u8,
            _race_number: u8,
        ) -> impl Future<Output = Result<String, FetchError>> + Send {
            std::future::pending()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_unit_is_bounded_by_timeout() {
        let source = HangingSource;
        let store = MemoryStore::new();
        let orchestrator = BulkOrchestrator::new(&source, &store)
            .with_unit_timeout(Duration::from_millis(100));

        let results = orchestrator
            .run(
                &request("2024-12-01", "2024-12-01", vec![1], vec![1]),
                &NullSink,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].error.as_deref().unwrap().contains("timed out"));
        assert!(!results[0].has_data());
    }

    #[tokio::test]
    async fn test_config_errors_abort_before_any_unit() {
        let source = MockSource::new();
        let store = MemoryStore::new();
        let orchestrator = BulkOrchestrator::new(&source, &store);
        let cancel = CancelToken::new();

        let bad_date = request("2024-13-99", "2024-12-01", vec![1], vec![1]);
        assert!(matches!(
            orchestrator.run(&bad_date, &NullSink, &cancel).await,
            Err(BulkConfigError::InvalidDateRange(_))
        ));

        let inverted = request("2024-12-05", "2024-12-01", vec![1], vec![1]);
        assert!(matches!(
            orchestrator.run(&inverted, &NullSink, &cancel).await,
            Err(BulkConfigError::InvalidDateRange(_))
        ));

        let no_venues = request("2024-12-01", "2024-12-01", vec![], vec![1]);
        assert!(matches!(
            orchestrator.run(&no_venues, &NullSink, &cancel).await,
            Err(BulkConfigError::EmptySelection("venue"))
        ));

        let bad_place = request("2024-12-01", "2024-12-01", vec![25], vec![1]);
        assert!(matches!(
            orchestrator.run(&bad_place, &NullSink, &cancel).await,
            Err(BulkConfigError::OutOfRange { value: 25, .. })
        ));

        assert_eq!(source.calls(), 0);
    }
}
