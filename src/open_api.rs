//! Open-API day-file fetching: single days and linear date ranges.
//!
//! Day files live at `{base}/{kind}/v2/{year}/{date}.json`. A fetched day is
//! stored as one [`DayRecord`] under its `{date}_{kind}` key; the bulk path
//! skips days that already have a stored record. One day's failure is
//! recorded in the summary and never aborts the range.

use crate::error::{BulkConfigError, FetchError, ParseError};
use crate::models::open_api::{
    BulkFetchError, BulkFetchSummary, DataKind, DayRecord, PreviewsResponse, ProgramsResponse,
    ResultsResponse,
};
use crate::progress::{CancelToken, ProgressSink};
use crate::store::{self, RaceStore, StoreKey};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Source of raw day-file JSON.
pub trait DaySource: Sync {
    fn day_json(
        &self,
        kind: DataKind,
        date_compact: &str,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

impl DaySource for crate::scraper::PageClient {
    fn day_json(
        &self,
        kind: DataKind,
        date_compact: &str,
    ) -> impl Future<Output = Result<String, FetchError>> + Send {
        self.fetch_open_api_day(kind, date_compact)
    }
}

/// Per-day status of a bulk open-API fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenApiStatus {
    Fetching,
    Cached,
    Saved,
    Error,
    Completed,
}

/// Progress event for one fetched day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiProgress {
    pub message: String,
    pub current: usize,
    pub total: usize,
    pub date: String,
    pub data_kind: DataKind,
    pub status: OpenApiStatus,
}

/// Payout overview of one stored results day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutSummary {
    pub date: String,
    pub race_count: usize,
    pub max_trifecta_payout: Option<i64>,
}

/// Parse a day payload into its stored record, validating the kind's shape.
pub fn parse_day_record(
    kind: DataKind,
    date_compact: &str,
    json: &str,
) -> Result<DayRecord, ParseError> {
    if json.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let race_count = match kind {
        DataKind::Previews => serde_json::from_str::<PreviewsResponse>(json)
            .map_err(|e| ParseError::structure(format!("previews payload: {}", e)))?
            .previews
            .len(),
        DataKind::Results => serde_json::from_str::<ResultsResponse>(json)
            .map_err(|e| ParseError::structure(format!("results payload: {}", e)))?
            .results
            .len(),
        DataKind::Programs => serde_json::from_str::<ProgramsResponse>(json)
            .map_err(|e| ParseError::structure(format!("programs payload: {}", e)))?
            .programs
            .len(),
    };

    Ok(DayRecord {
        date: date_compact.to_string(),
        kind,
        race_count,
        fetched_at: Utc::now().to_rfc3339(),
        payload: json.to_string(),
    })
}

/// Open-API fetcher over an explicit source and store.
pub struct OpenApiFetcher<'a, S> {
    source: &'a S,
    store: &'a dyn RaceStore,
    unit_timeout: Duration,
}

impl<'a, S: DaySource> OpenApiFetcher<'a, S> {
    pub fn new(source: &'a S, store: &'a dyn RaceStore) -> Self {
        OpenApiFetcher {
            source,
            store,
            unit_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = timeout;
        self
    }

    /// Fetch one day, cache-first.
    pub async fn fetch_day(
        &self,
        kind: DataKind,
        date_compact: &str,
    ) -> Result<DayRecord, FetchError> {
        let fetched = crate::unit::fetch_unit(
            self.store,
            &StoreKey::day(date_compact, kind),
            || self.source.day_json(kind, date_compact),
            |json| parse_day_record(kind, date_compact, json),
        )
        .await?;
        Ok(fetched.record)
    }

    /// Fetch every day in the inclusive YYYYMMDD range, skipping days that
    /// already have a stored record.
    pub async fn fetch_data_bulk(
        &self,
        kind: DataKind,
        start_date: &str,
        end_date: &str,
        sink: &dyn ProgressSink<OpenApiProgress>,
        cancel: &CancelToken,
    ) -> Result<BulkFetchSummary, BulkConfigError> {
        let start = NaiveDate::parse_from_str(start_date, "%Y%m%d")
            .map_err(|e| BulkConfigError::InvalidDateRange(format!("start date: {}", e)))?;
        let end = NaiveDate::parse_from_str(end_date, "%Y%m%d")
            .map_err(|e| BulkConfigError::InvalidDateRange(format!("end date: {}", e)))?;
        if start > end {
            return Err(BulkConfigError::InvalidDateRange(format!(
                "{} is after {}",
                start_date, end_date
            )));
        }

        let total_days = (end - start).num_days() as usize + 1;
        let mut success_count = 0;
        let mut error_count = 0;
        let mut skipped_count = 0;
        let mut errors = Vec::new();

        tracing::info!(
            "starting bulk {} fetch: {} to {} ({} days)",
            kind,
            start_date,
            end_date,
            total_days
        );

        let mut current_date = start;
        let mut current_day = 0;

        while current_date <= end {
            current_day += 1;
            let date_str = current_date.format("%Y%m%d").to_string();
            current_date += ChronoDuration::days(1);

            if cancel.is_cancelled() {
                sink.report(self.day_event(
                    &date_str,
                    kind,
                    current_day,
                    total_days,
                    OpenApiStatus::Error,
                    "cancelled".to_string(),
                ));
                errors.push(BulkFetchError {
                    date: date_str,
                    error_message: "cancelled".to_string(),
                });
                error_count += 1;
                continue;
            }

            // skip-if-cached: a stored day record means this day is done
            let day_key = StoreKey::day(&date_str, kind);
            let already_stored = match self.store.get(&day_key) {
                Ok(record) => record.is_some(),
                Err(e) => {
                    tracing::warn!("store read failed for {}: {}", day_key, e);
                    false
                }
            };
            if already_stored {
                sink.report(self.day_event(
                    &date_str,
                    kind,
                    current_day,
                    total_days,
                    OpenApiStatus::Cached,
                    format!("skipping {} (already stored)", date_str),
                ));
                skipped_count += 1;
                continue;
            }

            sink.report(self.day_event(
                &date_str,
                kind,
                current_day,
                total_days,
                OpenApiStatus::Fetching,
                format!("fetching {} for {}", kind, date_str),
            ));

            let outcome =
                tokio::time::timeout(self.unit_timeout, self.fetch_and_store(kind, &date_str))
                    .await;
            let result = match outcome {
                Err(_) => Err(format!("day timed out after {:?}", self.unit_timeout)),
                Ok(result) => result,
            };

            match result {
                Ok(race_count) => {
                    sink.report(self.day_event(
                        &date_str,
                        kind,
                        current_day,
                        total_days,
                        OpenApiStatus::Saved,
                        format!("saved {} races for {}", race_count, date_str),
                    ));
                    success_count += 1;
                }
                Err(message) => {
                    tracing::warn!("bulk {} fetch failed for {}: {}", kind, date_str, message);
                    sink.report(self.day_event(
                        &date_str,
                        kind,
                        current_day,
                        total_days,
                        OpenApiStatus::Error,
                        message.clone(),
                    ));
                    errors.push(BulkFetchError {
                        date: date_str,
                        error_message: message,
                    });
                    error_count += 1;
                }
            }
        }

        sink.report(self.day_event(
            end_date,
            kind,
            total_days,
            total_days,
            OpenApiStatus::Completed,
            format!(
                "bulk fetch completed: {} saved, {} skipped, {} errors",
                success_count, skipped_count, error_count
            ),
        ));

        Ok(BulkFetchSummary {
            total_days,
            success_count,
            error_count,
            skipped_count,
            errors,
        })
    }

    /// Fetch, parse and store one day; the stored record is the success
    /// criterion here, so a write failure counts as the day's error.
    async fn fetch_and_store(&self, kind: DataKind, date_str: &str) -> Result<usize, String> {
        let json = self
            .source
            .day_json(kind, date_str)
            .await
            .map_err(|e| e.to_string())?;
        let record = parse_day_record(kind, date_str, &json).map_err(|e| e.to_string())?;
        let race_count = record.race_count;

        store::put_record(self.store, &StoreKey::day(date_str, kind), &record)
            .map_err(|e| format!("store write failed: {}", e))?;

        Ok(race_count)
    }

    /// Summarize the payouts of a stored results day; `None` when the day is
    /// not stored.
    pub fn results_payout_summary(
        &self,
        date_compact: &str,
    ) -> Result<Option<PayoutSummary>, ParseError> {
        let key = StoreKey::day(date_compact, DataKind::Results);
        let record: Option<DayRecord> = store::get_record(self.store, &key)
            .map_err(|e| ParseError::structure(format!("stored day record: {}", e)))?;
        let Some(record) = record else {
            return Ok(None);
        };

        let response: ResultsResponse = serde_json::from_str(&record.payload)
            .map_err(|e| ParseError::structure(format!("results payload: {}", e)))?;

        let max_trifecta_payout = response
            .results
            .iter()
            .filter_map(|race| race.payouts.trifecta.as_ref())
            .flatten()
            .filter_map(|entry| entry.payout)
            .max();

        Ok(Some(PayoutSummary {
            date: date_compact.to_string(),
            race_count: response.results.len(),
            max_trifecta_payout,
        }))
    }

    fn day_event(
        &self,
        date: &str,
        kind: DataKind,
        current: usize,
        total: usize,
        status: OpenApiStatus,
        message: String,
    ) -> OpenApiProgress {
        OpenApiProgress {
            message,
            current,
            total,
            date: date.to_string(),
            data_kind: kind,
            status,
        }
    }
}
