//! HTTP client with rate limiting for the stats/odds pages and the open-API
//! day files.
//!
//! Retry with backoff lives here, at the transport layer; the unit fetcher
//! above never retries. Parse failures are terminal and never reach this
//! retry loop.

use crate::error::FetchError;
use crate::models::DataKind;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Stats-preview page (slider selects the page tab).
const BASE_URL_STATS: &str = "https://kyoteibiyori.com/race_shusso.php";
/// Official trifecta odds page.
const BASE_URL_TRIFECTA: &str = "https://www.boatrace.jp/owpc/pc/race/odds3t";
/// Open-API day files.
const BASE_URL_OPEN_API: &str = "https://boatraceopenapi.github.io";

/// Slider value for the lane stats tab.
const SLIDER_STATS: u8 = 1;
/// Slider value for the win/place odds tab.
const SLIDER_ODDS: u8 = 6;

/// Client configuration, owned by the caller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Delay between requests in milliseconds
    pub delay_ms: u64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Max retry attempts for transport failures
    pub max_retries: u32,
    /// User agent string
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            timeout_secs: 30,
            max_retries: 3,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

/// Page client with rate limiting.
pub struct PageClient {
    client: reqwest::Client,
    config: ClientConfig,
    last_request: Arc<Mutex<Instant>>,
}

impl PageClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            config,
            last_request: Arc::new(Mutex::new(Instant::now() - Duration::from_secs(10))),
        })
    }

    /// Wait for rate limit
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        let delay = Duration::from_millis(self.config.delay_ms);

        if elapsed < delay {
            tokio::time::sleep(delay - elapsed).await;
        }

        *last = Instant::now();
    }

    /// Build URL for the stats-preview page
    pub fn stats_url(&self, date_compact: &str, place_number: u8, race_number: u8) -> String {
        format!(
            "{}?place_no={}&race_no={}&hiduke={}&slider={}",
            BASE_URL_STATS, place_number, race_number, date_compact, SLIDER_STATS
        )
    }

    /// Build URL for the win/place odds tab
    pub fn odds_url(&self, date_compact: &str, place_number: u8, race_number: u8) -> String {
        format!(
            "{}?place_no={}&race_no={}&hiduke={}&slider={}",
            BASE_URL_STATS, place_number, race_number, date_compact, SLIDER_ODDS
        )
    }

    /// Build URL for the official trifecta odds page
    pub fn trifecta_url(&self, date_compact: &str, place_number: u8, race_number: u8) -> String {
        format!(
            "{}?rno={}&jcd={:02}&hd={}",
            BASE_URL_TRIFECTA, race_number, place_number, date_compact
        )
    }

    /// Build URL for an open-API day file
    pub fn open_api_url(&self, kind: DataKind, date_compact: &str) -> String {
        let year = &date_compact[0..4.min(date_compact.len())];
        format!(
            "{}/{}/v2/{}/{}.json",
            BASE_URL_OPEN_API,
            kind.as_str(),
            year,
            date_compact
        )
    }

    /// Fetch a page with rate limiting and retry
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let mut last_error = String::new();

        for attempt in 0..self.config.max_retries {
            self.wait_for_rate_limit().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.text().await?);
                    }
                    last_error = format!("HTTP status {}", status);
                    tracing::warn!(
                        "Request to {} failed with status {} (attempt {}/{})",
                        url,
                        status,
                        attempt + 1,
                        self.config.max_retries
                    );
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(
                        "Request to {} failed (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        self.config.max_retries,
                        e
                    );
                }
            }

            if attempt + 1 < self.config.max_retries {
                let backoff = Duration::from_millis(self.config.delay_ms * (attempt as u64 + 1));
                tokio::time::sleep(backoff).await;
            }
        }

        Err(FetchError::Network(format!(
            "failed to fetch {} after {} attempts: {}",
            url, self.config.max_retries, last_error
        )))
    }

    /// Fetch the stats-preview page for a race
    pub async fn fetch_stats_page(
        &self,
        date_compact: &str,
        place_number: u8,
        race_number: u8,
    ) -> Result<String, FetchError> {
        let url = self.stats_url(date_compact, place_number, race_number);
        tracing::info!("Fetching stats page: {}", url);
        self.fetch_text(&url).await
    }

    /// Fetch the win/place odds page for a race
    pub async fn fetch_odds_page(
        &self,
        date_compact: &str,
        place_number: u8,
        race_number: u8,
    ) -> Result<String, FetchError> {
        let url = self.odds_url(date_compact, place_number, race_number);
        tracing::info!("Fetching odds page: {}", url);
        self.fetch_text(&url).await
    }

    /// Fetch the official trifecta odds page for a race
    pub async fn fetch_trifecta_page(
        &self,
        date_compact: &str,
        place_number: u8,
        race_number: u8,
    ) -> Result<String, FetchError> {
        let url = self.trifecta_url(date_compact, place_number, race_number);
        tracing::info!("Fetching trifecta odds page: {}", url);
        self.fetch_text(&url).await
    }

    /// Fetch an open-API day file
    pub async fn fetch_open_api_day(
        &self,
        kind: DataKind,
        date_compact: &str,
    ) -> Result<String, FetchError> {
        let url = self.open_api_url(kind, date_compact);
        tracing::info!("Fetching {} day file: {}", kind, url);
        self.fetch_text(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_stats_url() {
        let client = PageClient::new(ClientConfig::default()).unwrap();
        assert_eq!(
            client.stats_url("20241201", 23, 1),
            "https://kyoteibiyori.com/race_shusso.php?place_no=23&race_no=1&hiduke=20241201&slider=1"
        );
    }

    #[test]
    fn test_odds_url_uses_odds_slider() {
        let client = PageClient::new(ClientConfig::default()).unwrap();
        let url = client.odds_url("20241201", 5, 12);
        assert!(url.contains("slider=6"));
        assert!(url.contains("place_no=5"));
        assert!(url.contains("race_no=12"));
    }

    #[test]
    fn test_trifecta_url_pads_place_number() {
        let client = PageClient::new(ClientConfig::default()).unwrap();
        assert_eq!(
            client.trifecta_url("20241230", 5, 12),
            "https://www.boatrace.jp/owpc/pc/race/odds3t?rno=12&jcd=05&hd=20241230"
        );
    }

    #[test]
    fn test_open_api_url() {
        let client = PageClient::new(ClientConfig::default()).unwrap();
        assert_eq!(
            client.open_api_url(DataKind::Results, "20241201"),
            "https://boatraceopenapi.github.io/results/v2/2024/20241201.json"
        );
        assert_eq!(
            client.open_api_url(DataKind::Previews, "20250101"),
            "https://boatraceopenapi.github.io/previews/v2/2025/20250101.json"
        );
    }
}
