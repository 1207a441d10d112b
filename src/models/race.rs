//! Per-race statistics records scraped from the stats-preview page.
//!
//! Window-keyed statistics are sparse: the source publishes a different
//! subset of time windows per table, so absent keys mean "not published",
//! never zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time windows the stats-preview tables publish columns for.
///
/// The last four only appear in the ST tables; performance tables never
/// populate them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    ThisPeriod,
    Last6Months,
    Last3Months,
    Last1Month,
    LocalVenue,
    GeneralRaces,
    SgG1,
    FirstDay,
    FinalDay,
    NightRaces,
    FlyingHistory,
}

impl TimeWindow {
    /// Windows published by the performance-rate tables.
    pub const PERFORMANCE: [TimeWindow; 7] = [
        TimeWindow::ThisPeriod,
        TimeWindow::Last6Months,
        TimeWindow::Last3Months,
        TimeWindow::Last1Month,
        TimeWindow::LocalVenue,
        TimeWindow::GeneralRaces,
        TimeWindow::SgG1,
    ];

    /// Windows published by the ST tables (performance windows plus the
    /// day/session columns).
    pub const ST: [TimeWindow; 11] = [
        TimeWindow::ThisPeriod,
        TimeWindow::Last6Months,
        TimeWindow::Last3Months,
        TimeWindow::Last1Month,
        TimeWindow::LocalVenue,
        TimeWindow::GeneralRaces,
        TimeWindow::SgG1,
        TimeWindow::FirstDay,
        TimeWindow::FinalDay,
        TimeWindow::NightRaces,
        TimeWindow::FlyingHistory,
    ];
}

/// Sparse window → rate mapping. Values are fractions in [0,1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable(BTreeMap<TimeWindow, f64>);

/// Sparse window → timing mapping (average ST seconds or ST-rank values).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingTable(BTreeMap<TimeWindow, f64>);

macro_rules! window_table_impl {
    ($name:ident) => {
        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn get(&self, window: TimeWindow) -> Option<f64> {
                self.0.get(&window).copied()
            }

            /// Inserts when the extractor produced a value; absence leaves the
            /// table sparse.
            pub fn insert_if_present(&mut self, window: TimeWindow, value: Option<f64>) {
                if let Some(v) = value {
                    self.0.insert(window, v);
                }
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn iter(&self) -> impl Iterator<Item = (TimeWindow, f64)> + '_ {
                self.0.iter().map(|(w, v)| (*w, *v))
            }
        }
    };
}

window_table_impl!(RateTable);
window_table_impl!(TimingTable);

/// Basic information for the lane-1 racer on the scraped page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerBasicInfo {
    pub registration_number: String,
    pub name: String,
    /// Class level string: A1 / A2 / B1 / B2.
    pub class_level: String,
    pub period: String,
    pub support_group: String,
    pub gender: String,
}

/// Lane win rate published for two fixed windows only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaneWinRate {
    pub last_1_year: Option<f64>,
    pub last_6_months: Option<f64>,
}

/// Finish-rate tables per time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedPerformanceData {
    pub first_place_rate: RateTable,
    pub top2_rate: RateTable,
    pub top3_rate: RateTable,
    pub lane_win_rate: LaneWinRate,
}

/// Derived start-timing analysis rates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct STAnalysis {
    pub stability_rate: Option<f64>,
    pub break_out_rate: Option<f64>,
    pub late_start_rate: Option<f64>,
}

/// Start-timing tables and the derived analysis block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct STRelatedData {
    pub average_st: TimingTable,
    pub st_ranking: TimingTable,
    pub st_analysis: STAnalysis,
}

/// Winning-hand rates (half-year window): how lane 1 wins or loses relative
/// to boat position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinningHandData {
    pub escape_rate: Option<f64>,
    pub let_escape_rate: Option<f64>,
    pub pierced_rate: Option<f64>,
    pub pierce_rate: Option<f64>,
    pub overtaken_rate: Option<f64>,
    pub overtake_rate: Option<f64>,
}

/// Full stats record for one (date, place, race) scrape.
///
/// The eight aggregate rates are always present in the source layout and are
/// required for a successful parse; everything nested below them is sparse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceData {
    pub escape_last_year: f64,
    pub escape_last_half_year: f64,
    pub allow_escape_last_year: f64,
    pub allow_escape_last_half_year: f64,
    pub pierce_last_year: f64,
    pub pierce_last_half_year: f64,
    pub overtake_last_year: f64,
    pub overtake_last_half_year: f64,
    /// First-place finishes across the last 10 races; 0 when the page omits
    /// the block.
    pub first_place_last_10: u32,
    pub player_basic_info: PlayerBasicInfo,
    pub detailed_performance: DetailedPerformanceData,
    pub st_data: STRelatedData,
    pub winning_hand: WinningHandData,
}

impl RaceData {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One unit of a cross-product bulk scrape.
///
/// After processing exactly one of {data present, error present} holds: a
/// unit that fails at any stage carries the error and no partial data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRaceData {
    pub date: String,
    pub place_number: u8,
    pub race_number: u8,
    pub race_data: Option<RaceData>,
    pub odds_data: Option<super::odds::OddsData>,
    pub error: Option<String>,
}

impl BulkRaceData {
    pub fn has_data(&self) -> bool {
        self.race_data.is_some() || self.odds_data.is_some()
    }
}
