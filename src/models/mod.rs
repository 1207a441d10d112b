//! Domain records produced by the scraping and open-API pipelines.

pub mod odds;
pub mod open_api;
pub mod race;

pub use odds::{BettingType, OddsData, OddsEntry, OddsValue};
pub use open_api::{BulkFetchError, BulkFetchSummary, DataKind};
pub use race::{
    BulkRaceData, DetailedPerformanceData, LaneWinRate, PlayerBasicInfo, RaceData, RateTable,
    STAnalysis, STRelatedData, TimeWindow, TimingTable, WinningHandData,
};
