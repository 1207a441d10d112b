//! Payload and summary types for the boatrace open-API day files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Day-file kinds the open API publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Previews,
    Results,
    Programs,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Previews => "previews",
            DataKind::Results => "results",
            DataKind::Programs => "programs",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "previews" => Some(DataKind::Previews),
            "results" => Some(DataKind::Results),
            "programs" => Some(DataKind::Programs),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----- previews -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewsResponse {
    pub previews: Vec<RacePreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RacePreview {
    pub race_date: String,
    pub race_stadium_number: u8,
    pub race_number: u8,
    pub race_wind: Option<f64>,
    pub race_wave: Option<f64>,
    pub race_temperature: Option<f64>,
    pub race_water_temperature: Option<f64>,
    #[serde(default)]
    pub boats: HashMap<String, PreviewBoat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewBoat {
    pub racer_boat_number: Option<u8>,
    pub racer_course_number: Option<u8>,
    pub racer_start_timing: Option<f64>,
    pub racer_weight: Option<f64>,
    pub racer_exhibition_time: Option<f64>,
    pub racer_tilt_adjustment: Option<f64>,
}

// ----- results -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub results: Vec<RaceResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceResult {
    pub race_date: String,
    pub race_stadium_number: u8,
    pub race_number: u8,
    #[serde(default)]
    pub boats: Vec<ResultBoat>,
    pub payouts: PayoutInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBoat {
    pub racer_boat_number: u8,
    pub racer_course_number: Option<u8>,
    pub racer_start_timing: Option<f64>,
    pub racer_place_number: Option<u8>,
    pub racer_number: Option<u32>,
    pub racer_name: Option<String>,
}

/// Payout blocks per bet type; each entry pairs a combination string with a
/// payout in yen per 100-yen stake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayoutInfo {
    pub win: Option<Vec<PayoutEntry>>,
    pub place: Option<Vec<PayoutEntry>>,
    pub exacta: Option<Vec<PayoutEntry>>,
    pub quinella: Option<Vec<PayoutEntry>>,
    pub quinella_place: Option<Vec<PayoutEntry>>,
    pub trifecta: Option<Vec<PayoutEntry>>,
    pub trio: Option<Vec<PayoutEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutEntry {
    pub combination: Option<String>,
    pub payout: Option<i64>,
}

// ----- programs -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramsResponse {
    pub programs: Vec<RaceProgram>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceProgram {
    pub race_date: String,
    pub race_stadium_number: u8,
    pub race_number: u8,
    pub race_grade_number: Option<i32>,
    pub race_title: Option<String>,
    pub race_distance: Option<i32>,
    #[serde(default)]
    pub boats: Vec<ProgramBoat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramBoat {
    pub racer_boat_number: Option<u8>,
    pub racer_name: Option<String>,
    pub racer_number: Option<u32>,
    pub racer_class_number: Option<i32>,
    pub racer_flying_count: Option<i32>,
    pub racer_average_start_timing: Option<f64>,
    pub racer_national_top_1_percent: Option<f64>,
    pub racer_national_top_2_percent: Option<f64>,
    pub racer_local_top_1_percent: Option<f64>,
}

// ----- stored day record & bulk summary -----

/// Stored record for one fetched open-API day: the raw payload plus the race
/// count, so skip-if-cached needs no re-parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: String,
    pub kind: DataKind,
    pub race_count: usize,
    pub fetched_at: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFetchError {
    pub date: String,
    pub error_message: String,
}

/// Final summary of a linear-range bulk fetch.
///
/// `total_days == success_count + error_count + skipped_count` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFetchSummary {
    pub total_days: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<BulkFetchError>,
}
