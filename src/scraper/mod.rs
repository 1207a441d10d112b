//! Scraping layer: HTTP client plus the two fixed-format page parsers.
//!
//! The stats-preview parser recovers per-race statistics from the
//! kyoteibiyori-style page; the odds parsers turn the win/place and trifecta
//! odds tables into typed combinations.

mod client;
mod odds;
mod stats;

pub use client::{ClientConfig, PageClient};
pub use odds::{
    extract_trifecta_rows, extract_win_place_rows, normalize_odds, parse_trifecta_odds,
    parse_win_place_odds, RawOddsRow,
};
pub use stats::parse_stats_page;

/// Venue names by place number (1-24).
pub fn venue_name(place_number: u8) -> &'static str {
    match place_number {
        1 => "桐生",
        2 => "戸田",
        3 => "江戸川",
        4 => "平和島",
        5 => "多摩川",
        6 => "浜名湖",
        7 => "蒲郡",
        8 => "常滑",
        9 => "津",
        10 => "三国",
        11 => "びわこ",
        12 => "住之江",
        13 => "尼崎",
        14 => "鳴門",
        15 => "丸亀",
        16 => "児島",
        17 => "宮島",
        18 => "徳山",
        19 => "下関",
        20 => "若松",
        21 => "芦屋",
        22 => "福岡",
        23 => "唐津",
        24 => "大村",
        _ => "不明",
    }
}
