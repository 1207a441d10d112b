//! Odds table extraction and normalization.
//!
//! Page-specific extractors pull raw (combination, odds-text) rows out of
//! the win/place table and the trifecta table; `normalize_odds` turns raw
//! rows into typed combinations for any betting type. Within a win/place
//! collection the odds cell format decides the entry kind: the source
//! publishes point odds for win bets and bucketed `low-high` ranges for
//! place bets.

use crate::error::ParseError;
use crate::models::odds::{BettingType, OddsData, OddsEntry, OddsValue};
use scraper::{ElementRef, Html, Selector};

/// One raw odds-table row: a combination string (`"1"`, `"1-2"`, `"1-2-3"`)
/// and the odds cell text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOddsRow {
    pub combo: String,
    pub odds_text: String,
}

impl RawOddsRow {
    pub fn new(combo: impl Into<String>, odds_text: impl Into<String>) -> Self {
        RawOddsRow {
            combo: combo.into(),
            odds_text: odds_text.into(),
        }
    }
}

fn parse_selector(s: &str) -> Result<Selector, ParseError> {
    Selector::parse(s).map_err(|e| ParseError::structure(e.to_string()))
}

/// Normalize raw rows into typed combinations, in input order.
pub fn normalize_odds(
    rows: &[RawOddsRow],
    betting_type: BettingType,
) -> Result<OddsData, ParseError> {
    let mut entries = Vec::with_capacity(rows.len());

    for row in rows {
        let boats = parse_boat_combo(&row.combo, betting_type.arity())?;
        let value = parse_odds_cell(&row.odds_text)?;

        let entry = match betting_type {
            BettingType::WinPlace => match value {
                OddsValue::Point(odds) => OddsEntry::Win {
                    boat: boats[0],
                    odds,
                },
                range => OddsEntry::Place {
                    boat: boats[0],
                    odds: range,
                },
            },
            BettingType::Exacta | BettingType::Quinella | BettingType::QuinellaPlace => {
                OddsEntry::Duo {
                    boats: [boats[0], boats[1]],
                    odds: value,
                }
            }
            BettingType::Trifecta | BettingType::Tricast => OddsEntry::Trio {
                boats: [boats[0], boats[1], boats[2]],
                odds: value,
            },
        };
        entries.push(entry);
    }

    Ok(OddsData {
        betting_type,
        entries,
    })
}

/// Parse a `-`-separated boat combination, checking arity and the 1-6 domain.
fn parse_boat_combo(combo: &str, arity: usize) -> Result<Vec<u8>, ParseError> {
    let parts: Vec<&str> = combo.trim().split('-').collect();
    if parts.len() != arity {
        return Err(ParseError::InvalidArity {
            expected: arity,
            got: parts.len(),
        });
    }

    parts
        .iter()
        .map(|part| {
            let boat: u8 = part
                .trim()
                .parse()
                .map_err(|_| ParseError::malformed("boat number", combo))?;
            if !(1..=6).contains(&boat) {
                return Err(ParseError::malformed("boat number", combo));
            }
            Ok(boat)
        })
        .collect()
}

/// Parse an odds cell: a positive decimal or a `low-high` range. The range
/// text is preserved verbatim for display fidelity.
fn parse_odds_cell(text: &str) -> Result<OddsValue, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::InvalidOddsValue(text.to_string()));
    }

    if let Some((low_text, high_text)) = trimmed.split_once('-') {
        let low = parse_odds_number(low_text)
            .ok_or_else(|| ParseError::InvalidOddsValue(trimmed.to_string()))?;
        let high = parse_odds_number(high_text)
            .ok_or_else(|| ParseError::InvalidOddsValue(trimmed.to_string()))?;
        if low > high {
            return Err(ParseError::InvalidOddsValue(trimmed.to_string()));
        }
        return Ok(OddsValue::Range {
            low,
            high,
            text: trimmed.to_string(),
        });
    }

    parse_odds_number(trimmed)
        .map(OddsValue::Point)
        .ok_or_else(|| ParseError::InvalidOddsValue(trimmed.to_string()))
}

fn parse_odds_number(text: &str) -> Option<f64> {
    let value: f64 = text.trim().replace(',', "").parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Cell texts the source uses for scratched/cancelled entries.
fn is_void_odds_text(text: &str) -> bool {
    let cleaned = text.trim();
    cleaned.is_empty() || cleaned == "-" || cleaned.contains("欠場") || cleaned.contains("取消")
}

// ----- win/place table -----

/// Extract raw rows from the win/place odds table.
///
/// Each course row carries `[course, racer, win odds, place odds]`; every
/// course yields a win row and a place row. Scratched entries are skipped.
pub fn extract_win_place_rows(html: &str) -> Result<Vec<RawOddsRow>, ParseError> {
    if html.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let document = Html::parse_document(html);
    let table_selector = parse_selector("table.odds_table")?;
    let row_selector = parse_selector("tr")?;
    let cell_selector = parse_selector("td")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| ParseError::structure("win/place odds table not found"))?;

    let mut rows = Vec::new();

    for row in table.select(&row_selector) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();

        // header rows carry the table_top_title class
        if cells
            .iter()
            .any(|cell| cell.value().attr("class") == Some("table_top_title"))
        {
            continue;
        }
        if cells.len() < 4 {
            continue;
        }

        let course_text = cells[0].text().collect::<String>().trim().to_string();
        let Ok(course) = course_text.parse::<u8>() else {
            continue;
        };
        if !(1..=6).contains(&course) {
            continue;
        }

        let win_text = cells[2].text().collect::<String>().trim().to_string();
        if !is_void_odds_text(&win_text) {
            rows.push(RawOddsRow::new(course.to_string(), win_text));
        }

        let place_text = cells[3].text().collect::<String>().trim().to_string();
        if !is_void_odds_text(&place_text) {
            rows.push(RawOddsRow::new(course.to_string(), place_text));
        }
    }

    Ok(rows)
}

/// Parse the win/place odds page into typed odds.
pub fn parse_win_place_odds(html: &str) -> Result<OddsData, ParseError> {
    let rows = extract_win_place_rows(html)?;
    normalize_odds(&rows, BettingType::WinPlace)
}

// ----- trifecta table -----

/// Extract raw rows from the trifecta odds table.
///
/// The table structure:
/// - Header row: 6 columns (1st place boats)
/// - For each column: groups of 2nd place boats (rowspan cells)
/// - Each group: rows for the 3rd place options
/// - Cell triplets: (2nd place with rowspan) (3rd place) (odds)
pub fn extract_trifecta_rows(html: &str) -> Result<Vec<RawOddsRow>, ParseError> {
    if html.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let document = Html::parse_document(html);

    let title_selector = parse_selector("span.title7_mainLabel")?;
    let found_title = document
        .select(&title_selector)
        .any(|el| el.text().collect::<String>().contains("3連単オッズ"));
    if !found_title {
        return Err(ParseError::structure("3連単オッズ title not found"));
    }

    let table_selector = parse_selector("div.table1 table")?;
    let thead_selector = parse_selector("thead")?;
    let th_selector = parse_selector("th")?;
    let tbody_selector = parse_selector("tbody")?;
    let tr_selector = parse_selector("tr")?;
    let td_selector = parse_selector("td")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| ParseError::structure("trifecta odds table not found"))?;

    let thead = table
        .select(&thead_selector)
        .next()
        .ok_or_else(|| ParseError::structure("trifecta table header not found"))?;

    let mut first_boats: Vec<u8> = Vec::new();
    for th in thead.select(&th_selector) {
        if let Some(boat) = boat_from_classes(&th) {
            if !first_boats.contains(&boat) {
                first_boats.push(boat);
            }
        }
    }
    if first_boats.len() != 6 {
        return Err(ParseError::structure(format!(
            "expected 6 first boats in header, got {}",
            first_boats.len()
        )));
    }

    let tbody = table
        .select(&tbody_selector)
        .next()
        .ok_or_else(|| ParseError::structure("trifecta table body not found"))?;

    let mut rows = Vec::new();
    // Current 2nd place boat per column, carried across rows by rowspan.
    let mut current_second: Vec<Option<u8>> = vec![None; 6];

    for row in tbody.select(&tr_selector) {
        let cells: Vec<ElementRef> = row.select(&td_selector).collect();
        let mut cell_idx = 0;

        for (col_idx, first_boat) in first_boats.iter().enumerate() {
            if cell_idx >= cells.len() {
                break;
            }

            // A rowspan cell opens a new 2nd-place group for this column.
            if cells[cell_idx].value().attr("rowspan").is_some() {
                let second_cell = &cells[cell_idx];
                current_second[col_idx] =
                    boat_from_classes(second_cell).or_else(|| boat_from_text(second_cell));
                cell_idx += 1;
            }

            if cell_idx >= cells.len() {
                break;
            }
            let third_boat = boat_from_text(&cells[cell_idx]);
            cell_idx += 1;

            if cell_idx >= cells.len() {
                break;
            }
            let odds_text = odds_cell_text(&cells[cell_idx]);
            cell_idx += 1;

            if let (Some(second), Some(third), Some(odds)) =
                (current_second[col_idx], third_boat, odds_text)
            {
                rows.push(RawOddsRow::new(
                    format!("{}-{}-{}", first_boat, second, third),
                    odds,
                ));
            }
        }
    }

    Ok(rows)
}

/// Parse the trifecta odds page into typed odds.
pub fn parse_trifecta_odds(html: &str) -> Result<OddsData, ParseError> {
    let rows = extract_trifecta_rows(html)?;
    normalize_odds(&rows, BettingType::Trifecta)
}

/// Extract boat number from an element's boat-color CSS class.
fn boat_from_classes(element: &ElementRef) -> Option<u8> {
    for class in element.value().classes() {
        for boat in 1..=6 {
            if class.contains(&format!("is-boatColor{}", boat)) {
                return Some(boat);
            }
        }
    }
    None
}

/// Extract boat number from an element's text content.
fn boat_from_text(element: &ElementRef) -> Option<u8> {
    let text = element.text().collect::<String>().trim().to_string();
    match text.parse::<u8>() {
        Ok(boat) if (1..=6).contains(&boat) => Some(boat),
        _ => None,
    }
}

/// Odds cell text, preferring the oddsPoint span; `None` for scratched
/// entries.
fn odds_cell_text(element: &ElementRef) -> Option<String> {
    let odds_point_selector = Selector::parse(".oddsPoint").ok()?;

    let text = if let Some(span) = element.select(&odds_point_selector).next() {
        span.text().collect::<String>()
    } else {
        element.text().collect::<String>()
    };

    let text = text.trim().to_string();
    (!is_void_odds_text(&text)).then_some(text)
}
