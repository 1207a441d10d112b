//! Stats-preview page parser.
//!
//! The page carries one big fixed-layout table under `#raceBasic`: an
//! aggregate block (escape / allow-escape / pierce / overtake pairs) at the
//! top, then labeled per-window metric tables, the ST tables, and the
//! winning-hand section. Sections are located by their labeled cells and the
//! data rows that follow them, never by free-text search over the page.
//!
//! The aggregate pairs and the lane-1 player block are required; every
//! per-window cell is optional and parses through the field extractor.

use crate::error::ParseError;
use crate::extract::{extract_optional_count, extract_optional_rate, extract_optional_timing};
use crate::models::race::{
    DetailedPerformanceData, PlayerBasicInfo, RaceData, RateTable, STRelatedData, TimeWindow,
    TimingTable, WinningHandData,
};
use scraper::{ElementRef, Html, Selector};

fn parse_selector(s: &str) -> Result<Selector, ParseError> {
    Selector::parse(s).map_err(|e| ParseError::structure(e.to_string()))
}

/// Parse the stats-preview page into a [`RaceData`] record.
pub fn parse_stats_page(html: &str) -> Result<RaceData, ParseError> {
    if html.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let document = Html::parse_document(html);
    let race_basic_selector = parse_selector("#raceBasic")?;
    let table_selector = parse_selector("table.table_fixed")?;
    let row_selector = parse_selector("tr")?;

    let race_basic = document
        .select(&race_basic_selector)
        .next()
        .ok_or_else(|| ParseError::structure("raceBasic section not found"))?;
    let table = race_basic
        .select(&table_selector)
        .next()
        .ok_or_else(|| ParseError::structure("stats table not found"))?;

    let rows: Vec<ElementRef> = table.select(&row_selector).collect();

    let mut race_data = RaceData::new();

    // The aggregate block sits above the first metric table. The winning-hand
    // section reuses the same hand labels, so the scan stops there.
    let aggregate_end = section_index(&rows, "1着率")?.unwrap_or(rows.len());
    let aggregates = &rows[..aggregate_end];

    // Each aggregate label appears twice: half-year block first, then 1-year.
    let escape = capture_percent_rows(aggregates, "逃げ", 2)?;
    race_data.escape_last_half_year = required_rate(&escape[0], 0, "escape (half year)")?;
    race_data.allow_escape_last_half_year =
        required_rate(&escape[0], 1, "allow-escape (half year)")?;
    race_data.escape_last_year = required_rate(&escape[1], 0, "escape (1 year)")?;
    race_data.allow_escape_last_year = required_rate(&escape[1], 1, "allow-escape (1 year)")?;

    let pierce = capture_percent_rows(aggregates, "差され", 2)?;
    race_data.pierce_last_half_year = required_rate(&pierce[0], 0, "pierce (half year)")?;
    race_data.pierce_last_year = required_rate(&pierce[1], 0, "pierce (1 year)")?;

    let overtake = capture_percent_rows(aggregates, "捲られ", 2)?;
    race_data.overtake_last_half_year = required_rate(&overtake[0], 0, "overtake (half year)")?;
    race_data.overtake_last_year = required_rate(&overtake[1], 0, "overtake (1 year)")?;

    race_data.first_place_last_10 = recent_win_count(aggregates)?;

    race_data.player_basic_info = extract_player_basic_info(&document)?;
    race_data.detailed_performance = extract_detailed_performance(&rows)?;
    race_data.st_data = extract_st_related(&rows)?;
    race_data.winning_hand = extract_winning_hand(&rows)?;

    Ok(race_data)
}

/// Trimmed text of every cell in a row.
fn cell_texts(row: &ElementRef) -> Result<Vec<String>, ParseError> {
    let cell_selector = parse_selector("td")?;
    Ok(row
        .select(&cell_selector)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect())
}

/// Section header labels; a row carrying one of these ends the previous
/// section's window scan.
const SECTION_HEADERS: [&str; 8] = [
    "1着率",
    "2連対率",
    "3連対率",
    "枠別勝率",
    "平均ST",
    "ST順位",
    "ST考察",
    "決まり手",
];

/// Index of the row holding a cell exactly equal to `header`.
fn section_index(rows: &[ElementRef], header: &str) -> Result<Option<usize>, ParseError> {
    for (i, row) in rows.iter().enumerate() {
        if cell_texts(row)?.iter().any(|t| t == header) {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// Data-row range of the section starting at `header`: the rows between the
/// header and the next section header (or the table end).
fn section_range(
    rows: &[ElementRef],
    header: &str,
) -> Result<Option<(usize, usize)>, ParseError> {
    let Some(idx) = section_index(rows, header)? else {
        return Ok(None);
    };
    let mut end = rows.len();
    for (offset, row) in rows.iter().enumerate().skip(idx + 1) {
        let texts = cell_texts(row)?;
        if texts
            .iter()
            .any(|t| SECTION_HEADERS.contains(&t.as_str()))
        {
            end = offset;
            break;
        }
    }
    Ok(Some((idx + 1, end)))
}

/// Captures the data row following each occurrence of `label`, skipping
/// spacer rows until a percent-bearing row shows up. Fails when fewer than
/// `want` data rows exist; the aggregate blocks are not optional.
fn capture_percent_rows(
    rows: &[ElementRef],
    label: &str,
    want: usize,
) -> Result<Vec<Vec<String>>, ParseError> {
    let mut captured = Vec::new();
    let mut take_next = false;

    for row in rows {
        let texts = cell_texts(row)?;
        if take_next {
            if texts.iter().any(|t| t.contains('%')) {
                captured.push(texts);
                take_next = false;
                if captured.len() == want {
                    break;
                }
            }
            continue;
        }
        if texts.iter().any(|t| t.contains(label)) {
            take_next = true;
        }
    }

    if captured.len() < want {
        return Err(ParseError::structure(format!(
            "{} block incomplete: found {} of {} data rows",
            label,
            captured.len(),
            want
        )));
    }
    Ok(captured)
}

fn required_rate(texts: &[String], idx: usize, label: &'static str) -> Result<f64, ParseError> {
    let cell = texts
        .get(idx)
        .ok_or_else(|| ParseError::structure(format!("missing {} cell", label)))?;
    extract_optional_rate(cell)?
        .ok_or_else(|| ParseError::structure(format!("required rate {} not published", label)))
}

/// First places over the last 10 races; 0 when the page omits the block.
fn recent_win_count(rows: &[ElementRef]) -> Result<u32, ParseError> {
    let mut take_next = false;
    for row in rows {
        let texts = cell_texts(row)?;
        if take_next {
            if let Some(cell) = texts.first() {
                return Ok(extract_optional_count(cell)?.unwrap_or(0));
            }
            return Ok(0);
        }
        if texts.iter().any(|t| t.contains("直近10走")) {
            take_next = true;
        }
    }
    Ok(0)
}

fn window_label(window: TimeWindow) -> &'static str {
    match window {
        TimeWindow::ThisPeriod => "今期",
        TimeWindow::Last6Months => "直近6ヶ月",
        TimeWindow::Last3Months => "直近3ヶ月",
        TimeWindow::Last1Month => "直近1ヶ月",
        TimeWindow::LocalVenue => "当地",
        TimeWindow::GeneralRaces => "一般戦",
        TimeWindow::SgG1 => "SG/G1",
        TimeWindow::FirstDay => "初日",
        TimeWindow::FinalDay => "最終日",
        TimeWindow::NightRaces => "ナイター",
        TimeWindow::FlyingHistory => "F持",
    }
}

/// Lane-1 value of the window row labeled `label` within a section's data
/// rows. The first cell carries the window label, the second the lane-1
/// value.
fn window_value(
    rows: &[ElementRef],
    range: (usize, usize),
    label: &str,
    extractor: fn(&str) -> Result<Option<f64>, ParseError>,
) -> Result<Option<f64>, ParseError> {
    for row in &rows[range.0..range.1] {
        let texts = cell_texts(row)?;
        if texts.first().map(String::as_str) == Some(label) {
            return match texts.get(1) {
                Some(cell) => extractor(cell),
                None => Ok(None),
            };
        }
    }
    Ok(None)
}

fn fill_rate_table(
    rows: &[ElementRef],
    header: &str,
    windows: &[TimeWindow],
    table: &mut RateTable,
) -> Result<(), ParseError> {
    let Some(range) = section_range(rows, header)? else {
        return Ok(());
    };
    for &window in windows {
        let value = window_value(rows, range, window_label(window), extract_optional_rate)?;
        table.insert_if_present(window, value);
    }
    Ok(())
}

fn fill_timing_table(
    rows: &[ElementRef],
    header: &str,
    windows: &[TimeWindow],
    table: &mut TimingTable,
) -> Result<(), ParseError> {
    let Some(range) = section_range(rows, header)? else {
        return Ok(());
    };
    for &window in windows {
        let value = window_value(rows, range, window_label(window), extract_optional_timing)?;
        table.insert_if_present(window, value);
    }
    Ok(())
}

fn extract_detailed_performance(
    rows: &[ElementRef],
) -> Result<DetailedPerformanceData, ParseError> {
    let mut performance = DetailedPerformanceData::default();

    fill_rate_table(
        rows,
        "1着率",
        &TimeWindow::PERFORMANCE,
        &mut performance.first_place_rate,
    )?;
    fill_rate_table(
        rows,
        "2連対率",
        &TimeWindow::PERFORMANCE,
        &mut performance.top2_rate,
    )?;
    fill_rate_table(
        rows,
        "3連対率",
        &TimeWindow::PERFORMANCE,
        &mut performance.top3_rate,
    )?;

    // 枠別勝率 publishes two fixed windows of its own (note the ヵ spelling).
    if let Some(range) = section_range(rows, "枠別勝率")? {
        performance.lane_win_rate.last_1_year =
            window_value(rows, range, "直近1年", extract_optional_rate)?;
        performance.lane_win_rate.last_6_months =
            window_value(rows, range, "直近6ヵ月", extract_optional_rate)?;
    }

    Ok(performance)
}

fn extract_st_related(rows: &[ElementRef]) -> Result<STRelatedData, ParseError> {
    let mut st_data = STRelatedData::default();

    fill_timing_table(rows, "平均ST", &TimeWindow::ST, &mut st_data.average_st)?;
    fill_timing_table(rows, "ST順位", &TimeWindow::ST, &mut st_data.st_ranking)?;

    if let Some(range) = section_range(rows, "ST考察")? {
        st_data.st_analysis.stability_rate =
            window_value(rows, range, "安定率", extract_optional_rate)?;
        st_data.st_analysis.break_out_rate =
            window_value(rows, range, "抜出率", extract_optional_rate)?;
        st_data.st_analysis.late_start_rate =
            window_value(rows, range, "出遅率", extract_optional_rate)?;
    }

    Ok(st_data)
}

/// The winning-hand section pairs opposing hands on one label row (e.g.
/// 逃げ/逃し) with the lane-1 rates on the following data row.
fn extract_winning_hand(rows: &[ElementRef]) -> Result<WinningHandData, ParseError> {
    let mut winning_hand = WinningHandData::default();

    let Some(start) = section_index(rows, "決まり手")? else {
        return Ok(winning_hand);
    };
    let section = &rows[start..rows.len().min(start + 15)];

    if let Some(data) = pair_row_values(section, "逃げ", "逃し")? {
        winning_hand.escape_rate = first_rate(&data, 0)?;
        winning_hand.let_escape_rate = first_rate(&data, 1)?;
    }
    if let Some(data) = pair_row_values(section, "差され", "差し")? {
        winning_hand.pierced_rate = first_rate(&data, 0)?;
        winning_hand.pierce_rate = first_rate(&data, 1)?;
    }
    if let Some(data) = pair_row_values(section, "捲られ", "捲り")? {
        winning_hand.overtaken_rate = first_rate(&data, 0)?;
        winning_hand.overtake_rate = first_rate(&data, 1)?;
    }

    Ok(winning_hand)
}

/// Finds the row containing both hand labels, then returns the next
/// percent-bearing row (spacer rows skipped).
fn pair_row_values(
    rows: &[ElementRef],
    left: &str,
    right: &str,
) -> Result<Option<Vec<String>>, ParseError> {
    let mut found_labels = false;
    for row in rows {
        let texts = cell_texts(row)?;
        if found_labels {
            if texts.iter().any(|t| t.contains('%')) {
                return Ok(Some(texts));
            }
            continue;
        }
        let joined = texts.join(" ");
        if joined.contains(left) && joined.contains(right) {
            found_labels = true;
        }
    }
    Ok(None)
}

fn first_rate(texts: &[String], idx: usize) -> Result<Option<f64>, ParseError> {
    match texts.get(idx) {
        Some(cell) => extract_optional_rate(cell),
        None => Ok(None),
    }
}

fn extract_player_basic_info(document: &Html) -> Result<PlayerBasicInfo, ParseError> {
    let names_selector = parse_selector("#raceMemerNames")?;
    let names2_selector = parse_selector("#raceMemerNames2")?;
    let table_selector = parse_selector("table")?;
    let row_selector = parse_selector("tr")?;
    let course1_selector = parse_selector("td.course1")?;
    let img_selector = parse_selector("img")?;
    let span_selector = parse_selector("span")?;

    let mut player_info = PlayerBasicInfo::default();

    let names = document
        .select(&names_selector)
        .next()
        .ok_or_else(|| ParseError::structure("player name block not found"))?;
    let table = names
        .select(&table_selector)
        .next()
        .ok_or_else(|| ParseError::structure("player name table not found"))?;
    let rows: Vec<ElementRef> = table.select(&row_selector).collect();

    // Row layout: header, registration number, name, class level.
    if let Some(cell) = rows.get(1).and_then(|r| r.select(&course1_selector).next()) {
        player_info.registration_number = cell.text().collect::<String>().trim().to_string();
    }
    if player_info.registration_number.is_empty() {
        return Err(ParseError::structure("registration number not found"));
    }

    if let Some(cell) = rows.get(2).and_then(|r| r.select(&course1_selector).next()) {
        // Female racers carry a joshi.png marker image.
        let has_female_image = cell
            .select(&img_selector)
            .any(|img| img.value().attr("src").is_some_and(|src| src.contains("joshi.png")));
        player_info.gender = if has_female_image { "女性" } else { "男性" }.to_string();

        player_info.name = match cell.value().attr("data-player_name") {
            Some(name) => name.to_string(),
            None => cell.text().collect::<String>().trim().to_string(),
        };
    }

    if let Some(cell) = rows.get(3).and_then(|r| r.select(&course1_selector).next()) {
        player_info.class_level = cell.text().collect::<String>().trim().to_string();
    }

    // Second block: period before the <br>, support group in the span.
    if let Some(names2) = document.select(&names2_selector).next() {
        if let Some(table) = names2.select(&table_selector).next() {
            if let Some(cell) = table
                .select(&row_selector)
                .next()
                .and_then(|r| r.select(&course1_selector).next())
            {
                let cell_html = cell.html();
                if let Some(br_pos) = cell_html.find("<br>") {
                    let fragment = Html::parse_fragment(&cell_html[..br_pos]);
                    player_info.period = fragment
                        .root_element()
                        .text()
                        .collect::<String>()
                        .trim()
                        .to_string();
                }

                if let Some(span) = cell.select(&span_selector).next() {
                    player_info.support_group =
                        span.text().collect::<String>().trim().to_string();
                } else {
                    let all_text = cell.text().collect::<String>();
                    let parts: Vec<&str> = all_text.split_whitespace().collect();
                    if parts.len() >= 2 {
                        player_info.support_group = parts[1].to_string();
                    }
                }
            }
        }
    }

    Ok(player_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::stats_page_html;

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse_stats_page(""), Err(ParseError::EmptyInput));
        assert_eq!(parse_stats_page("   \n  "), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_parse_missing_race_basic() {
        let html = "<html><body><p>nothing here</p></body></html>";
        assert!(matches!(
            parse_stats_page(html),
            Err(ParseError::StructureMismatch(_))
        ));
    }

    #[test]
    fn test_parse_aggregate_rates() {
        let race_data = parse_stats_page(&stats_page_html()).unwrap();

        assert!((race_data.escape_last_half_year - 0.188).abs() < 1e-9);
        assert!((race_data.escape_last_year - 0.310).abs() < 1e-9);
        assert!((race_data.allow_escape_last_half_year - 0.640).abs() < 1e-9);
        assert!((race_data.allow_escape_last_year - 0.622).abs() < 1e-9);
        assert!((race_data.pierce_last_half_year - 0.250).abs() < 1e-9);
        assert!((race_data.pierce_last_year - 0.172).abs() < 1e-9);
        assert!((race_data.overtake_last_half_year - 0.313).abs() < 1e-9);
        assert!((race_data.overtake_last_year - 0.276).abs() < 1e-9);
        assert_eq!(race_data.first_place_last_10, 4);
    }

    #[test]
    fn test_parse_player_basic_info() {
        let info = parse_stats_page(&stats_page_html())
            .unwrap()
            .player_basic_info;

        assert_eq!(info.registration_number, "3448");
        assert_eq!(info.name, "高山秀雄");
        assert_eq!(info.class_level, "B1");
        assert_eq!(info.period, "65期");
        assert_eq!(info.support_group, "群馬");
        assert_eq!(info.gender, "男性");
    }

    #[test]
    fn test_parse_sparse_performance_windows() {
        let performance = parse_stats_page(&stats_page_html())
            .unwrap()
            .detailed_performance;

        // published cell parses to a fraction, empty cell stays absent
        let this_period = performance
            .first_place_rate
            .get(TimeWindow::ThisPeriod)
            .unwrap();
        assert!((this_period - 0.123).abs() < 1e-12);
        assert_eq!(
            performance.first_place_rate.get(TimeWindow::Last6Months),
            None
        );
        assert_eq!(
            performance.first_place_rate.get(TimeWindow::Last3Months),
            None
        );
        assert_eq!(
            performance.first_place_rate.get(TimeWindow::LocalVenue),
            Some(0.32)
        );
        assert_eq!(performance.top2_rate.get(TimeWindow::ThisPeriod), Some(0.25));
        assert_eq!(performance.top3_rate.get(TimeWindow::ThisPeriod), Some(0.40));
        assert_eq!(performance.lane_win_rate.last_1_year, Some(0.18));
        assert_eq!(performance.lane_win_rate.last_6_months, Some(0.20));
    }

    #[test]
    fn test_parse_st_tables() {
        let st_data = parse_stats_page(&stats_page_html()).unwrap().st_data;

        assert_eq!(st_data.average_st.get(TimeWindow::ThisPeriod), Some(0.15));
        assert_eq!(st_data.average_st.get(TimeWindow::Last6Months), Some(0.14));
        assert_eq!(st_data.average_st.get(TimeWindow::NightRaces), Some(0.16));
        assert_eq!(st_data.average_st.get(TimeWindow::FlyingHistory), None);
        assert_eq!(st_data.st_ranking.get(TimeWindow::ThisPeriod), Some(3.2));
        assert_eq!(st_data.st_analysis.stability_rate, Some(0.85));
        assert_eq!(st_data.st_analysis.break_out_rate, Some(0.03));
        assert_eq!(st_data.st_analysis.late_start_rate, Some(0.12));
    }

    #[test]
    fn test_parse_winning_hand() {
        let winning_hand = parse_stats_page(&stats_page_html()).unwrap().winning_hand;

        assert_eq!(winning_hand.escape_rate, Some(0.188));
        assert_eq!(winning_hand.let_escape_rate, Some(0.64));
        assert_eq!(winning_hand.pierced_rate, Some(0.25));
        assert_eq!(winning_hand.pierce_rate, Some(0.20));
        assert_eq!(winning_hand.overtaken_rate, Some(0.313));
        assert_eq!(winning_hand.overtake_rate, Some(0.15));
    }

    #[test]
    fn test_parse_missing_aggregate_block_is_structure_mismatch() {
        // page without the pierce rows
        let html = r#"<html><body>
            <div id="raceMemerNames"><table>
                <tr><td class="course1">1</td></tr>
                <tr><td class="course1">3448</td></tr>
            </table></div>
            <div id="raceBasic"><table class="table_fixed">
                <tr><td>逃げ</td><td>逃がし</td></tr>
                <tr><td>18.8%</td><td>64.0%</td></tr>
                <tr><td>逃げ</td><td>逃がし</td></tr>
                <tr><td>31.0%</td><td>62.2%</td></tr>
            </table></div>
            </body></html>"#;

        match parse_stats_page(html) {
            Err(ParseError::StructureMismatch(msg)) => assert!(msg.contains("差され")),
            other => panic!("expected StructureMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_malformed_window_cell_fails() {
        // corrupt text in an optional window cell must surface, not vanish
        let html = stats_page_html().replace(
            "<tr><td>当地</td><td>32.0%</td></tr>",
            "<tr><td>当地</td><td>3x.0%</td></tr>",
        );
        assert!(matches!(
            parse_stats_page(&html),
            Err(ParseError::MalformedField { .. })
        ));
    }

    #[test]
    fn test_parse_female_marker() {
        let html = stats_page_html().replace(
            r#"<td class="course1" data-player_name="高山秀雄">高山秀雄</td>"#,
            r#"<td class="course1" data-player_name="中村桃佳"><img src="/img/joshi.png">中村桃佳</td>"#,
        );
        let info = parse_stats_page(&html).unwrap().player_basic_info;
        assert_eq!(info.name, "中村桃佳");
        assert_eq!(info.gender, "女性");
    }
}
