//! Typed odds records.
//!
//! Win and place odds share one source table but are different things; they
//! are kept apart as enum variants rather than flagged with a sentinel boat
//! number, so a combination is unambiguous on its own.

use serde::{Deserialize, Serialize};

/// Wagering bet types, a closed tag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BettingType {
    Trifecta,
    Tricast,
    Exacta,
    Quinella,
    QuinellaPlace,
    WinPlace,
}

impl BettingType {
    /// Number of boats in one combination for this bet type.
    pub fn arity(&self) -> usize {
        match self {
            BettingType::WinPlace => 1,
            BettingType::Exacta | BettingType::Quinella | BettingType::QuinellaPlace => 2,
            BettingType::Trifecta | BettingType::Tricast => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BettingType::Trifecta => "trifecta",
            BettingType::Tricast => "tricast",
            BettingType::Exacta => "exacta",
            BettingType::Quinella => "quinella",
            BettingType::QuinellaPlace => "quinella_place",
            BettingType::WinPlace => "win_place",
        }
    }
}

/// An odds figure: either a point value or the bucketed payout range the
/// source publishes for place-type bets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsValue {
    Point(f64),
    Range {
        low: f64,
        high: f64,
        /// Source string verbatim, e.g. "2.4-3.5", kept for display fidelity.
        text: String,
    },
}

impl OddsValue {
    /// Representative value: the point itself, or the lower bound of a range.
    pub fn value(&self) -> f64 {
        match self {
            OddsValue::Point(v) => *v,
            OddsValue::Range { low, .. } => *low,
        }
    }

    /// True when the source only published a bucketed range.
    pub fn is_combined(&self) -> bool {
        matches!(self, OddsValue::Range { .. })
    }

    pub fn range_text(&self) -> Option<&str> {
        match self {
            OddsValue::Point(_) => None,
            OddsValue::Range { text, .. } => Some(text),
        }
    }
}

/// One odds combination, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsEntry {
    Win { boat: u8, odds: f64 },
    Place { boat: u8, odds: OddsValue },
    Duo { boats: [u8; 2], odds: OddsValue },
    Trio { boats: [u8; 3], odds: OddsValue },
}

impl OddsEntry {
    /// Boats of the combination in finishing order.
    pub fn boats(&self) -> &[u8] {
        match self {
            OddsEntry::Win { boat, .. } | OddsEntry::Place { boat, .. } => std::slice::from_ref(boat),
            OddsEntry::Duo { boats, .. } => boats,
            OddsEntry::Trio { boats, .. } => boats,
        }
    }

    /// Representative odds value for sorting/expected-value math.
    pub fn odds_value(&self) -> f64 {
        match self {
            OddsEntry::Win { odds, .. } => *odds,
            OddsEntry::Place { odds, .. }
            | OddsEntry::Duo { odds, .. }
            | OddsEntry::Trio { odds, .. } => odds.value(),
        }
    }

    pub fn is_combined(&self) -> bool {
        match self {
            OddsEntry::Win { .. } => false,
            OddsEntry::Place { odds, .. }
            | OddsEntry::Duo { odds, .. }
            | OddsEntry::Trio { odds, .. } => odds.is_combined(),
        }
    }
}

/// Odds for one race and bet type, in source row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsData {
    pub betting_type: BettingType,
    pub entries: Vec<OddsEntry>,
}

impl OddsData {
    pub fn new(betting_type: BettingType) -> Self {
        OddsData {
            betting_type,
            entries: Vec::new(),
        }
    }

    /// Win entries of a win/place collection.
    pub fn win_entries(&self) -> impl Iterator<Item = &OddsEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e, OddsEntry::Win { .. }))
    }

    /// Place entries of a win/place collection.
    pub fn place_entries(&self) -> impl Iterator<Item = &OddsEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e, OddsEntry::Place { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_per_betting_type() {
        assert_eq!(BettingType::WinPlace.arity(), 1);
        assert_eq!(BettingType::Exacta.arity(), 2);
        assert_eq!(BettingType::Quinella.arity(), 2);
        assert_eq!(BettingType::QuinellaPlace.arity(), 2);
        assert_eq!(BettingType::Trifecta.arity(), 3);
        assert_eq!(BettingType::Tricast.arity(), 3);
    }

    #[test]
    fn test_range_value_is_lower_bound() {
        let v = OddsValue::Range {
            low: 2.4,
            high: 3.5,
            text: "2.4-3.5".to_string(),
        };
        assert_eq!(v.value(), 2.4);
        assert!(v.is_combined());
        assert_eq!(v.range_text(), Some("2.4-3.5"));
    }

    #[test]
    fn test_point_value() {
        let v = OddsValue::Point(1.5);
        assert_eq!(v.value(), 1.5);
        assert!(!v.is_combined());
        assert_eq!(v.range_text(), None);
    }

    #[test]
    fn test_entry_boats() {
        let trio = OddsEntry::Trio {
            boats: [1, 2, 3],
            odds: OddsValue::Point(25.5),
        };
        assert_eq!(trio.boats(), &[1, 2, 3]);
        assert_eq!(trio.odds_value(), 25.5);

        let win = OddsEntry::Win { boat: 4, odds: 6.2 };
        assert_eq!(win.boats(), &[4]);
        assert!(!win.is_combined());
    }

    #[test]
    fn test_win_place_split() {
        let data = OddsData {
            betting_type: BettingType::WinPlace,
            entries: vec![
                OddsEntry::Win { boat: 1, odds: 1.8 },
                OddsEntry::Place {
                    boat: 1,
                    odds: OddsValue::Range {
                        low: 1.1,
                        high: 1.4,
                        text: "1.1-1.4".to_string(),
                    },
                },
                OddsEntry::Win { boat: 2, odds: 5.4 },
            ],
        };
        assert_eq!(data.win_entries().count(), 2);
        assert_eq!(data.place_entries().count(), 1);
    }

    #[test]
    fn test_odds_serde_round_trip() {
        let data = OddsData {
            betting_type: BettingType::Trifecta,
            entries: vec![OddsEntry::Trio {
                boats: [1, 2, 3],
                odds: OddsValue::Point(25.5),
            }],
        };
        let json = serde_json::to_string(&data).unwrap();
        let back: OddsData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
