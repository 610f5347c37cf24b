// Core domain types: rated statistics, percentile thresholds, player cards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::RangeFilter;

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Cut points (percent) used for every statistic where higher is better.
pub const STANDARD_CUT_POINTS: [f64; 3] = [20.0, 50.0, 90.0];

/// Cut points (percent) used for turnover rate, where lower is better.
pub const TURNOVER_CUT_POINTS: [f64; 3] = [10.0, 50.0, 80.0];

/// Shooting percentages only count players with more attempts than this.
pub const MIN_SHOT_ATTEMPTS: f64 = 20.0;

/// The eight statistics a player card is rated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stat {
    TwoPoint,
    ThreePoint,
    DefensiveRebound,
    OffensiveRebound,
    Assist,
    Block,
    Steal,
    Turnover,
}

impl Stat {
    /// All rated statistics in card column order.
    pub const ALL: [Stat; 8] = [
        Stat::TwoPoint,
        Stat::ThreePoint,
        Stat::DefensiveRebound,
        Stat::OffensiveRebound,
        Stat::Assist,
        Stat::Block,
        Stat::Steal,
        Stat::Turnover,
    ];

    /// Column header in the source season stats CSV.
    pub fn column(self) -> &'static str {
        match self {
            Stat::TwoPoint => "2P%",
            Stat::ThreePoint => "3P%",
            Stat::DefensiveRebound => "DRB%",
            Stat::OffensiveRebound => "ORB%",
            Stat::Assist => "AST%",
            Stat::Block => "BLK%",
            Stat::Steal => "STL%",
            Stat::Turnover => "TOV%",
        }
    }

    /// Field name in the stored season stats documents.
    pub fn field(self) -> &'static str {
        match self {
            Stat::TwoPoint => "2-Point Field Goal Percentage",
            Stat::ThreePoint => "3-Point Field Goal Percentage",
            Stat::DefensiveRebound => "Defensive Rebound Percentage",
            Stat::OffensiveRebound => "Offensive Rebound Percentage",
            Stat::Assist => "Assist Percentage",
            Stat::Block => "Block Percentage",
            Stat::Steal => "Steal Percentage",
            Stat::Turnover => "Turnover Percentage",
        }
    }

    /// Header of the rating column in the cards CSV.
    pub fn card_column(self) -> &'static str {
        match self {
            Stat::TwoPoint => "2PT",
            Stat::ThreePoint => "3PT",
            Stat::DefensiveRebound => "DRB",
            Stat::OffensiveRebound => "ORB",
            Stat::Assist => "AST",
            Stat::Block => "BLK",
            Stat::Steal => "STL",
            Stat::Turnover => "SKL",
        }
    }

    /// Percentiles requested from the store for this statistic.
    pub fn cut_points(self) -> [f64; 3] {
        match self {
            Stat::Turnover => TURNOVER_CUT_POINTS,
            _ => STANDARD_CUT_POINTS,
        }
    }

    /// Lower values rate better for this statistic.
    pub fn is_inverse(self) -> bool {
        matches!(self, Stat::Turnover)
    }

    /// Population restriction applied when computing this statistic's
    /// percentiles. Only the shooting percentages are restricted.
    pub fn population_filter(self) -> Option<RangeFilter> {
        let attempts = match self {
            Stat::TwoPoint => "2-Point Field Goal Attempts",
            Stat::ThreePoint => "3-Point Field Goal Attempts",
            _ => return None,
        };
        Some(RangeFilter::greater_than(attempts, MIN_SHOT_ATTEMPTS))
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Three ascending percentile cut points for one statistic.
///
/// For standard statistics these are the 20th/50th/90th percentiles; for
/// turnover rate the 10th/50th/80th.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundaries {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl Boundaries {
    pub fn new(low: f64, mid: f64, high: f64) -> Self {
        Self { low, mid, high }
    }
}

/// Boundaries for one statistic together with the population they were
/// computed over.
#[derive(Debug, Clone, PartialEq)]
pub struct StatThreshold {
    pub boundaries: Boundaries,
    pub filter: Option<RangeFilter>,
}

/// Percentile thresholds for every rated statistic, computed once per report
/// run from the live population.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    pub two_point: StatThreshold,
    pub three_point: StatThreshold,
    pub defensive_rebound: StatThreshold,
    pub offensive_rebound: StatThreshold,
    pub assist: StatThreshold,
    pub block: StatThreshold,
    pub steal: StatThreshold,
    pub turnover: StatThreshold,
}

impl ThresholdSet {
    pub fn get(&self, stat: Stat) -> &StatThreshold {
        match stat {
            Stat::TwoPoint => &self.two_point,
            Stat::ThreePoint => &self.three_point,
            Stat::DefensiveRebound => &self.defensive_rebound,
            Stat::OffensiveRebound => &self.offensive_rebound,
            Stat::Assist => &self.assist,
            Stat::Block => &self.block,
            Stat::Steal => &self.steal,
            Stat::Turnover => &self.turnover,
        }
    }
}

// ---------------------------------------------------------------------------
// Player card
// ---------------------------------------------------------------------------

/// Worst rating; also assigned when a statistic is missing.
pub const MIN_RATING: u8 = 1;

/// Best rating.
pub const MAX_RATING: u8 = 4;

/// One player-season rated 1-4 on each card statistic.
///
/// Serde names and field order define the cards CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCard {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "2PT")]
    pub two_point: u8,
    #[serde(rename = "3PT")]
    pub three_point: u8,
    #[serde(rename = "DRB")]
    pub defensive_rebound: u8,
    #[serde(rename = "ORB")]
    pub offensive_rebound: u8,
    #[serde(rename = "AST")]
    pub assist: u8,
    #[serde(rename = "BLK")]
    pub block: u8,
    #[serde(rename = "STL")]
    pub steal: u8,
    #[serde(rename = "SKL")]
    pub skill: u8,
}

impl PlayerCard {
    /// Rating for `stat`. The turnover statistic maps to the skill rating.
    pub fn rating(&self, stat: Stat) -> u8 {
        match stat {
            Stat::TwoPoint => self.two_point,
            Stat::ThreePoint => self.three_point,
            Stat::DefensiveRebound => self.defensive_rebound,
            Stat::OffensiveRebound => self.offensive_rebound,
            Stat::Assist => self.assist,
            Stat::Block => self.block,
            Stat::Steal => self.steal,
            Stat::Turnover => self.skill,
        }
    }
}

impl fmt::Display for PlayerCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.name, self.year, self.team, self.position
        )?;
        for stat in Stat::ALL {
            write!(f, ", {}: {}", stat.card_column(), self.rating(stat))?;
        }
        Ok(())
    }
}
