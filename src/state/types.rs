use crate::engine::filter::GameFilterCriteria;
use crate::error::CalcError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Earliest season with play-by-play data.
pub const MIN_SEASON_YEAR: i32 = 1996;
pub const MAX_SEASON_YEAR: i32 = 2030;
/// Regulation length, 48 minutes.
pub const GAME_SECONDS: u32 = 2880;

pub const DEFAULT_PERCENTS: [&str; 4] = ["20", "10", "5", "1"];
pub const DEFAULT_START_SECONDS: u32 = 24 * 60;
pub const DEFAULT_SPECIFIC_SECONDS: u32 = 12 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlotType {
    #[serde(rename = "Percent Chance: Time Vs. Points Down")]
    PercentChanceTimeVsPointsDown,
    #[serde(rename = "Max Points Down Or More")]
    MaxPointsDownOrMore,
    #[serde(rename = "Max Points Down")]
    MaxPointsDown,
    #[serde(rename = "Points Down At Time")]
    PointsDownAtTime,
}

impl PlotType {
    /// Wire order: the compact codec encodes a plot type as its index here.
    pub const ALL: [PlotType; 4] = [
        PlotType::PercentChanceTimeVsPointsDown,
        PlotType::MaxPointsDownOrMore,
        PlotType::MaxPointsDown,
        PlotType::PointsDownAtTime,
    ];

    pub fn index(self) -> usize {
        match self {
            PlotType::PercentChanceTimeVsPointsDown => 0,
            PlotType::MaxPointsDownOrMore => 1,
            PlotType::MaxPointsDown => 2,
            PlotType::PointsDownAtTime => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            PlotType::PercentChanceTimeVsPointsDown => "Percent Chance: Time Vs. Points Down",
            PlotType::MaxPointsDownOrMore => "Max Points Down Or More",
            PlotType::MaxPointsDown => "Max Points Down",
            PlotType::PointsDownAtTime => "Points Down At Time",
        }
    }
}

impl Default for PlotType {
    fn default() -> Self {
        PlotType::PercentChanceTimeVsPointsDown
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlotType {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| CalcError::UnsupportedPlotType(s.to_string()))
    }
}

/// Season range plus segment selection; one chart line each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearGroup {
    pub min_year: i32,
    pub max_year: i32,
    #[serde(rename = "regularSeason")]
    pub include_regular_season: bool,
    #[serde(rename = "playoffs")]
    pub include_playoffs: bool,
    pub label: String,
}

impl YearGroup {
    pub fn new(
        min_year: i32,
        max_year: i32,
        include_regular_season: bool,
        include_playoffs: bool,
    ) -> Self {
        Self {
            min_year,
            max_year,
            include_regular_season,
            include_playoffs,
            label: Self::label_for(min_year, max_year, include_regular_season, include_playoffs),
        }
    }

    /// `2017-2024` for both segments, `R2017-2024` regular only,
    /// `P2017-2024` playoffs only.
    pub fn label_for(min_year: i32, max_year: i32, regular: bool, playoffs: bool) -> String {
        match (regular, playoffs) {
            (true, false) => format!("R{min_year}-{max_year}"),
            (false, true) => format!("P{min_year}-{max_year}"),
            _ => format!("{min_year}-{max_year}"),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_year >= MIN_SEASON_YEAR
            && self.max_year <= MAX_SEASON_YEAR
            && self.min_year <= self.max_year
    }
}

impl Default for YearGroup {
    fn default() -> Self {
        YearGroup::new(2017, 2024, true, true)
    }
}

/// Everything needed to reproduce one calculator view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorConfiguration {
    pub plot_type: PlotType,
    pub start_time_seconds: u32,
    pub end_time_seconds: u32,
    #[serde(default)]
    pub specific_time_seconds: Option<u32>,
    #[serde(default)]
    pub selected_percents: Vec<String>,
    #[serde(default)]
    pub plot_guides: bool,
    #[serde(default)]
    pub plot_calculated_guides: bool,
    #[serde(default)]
    pub year_groups: Vec<YearGroup>,
    /// `None` entries select all games.
    #[serde(default)]
    pub game_filters: Vec<Option<GameFilterCriteria>>,
}

impl Default for CalculatorConfiguration {
    fn default() -> Self {
        Self {
            plot_type: PlotType::default(),
            start_time_seconds: DEFAULT_START_SECONDS,
            end_time_seconds: 0,
            specific_time_seconds: Some(DEFAULT_SPECIFIC_SECONDS),
            selected_percents: default_percents(),
            plot_guides: false,
            plot_calculated_guides: false,
            year_groups: vec![YearGroup::default()],
            game_filters: vec![None],
        }
    }
}

impl CalculatorConfiguration {
    /// Replace empty collections with their single default entry.
    pub fn normalized(mut self) -> Self {
        if self.year_groups.is_empty() {
            self.year_groups.push(YearGroup::default());
        }
        if self.game_filters.is_empty() {
            self.game_filters.push(None);
        }
        self
    }
}

pub fn default_percents() -> Vec<String> {
    DEFAULT_PERCENTS.iter().map(|p| p.to_string()).collect()
}
