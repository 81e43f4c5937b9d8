//! Expands a calculator configuration into a fully resolved chart
//! description: axis bounds, title, and one line request per year group.
//!
//! The builder does no aggregation. Callers select games with
//! [`LineRequest::select`], tally them with [`ChartSpec::tally_line`], and
//! hand the tally back through [`ChartSpec::plot_line`]. Time charts are
//! traced with [`ChartSpec::trace_percents`].

use super::filter::GameFilterCriteria;
use super::line::{FitOptions, LineFit, MarginTally, PlottedLine};
use crate::error::{CalcError, CalcResult};
use crate::feed::types::{Game, SeasonArchive, SeasonContext};
use crate::state::types::{CalculatorConfiguration, PlotType, YearGroup, GAME_SECONDS};
use serde::Serialize;

/// Deepest deficit any margin chart shows.
pub const MAX_DEFICIT: i32 = 36;
pub const DEFAULT_POINT_MARGIN: i32 = 15;

#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    /// Shallowest deficit on "Max Points Down Or More" charts.
    pub point_margin: i32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            point_margin: DEFAULT_POINT_MARGIN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// x = point margin, y = win %.
    PointMarginVWinPercent,
    /// x = minutes remaining, y = point margin.
    TimeVPointMargin,
}

/// Game time the chart covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSelection {
    /// From `start_seconds` remaining down to `end_seconds` remaining.
    Window { start_seconds: u32, end_seconds: u32 },
    /// A single instant with `seconds` remaining.
    At { seconds: u32 },
}

/// OR over a list of criteria.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSet {
    filters: Vec<GameFilterCriteria>,
}

impl FilterSet {
    /// Unset entries become all-games criteria.
    pub fn from_config(filters: &[Option<GameFilterCriteria>]) -> Self {
        Self {
            filters: filters
                .iter()
                .map(|f| f.clone().unwrap_or_else(GameFilterCriteria::all_games))
                .collect(),
        }
    }

    pub fn filters(&self) -> &[GameFilterCriteria] {
        &self.filters
    }

    pub fn matches(&self, game: &Game, season: Option<&SeasonContext>) -> bool {
        self.filters.iter().any(|f| f.matches(game, season))
    }

    /// Labels of the constrained filters, joined with " or ".
    /// Empty when any filter takes all games.
    pub fn describe(&self) -> String {
        if self.filters.iter().any(GameFilterCriteria::is_unconstrained) {
            return String::new();
        }
        self.filters
            .iter()
            .map(GameFilterCriteria::describe)
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// Games one chart line is computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRequest {
    pub label: String,
    pub min_year: i32,
    pub max_year: i32,
    pub include_regular_season: bool,
    pub include_playoffs: bool,
    pub filters: FilterSet,
}

impl LineRequest {
    fn from_group(group: &YearGroup, filters: FilterSet) -> Self {
        Self {
            label: group.label.clone(),
            min_year: group.min_year,
            max_year: group.max_year,
            include_regular_season: group.include_regular_season,
            include_playoffs: group.include_playoffs,
            filters,
        }
    }

    pub fn matches(&self, game: &Game, archive: &SeasonArchive) -> bool {
        if game.year < self.min_year || game.year > self.max_year {
            return false;
        }
        let segment_ok = if game.is_playoffs {
            self.include_playoffs
        } else {
            self.include_regular_season
        };
        segment_ok && self.filters.matches(game, archive.context(game.year))
    }

    pub fn select<'a>(&self, archive: &'a SeasonArchive) -> Vec<&'a Game> {
        archive
            .games_between(self.min_year, self.max_year)
            .filter(|g| self.matches(g, archive))
            .collect()
    }

    /// Label plus the filter description, when there is one.
    pub fn legend_label(&self) -> String {
        match self.filters.describe() {
            d if d.is_empty() => self.label.clone(),
            d => format!("{} {}", self.label, d),
        }
    }
}

/// Fully resolved, render-ready chart description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub plot_type: PlotType,
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub min_x: i32,
    pub max_x: i32,
    pub time: TimeSelection,
    /// Win percents traced across time; empty unless `kind` is time based.
    pub percents: Vec<f64>,
    pub plot_guides: bool,
    pub plot_calculated_guides: bool,
    pub lines: Vec<LineRequest>,
}

impl ChartSpec {
    /// Tally the games one line selects over the chart's time.
    pub fn tally_line(&self, request: &LineRequest, archive: &SeasonArchive) -> MarginTally {
        MarginTally::from_games(request.select(archive), &self.time)
    }

    /// Turn one line's tally into plotted points and a fitted line.
    ///
    /// "Max Points Down Or More" charts cumulate the tally first; the
    /// one-sided ends are folded in before fitting.
    pub fn plot_line(
        &self,
        request: &LineRequest,
        mut tally: MarginTally,
        options: &FitOptions,
    ) -> CalcResult<PlottedLine> {
        if self.kind != ChartKind::PointMarginVWinPercent {
            return Err(CalcError::InvalidInput(format!(
                "\"{}\" is not plotted from a margin tally",
                self.plot_type
            )));
        }
        if self.plot_type == PlotType::MaxPointsDownOrMore {
            tally.cumulate();
        }
        tally.clean_end_points();
        let fit = LineFit::fit(&tally, options)?;
        Ok(PlottedLine::from_tally(
            &request.legend_label(),
            &tally,
            Some(&fit),
            (self.min_x, self.max_x),
            options.min_percent,
        ))
    }

    /// For each selected percent, the margin at which a line's games reach
    /// that win chance, minute by minute across the window. Minutes whose
    /// tally cannot be fitted are left out.
    pub fn trace_percents(
        &self,
        request: &LineRequest,
        archive: &SeasonArchive,
        options: &FitOptions,
    ) -> CalcResult<Vec<PercentTrace>> {
        let TimeSelection::Window {
            start_seconds,
            end_seconds,
        } = self.time
        else {
            return Err(CalcError::InvalidInput(format!(
                "\"{}\" has no time window to trace",
                self.plot_type
            )));
        };
        if self.kind != ChartKind::TimeVPointMargin {
            return Err(CalcError::InvalidInput(format!(
                "\"{}\" is not traced over time",
                self.plot_type
            )));
        }

        let games = request.select(archive);
        let mut traces: Vec<PercentTrace> = self
            .percents
            .iter()
            .map(|&percent| PercentTrace {
                percent,
                points: Vec::new(),
            })
            .collect();

        for minute in (end_seconds / 60..=start_seconds / 60).rev() {
            let at = TimeSelection::At {
                seconds: minute * 60,
            };
            let mut tally = MarginTally::from_games(games.iter().copied(), &at);
            tally.clean_end_points();
            let fit = match LineFit::fit(&tally, options) {
                Ok(fit) => fit,
                Err(e) => {
                    tracing::debug!(minute, error = %e, "skipping minute");
                    continue;
                }
            };
            for trace in &mut traces {
                if let Ok(margin) = fit.margin_at_percent(trace.percent) {
                    trace.points.push(TracePoint { minute, margin });
                }
            }
        }
        Ok(traces)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TracePoint {
    /// Minutes remaining.
    pub minute: u32,
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentTrace {
    pub percent: f64,
    pub points: Vec<TracePoint>,
}

/// Resolve a plot type name, as carried by untyped callers.
pub fn resolve_plot_type(name: &str) -> CalcResult<PlotType> {
    name.parse()
}

pub fn build_chart_spec(
    config: &CalculatorConfiguration,
    options: &ChartOptions,
) -> CalcResult<ChartSpec> {
    if config.year_groups.is_empty() {
        return Err(incomplete("no year groups"));
    }
    if let Some(group) = config.year_groups.iter().find(|g| g.min_year > g.max_year) {
        return Err(incomplete(format!("year group {} ends before it starts", group.label)));
    }
    if config.game_filters.is_empty() {
        return Err(incomplete("no game filters"));
    }

    let filters = FilterSet::from_config(&config.game_filters);
    let lines = config
        .year_groups
        .iter()
        .map(|group| LineRequest::from_group(group, filters.clone()))
        .collect();

    let (kind, title, min_x, max_x, time) = match config.plot_type {
        PlotType::MaxPointsDownOrMore => {
            let margin = options.point_margin;
            if !(1..=MAX_DEFICIT).contains(&margin) {
                return Err(incomplete(format!(
                    "point margin {margin} outside 1..={MAX_DEFICIT}"
                )));
            }
            (
                ChartKind::PointMarginVWinPercent,
                format!("Win % When Down {margin} Or More Points"),
                -MAX_DEFICIT,
                -margin,
                time_window(config)?,
            )
        }
        PlotType::MaxPointsDown => (
            ChartKind::PointMarginVWinPercent,
            "Win % When Max Down Is X Points".to_string(),
            -MAX_DEFICIT,
            -1,
            time_window(config)?,
        ),
        PlotType::PointsDownAtTime => {
            let seconds = config
                .specific_time_seconds
                .ok_or_else(|| incomplete("\"Points Down At Time\" needs a specific time"))?;
            if seconds > GAME_SECONDS {
                return Err(incomplete(format!(
                    "specific time {seconds}s is past the start of the game"
                )));
            }
            (
                ChartKind::PointMarginVWinPercent,
                format!("Win % When Down X Points with {} Left", format_clock(seconds)),
                -MAX_DEFICIT,
                -1,
                TimeSelection::At { seconds },
            )
        }
        PlotType::PercentChanceTimeVsPointsDown => (
            ChartKind::TimeVPointMargin,
            "Win % By Score Differential And Time Remaining".to_string(),
            0,
            (GAME_SECONDS / 60) as i32,
            time_window(config)?,
        ),
    };

    let percents = match kind {
        ChartKind::TimeVPointMargin => parse_percents(&config.selected_percents)?,
        ChartKind::PointMarginVWinPercent => Vec::new(),
    };

    let (x_label, y_label) = match kind {
        ChartKind::PointMarginVWinPercent => ("Point Margin", "Win %"),
        ChartKind::TimeVPointMargin => ("Minutes Remaining", "Point Margin"),
    };

    tracing::debug!(
        plot_type = %config.plot_type,
        lines = config.year_groups.len(),
        "built chart spec"
    );

    Ok(ChartSpec {
        plot_type: config.plot_type,
        kind,
        title,
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        min_x,
        max_x,
        time,
        percents,
        plot_guides: config.plot_guides,
        plot_calculated_guides: config.plot_calculated_guides,
        lines,
    })
}

/// `MM:SS` game clock.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn time_window(config: &CalculatorConfiguration) -> CalcResult<TimeSelection> {
    let (start, end) = (config.start_time_seconds, config.end_time_seconds);
    if start > GAME_SECONDS {
        return Err(incomplete(format!("start time {start}s is past the start of the game")));
    }
    if end >= start {
        return Err(incomplete(format!("end time {end}s is not before start time {start}s")));
    }
    Ok(TimeSelection::Window {
        start_seconds: start,
        end_seconds: end,
    })
}

fn parse_percents(raw: &[String]) -> CalcResult<Vec<f64>> {
    if raw.is_empty() {
        return Err(incomplete("no percents selected"));
    }
    raw.iter()
        .map(|p| match p.trim().parse::<f64>() {
            Ok(v) if v > 0.0 && v < 100.0 => Ok(v),
            _ => Err(incomplete(format!("percent {p:?} is not a number in (0, 100)"))),
        })
        .collect()
}

fn incomplete(msg: impl Into<String>) -> CalcError {
    CalcError::IncompleteConfiguration(msg.into())
}
