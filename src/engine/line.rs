//! Point-margin tallies and the sigma-space line fitted through them.
//!
//! For each point margin the tally keeps which games were won and lost
//! from that margin. Win percentages are mapped to sigma with the normal
//! quantile, fitted with least squares, and the intercept is then refined
//! by a probit maximum-likelihood pass over the individual outcomes.

use super::chart::TimeSelection;
use super::minimize::{minimize_scalar, MinimizeOptions};
use super::normal::{std_normal_cdf, std_normal_inverse_cdf};
use super::regression::{fit_linear_regression, LinearFit};
use crate::error::{CalcError, CalcResult};
use crate::feed::types::Game;
use crate::state::types::GAME_SECONDS;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

/// Percent clamp applied before taking the normal quantile.
pub const DEFAULT_MIN_PERCENT: f64 = 1e-10;

const GAME_MINUTES: usize = (GAME_SECONDS / 60) as usize;

/// Probability clamp inside the likelihood so `ln` stays finite.
const LIKELIHOOD_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarginOutcome {
    pub wins: Vec<String>,
    pub losses: Vec<String>,
}

impl MarginOutcome {
    pub fn total(&self) -> usize {
        self.wins.len() + self.losses.len()
    }

    pub fn win_percent(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.wins.len() as f64 / total as f64),
        }
    }
}

/// Wins and losses keyed by point margin.
#[derive(Debug, Clone, Default)]
pub struct MarginTally {
    margins: BTreeMap<i32, MarginOutcome>,
}

impl MarginTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally both sides of every decided game over `time`.
    ///
    /// Over a window the winner is recorded at the deepest deficit it faced
    /// and the loser at its deepest deficit (or smallest lead). At a single
    /// instant each side is recorded at its margin at that minute. Games
    /// without margin data for the selected minutes are skipped.
    pub fn from_games<'a>(
        games: impl IntoIterator<Item = &'a Game>,
        time: &TimeSelection,
    ) -> Self {
        let mut tally = Self::new();
        let mut skipped = 0usize;
        for game in games {
            match side_margins(game, time) {
                Some((win_margin, lose_margin)) => {
                    tally.record(win_margin, true, game.game_id.clone());
                    tally.record(lose_margin, false, game.game_id.clone());
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, "games without usable margins");
        }
        tally
    }

    /// Record one team-perspective outcome: the team reached `margin` and
    /// went on to win (`won`) or lose.
    pub fn record(&mut self, margin: i32, won: bool, game_id: impl Into<String>) {
        let outcome = self.margins.entry(margin).or_default();
        if won {
            outcome.wins.push(game_id.into());
        } else {
            outcome.losses.push(game_id.into());
        }
    }

    /// Make every margin include the outcomes of all smaller margins, so
    /// margin `m` reads "down `m` points or more".
    pub fn cumulate(&mut self) {
        let mut carried = MarginOutcome::default();
        for outcome in self.margins.values_mut() {
            carried.wins.extend(outcome.wins.iter().cloned());
            carried.losses.extend(outcome.losses.iter().cloned());
            *outcome = carried.clone();
        }
    }

    /// Fold the one-sided tails into the nearest mixed margin: margins
    /// below the first one with a win give their losses to it, margins above
    /// the last one with a loss give their wins to it.
    pub fn clean_end_points(&mut self) {
        let first = self
            .margins
            .iter()
            .find(|(_, o)| !o.wins.is_empty())
            .map(|(m, _)| *m)
            .or_else(|| self.margins.keys().next_back().copied());
        let last = self
            .margins
            .iter()
            .rev()
            .find(|(_, o)| !o.losses.is_empty())
            .map(|(m, _)| *m)
            .or_else(|| self.margins.keys().next().copied());
        let (Some(first), Some(last)) = (first, last) else {
            return;
        };
        // every loss sits below every win; nothing to fold into
        if first > last {
            return;
        }

        let below: Vec<i32> = self.margins.range(..first).map(|(m, _)| *m).collect();
        for margin in below {
            if let Some(outcome) = self.margins.remove(&margin) {
                self.margins.entry(first).or_default().losses.extend(outcome.losses);
            }
        }
        let above: Vec<i32> = self
            .margins
            .range((Bound::Excluded(last), Bound::Unbounded))
            .map(|(m, _)| *m)
            .collect();
        for margin in above {
            if let Some(outcome) = self.margins.remove(&margin) {
                self.margins.entry(last).or_default().wins.extend(outcome.wins);
            }
        }
    }

    pub fn get(&self, margin: i32) -> Option<&MarginOutcome> {
        self.margins.get(&margin)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &MarginOutcome)> {
        self.margins.iter().map(|(m, o)| (*m, o))
    }

    pub fn is_empty(&self) -> bool {
        self.margins.is_empty()
    }

    /// Distinct game ids across all margins.
    pub fn number_of_games(&self) -> usize {
        self.margins
            .values()
            .flat_map(|o| o.wins.iter().chain(o.losses.iter()))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Up to `n` random game ids that were won (or lost) from `margin`.
    pub fn sample_games<R: Rng + ?Sized>(
        &self,
        margin: i32,
        won: bool,
        n: usize,
        rng: &mut R,
    ) -> Vec<&str> {
        let Some(outcome) = self.margins.get(&margin) else {
            return Vec::new();
        };
        let pool = if won { &outcome.wins } else { &outcome.losses };
        pool.choose_multiple(rng, n).map(String::as_str).collect()
    }
}

/// `(winner margin, loser margin)` for one game, or `None` when the game
/// is tied or lacks margins for the selected minutes.
fn side_margins(game: &Game, time: &TimeSelection) -> Option<(i32, i32)> {
    let home_won = match game.point_diff() {
        0 => return None,
        diff => diff > 0,
    };
    let series = &game.point_margins;

    match *time {
        TimeSelection::At { seconds } => {
            let minute = (seconds / 60) as usize;
            let index = GAME_MINUTES.checked_sub(minute + 1)?;
            let home_margin = *series.margins.get(index)?;
            let win_margin = if home_won { home_margin } else { -home_margin };
            Some((win_margin, -win_margin))
        }
        TimeSelection::Window {
            start_seconds,
            end_seconds,
        } => {
            let (start, end) = ((start_seconds / 60) as usize, (end_seconds / 60) as usize);
            let mut win_margin = i32::MAX;
            let mut lose_margin = i32::MAX;
            for minute in (end..=start).rev() {
                let index = GAME_MINUTES.checked_sub(minute)?;
                let low = *series.min_margins.get(index)?;
                let high = *series.max_margins.get(index)?;
                let (winner, loser) = if home_won { (low, -high) } else { (-high, low) };
                win_margin = win_margin.min(winner);
                lose_margin = lose_margin.min(loser);
            }
            (win_margin != i32::MAX).then_some((win_margin, lose_margin))
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub min_percent: f64,
    /// Only margins at or below this take part in the fit.
    pub max_fit_margin: Option<i32>,
    pub refine: MinimizeOptions,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            min_percent: DEFAULT_MIN_PERCENT,
            max_fit_margin: None,
            refine: MinimizeOptions::default(),
        }
    }
}

/// Sigma-space line through a tally: `sigma(margin) = slope * margin + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineFit {
    pub line: LinearFit,
    /// True when the likelihood pass improved on the least-squares intercept.
    pub refined: bool,
}

impl LineFit {
    pub fn fit(tally: &MarginTally, options: &FitOptions) -> CalcResult<Self> {
        let max_percent = 1.0 - options.min_percent;
        let in_fit = |margin: i32| options.max_fit_margin.map_or(true, |max| margin <= max);

        let (xs, ys): (Vec<f64>, Vec<f64>) = tally
            .iter()
            .filter(|(margin, _)| in_fit(*margin))
            .filter_map(|(margin, outcome)| {
                let percent = outcome.win_percent()?;
                (percent > options.min_percent && percent < max_percent)
                    .then(|| (margin as f64, std_normal_inverse_cdf(percent)))
            })
            .unzip();

        if xs.len() < 2 {
            return Err(CalcError::InvalidInput(format!(
                "need at least two margins with mixed outcomes to fit a line, got {}",
                xs.len()
            )));
        }
        let initial = fit_linear_regression(&xs, &ys)?;

        let observations: Vec<(f64, f64, f64)> = tally
            .iter()
            .filter(|(margin, _)| in_fit(*margin))
            .map(|(margin, o)| (margin as f64, o.wins.len() as f64, o.losses.len() as f64))
            .collect();
        let total: f64 = observations.iter().map(|(_, w, l)| w + l).sum();
        let slope = initial.slope;
        let objective = |intercept: f64| {
            let nll: f64 = observations
                .iter()
                .map(|&(x, wins, losses)| {
                    let p = std_normal_cdf(slope * x + intercept)
                        .clamp(LIKELIHOOD_FLOOR, 1.0 - LIKELIHOOD_FLOOR);
                    -(wins * p.ln() + losses * (1.0 - p).ln())
                })
                .sum();
            nll / total
        };

        let start_value = objective(initial.intercept);
        let refined = minimize_scalar(objective, initial.intercept, options.refine);
        if refined.value.is_finite() && refined.value < start_value {
            tracing::debug!(
                from = initial.intercept,
                to = refined.x,
                converged = refined.converged,
                "refined line intercept"
            );
            return Ok(Self {
                line: LinearFit {
                    slope,
                    intercept: refined.x,
                },
                refined: true,
            });
        }
        Ok(Self {
            line: initial,
            refined: false,
        })
    }

    pub fn sigma_at(&self, margin: f64) -> f64 {
        self.line.predict(margin)
    }

    /// Fitted win probability (0..1) at `margin`.
    pub fn percent_at(&self, margin: f64) -> f64 {
        std_normal_cdf(self.sigma_at(margin))
    }

    /// Margin at which the fitted win chance equals `percent` (0..100).
    pub fn margin_at_percent(&self, percent: f64) -> CalcResult<f64> {
        if !(percent > 0.0 && percent < 100.0) {
            return Err(CalcError::InvalidInput(format!("percent {percent} outside (0, 100)")));
        }
        if self.line.slope == 0.0 {
            return Err(CalcError::InvalidInput(
                "flat line has no margin for a percent".to_string(),
            ));
        }
        Ok((std_normal_inverse_cdf(percent / 100.0) - self.line.intercept) / self.line.slope)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: i32,
    pub percent: f64,
    pub sigma: f64,
    pub wins: usize,
    pub losses: usize,
}

/// One finished line, ready for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlottedLine {
    pub legend: String,
    pub number_of_games: usize,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    pub points: Vec<PlotPoint>,
}

impl PlottedLine {
    /// Points for every tallied margin within `[min_x, max_x]`.
    pub fn from_tally(
        label: &str,
        tally: &MarginTally,
        fit: Option<&LineFit>,
        (min_x, max_x): (i32, i32),
        min_percent: f64,
    ) -> Self {
        let number_of_games = tally.number_of_games();
        let points = tally
            .iter()
            .filter(|(margin, _)| *margin >= min_x && *margin <= max_x)
            .filter_map(|(margin, outcome)| {
                let percent = outcome.win_percent()?;
                let clamped = percent.clamp(min_percent, 1.0 - min_percent);
                Some(PlotPoint {
                    x: margin,
                    percent,
                    sigma: std_normal_inverse_cdf(clamped),
                    wins: outcome.wins.len(),
                    losses: outcome.losses.len(),
                })
            })
            .collect();

        Self {
            legend: format!("{label} ({number_of_games} Games)"),
            number_of_games,
            slope: fit.map(|f| f.line.slope),
            intercept: fit.map(|f| f.line.intercept),
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::PointMargins;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Trailing teams win less the further down they are:
    /// margin -m is won (20 - m) times out of 20 for m in 1..=15.
    fn sample_tally() -> MarginTally {
        let mut tally = MarginTally::new();
        let mut id = 0;
        for m in 1..=15 {
            for i in 0..20 {
                id += 1;
                tally.record(-m, i < 20 - m, format!("g{id}"));
            }
        }
        tally
    }

    #[test]
    fn test_record_and_percent() {
        let tally = sample_tally();
        let outcome = tally.get(-5).unwrap();
        assert_eq!(outcome.wins.len(), 15);
        assert_eq!(outcome.losses.len(), 5);
        assert_eq!(outcome.win_percent(), Some(0.75));
        assert_eq!(tally.number_of_games(), 300);
    }

    #[test]
    fn test_cumulate_absorbs_smaller_margins() {
        let mut tally = MarginTally::new();
        tally.record(-10, false, "a");
        tally.record(-5, true, "b");
        tally.record(-1, true, "c");
        tally.cumulate();
        assert_eq!(tally.get(-10).unwrap().total(), 1);
        assert_eq!(tally.get(-5).unwrap().total(), 2);
        let last = tally.get(-1).unwrap();
        assert_eq!(last.wins, vec!["b", "c"]);
        assert_eq!(last.losses, vec!["a"]);
        assert_eq!(tally.number_of_games(), 3);
    }

    fn game_with_margins(id: &str, home_won: bool, margins: PointMargins) -> Game {
        Game {
            game_id: id.to_string(),
            year: 2018,
            home_team: "BOS".to_string(),
            away_team: "NYK".to_string(),
            home_score: 100,
            away_score: if home_won { 90 } else { 110 },
            is_playoffs: false,
            point_margins: margins,
        }
    }

    /// Home trails by 8 early, leads by 4 late; minute `m` elapsed sits at index `m`.
    fn swinging_margins() -> PointMargins {
        let margins: Vec<i32> = (1..=48).map(|m| if m <= 24 { -8 } else { 4 }).collect();
        let min_margins: Vec<i32> = (0..=48).map(|m| if m <= 24 { -8 } else { 2 }).collect();
        let max_margins: Vec<i32> = (0..=48).map(|m| if m <= 24 { 0 } else { 6 }).collect();
        PointMargins {
            margins,
            min_margins,
            max_margins,
        }
    }

    #[test]
    fn test_from_games_over_window() {
        let games = vec![
            game_with_margins("home", true, swinging_margins()),
            game_with_margins("away", false, swinging_margins()),
        ];
        // whole game: home's deepest hole -8, away's deepest -6
        let whole = TimeSelection::Window {
            start_seconds: GAME_SECONDS,
            end_seconds: 0,
        };
        let tally = MarginTally::from_games(&games, &whole);
        assert_eq!(tally.get(-8).unwrap().wins, vec!["home"]);
        assert_eq!(tally.get(-6).unwrap().losses, vec!["home"]);
        assert_eq!(tally.get(-6).unwrap().wins, vec!["away"]);
        assert_eq!(tally.get(-8).unwrap().losses, vec!["away"]);

        // last 12 minutes: home never trails
        let late = TimeSelection::Window {
            start_seconds: 12 * 60,
            end_seconds: 0,
        };
        let tally = MarginTally::from_games(&games, &late);
        assert_eq!(tally.get(2).unwrap().wins, vec!["home"]);
        assert_eq!(tally.get(-6).unwrap().losses, vec!["home"]);
    }

    #[test]
    fn test_from_games_at_time() {
        let games = vec![game_with_margins("home", true, swinging_margins())];
        let at = |minutes_left: u32| TimeSelection::At {
            seconds: minutes_left * 60,
        };

        let tally = MarginTally::from_games(&games, &at(30));
        assert_eq!(tally.get(-8).unwrap().wins, vec!["home"]);
        assert_eq!(tally.get(8).unwrap().losses, vec!["home"]);

        let tally = MarginTally::from_games(&games, &at(0));
        assert_eq!(tally.get(4).unwrap().wins, vec!["home"]);
        assert_eq!(tally.get(-4).unwrap().losses, vec!["home"]);

        // no margin before tip-off
        assert!(MarginTally::from_games(&games, &at(48)).is_empty());
    }

    #[test]
    fn test_from_games_skips_ties_and_missing_margins() {
        let mut tied = game_with_margins("tied", true, swinging_margins());
        tied.away_score = tied.home_score;
        let bare = game_with_margins("bare", true, PointMargins::default());
        let whole = TimeSelection::Window {
            start_seconds: GAME_SECONDS,
            end_seconds: 0,
        };
        let tally = MarginTally::from_games([&tied, &bare], &whole);
        assert!(tally.is_empty());
        assert_eq!(tally.number_of_games(), 0);
    }

    #[test]
    fn test_clean_end_points_folds_tails() {
        let mut tally = MarginTally::new();
        tally.record(-12, false, "a");
        tally.record(-10, false, "b");
        tally.record(-8, true, "c");
        tally.record(-8, false, "d");
        tally.record(-4, false, "e");
        tally.record(-4, true, "f");
        tally.record(-2, true, "g");
        tally.record(0, true, "h");
        tally.clean_end_points();

        let margins: Vec<i32> = tally.iter().map(|(m, _)| m).collect();
        assert_eq!(margins, vec![-8, -4]);
        let first = tally.get(-8).unwrap();
        assert_eq!(first.wins, vec!["c"]);
        assert_eq!(first.losses, vec!["d", "a", "b"]);
        let last = tally.get(-4).unwrap();
        assert_eq!(last.wins, vec!["f", "g", "h"]);
        assert_eq!(last.losses, vec!["e"]);
        assert_eq!(tally.number_of_games(), 8);
    }

    #[test]
    fn test_clean_end_points_leaves_separated_outcomes() {
        let mut tally = MarginTally::new();
        tally.record(-10, false, "a");
        tally.record(-2, true, "b");
        tally.clean_end_points();
        assert_eq!(tally.iter().count(), 2);

        let mut empty = MarginTally::new();
        empty.clean_end_points();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_fit_slopes_upward_toward_zero_margin() {
        let fit = LineFit::fit(&sample_tally(), &FitOptions::default()).unwrap();
        assert!(fit.line.slope > 0.0, "slope {}", fit.line.slope);
        assert!(fit.percent_at(-2.0) > fit.percent_at(-12.0));
        // about half of the games are won from ten down
        let p = fit.percent_at(-10.0);
        assert!(p > 0.35 && p < 0.65, "p = {p}");
    }

    #[test]
    fn test_margin_at_percent_inverts_percent_at() {
        let fit = LineFit::fit(&sample_tally(), &FitOptions::default()).unwrap();
        let margin = fit.margin_at_percent(20.0).unwrap();
        assert!((fit.percent_at(margin) - 0.20).abs() < 1e-6);
        assert!(fit.margin_at_percent(0.0).is_err());
        assert!(fit.margin_at_percent(100.0).is_err());
    }

    #[test]
    fn test_fit_needs_two_mixed_margins() {
        let mut tally = MarginTally::new();
        tally.record(-3, true, "a");
        tally.record(-3, false, "b");
        tally.record(-20, false, "c");
        let err = LineFit::fit(&tally, &FitOptions::default()).unwrap_err();
        assert!(matches!(err, CalcError::InvalidInput(_)));
    }

    #[test]
    fn test_fit_respects_max_fit_margin() {
        let options = FitOptions {
            max_fit_margin: Some(-14),
            ..Default::default()
        };
        assert!(LineFit::fit(&sample_tally(), &options).is_ok());
        let options = FitOptions {
            max_fit_margin: Some(-15),
            ..Default::default()
        };
        assert!(LineFit::fit(&sample_tally(), &options).is_err());
    }

    #[test]
    fn test_plotted_line_bounds_and_legend() {
        let tally = sample_tally();
        let fit = LineFit::fit(&tally, &FitOptions::default()).unwrap();
        let bounds = (-12, -3);
        let line =
            PlottedLine::from_tally("2017-2024", &tally, Some(&fit), bounds, DEFAULT_MIN_PERCENT);
        assert_eq!(line.legend, "2017-2024 (300 Games)");
        assert_eq!(line.points.len(), 10);
        assert_eq!(line.points.first().unwrap().x, -12);
        assert_eq!(line.slope, Some(fit.line.slope));
    }

    #[test]
    fn test_sample_games_is_bounded() {
        let tally = sample_tally();
        let mut rng = StdRng::seed_from_u64(7);
        let wins = tally.sample_games(-5, true, 10, &mut rng);
        assert_eq!(wins.len(), 10);
        let losses = tally.sample_games(-5, false, 10, &mut rng);
        assert_eq!(losses.len(), 5);
        assert!(tally.sample_games(-40, true, 10, &mut rng).is_empty());
    }
}
