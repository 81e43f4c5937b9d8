//! Game filter predicate: decides whether a historical game matches a set of
//! criteria, optionally in the context of that season's team rankings.
//!
//! Every set field is an independent reject-if-violated test; a criteria
//! record with nothing constrained matches every game.

use crate::feed::types::{Game, SeasonContext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank boundary used by the mid-table filters. The mid band always excludes
/// the top 10 and bottom 10 teams, whatever N the filter carries.
const MID_BAND_EDGE: i64 = 10;

/// Which side of the game a team plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamLocation {
    Home,
    Away,
}

impl TeamLocation {
    pub fn opposite(self) -> Self {
        match self {
            TeamLocation::Home => TeamLocation::Away,
            TeamLocation::Away => TeamLocation::Home,
        }
    }
}

/// One team abbreviation or a set of them (OR within the set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TeamSetRepr", into = "TeamSetRepr")]
pub struct TeamSet(Vec<String>);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TeamSetRepr {
    One(String),
    Many(Vec<String>),
}

impl From<TeamSetRepr> for TeamSet {
    fn from(repr: TeamSetRepr) -> Self {
        match repr {
            TeamSetRepr::One(abbr) => TeamSet(vec![abbr]),
            TeamSetRepr::Many(abbrs) => TeamSet(abbrs),
        }
    }
}

impl From<TeamSet> for TeamSetRepr {
    fn from(set: TeamSet) -> Self {
        let mut abbrs = set.0;
        if abbrs.len() == 1 {
            TeamSetRepr::One(abbrs.remove(0))
        } else {
            TeamSetRepr::Many(abbrs)
        }
    }
}

impl TeamSet {
    pub fn one(abbr: impl Into<String>) -> Self {
        TeamSet(vec![abbr.into()])
    }

    pub fn many<I, S>(abbrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TeamSet(abbrs.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, abbr: &str) -> bool {
        self.0.iter().any(|a| a == abbr)
    }

    pub fn abbreviations(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TeamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// A single rank selection for one side: top N, mid table, or bottom N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBand {
    Top(u32),
    Mid(u32),
    Bottom(u32),
}

impl RankBand {
    /// Parse the compact token form: `top5`, `mid10`, `bot10`, ...
    pub fn parse(token: &str) -> Option<Self> {
        type Ctor = fn(u32) -> RankBand;
        let (ctor, digits): (Ctor, &str) = if let Some(n) = token.strip_prefix("top") {
            (RankBand::Top, n)
        } else if let Some(n) = token.strip_prefix("mid") {
            (RankBand::Mid, n)
        } else if let Some(n) = token.strip_prefix("bot") {
            (RankBand::Bottom, n)
        } else {
            return None;
        };
        match digits.parse::<u32>() {
            Ok(n) if n > 0 => Some(ctor(n)),
            _ => None,
        }
    }

    pub fn token(&self) -> String {
        match self {
            RankBand::Top(n) => format!("top{n}"),
            RankBand::Mid(n) => format!("mid{n}"),
            RankBand::Bottom(n) => format!("bot{n}"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Flat set of optional constraints, all of which must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameFilterCriteria {
    #[serde(default)]
    pub for_team: Option<TeamSet>,
    #[serde(default)]
    pub vs_team: Option<TeamSet>,
    /// Side the `for_team` plays on; `None` lets either side qualify.
    #[serde(default)]
    pub team_location: Option<TeamLocation>,

    #[serde(default = "default_true")]
    pub include_regular_season: bool,
    #[serde(default = "default_true")]
    pub include_playoffs: bool,

    #[serde(default)]
    pub min_year: Option<i32>,
    #[serde(default)]
    pub max_year: Option<i32>,

    /// Bounds on `home_score - away_score`.
    #[serde(default)]
    pub min_point_diff: Option<i32>,
    #[serde(default)]
    pub max_point_diff: Option<i32>,
    #[serde(default)]
    pub home_won: Option<bool>,

    #[serde(default)]
    pub both_top_n: Option<u32>,
    #[serde(default)]
    pub both_bottom_n: Option<u32>,
    #[serde(default)]
    pub home_top_n: Option<u32>,
    #[serde(default)]
    pub home_bottom_n: Option<u32>,
    #[serde(default)]
    pub home_mid_n: Option<u32>,
    #[serde(default)]
    pub away_top_n: Option<u32>,
    #[serde(default)]
    pub away_bottom_n: Option<u32>,
    #[serde(default)]
    pub away_mid_n: Option<u32>,
}

impl Default for GameFilterCriteria {
    fn default() -> Self {
        Self {
            for_team: None,
            vs_team: None,
            team_location: None,
            include_regular_season: true,
            include_playoffs: true,
            min_year: None,
            max_year: None,
            min_point_diff: None,
            max_point_diff: None,
            home_won: None,
            both_top_n: None,
            both_bottom_n: None,
            home_top_n: None,
            home_bottom_n: None,
            home_mid_n: None,
            away_top_n: None,
            away_bottom_n: None,
            away_mid_n: None,
        }
    }
}

impl GameFilterCriteria {
    /// Criteria matching every game.
    pub fn all_games() -> Self {
        Self::default()
    }

    pub fn has_rank_criteria(&self) -> bool {
        [
            self.both_top_n,
            self.both_bottom_n,
            self.home_top_n,
            self.home_bottom_n,
            self.home_mid_n,
            self.away_top_n,
            self.away_bottom_n,
            self.away_mid_n,
        ]
        .iter()
        .any(Option::is_some)
    }

    /// True when no field constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    /// Evaluate the criteria against one game.
    ///
    /// Clauses run in a fixed order and short-circuit: season segment, year
    /// bounds, team identity, outcome, then ranks. Rank clauses need the
    /// game's season context; without it the game is rejected.
    pub fn matches(&self, game: &Game, season: Option<&SeasonContext>) -> bool {
        self.segment_matches(game)
            && self.year_matches(game)
            && self.identity_matches(game)
            && self.outcome_matches(game)
            && self.rank_matches(game, season)
    }

    fn segment_matches(&self, game: &Game) -> bool {
        if game.is_playoffs {
            self.include_playoffs
        } else {
            self.include_regular_season
        }
    }

    fn year_matches(&self, game: &Game) -> bool {
        if matches!(self.min_year, Some(min) if game.year < min) {
            return false;
        }
        !matches!(self.max_year, Some(max) if game.year > max)
    }

    fn identity_matches(&self, game: &Game) -> bool {
        if self.for_team.is_none() && self.vs_team.is_none() {
            return true;
        }
        let side_matches = |for_abbr: &str, vs_abbr: &str| {
            self.for_team.as_ref().map_or(true, |t| t.contains(for_abbr))
                && self.vs_team.as_ref().map_or(true, |t| t.contains(vs_abbr))
        };
        let at_home = side_matches(&game.home_team, &game.away_team);
        let away = side_matches(&game.away_team, &game.home_team);
        match self.team_location {
            Some(TeamLocation::Home) => at_home,
            Some(TeamLocation::Away) => away,
            None => at_home || away,
        }
    }

    fn outcome_matches(&self, game: &Game) -> bool {
        let diff = game.point_diff();
        if matches!(self.min_point_diff, Some(min) if diff < min) {
            return false;
        }
        if matches!(self.max_point_diff, Some(max) if diff > max) {
            return false;
        }
        !matches!(self.home_won, Some(won) if (diff > 0) != won)
    }

    fn rank_matches(&self, game: &Game, season: Option<&SeasonContext>) -> bool {
        if !self.has_rank_criteria() {
            return true;
        }
        let Some(season) = season else {
            return false;
        };

        let home = season.rank_of(&game.home_team) as i64;
        let away = season.rank_of(&game.away_team) as i64;
        let total = season.total_teams() as i64;

        let in_top = |rank: i64, n: u32| rank <= n as i64;
        let in_bottom = |rank: i64, n: u32| rank > total - n as i64;
        let in_mid = |rank: i64| rank > MID_BAND_EDGE && rank <= total - MID_BAND_EDGE;

        if let Some(n) = self.both_top_n {
            if !in_top(home, n) || !in_top(away, n) {
                return false;
            }
        }
        if let Some(n) = self.both_bottom_n {
            if !in_bottom(home, n) || !in_bottom(away, n) {
                return false;
            }
        }
        if matches!(self.home_top_n, Some(n) if !in_top(home, n)) {
            return false;
        }
        if self.home_mid_n.is_some() && !in_mid(home) {
            return false;
        }
        if matches!(self.home_bottom_n, Some(n) if !in_bottom(home, n)) {
            return false;
        }
        if matches!(self.away_top_n, Some(n) if !in_top(away, n)) {
            return false;
        }
        if self.away_mid_n.is_some() && !in_mid(away) {
            return false;
        }
        !matches!(self.away_bottom_n, Some(n) if !in_bottom(away, n))
    }

    /// The first rank band set for one side (top, then mid, then bottom).
    pub fn side_rank(&self, side: TeamLocation) -> Option<RankBand> {
        let (top, mid, bottom) = match side {
            TeamLocation::Home => (self.home_top_n, self.home_mid_n, self.home_bottom_n),
            TeamLocation::Away => (self.away_top_n, self.away_mid_n, self.away_bottom_n),
        };
        top.map(RankBand::Top)
            .or(mid.map(RankBand::Mid))
            .or(bottom.map(RankBand::Bottom))
    }

    /// Replace whatever rank band one side carries.
    pub fn set_side_rank(&mut self, side: TeamLocation, band: Option<RankBand>) {
        let (top, mid, bottom) = match side {
            TeamLocation::Home => (
                &mut self.home_top_n,
                &mut self.home_mid_n,
                &mut self.home_bottom_n,
            ),
            TeamLocation::Away => (
                &mut self.away_top_n,
                &mut self.away_mid_n,
                &mut self.away_bottom_n,
            ),
        };
        *top = None;
        *mid = None;
        *bottom = None;
        match band {
            Some(RankBand::Top(n)) => *top = Some(n),
            Some(RankBand::Mid(n)) => *mid = Some(n),
            Some(RankBand::Bottom(n)) => *bottom = Some(n),
            None => {}
        }
    }

    /// Human-readable label listing only the constrained clauses, in the
    /// order: identity, segment, years, ranks, location, outcome.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();

        if let Some(team) = &self.for_team {
            parts.push(format!("For: {team}"));
        }
        if let Some(team) = &self.vs_team {
            parts.push(format!("Vs: {team}"));
        }

        match (self.include_regular_season, self.include_playoffs) {
            (true, false) => parts.push("Regular Season".to_string()),
            (false, true) => parts.push("Playoffs".to_string()),
            (false, false) => parts.push("No Games".to_string()),
            (true, true) => {}
        }

        match (self.min_year, self.max_year) {
            (Some(min), Some(max)) if min == max => parts.push(format!("Year: {min}")),
            (Some(min), Some(max)) => parts.push(format!("Years: {min}-{max}")),
            (Some(min), None) => parts.push(format!("From: {min}")),
            (None, Some(max)) => parts.push(format!("Until: {max}")),
            (None, None) => {}
        }

        let ranks = [
            (self.both_top_n, "Both in Top"),
            (self.both_bottom_n, "Both in Bottom"),
            (self.home_top_n, "Home in Top"),
            (self.home_mid_n, "Home in Mid"),
            (self.home_bottom_n, "Home in Bottom"),
            (self.away_top_n, "Away in Top"),
            (self.away_mid_n, "Away in Mid"),
            (self.away_bottom_n, "Away in Bottom"),
        ];
        for (n, label) in ranks {
            if let Some(n) = n {
                parts.push(format!("{label} {n}"));
            }
        }

        match self.team_location {
            Some(TeamLocation::Home) => parts.push("Team At Home".to_string()),
            Some(TeamLocation::Away) => parts.push("Team Away".to_string()),
            None => {}
        }

        match (self.min_point_diff, self.max_point_diff) {
            (Some(min), Some(max)) => parts.push(format!("Margin: {min} to {max}")),
            (Some(min), None) => parts.push(format!("Margin >= {min}")),
            (None, Some(max)) => parts.push(format!("Margin <= {max}")),
            (None, None) => {}
        }
        match self.home_won {
            Some(true) => parts.push("Home Won".to_string()),
            Some(false) => parts.push("Away Won".to_string()),
            None => {}
        }

        if parts.is_empty() {
            "All Games".to_string()
        } else {
            parts.join(", ")
        }
    }
}
