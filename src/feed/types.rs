use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Rank assigned to a team missing from a season's rankings.
pub const UNRANKED: u32 = 999;

/// One finished game. Historical fact, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub year: i32,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    #[serde(default, alias = "playoffs")]
    pub is_playoffs: bool,
    /// Minute-by-minute score margins; empty when the file carries none.
    #[serde(default)]
    pub point_margins: PointMargins,
}

/// Home-relative score margins, indexed by minutes elapsed.
///
/// `margins[i]` is the margin at the end of minute `i + 1`.
/// `min_margins[i]` and `max_margins[i]` are the extremes reached with
/// `i` minutes elapsed, so they carry one more entry than `margins`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointMargins {
    #[serde(default)]
    pub margins: Vec<i32>,
    #[serde(default)]
    pub min_margins: Vec<i32>,
    #[serde(default)]
    pub max_margins: Vec<i32>,
}

impl PointMargins {
    pub fn is_empty(&self) -> bool {
        self.margins.is_empty() && self.min_margins.is_empty() && self.max_margins.is_empty()
    }
}

impl Game {
    /// Final margin from the home side: `home_score - away_score`.
    pub fn point_diff(&self) -> i32 {
        self.home_score - self.away_score
    }

    pub fn home_won(&self) -> bool {
        self.point_diff() > 0
    }
}

/// Standings for one season, used to resolve rank filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonContext {
    /// Team abbreviation -> 1-based rank (1 = best).
    pub rankings: HashMap<String, u32>,
    #[serde(default, rename = "totalTeams", alias = "total_teams")]
    pub total_teams: Option<u32>,
}

impl SeasonContext {
    pub fn from_rankings<I, S>(rankings: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            rankings: rankings.into_iter().map(|(t, r)| (t.into(), r)).collect(),
            total_teams: None,
        }
    }

    pub fn rank_of(&self, team: &str) -> u32 {
        match self.rankings.get(team) {
            Some(&rank) if rank > 0 => rank,
            _ => UNRANKED,
        }
    }

    /// Explicit team count when supplied, otherwise the size of the rankings.
    pub fn total_teams(&self) -> u32 {
        self.total_teams
            .unwrap_or_else(|| self.rankings.len() as u32)
    }
}

/// Loaded seasons keyed by year, plus all their games.
#[derive(Debug, Clone, Default)]
pub struct SeasonArchive {
    pub seasons: BTreeMap<i32, SeasonContext>,
    pub games: Vec<Game>,
}

impl SeasonArchive {
    pub fn context(&self, year: i32) -> Option<&SeasonContext> {
        self.seasons.get(&year)
    }

    pub fn insert_season(&mut self, year: i32, context: SeasonContext, games: Vec<Game>) {
        self.seasons.insert(year, context);
        self.games.extend(games);
    }

    pub fn games_between(&self, min_year: i32, max_year: i32) -> impl Iterator<Item = &Game> {
        self.games
            .iter()
            .filter(move |g| g.year >= min_year && g.year <= max_year)
    }

    pub fn years(&self) -> Vec<i32> {
        self.seasons.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_defaults_to_unranked() {
        let ctx = SeasonContext::from_rankings([("BOS", 1), ("NYK", 2)]);
        assert_eq!(ctx.rank_of("BOS"), 1);
        assert_eq!(ctx.rank_of("LAL"), UNRANKED);
        assert_eq!(ctx.total_teams(), 2);
    }

    #[test]
    fn test_explicit_total_teams_wins() {
        let mut ctx = SeasonContext::from_rankings([("BOS", 1)]);
        ctx.total_teams = Some(30);
        assert_eq!(ctx.total_teams(), 30);
    }

    #[test]
    fn test_game_parses_from_season_json() {
        let json = r#"{"year": 2019, "home_team": "BOS", "away_team": "NYK",
                       "home_score": 101, "away_score": 99, "playoffs": true}"#;
        let game: Game = serde_json::from_str(json).unwrap();
        assert!(game.is_playoffs);
        assert_eq!(game.point_diff(), 2);
        assert!(game.home_won());
        assert!(game.game_id.is_empty());
        assert!(game.point_margins.is_empty());
    }

    #[test]
    fn test_game_parses_point_margins() {
        let json = r#"{"home_team": "BOS", "away_team": "NYK", "home_score": 101,
                       "away_score": 99, "point_margins": {"margins": [2, -3],
                       "min_margins": [0, -1, -5], "max_margins": [0, 2, 4]}}"#;
        let game: Game = serde_json::from_str(json).unwrap();
        assert_eq!(game.point_margins.margins, vec![2, -3]);
        assert_eq!(game.point_margins.min_margins[2], -5);
        assert!(!game.point_margins.is_empty());
    }

    #[test]
    fn test_games_between() {
        let mut archive = SeasonArchive::default();
        for year in [2018, 2019, 2020] {
            let game = Game {
                game_id: format!("g{year}"),
                year,
                home_team: "BOS".into(),
                away_team: "NYK".into(),
                home_score: 100,
                away_score: 90,
                is_playoffs: false,
                point_margins: PointMargins::default(),
            };
            archive.insert_season(year, SeasonContext::default(), vec![game]);
        }
        let ids: Vec<_> = archive.games_between(2019, 2020).map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec!["g2019", "g2020"]);
        assert_eq!(archive.years(), vec![2018, 2019, 2020]);
    }
}
