use super::types::{Game, SeasonArchive, SeasonContext};
use super::SeasonFeed;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// On-disk layout of one `nba_season_<year>.json` file.
#[derive(Debug, Deserialize)]
struct SeasonFile {
    #[serde(default)]
    rankings: HashMap<String, u32>,
    #[serde(default, rename = "totalTeams", alias = "total_teams")]
    total_teams: Option<u32>,
    #[serde(default)]
    games: Vec<Game>,
}

/// Reads season files from a local directory.
#[derive(Debug, Clone)]
pub struct JsonDirFeed {
    dir: PathBuf,
}

impl JsonDirFeed {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn season_path(&self, year: i32) -> PathBuf {
        self.dir.join(format!("nba_season_{year}.json"))
    }

    fn read_season(path: &Path, year: i32) -> Result<(SeasonContext, Vec<Game>)> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read season file: {}", path.display()))?;
        let file: SeasonFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse season file: {}", path.display()))?;

        let mut games = file.games;
        // Season files may omit the year on each game
        for game in &mut games {
            if game.year == 0 {
                game.year = year;
            }
        }
        let context = SeasonContext {
            rankings: file.rankings,
            total_teams: file.total_teams,
        };
        Ok((context, games))
    }
}

impl SeasonFeed for JsonDirFeed {
    fn load_seasons(&self, min_year: i32, max_year: i32) -> Result<SeasonArchive> {
        if min_year > max_year {
            anyhow::bail!("empty season range {min_year}-{max_year}");
        }
        let mut archive = SeasonArchive::default();
        for year in min_year..=max_year {
            let path = self.season_path(year);
            match Self::read_season(&path, year) {
                Ok((context, games)) => {
                    tracing::debug!(year, games = games.len(), "loaded season");
                    archive.insert_season(year, context, games);
                }
                Err(e) => {
                    tracing::warn!(year, error = %format!("{e:#}"), "skipping season");
                }
            }
        }
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("comeback-calc-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_loads_present_years_and_skips_missing() {
        let dir = scratch_dir("season-feed");
        std::fs::write(
            dir.join("nba_season_2019.json"),
            r#"{
                "rankings": {"MIL": 1, "TOR": 2},
                "games": [
                    {"home_team": "MIL", "away_team": "TOR", "home_score": 108,
                     "away_score": 100, "year": 0}
                ]
            }"#,
        )
        .unwrap();
        std::fs::write(dir.join("nba_season_2020.json"), "not json").unwrap();

        let feed = JsonDirFeed::new(&dir);
        let archive = feed.load_seasons(2018, 2020).unwrap();
        assert_eq!(archive.years(), vec![2019]);
        assert_eq!(archive.games.len(), 1);
        assert_eq!(archive.games[0].year, 2019);
        assert_eq!(archive.context(2019).unwrap().rank_of("TOR"), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_inverted_range_is_an_error() {
        let feed = JsonDirFeed::new("/nonexistent");
        assert!(feed.load_seasons(2020, 2019).is_err());
    }
}
