pub mod season;
pub mod types;

use anyhow::Result;
use types::SeasonArchive;

/// Source of historical season data keyed by year.
pub trait SeasonFeed {
    /// Load every available season in `[min_year, max_year]`. Years that
    /// cannot be loaded are skipped, not fatal.
    fn load_seasons(&self, min_year: i32, max_year: i32) -> Result<SeasonArchive>;
}
