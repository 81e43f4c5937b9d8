use crate::engine::chart::{ChartOptions, DEFAULT_POINT_MARGIN};
use crate::engine::line::{FitOptions, DEFAULT_MIN_PERCENT};
use crate::feed::season::JsonDirFeed;
use crate::state::StateStore;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Directory holding `nba_season_<year>.json` files.
    #[serde(default = "default_season_dir")]
    pub season_dir: PathBuf,
}

fn default_season_dir() -> PathBuf {
    PathBuf::from("data/seasons")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            season_dir: default_season_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartConfig {
    #[serde(default = "default_point_margin")]
    pub point_margin: i32,
    /// Only margins at or below this are used when fitting lines.
    #[serde(default)]
    pub fit_max_margin: Option<i32>,
    #[serde(default = "default_min_percent")]
    pub min_percent: f64,
}

fn default_point_margin() -> i32 { DEFAULT_POINT_MARGIN }
fn default_min_percent() -> f64 { DEFAULT_MIN_PERCENT }

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            point_margin: DEFAULT_POINT_MARGIN,
            fit_max_margin: None,
            min_percent: DEFAULT_MIN_PERCENT,
        }
    }
}

impl ChartConfig {
    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            point_margin: self.point_margin,
        }
    }

    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            min_percent: self.min_percent,
            max_fit_margin: self.fit_max_margin,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("nbacc_state.json")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber` env-filter directive.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "comeback_calc=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    /// A file that exists and fails to parse is still an error. Runs before
    /// the subscriber is installed, so callers log the fallback themselves.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn season_feed(&self) -> JsonDirFeed {
        JsonDirFeed::new(&self.data.season_dir)
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(&self.state.store_path)
    }
}
