use super::types::CalculatorConfiguration;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Key the calculator state is saved under.
pub const STATE_KEY: &str = "nbacc_calculator_state";
const SAVED_AT_KEY: &str = "nbacc_calculator_state_saved_at";

/// Key-value JSON file holding the last calculator state between sessions.
///
/// The configuration is stored verbatim under [`STATE_KEY`]; other keys in
/// the file are left untouched.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge the configuration into the store. A file that exists but is
    /// not a JSON object is replaced.
    pub fn save(&self, config: &CalculatorConfiguration) -> Result<()> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(e) => {
                if self.path.exists() {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %format!("{e:#}"),
                        "replacing unreadable state file"
                    );
                }
                Map::new()
            }
        };
        let value = serde_json::to_value(config).context("Failed to serialize calculator state")?;
        entries.insert(STATE_KEY.to_string(), value);
        entries.insert(SAVED_AT_KEY.to_string(), Value::String(Utc::now().to_rfc3339()));
        self.write_entries(&entries)
    }

    /// The saved configuration, or `None` when absent or unreadable.
    pub fn load(&self) -> Option<CalculatorConfiguration> {
        let entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %format!("{e:#}"),
                    "no saved state"
                );
                return None;
            }
        };
        let value = entries.get(STATE_KEY)?.clone();
        match serde_json::from_value::<CalculatorConfiguration>(value) {
            Ok(config) => Some(config.normalized()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load saved calculator state");
                None
            }
        }
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        let entries = self.read_entries().ok()?;
        let raw = entries.get(SAVED_AT_KEY)?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn clear(&self) -> Result<()> {
        let Ok(mut entries) = self.read_entries() else {
            return Ok(());
        };
        entries.remove(STATE_KEY);
        entries.remove(SAVED_AT_KEY);
        self.write_entries(&entries)
    }

    fn read_entries(&self) -> Result<Map<String, Value>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| {
                    format!("Failed to create state directory: {}", parent.display())
                })?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))
    }
}
