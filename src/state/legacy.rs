//! Decoder for the older verbose share-link format, where each field is a
//! separate parameter holding a JSON value:
//!
//! `pt` plot type (index or name), `st`/`et`/`spt` start, end and specific
//! minute, `pc` percent list, `pg`/`pcg` guide flags, `yg` year groups,
//! `gf` game filters.
//!
//! Links in this format are only ever read, never produced.

use super::codec::{
    criteria_from_parts, is_valid_percent, parse_start_minute, team_set, QueryParams,
};
use super::types::{default_percents, CalculatorConfiguration, PlotType, YearGroup, GAME_SECONDS};
use crate::engine::filter::{GameFilterCriteria, RankBand, TeamLocation};
use serde::Deserialize;
use serde_json::Value;

pub const PARAMS: &[&str] = &["pt", "st", "et", "spt", "pc", "pg", "pcg", "yg", "gf"];

/// Year group as the old links stored it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyYearGroup {
    min_year: i32,
    max_year: i32,
    #[serde(default = "yes")]
    regular_season: bool,
    #[serde(default = "yes")]
    playoffs: bool,
}

fn yes() -> bool {
    true
}

/// Game filter as the old links (and saved sessions) stored it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyFilter {
    for_at_home: Option<bool>,
    for_rank: Option<String>,
    for_team_abbr: Option<Value>,
    vs_rank: Option<String>,
    vs_team_abbr: Option<Value>,
}

pub(crate) fn decode_legacy(params: &QueryParams) -> CalculatorConfiguration {
    let mut config = CalculatorConfiguration::default();

    if let Some(value) = json_param(params, "pt") {
        match plot_type_from(&value) {
            Some(plot_type) => config.plot_type = plot_type,
            None => tracing::warn!(%value, "invalid legacy plot type, using default"),
        }
    }

    if let Some(value) = json_param(params, "st") {
        match minute_value(&value).and_then(|m| parse_start_minute(&m.to_string())) {
            Some(seconds) => config.start_time_seconds = seconds,
            None => tracing::warn!(%value, "invalid legacy start time, using default"),
        }
    }

    if let Some(value) = json_param(params, "et") {
        match minute_value(&value).map(|m| m * 60) {
            Some(seconds) if seconds < config.start_time_seconds => {
                config.end_time_seconds = seconds
            }
            _ => tracing::warn!(%value, "invalid legacy end time, using default"),
        }
    }

    if config.plot_type == PlotType::PointsDownAtTime {
        config.specific_time_seconds = Some(config.start_time_seconds);
    }
    if let Some(value) = json_param(params, "spt") {
        match minute_value(&value).map(|m| m * 60) {
            Some(seconds) if seconds <= GAME_SECONDS => {
                config.specific_time_seconds = Some(seconds)
            }
            _ => tracing::warn!(%value, "invalid legacy specific time, using default"),
        }
    }

    if let Some(value) = json_param(params, "pc") {
        config.selected_percents = percents_from(&value);
    }
    if let Some(value) = json_param(params, "pg") {
        config.plot_guides = flag_from(&value);
    }
    if let Some(value) = json_param(params, "pcg") {
        config.plot_calculated_guides = flag_from(&value);
    }

    if let Some(Value::Array(groups)) = json_param(params, "yg") {
        config.year_groups = groups.into_iter().filter_map(year_group_from).collect();
    }
    if config.year_groups.is_empty() {
        config.year_groups.push(YearGroup::default());
    }

    if let Some(Value::Array(filters)) = json_param(params, "gf") {
        config.game_filters = filters.into_iter().filter_map(filter_from).collect();
    }
    if config.game_filters.is_empty() {
        config.game_filters.push(None);
    }

    config
}

/// Parse a parameter as JSON; a bare word that is not JSON is kept as a
/// string so `pt=Max Points Down` still reads.
fn json_param(params: &QueryParams, key: &str) -> Option<Value> {
    let raw = params.get(key)?;
    Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

fn plot_type_from(value: &Value) -> Option<PlotType> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|i| PlotType::from_index(i as usize)),
        Value::String(s) => s
            .parse::<usize>()
            .ok()
            .and_then(PlotType::from_index)
            .or_else(|| s.parse::<PlotType>().ok()),
        _ => None,
    }
}

fn minute_value(value: &Value) -> Option<u32> {
    let minutes = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(minutes).ok().filter(|m| *m <= GAME_SECONDS / 60)
}

fn percents_from(value: &Value) -> Vec<String> {
    let percents: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|p| is_valid_percent(p))
            .collect(),
        _ => Vec::new(),
    };
    if percents.is_empty() {
        tracing::warn!(%value, "no valid legacy percents, using defaults");
        return default_percents();
    }
    percents
}

fn flag_from(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_u64() == Some(1),
        Value::String(s) => s == "1" || s == "true",
        _ => false,
    }
}

fn year_group_from(value: Value) -> Option<YearGroup> {
    let legacy: LegacyYearGroup = match serde_json::from_value(value) {
        Ok(group) => group,
        Err(e) => {
            tracing::warn!(error = %e, "invalid legacy year group");
            return None;
        }
    };
    let (regular, playoffs) = match (legacy.regular_season, legacy.playoffs) {
        (false, false) => (true, true),
        flags => flags,
    };
    let group = YearGroup::new(legacy.min_year, legacy.max_year, regular, playoffs);
    group.is_valid().then_some(group)
}

/// `None` drops the entry; `Some(None)` is an all-games filter.
fn filter_from(value: Value) -> Option<Option<GameFilterCriteria>> {
    if value.is_null() {
        return Some(None);
    }
    let legacy: LegacyFilter = match serde_json::from_value(value) {
        Ok(filter) => filter,
        Err(e) => {
            tracing::warn!(error = %e, "invalid legacy filter");
            return None;
        }
    };

    let location = legacy.for_at_home.map(|home| {
        if home {
            TeamLocation::Home
        } else {
            TeamLocation::Away
        }
    });
    let rank = |token: Option<&String>| token.and_then(|t| RankBand::parse(t));

    Some(criteria_from_parts(
        location,
        rank(legacy.for_rank.as_ref()),
        legacy.for_team_abbr.as_ref().and_then(teams_from),
        rank(legacy.vs_rank.as_ref()),
        legacy.vs_team_abbr.as_ref().and_then(teams_from),
    ))
}

fn teams_from(value: &Value) -> Option<crate::engine::filter::TeamSet> {
    match value {
        Value::String(s) => team_set(s.split('_')),
        Value::Array(items) => team_set(items.iter().filter_map(Value::as_str)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::filter::TeamSet;
    use crate::state::codec::decode;

    #[test]
    fn test_legacy_plot_and_times() {
        let config = decode("pt=2&st=36&et=6");
        assert_eq!(config.plot_type, PlotType::MaxPointsDown);
        assert_eq!(config.start_time_seconds, 36 * 60);
        assert_eq!(config.end_time_seconds, 6 * 60);
    }

    #[test]
    fn test_legacy_plot_type_by_name() {
        let config = decode("pt=Points%20Down%20At%20Time&st=5");
        assert_eq!(config.plot_type, PlotType::PointsDownAtTime);
        assert_eq!(config.specific_time_seconds, Some(300));
    }

    #[test]
    fn test_legacy_invalid_fields_use_defaults() {
        let config = decode("pt=9&st=0&et=30&pc=[]");
        let defaults = CalculatorConfiguration::default();
        assert_eq!(config.plot_type, defaults.plot_type);
        assert_eq!(config.start_time_seconds, defaults.start_time_seconds);
        // end must be before the start
        assert_eq!(config.end_time_seconds, 0);
        assert_eq!(config.selected_percents, default_percents());
    }

    #[test]
    fn test_legacy_year_groups() {
        let yg = r#"[{"minYear":2018,"maxYear":2020,"regularSeason":true,"playoffs":false},
                     {"minYear":1980,"maxYear":1990},
                     "junk"]"#;
        let query = format!("yg={}", urlencode(yg));
        let config = decode(&query);
        assert_eq!(config.year_groups, vec![YearGroup::new(2018, 2020, true, false)]);
    }

    #[test]
    fn test_legacy_filters() {
        let gf = r#"[null,
            {"for_at_home": false, "for_rank": "top10", "vs_team_abbr": ["BOS", "NYK"]},
            7]"#;
        let query = format!("gf={}&pg=true&pcg=0&pc=[\"15\",5]", urlencode(gf));
        let config = decode(&query);
        assert_eq!(config.game_filters.len(), 2);
        assert_eq!(config.game_filters[0], None);
        let filter = config.game_filters[1].as_ref().unwrap();
        assert_eq!(filter.team_location, Some(TeamLocation::Away));
        assert_eq!(filter.away_top_n, Some(10));
        assert_eq!(filter.vs_team, Some(TeamSet::many(["BOS", "NYK"])));
        assert!(config.plot_guides);
        assert!(!config.plot_calculated_guides);
        assert_eq!(config.selected_percents, vec!["15", "5"]);
    }

    #[test]
    fn test_compact_params_win_over_legacy() {
        let config = decode("pt=2&p=1-10");
        assert_eq!(config.plot_type, PlotType::MaxPointsDownOrMore);
    }

    fn urlencode(raw: &str) -> String {
        url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
    }
}
