//! Compact query-string codec for calculator state.
//!
//! ```text
//! p=<plot index>-<minute>[-<pct>_<pct>...[-<guides><calculated guides>]]
//! s=<min>-<max>-<B|R|P>~<min>-<max>-<B|R|P>...
//! g=all~<H|A|N>-<for spec>-<vs spec>...
//!
//! spec: any | R:<top5|mid10|bot5..> | T:<abbr>[_<abbr>...]
//! ```
//!
//! Decoding is total: malformed fields fall back to their defaults and a
//! warning is logged, so every string yields a usable configuration.

use super::legacy;
use super::types::{
    default_percents, CalculatorConfiguration, PlotType, YearGroup, GAME_SECONDS,
};
use crate::engine::filter::{GameFilterCriteria, RankBand, TeamLocation, TeamSet};

pub const PLOT_PARAM: &str = "p";
pub const SEASONS_PARAM: &str = "s";
pub const FILTERS_PARAM: &str = "g";

const ENTRY_SEPARATOR: char = '~';
const FIELD_SEPARATOR: char = '-';
const LIST_SEPARATOR: char = '_';
const ALL_GAMES: &str = "all";
const ANY_TEAM: &str = "any";

/// Decoded `key=value` pairs in order of appearance.
#[derive(Debug, Default)]
pub(crate) struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub(crate) fn parse(query: &str) -> Self {
        let query = query.trim();
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// First value for `key`, like `URLSearchParams.get`.
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn has_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.get(key).is_some())
    }
}

/// True when `query` carries any compact-form parameter.
pub fn has_state(query: &str) -> bool {
    QueryParams::parse(query).has_any(&[PLOT_PARAM, SEASONS_PARAM, FILTERS_PARAM])
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a configuration as a query string without the leading `?`.
///
/// Only the fields the compact grammar carries survive: time is truncated
/// to whole minutes, percents and guide flags are kept for the percent
/// chance plot only, and each filter keeps its location, one team-or-rank
/// spec per side.
pub fn encode(config: &CalculatorConfiguration) -> String {
    let mut params = vec![format!("{PLOT_PARAM}={}", encode_plot(config))];

    let seasons = config
        .year_groups
        .iter()
        .map(encode_year_group)
        .collect::<Vec<_>>()
        .join(&ENTRY_SEPARATOR.to_string());
    if !seasons.is_empty() {
        params.push(format!("{SEASONS_PARAM}={seasons}"));
    }

    let filters = config
        .game_filters
        .iter()
        .map(|f| encode_filter(f.as_ref()))
        .collect::<Vec<_>>()
        .join(&ENTRY_SEPARATOR.to_string());
    if !filters.is_empty() {
        params.push(format!("{FILTERS_PARAM}={filters}"));
    }

    params.join("&")
}

fn encode_plot(config: &CalculatorConfiguration) -> String {
    let index = config.plot_type.index();
    // The single time slot carries the clock the chart actually reads.
    let seconds = match config.plot_type {
        PlotType::PointsDownAtTime => config
            .specific_time_seconds
            .unwrap_or(config.start_time_seconds),
        _ => config.start_time_seconds,
    };
    let mut out = format!("{index}{FIELD_SEPARATOR}{}", seconds / 60);

    if config.plot_type == PlotType::PercentChanceTimeVsPointsDown
        && !config.selected_percents.is_empty()
    {
        out.push(FIELD_SEPARATOR);
        out.push_str(&config.selected_percents.join(&LIST_SEPARATOR.to_string()));

        if config.plot_guides || config.plot_calculated_guides {
            out.push(FIELD_SEPARATOR);
            out.push(flag(config.plot_guides));
            out.push(flag(config.plot_calculated_guides));
        }
    }
    out
}

fn flag(value: bool) -> char {
    if value {
        '1'
    } else {
        '0'
    }
}

fn encode_year_group(group: &YearGroup) -> String {
    let segment = match (group.include_regular_season, group.include_playoffs) {
        (true, false) => 'R',
        (false, true) => 'P',
        _ => 'B',
    };
    format!("{}-{}-{segment}", group.min_year, group.max_year)
}

fn encode_filter(filter: Option<&GameFilterCriteria>) -> String {
    let Some(filter) = filter else {
        return ALL_GAMES.to_string();
    };

    let status = match filter.team_location {
        Some(TeamLocation::Home) => 'H',
        Some(TeamLocation::Away) => 'A',
        None => 'N',
    };
    let for_side = filter.team_location.unwrap_or(TeamLocation::Home);
    let for_spec = side_spec(filter.side_rank(for_side), filter.for_team.as_ref());
    let vs_spec = side_spec(filter.side_rank(for_side.opposite()), filter.vs_team.as_ref());

    if status == 'N' && for_spec == ANY_TEAM && vs_spec == ANY_TEAM {
        return ALL_GAMES.to_string();
    }
    format!("{status}-{for_spec}-{vs_spec}")
}

/// A rank selection takes precedence over a team selection on the same side.
fn side_spec(rank: Option<RankBand>, team: Option<&TeamSet>) -> String {
    if let Some(rank) = rank {
        return format!("R:{}", rank.token());
    }
    match team {
        Some(team) if !team.is_empty() => {
            format!("T:{}", team.abbreviations().join(&LIST_SEPARATOR.to_string()))
        }
        _ => ANY_TEAM.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a query string (with or without a leading `?`).
///
/// Compact `p/s/g` parameters take precedence; otherwise the legacy verbose
/// parameters are read; with neither present the defaults are returned.
pub fn decode(query: &str) -> CalculatorConfiguration {
    let params = QueryParams::parse(query);
    let config = if params.has_any(&[PLOT_PARAM, SEASONS_PARAM, FILTERS_PARAM]) {
        decode_compact(&params)
    } else if params.has_any(legacy::PARAMS) {
        tracing::debug!("decoding legacy state parameters");
        legacy::decode_legacy(&params)
    } else {
        tracing::debug!("no state parameters, using defaults");
        CalculatorConfiguration::default()
    };
    config.normalized()
}

fn decode_compact(params: &QueryParams) -> CalculatorConfiguration {
    let mut config = CalculatorConfiguration::default();

    if let Some(plot) = params.get(PLOT_PARAM) {
        decode_plot(plot, &mut config);
    }

    config.year_groups = match params.get(SEASONS_PARAM) {
        Some(seasons) => decode_year_groups(seasons),
        None => Vec::new(),
    };
    if config.year_groups.is_empty() {
        tracing::debug!("no valid year groups, using default");
        config.year_groups.push(YearGroup::default());
    }

    config.game_filters = match params.get(FILTERS_PARAM) {
        Some(filters) => decode_filters(filters),
        None => Vec::new(),
    };
    if config.game_filters.is_empty() {
        config.game_filters.push(None);
    }

    tracing::debug!(
        plot_type = %config.plot_type,
        year_groups = config.year_groups.len(),
        filters = config.game_filters.len(),
        "decoded state"
    );
    config
}

fn decode_plot(raw: &str, config: &mut CalculatorConfiguration) {
    let parts: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();

    match parts[0].parse::<usize>().ok().and_then(PlotType::from_index) {
        Some(plot_type) => config.plot_type = plot_type,
        None => tracing::warn!(value = parts[0], "invalid plot type index, using default"),
    }

    if let Some(start) = parts.get(1) {
        match parse_start_minute(start) {
            Some(seconds) => {
                config.start_time_seconds = seconds;
                if config.plot_type == PlotType::PointsDownAtTime {
                    config.specific_time_seconds = Some(seconds);
                }
            }
            None => tracing::warn!(value = *start, "invalid start time, using default"),
        }
    }

    if config.plot_type != PlotType::PercentChanceTimeVsPointsDown {
        return;
    }

    if let Some(percents) = parts.get(2).filter(|p| !p.is_empty()) {
        config.selected_percents = decode_percents(percents);
    }

    if let Some(guides) = parts.get(3) {
        let flags: Vec<char> = guides.chars().collect();
        if flags.len() == 2 {
            config.plot_guides = flags[0] == '1';
            config.plot_calculated_guides = flags[1] == '1';
        } else {
            tracing::warn!(value = *guides, "invalid guide flags, ignoring");
        }
    }
}

/// Start minute must be in `(0, 48]`; returns seconds.
pub(crate) fn parse_start_minute(raw: &str) -> Option<u32> {
    let minutes = raw.trim().parse::<u32>().ok()?;
    let seconds = minutes.checked_mul(60)?;
    (minutes > 0 && seconds <= GAME_SECONDS).then_some(seconds)
}

/// Percent tokens must be numbers strictly between 0 and 100.
pub(crate) fn decode_percents(raw: &str) -> Vec<String> {
    let percents: Vec<String> = raw
        .split(LIST_SEPARATOR)
        .filter(|p| !p.is_empty())
        .filter(|p| {
            let valid = is_valid_percent(p);
            if !valid {
                tracing::warn!(value = *p, "dropping invalid percent");
            }
            valid
        })
        .map(str::to_string)
        .collect();

    if percents.is_empty() {
        tracing::warn!(value = raw, "no valid percents, using defaults");
        return default_percents();
    }
    percents
}

pub(crate) fn is_valid_percent(raw: &str) -> bool {
    matches!(raw.parse::<f64>(), Ok(v) if v > 0.0 && v < 100.0)
}

fn decode_year_groups(raw: &str) -> Vec<YearGroup> {
    raw.split(ENTRY_SEPARATOR)
        .filter(|s| !s.is_empty())
        .filter_map(decode_year_group)
        .collect()
}

fn decode_year_group(raw: &str) -> Option<YearGroup> {
    let parts: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
    if parts.len() != 3 {
        tracing::warn!(value = raw, "invalid season format");
        return None;
    }

    let (Ok(min_year), Ok(max_year)) = (parts[0].parse::<i32>(), parts[1].parse::<i32>()) else {
        tracing::warn!(value = raw, "invalid season years");
        return None;
    };

    let (regular, playoffs) = match parts[2] {
        "R" => (true, false),
        "P" => (false, true),
        "B" => (true, true),
        other => {
            tracing::warn!(value = other, "invalid season type, using both");
            (true, true)
        }
    };

    let group = YearGroup::new(min_year, max_year, regular, playoffs);
    if !group.is_valid() {
        tracing::warn!(min_year, max_year, "season range out of bounds");
        return None;
    }
    Some(group)
}

fn decode_filters(raw: &str) -> Vec<Option<GameFilterCriteria>> {
    raw.split(ENTRY_SEPARATOR)
        .filter(|s| !s.is_empty())
        .filter_map(decode_filter)
        .collect()
}

/// `None` drops the entry; `Some(None)` is an all-games filter.
fn decode_filter(raw: &str) -> Option<Option<GameFilterCriteria>> {
    if raw == ALL_GAMES {
        return Some(None);
    }

    let parts: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
    if parts.len() != 3 {
        tracing::warn!(value = raw, "invalid filter format");
        return None;
    }

    let location = match parts[0] {
        "H" => Some(TeamLocation::Home),
        "A" => Some(TeamLocation::Away),
        "N" => None,
        other => {
            tracing::warn!(value = other, "invalid home status, using any");
            None
        }
    };
    let (for_rank, for_team) = decode_side_spec(parts[1]);
    let (vs_rank, vs_team) = decode_side_spec(parts[2]);

    Some(criteria_from_parts(location, for_rank, for_team, vs_rank, vs_team))
}

fn decode_side_spec(raw: &str) -> (Option<RankBand>, Option<TeamSet>) {
    if raw.is_empty() || raw == ANY_TEAM {
        return (None, None);
    }
    if let Some(token) = raw.strip_prefix("R:") {
        let rank = RankBand::parse(token);
        if rank.is_none() {
            tracing::warn!(value = raw, "invalid rank spec, using any");
        }
        return (rank, None);
    }
    if let Some(teams) = raw.strip_prefix("T:") {
        return (None, team_set(teams.split(LIST_SEPARATOR)));
    }
    tracing::warn!(value = raw, "invalid team/rank spec, using any");
    (None, None)
}

pub(crate) fn team_set<'a>(abbrs: impl IntoIterator<Item = &'a str>) -> Option<TeamSet> {
    let abbrs: Vec<&str> = abbrs
        .into_iter()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();
    if abbrs.is_empty() {
        None
    } else {
        Some(TeamSet::many(abbrs))
    }
}

/// Build a filter from the shared "for/vs" shape. The for-side rank lands
/// on the home fields unless the team is away; the vs-side takes the other.
/// A filter that ends up constraining nothing is the all-games filter.
pub(crate) fn criteria_from_parts(
    location: Option<TeamLocation>,
    for_rank: Option<RankBand>,
    for_team: Option<TeamSet>,
    vs_rank: Option<RankBand>,
    vs_team: Option<TeamSet>,
) -> Option<GameFilterCriteria> {
    let for_side = location.unwrap_or(TeamLocation::Home);
    let mut criteria = GameFilterCriteria {
        for_team,
        vs_team,
        team_location: location,
        ..Default::default()
    };
    criteria.set_side_rank(for_side, for_rank);
    criteria.set_side_rank(for_side.opposite(), vs_rank);

    if criteria.is_unconstrained() {
        None
    } else {
        Some(criteria)
    }
}
