use anyhow::{bail, Context, Result};
use comeback_calc::config::{Config, DEFAULT_CONFIG_PATH};
use comeback_calc::engine::chart::{build_chart_spec, ChartKind, PercentTrace};
use comeback_calc::engine::line::PlottedLine;
use comeback_calc::feed::SeasonFeed;
use comeback_calc::state::{self, CalculatorConfiguration};
use serde::Serialize;
use std::path::{Path, PathBuf};

const USAGE: &str = "usage: comeback-calc [--config <path>] <command>

commands:
  decode <query>      print the configuration a share link describes
  encode <json-file>  print the share link for a saved configuration
  chart <query>       resolve the chart and fit a line per year group
  save <query>        store the configuration for the next session
  load                print the stored configuration";

enum Command {
    Decode(String),
    Encode(PathBuf),
    Chart(String),
    Save(String),
    Load,
}

struct Args {
    config_path: PathBuf,
    command: Command,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut positional = Vec::new();
    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                config_path = iter.next().map(PathBuf::from).context("--config needs a path")?;
            }
            "-h" | "--help" => bail!("{USAGE}"),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match (positional.next().as_deref(), positional.next()) {
        (Some("decode"), Some(query)) => Command::Decode(query),
        (Some("encode"), Some(file)) => Command::Encode(PathBuf::from(file)),
        (Some("chart"), Some(query)) => Command::Chart(query),
        (Some("save"), Some(query)) => Command::Save(query),
        (Some("load"), None) => Command::Load,
        _ => bail!("{USAGE}"),
    };
    Ok(Args { config_path, command })
}

#[derive(Serialize)]
struct LineSummary {
    label: String,
    legend: String,
    games: usize,
    regular_season_games: usize,
    playoff_games: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    plotted: Option<PlottedLine>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    traces: Vec<PercentTrace>,
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let (config, defaulted) = load_config(&args.config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(config.logging.filter.as_str())
        .with_writer(std::io::stderr)
        .init();
    if defaulted {
        tracing::info!(path = %args.config_path.display(), "no config file, using defaults");
    }

    match args.command {
        Command::Decode(query) => print_json(&state::decode(&query)),
        Command::Encode(path) => {
            let calculator = read_configuration(&path)?;
            println!("{}", state::encode(&calculator));
            Ok(())
        }
        Command::Chart(query) => chart(&config, &query),
        Command::Save(query) => {
            let store = config.state_store();
            store.save(&state::decode(&query))?;
            println!("saved to {}", store.path().display());
            Ok(())
        }
        Command::Load => match config.state_store().load() {
            Some(calculator) => {
                println!("{}", state::encode(&calculator));
                print_json(&calculator)
            }
            None => {
                println!("no saved state");
                Ok(())
            }
        },
    }
}

/// The config plus whether it fell back to the defaults. Logging is not
/// set up yet, so the caller reports the fallback.
fn load_config(path: &Path) -> Result<(Config, bool)> {
    let defaulted = !path.exists();
    Ok((Config::load_or_default(path)?, defaulted))
}

fn chart(config: &Config, query: &str) -> Result<()> {
    let calculator = state::decode(query);
    let spec = build_chart_spec(&calculator, &config.chart.chart_options())?;

    let min_year = spec.lines.iter().map(|l| l.min_year).min().unwrap_or_default();
    let max_year = spec.lines.iter().map(|l| l.max_year).max().unwrap_or_default();
    let archive = config.season_feed().load_seasons(min_year, max_year)?;
    if archive.games.is_empty() {
        tracing::warn!(
            dir = %config.data.season_dir.display(),
            min_year,
            max_year,
            "no games loaded"
        );
    }

    let fit_options = config.chart.fit_options();
    let lines: Vec<LineSummary> = spec
        .lines
        .iter()
        .map(|line| {
            let games = line.select(&archive);
            let playoff_games = games.iter().filter(|g| g.is_playoffs).count();
            let mut summary = LineSummary {
                label: line.label.clone(),
                legend: line.legend_label(),
                games: games.len(),
                regular_season_games: games.len() - playoff_games,
                playoff_games,
                plotted: None,
                traces: Vec::new(),
            };
            let fitted = match spec.kind {
                ChartKind::PointMarginVWinPercent => {
                    let tally = spec.tally_line(line, &archive);
                    spec.plot_line(line, tally, &fit_options)
                        .map(|plotted| summary.plotted = Some(plotted))
                }
                ChartKind::TimeVPointMargin => spec
                    .trace_percents(line, &archive, &fit_options)
                    .map(|traces| summary.traces = traces),
            };
            if let Err(e) = fitted {
                tracing::warn!(line = %summary.label, error = %e, "no line fitted");
            }
            summary
        })
        .collect();

    print_json(&serde_json::json!({ "chart": spec, "lines": lines }))
}

fn read_configuration(path: &Path) -> Result<CalculatorConfiguration> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
    let calculator: CalculatorConfiguration = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
    Ok(calculator.normalized())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
