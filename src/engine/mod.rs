pub mod chart;
pub mod filter;
pub mod line;
pub mod minimize;
pub mod normal;
pub mod regression;

pub use chart::{
    build_chart_spec, ChartKind, ChartOptions, ChartSpec, FilterSet, LineRequest, PercentTrace,
    TimeSelection,
};
pub use filter::{GameFilterCriteria, RankBand, TeamLocation, TeamSet};
pub use line::{FitOptions, LineFit, MarginTally, PlottedLine};
