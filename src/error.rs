use thiserror::Error;

/// Errors surfaced by the computation engine.
///
/// The state codec never produces these: malformed shared state is always
/// resolved to defaults instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported plot type: {0}")]
    UnsupportedPlotType(String),

    #[error("Incomplete configuration: {0}")]
    IncompleteConfiguration(String),
}

pub type CalcResult<T> = std::result::Result<T, CalcError>;
