pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod state;

pub use error::{CalcError, CalcResult};
