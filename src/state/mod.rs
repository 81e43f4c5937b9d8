pub mod codec;
pub mod legacy;
pub mod store;
pub mod types;

pub use codec::{decode, encode, has_state};
pub use store::StateStore;
pub use types::{CalculatorConfiguration, PlotType, YearGroup};
