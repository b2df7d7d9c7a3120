pub mod config;
pub mod error;
pub mod random;
pub mod types;

pub use config::{CarryLimits, ColonyConfig, FieldConfig, HiveLayout};
pub use error::{ColonyError, Result};
pub use random::{FirstPick, RandomSource, SeededRandom};
