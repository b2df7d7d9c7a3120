//! The world outside the hive

pub mod field;

pub use field::{Field, FieldChange, FlowerSource};
