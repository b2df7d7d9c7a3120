//! The hive comb: storage cells, brood cells, claims and the colony ledger

pub mod brood;
pub mod cell;
pub mod claim;
pub mod comb;
pub mod ledger;

pub use brood::{Brood, StageAdvance};
pub use cell::Cell;
pub use claim::{Claim, Claimant};
pub use comb::Comb;
pub use ledger::Ledger;
