//! Colony-wide resource totals derived from the comb

use serde::{Deserialize, Serialize};

use crate::core::types::Resource;
use crate::hive::cell::Cell;

/// Sum of stored resources over all active cells.
///
/// Derived data only; the comb recomputes it after every mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub nectar: u32,
    pub water: u32,
    pub honey: u32,
}

impl Ledger {
    pub fn tally<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut ledger = Ledger::default();
        for cell in cells.into_iter().filter(|c| c.is_active()) {
            match cell.kind.resource() {
                Some(Resource::Nectar) => ledger.nectar += cell.amount(),
                Some(Resource::Water) => ledger.water += cell.amount(),
                Some(Resource::Honey) => ledger.honey += cell.amount(),
                None => {}
            }
        }
        ledger
    }

    pub fn total(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Nectar => self.nectar,
            Resource::Water => self.water,
            Resource::Honey => self.honey,
        }
    }
}
