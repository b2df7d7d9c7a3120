//! A single comb cell

use crate::core::types::{CellId, CellKind, Vec2};
use crate::hive::brood::Brood;
use crate::hive::claim::Claimant;

/// A capacity-bounded store of one resource, or a brood cell.
///
/// Amount and claim are private: every mutation goes through the comb.
#[derive(Debug, Clone)]
pub struct Cell {
    pub id: CellId,
    pub kind: CellKind,
    pub position: Vec2,
    amount: u32,
    capacity: u32,
    holder: Option<Claimant>,
    active: bool,
    brood: Option<Brood>,
}

impl Cell {
    pub(crate) fn new(id: CellId, kind: CellKind, position: Vec2, capacity: u32, active: bool) -> Self {
        let brood = (kind == CellKind::Brood).then(Brood::new);
        Self {
            id,
            kind,
            position,
            amount: 0,
            capacity,
            holder: None,
            active,
            brood,
        }
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn room(&self) -> u32 {
        self.capacity.saturating_sub(self.amount)
    }

    pub fn is_full(&self) -> bool {
        self.amount >= self.capacity
    }

    pub fn is_locked(&self) -> bool {
        self.holder.is_some()
    }

    pub fn holder(&self) -> Option<Claimant> {
        self.holder
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn brood(&self) -> Option<&Brood> {
        self.brood.as_ref()
    }

    /// Active, unclaimed cell of `kind` with something in it
    pub fn has_available(&self, kind: CellKind) -> bool {
        self.active && self.kind == kind && !self.is_locked() && self.amount > 0
    }

    /// Active, unclaimed brood cell whose larva is waiting to be fed
    pub fn is_awaiting_food(&self) -> bool {
        self.active
            && !self.is_locked()
            && self.brood.as_ref().is_some_and(Brood::is_awaiting_food)
    }

    pub(crate) fn brood_mut(&mut self) -> Option<&mut Brood> {
        self.brood.as_mut()
    }

    pub(crate) fn set_holder(&mut self, holder: Option<Claimant>) {
        self.holder = holder;
    }

    pub(crate) fn activate(&mut self) -> bool {
        let changed = !self.active;
        self.active = true;
        changed
    }

    /// Add up to `amount`, clamped to capacity; returns what was added
    pub(crate) fn add(&mut self, amount: u32) -> u32 {
        let added = amount.min(self.room());
        self.amount += added;
        added
    }

    /// Remove up to `amount`; returns what was removed
    pub(crate) fn take(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.amount);
        self.amount -= removed;
        removed
    }
}
