//! Comb - the colony's set of storage and brood cells
//!
//! The comb exclusively owns every cell. Reads (eligibility checks) are free;
//! writes need a [`Claim`] on the target cell, and the ledger is recomputed
//! after each write.

use crate::core::config::{ColonyConfig, HiveLayout};
use crate::core::error::{ColonyError, Result};
use crate::core::random::RandomSource;
use crate::core::types::{CellId, CellKind, Vec2};
use crate::hive::brood::StageAdvance;
use crate::hive::cell::Cell;
use crate::hive::claim::{Claim, Claimant};
use crate::hive::ledger::Ledger;

#[derive(Debug, Clone, Default)]
pub struct Comb {
    cells: Vec<Cell>,
    ledger: Ledger,
}

impl Comb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out an inactive comb on a staggered grid with randomly rolled kinds
    pub fn generate(config: &ColonyConfig, random: &mut dyn RandomSource) -> Self {
        let layout: &HiveLayout = &config.layout;
        let mut comb = Self::new();

        for row in 0..layout.rows {
            for col in 0..layout.cols {
                // Odd rows shift half a pitch to interlock the hexagons
                let x = col as f32 * layout.cell_pitch
                    + (row % 2) as f32 * (layout.cell_pitch / 2.0);
                let y = row as f32 * layout.cell_height + layout.top_margin;

                let roll = random.between(0, 99) as u32;
                let kind = if roll < layout.honey_percent {
                    CellKind::Honey
                } else if roll < layout.honey_percent + layout.nectar_percent {
                    CellKind::Nectar
                } else if roll < layout.honey_percent + layout.nectar_percent + layout.water_percent
                {
                    CellKind::Water
                } else {
                    CellKind::Brood
                };

                comb.push_cell(kind, Vec2::new(x, y), config.capacity_of(kind), false);
            }
        }

        comb
    }

    /// Add an active, empty cell
    pub fn add_cell(&mut self, kind: CellKind, position: Vec2, config: &ColonyConfig) -> CellId {
        self.push_cell(kind, position, config.capacity_of(kind), true)
    }

    fn push_cell(&mut self, kind: CellKind, position: Vec2, capacity: u32, active: bool) -> CellId {
        let id = CellId(self.cells.len() as u32);
        self.cells.push(Cell::new(id, kind, position, capacity, active));
        id
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.0 as usize)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter().filter(|c| c.is_active())
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn position(&self, id: CellId) -> Result<Vec2> {
        self.cell(id)
            .map(|c| c.position)
            .ok_or(ColonyError::CellNotFound(id))
    }

    /// Make an inactive cell usable. Returns false if it was already active.
    pub fn activate(&mut self, id: CellId) -> Result<bool> {
        let cell = self
            .cells
            .get_mut(id.0 as usize)
            .ok_or(ColonyError::CellNotFound(id))?;
        let changed = cell.activate();
        self.refresh_ledger();
        Ok(changed)
    }

    /// Activate up to `count` random inactive cells of `kind`
    pub fn activate_random(
        &mut self,
        kind: CellKind,
        count: usize,
        random: &mut dyn RandomSource,
    ) -> Vec<CellId> {
        let mut candidates: Vec<CellId> = self
            .cells
            .iter()
            .filter(|c| c.kind == kind && !c.is_active())
            .map(|c| c.id)
            .collect();

        let mut activated = Vec::new();
        while activated.len() < count && !candidates.is_empty() {
            let idx = random.pick(candidates.len()).min(candidates.len() - 1);
            let id = candidates.swap_remove(idx);
            if let Some(cell) = self.cells.get_mut(id.0 as usize) {
                cell.activate();
                activated.push(id);
            }
        }

        self.refresh_ledger();
        activated
    }

    // === ELIGIBILITY (unlocked reads) ===

    /// Active, unclaimed cells of `kind` holding something
    pub fn available(&self, kind: CellKind) -> Vec<CellId> {
        self.cells
            .iter()
            .filter(|c| c.has_available(kind))
            .map(|c| c.id)
            .collect()
    }

    /// Active, unclaimed cells of `kind` with room left
    pub fn unfilled(&self, kind: CellKind) -> Vec<CellId> {
        self.iter_active()
            .filter(|c| c.kind == kind && !c.is_locked() && !c.is_full())
            .map(|c| c.id)
            .collect()
    }

    /// Active, unclaimed cells of `kind`, full or not
    pub fn unclaimed(&self, kind: CellKind) -> Vec<CellId> {
        self.iter_active()
            .filter(|c| c.kind == kind && !c.is_locked())
            .map(|c| c.id)
            .collect()
    }

    /// Brood cells waiting to be fed
    pub fn awaiting_brood(&self) -> Vec<CellId> {
        self.cells
            .iter()
            .filter(|c| c.is_awaiting_food())
            .map(|c| c.id)
            .collect()
    }

    // === CLAIMS ===

    pub fn try_claim(&mut self, id: CellId, claimant: Claimant) -> Result<Claim<CellId>> {
        let cell = self
            .cells
            .get_mut(id.0 as usize)
            .ok_or(ColonyError::CellNotFound(id))?;

        if !cell.is_active() {
            return Err(ColonyError::InvalidTarget(format!("cell {:?} is not active", id)));
        }
        if cell.is_locked() {
            return Err(ColonyError::LockConflict(id));
        }

        cell.set_holder(Some(claimant));
        Ok(Claim::new(id, claimant))
    }

    pub fn release(&mut self, claim: Claim<CellId>) {
        let id = claim.target();
        match self.cells.get_mut(id.0 as usize) {
            Some(cell) if cell.holder() == Some(claim.holder()) => cell.set_holder(None),
            Some(_) => tracing::warn!(cell = ?id, "released a claim the cell does not record"),
            None => tracing::warn!(cell = ?id, "released a claim on an unknown cell"),
        }
    }

    pub fn release_all(&mut self, claims: impl IntoIterator<Item = Claim<CellId>>) {
        for claim in claims {
            self.release(claim);
        }
    }

    /// Claim `id`, run `f`, and release again whatever `f` returns
    pub fn scoped<R>(
        &mut self,
        id: CellId,
        claimant: Claimant,
        f: impl FnOnce(&mut Comb, &Claim<CellId>) -> R,
    ) -> Result<R> {
        let claim = self.try_claim(id, claimant)?;
        let out = f(self, &claim);
        self.release(claim);
        Ok(out)
    }

    // === MUTATIONS (claim required) ===

    /// Remove up to `amount`; returns what was removed
    pub fn withdraw(&mut self, claim: &Claim<CellId>, amount: u32) -> Result<u32> {
        let cell = self.held_cell(claim)?;
        let removed = cell.take(amount);
        if removed < amount {
            tracing::trace!(cell = ?cell.id, wanted = amount, removed, "withdraw clamped at empty");
        }
        self.refresh_ledger();
        Ok(removed)
    }

    /// Add up to `amount`, clamped to capacity; returns what was stored
    pub fn deposit(&mut self, claim: &Claim<CellId>, amount: u32) -> Result<u32> {
        let cell = self.held_cell(claim)?;
        let room = cell.room();
        let added = cell.add(amount);
        if added < amount {
            let clamp = ColonyError::CapacityExceeded {
                cell: cell.id,
                requested: amount,
                available: room,
            };
            tracing::debug!(%clamp, "deposit clamped");
        }
        self.refresh_ledger();
        Ok(added)
    }

    /// Deliver honey to a brood cell and arm its digestion timer.
    ///
    /// Returns whether a timer was armed (false if one was already pending).
    pub fn feed_brood(&mut self, claim: &Claim<CellId>, honey: u32, nutrient_ms: f32) -> Result<bool> {
        let cell = self.held_cell(claim)?;
        let id = cell.id;
        let brood = cell
            .brood_mut()
            .ok_or_else(|| ColonyError::InvalidTarget(format!("cell {:?} holds no brood", id)))?;
        brood.feed(honey);
        Ok(brood.start_consumption(nutrient_ms))
    }

    /// Advance a larva one stage by hand (player nudge or founding).
    ///
    /// Returns `Ok(None)` while digestion is pending.
    pub fn advance_brood(&mut self, id: CellId, max_stage: u8) -> Result<Option<StageAdvance>> {
        let cell = self
            .cells
            .get_mut(id.0 as usize)
            .ok_or(ColonyError::CellNotFound(id))?;
        if cell.is_locked() {
            return Err(ColonyError::LockConflict(id));
        }
        let brood = cell
            .brood_mut()
            .ok_or_else(|| ColonyError::InvalidTarget(format!("cell {:?} holds no brood", id)))?;
        Ok(brood.progress_stage(max_stage))
    }

    /// Run every digestion timer; returns the advances that happened
    pub fn tick_brood(&mut self, dt_ms: f32, max_stage: u8) -> Vec<(CellId, StageAdvance)> {
        let mut advances = Vec::new();
        for cell in self.cells.iter_mut().filter(|c| c.is_active()) {
            let id = cell.id;
            if let Some(advance) = cell.brood_mut().and_then(|b| b.tick(dt_ms, max_stage)) {
                advances.push((id, advance));
            }
        }
        advances
    }

    /// Player deposit: add `unit` to the first eligible cell of `kind`.
    ///
    /// Returns the cell and amount stored, or `None` when every cell is full
    /// or claimed.
    pub fn player_deposit(&mut self, kind: CellKind, unit: u32) -> Option<(CellId, u32)> {
        let target = *self.unfilled(kind).first()?;
        self.scoped(target, Claimant::Keeper, |comb, claim| comb.deposit(claim, unit))
            .ok()
            .and_then(|stored| stored.ok())
            .map(|stored| (target, stored))
    }

    /// Put `amount` into an unclaimed cell, clamped to capacity
    pub fn fill(&mut self, id: CellId, amount: u32) -> Result<u32> {
        self.scoped(id, Claimant::Keeper, |comb, claim| comb.deposit(claim, amount))?
    }

    fn held_cell(&mut self, claim: &Claim<CellId>) -> Result<&mut Cell> {
        let id = claim.target();
        let cell = self
            .cells
            .get_mut(id.0 as usize)
            .ok_or(ColonyError::CellNotFound(id))?;
        if cell.holder() != Some(claim.holder()) {
            return Err(ColonyError::LockConflict(id));
        }
        Ok(cell)
    }

    fn refresh_ledger(&mut self) {
        self.ledger = Ledger::tally(&self.cells);
    }
}
