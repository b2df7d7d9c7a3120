//! The colony session: owns the comb, the field, the population and the
//! random source, and exposes the tick and every inbound signal
//!
//! Events produced by signals between ticks are queued and handed out at the
//! start of the next tick's events.

use serde::Serialize;
use tracing::{debug, info};

use crate::core::config::ColonyConfig;
use crate::core::error::{ColonyError, Result};
use crate::core::random::{RandomSource, SeededRandom};
use crate::core::types::{AgentId, CellId, CellKind, Role, SourceId, StepToken, Tick, Vec2};
use crate::entity::agent::Activity;
use crate::hive::cell::Cell;
use crate::hive::comb::Comb;
use crate::hive::ledger::Ledger;
use crate::simulation::brood_growth;
use crate::simulation::foraging::{self, ForageContext};
use crate::simulation::locomotion::Locomotion;
use crate::simulation::population::Population;
use crate::simulation::task_execute::{self, MaturingBatch, TaskContext};
use crate::simulation::tick::{run_colony_tick, ColonyEvent};
use crate::world::field::Field;

pub struct Colony {
    pub(crate) config: ColonyConfig,
    pub(crate) comb: Comb,
    pub(crate) field: Field,
    pub(crate) population: Population,
    pub(crate) random: Box<dyn RandomSource>,
    pub(crate) locomotion: Locomotion,
    pub(crate) pending: Vec<ColonyEvent>,
    /// Honey still maturing after its worker died
    pub(crate) maturing: Vec<MaturingBatch>,
    pub(crate) current_tick: Tick,
    pub(crate) elapsed_ms: f64,
}

impl Colony {
    /// An empty colony: no cells, no agents, no flowers
    pub fn new(
        config: ColonyConfig,
        random: Box<dyn RandomSource>,
        locomotion: Locomotion,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            field: Field::new(&config.field),
            config,
            comb: Comb::new(),
            population: Population::new(),
            random,
            locomotion,
            pending: Vec::new(),
            maturing: Vec::new(),
            current_tick: 0,
            elapsed_ms: 0.0,
        })
    }

    pub fn with_seed(config: ColonyConfig, seed: u64, locomotion: Locomotion) -> Result<Self> {
        Self::new(config, Box::new(SeededRandom::new(seed)), locomotion)
    }

    /// A freshly founded hive: a generated comb with a few cells of each kind
    /// active, the founding workers and foragers, and one larva per founding
    /// worker nudged to stage 1.
    pub fn found(
        config: ColonyConfig,
        random: Box<dyn RandomSource>,
        locomotion: Locomotion,
    ) -> Result<Self> {
        let mut colony = Self::new(config, random, locomotion)?;
        colony.comb = Comb::generate(&colony.config, colony.random.as_mut());

        let per_kind = colony.config.layout.initial_active_per_kind;
        for kind in [CellKind::Honey, CellKind::Nectar, CellKind::Water, CellKind::Brood] {
            for cell in colony.comb.activate_random(kind, per_kind, colony.random.as_mut()) {
                colony.pending.push(ColonyEvent::CellActivated { cell, kind });
            }
        }

        for _ in 0..colony.config.layout.initial_workers {
            let home = colony.nudge_dormant_larva();
            let position = home
                .and_then(|cell| colony.comb.cell(cell))
                .map(|cell| cell.position + brood_growth::HATCH_OFFSET)
                .unwrap_or(Vec2::new(0.0, colony.config.layout.top_margin));
            colony.place(Role::Worker, position);
        }
        for _ in 0..colony.config.layout.initial_foragers {
            let base = colony.field.base();
            colony.place(Role::Forager, base);
        }

        info!(
            cells = colony.comb.cells().len(),
            active = colony.comb.iter_active().count(),
            agents = colony.population.len(),
            "colony founded"
        );
        Ok(colony)
    }

    /// Found a colony driven by the autopilot
    pub fn founded(config: ColonyConfig, seed: u64) -> Result<Self> {
        Self::found(config, Box::new(SeededRandom::new(seed)), Locomotion::autopilot())
    }

    /// Advance to stage 1 the first dormant larva, preferring active cells
    fn nudge_dormant_larva(&mut self) -> Option<CellId> {
        let is_dormant = |cell: &Cell| {
            !cell.is_locked() && cell.brood().is_some_and(|b| b.stage() == 0 && !b.timer_pending())
        };
        let cells = self.comb.cells();
        let target = cells
            .iter()
            .filter(|c| c.is_active())
            .find(|&c| is_dormant(c))
            .or_else(|| cells.iter().find(|&c| is_dormant(c)))
            .map(|c| c.id)?;

        let advance = self
            .comb
            .advance_brood(target, self.config.brood_max_stage)
            .ok()
            .flatten()?;
        self.pending.push(ColonyEvent::BroodStageAdvanced {
            cell: target,
            stage: advance.stage,
        });
        Some(target)
    }

    /// Put a new agent into the colony outside of hatching
    pub fn place(&mut self, role: Role, position: Vec2) -> AgentId {
        let agent = self.population.spawn(role, position, &self.config);
        self.pending.push(ColonyEvent::AgentSpawned {
            agent,
            role,
            origin: None,
        });
        agent
    }

    /// Advance the simulation by `dt_ms` milliseconds
    pub fn tick(&mut self, dt_ms: f32) -> Vec<ColonyEvent> {
        run_colony_tick(self, dt_ms)
    }

    // === INBOUND SIGNALS ===

    /// An agent reached the target of the travel request carrying `token`.
    ///
    /// Returns `Ok(false)` for a stale token.
    pub fn arrived(&mut self, agent: AgentId, token: StepToken) -> Result<bool> {
        let mut events = Vec::new();
        let outcome = self.route_arrival(agent, token, &mut events);
        self.pending.append(&mut events);
        outcome
    }

    /// The hive-side deposit sequence of a returned forager finished
    pub fn deposit_complete(&mut self, agent: AgentId) -> Result<bool> {
        let mut events = Vec::new();
        let outcome = self.route_deposit(agent, &mut events);
        self.pending.append(&mut events);
        outcome
    }

    /// The player adds one unit to the first cell of `kind` with room.
    ///
    /// A no-op when every such cell is full or claimed.
    pub fn player_deposit(&mut self, kind: CellKind) -> Option<CellId> {
        let Some(resource) = kind.resource() else {
            debug!(?kind, "player deposit ignored");
            return None;
        };

        let (cell, amount) = self.comb.player_deposit(kind, self.config.player_deposit_unit)?;
        self.pending.push(ColonyEvent::ResourceDeposited {
            cell,
            resource,
            amount,
        });
        Some(cell)
    }

    /// The player collects a flower: it disappears and one unit each of
    /// nectar and water goes into the comb
    pub fn harvest_source(&mut self, source: SourceId) -> Result<()> {
        self.field.harvest(source)?;
        self.player_deposit(CellKind::Nectar);
        self.player_deposit(CellKind::Water);
        Ok(())
    }

    /// The player nudges a larva one stage. Ignored while it is digesting.
    pub fn advance_brood(&mut self, cell: CellId) -> Result<Option<u8>> {
        let active = self
            .comb
            .cell(cell)
            .map(|c| c.is_active())
            .ok_or(ColonyError::CellNotFound(cell))?;
        if !active {
            return Err(ColonyError::InvalidTarget(format!("cell {:?} is not active", cell)));
        }

        let Some(advance) = self.comb.advance_brood(cell, self.config.brood_max_stage)? else {
            return Ok(None);
        };

        let mut events = vec![ColonyEvent::BroodStageAdvanced {
            cell,
            stage: advance.stage,
        }];
        if advance.hatched {
            events.push(ColonyEvent::AgentSpawnRequested { origin: cell });
            self.hatch(cell, &mut events);
        }
        self.pending.append(&mut events);
        Ok(Some(advance.stage))
    }

    /// The player opens an inactive cell. Returns false if it was already open.
    pub fn activate_cell(&mut self, cell: CellId) -> Result<bool> {
        let changed = self.comb.activate(cell)?;
        if changed {
            if let Some(kind) = self.comb.cell(cell).map(|c| c.kind) {
                self.pending.push(ColonyEvent::CellActivated { cell, kind });
            }
        }
        Ok(changed)
    }

    pub(crate) fn route_arrival(
        &mut self,
        id: AgentId,
        token: StepToken,
        events: &mut Vec<ColonyEvent>,
    ) -> Result<bool> {
        let Colony {
            comb,
            field,
            population,
            config,
            random,
            ..
        } = self;

        let agent = population.get_mut(id).ok_or(ColonyError::AgentNotFound(id))?;
        if agent.is_expired() {
            return Err(ColonyError::AgentExpired(id));
        }

        let resumed = match agent.role() {
            Role::Worker => {
                let mut ctx = TaskContext {
                    comb,
                    config,
                    random: random.as_mut(),
                    events,
                };
                task_execute::on_arrival(&mut ctx, agent, token)
            }
            Role::Forager => {
                let mut ctx = ForageContext {
                    field,
                    comb,
                    config,
                    random: random.as_mut(),
                    events,
                };
                foraging::on_arrival(&mut ctx, agent, token)
            }
        };
        Ok(resumed)
    }

    pub(crate) fn route_deposit(&mut self, id: AgentId, events: &mut Vec<ColonyEvent>) -> Result<bool> {
        let Colony {
            comb,
            field,
            population,
            config,
            random,
            ..
        } = self;

        let agent = population.get_mut(id).ok_or(ColonyError::AgentNotFound(id))?;
        let mut ctx = ForageContext {
            field,
            comb,
            config,
            random: random.as_mut(),
            events,
        };
        Ok(foraging::complete_deposit(&mut ctx, agent))
    }

    pub(crate) fn hatch(&mut self, origin: CellId, events: &mut Vec<ColonyEvent>) -> AgentId {
        brood_growth::spawn_hatchling(
            &mut self.population,
            &self.comb,
            &self.field,
            &self.config,
            self.random.as_mut(),
            origin,
            events,
        )
    }

    // === ACCESSORS ===

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn comb(&self) -> &Comb {
        &self.comb
    }

    /// Direct comb access for setting up scenarios
    pub fn comb_mut(&mut self) -> &mut Comb {
        &mut self.comb
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut Field {
        &mut self.field
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn locomotion(&self) -> &Locomotion {
        &self.locomotion
    }

    pub fn ledger(&self) -> &Ledger {
        self.comb.ledger()
    }

    /// Batches the keeper is seeing through for dead workers
    pub fn maturing_batches(&self) -> &[MaturingBatch] {
        &self.maturing
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn report(&self) -> ColonyReport {
        ColonyReport::collect(self)
    }
}

/// Snapshot of the colony for display and logging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColonyReport {
    pub tick: Tick,
    pub elapsed_secs: f64,
    pub workers: usize,
    pub foragers: usize,
    pub activity: ActivityCounts,
    pub ledger: Ledger,
    pub active_cells: usize,
    pub brood: BroodCounts,
    pub flowers: usize,
    pub claimed_flowers: usize,
    pub mean_energy: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityCounts {
    pub idle: usize,
    pub traveling: usize,
    pub transacting: usize,
    pub eating: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroodCounts {
    /// Active larvae past stage 0
    pub growing: usize,
    pub awaiting_food: usize,
    pub digesting: usize,
}

impl ColonyReport {
    fn collect(colony: &Colony) -> Self {
        let mut activity = ActivityCounts::default();
        let mut energy = 0.0;
        for agent in colony.population.iter() {
            energy += agent.energy;
            match agent.activity() {
                Activity::Idle => activity.idle += 1,
                Activity::Traveling => activity.traveling += 1,
                Activity::Transacting => activity.transacting += 1,
                Activity::Eating => activity.eating += 1,
            }
        }

        let mut brood = BroodCounts::default();
        for larva in colony.comb.iter_active().filter_map(|c| c.brood()) {
            if larva.stage() > 0 {
                brood.growing += 1;
            }
            if larva.is_awaiting_food() {
                brood.awaiting_food += 1;
            }
            if larva.timer_pending() {
                brood.digesting += 1;
            }
        }

        let agents = colony.population.len();
        Self {
            tick: colony.current_tick,
            elapsed_secs: colony.elapsed_ms / 1000.0,
            workers: colony.population.count(Role::Worker),
            foragers: colony.population.count(Role::Forager),
            activity,
            ledger: *colony.comb.ledger(),
            active_cells: colony.comb.iter_active().count(),
            brood,
            flowers: colony.field.sources().len(),
            claimed_flowers: colony.field.sources().iter().filter(|s| s.is_claimed()).count(),
            mean_energy: if agents == 0 { 0.0 } else { energy / agents as f32 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::FirstPick;

    fn bare_colony() -> Colony {
        Colony::new(ColonyConfig::default(), Box::new(FirstPick), Locomotion::External).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ColonyConfig::default();
        config.max_energy = 0.0;
        assert!(matches!(
            Colony::new(config, Box::new(FirstPick), Locomotion::External),
            Err(ColonyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_founding() {
        let colony = Colony::founded(ColonyConfig::default(), 7).unwrap();
        let layout = &colony.config().layout;

        assert_eq!(colony.population().count(Role::Worker), layout.initial_workers);
        assert_eq!(colony.population().count(Role::Forager), layout.initial_foragers);
        assert!(colony.locomotion().is_autopilot());
        assert!(colony.comb().iter_active().count() <= 4 * layout.initial_active_per_kind);
        assert_eq!(*colony.ledger(), Ledger::default());
    }

    #[test]
    fn test_signal_events_arrive_with_next_tick() {
        let mut colony = bare_colony();
        let config = colony.config().clone();
        let cell = colony.comb_mut().add_cell(CellKind::Water, Vec2::default(), &config);

        assert_eq!(colony.player_deposit(CellKind::Water), Some(cell));
        let events = colony.tick(16.0);
        assert_eq!(
            events.first(),
            Some(&ColonyEvent::ResourceDeposited {
                cell,
                resource: crate::core::types::Resource::Water,
                amount: 1
            })
        );
        assert!(colony.tick(16.0).is_empty());
    }

    #[test]
    fn test_player_deposit_on_brood_is_ignored() {
        let mut colony = bare_colony();
        let config = colony.config().clone();
        colony.comb_mut().add_cell(CellKind::Brood, Vec2::default(), &config);
        assert_eq!(colony.player_deposit(CellKind::Brood), None);
    }

    #[test]
    fn test_unknown_ids_are_reported() {
        let mut colony = bare_colony();
        assert_eq!(
            colony.arrived(AgentId(5), StepToken(1)),
            Err(ColonyError::AgentNotFound(AgentId(5)))
        );
        assert_eq!(
            colony.advance_brood(CellId(3)),
            Err(ColonyError::CellNotFound(CellId(3)))
        );
        assert_eq!(
            colony.harvest_source(SourceId(0)),
            Err(ColonyError::SourceNotFound(SourceId(0)))
        );
    }

    #[test]
    fn test_player_nudge_past_final_stage_hatches() {
        let mut colony = bare_colony();
        let config = colony.config().clone();
        let cell = colony.comb_mut().add_cell(CellKind::Brood, Vec2::default(), &config);

        for stage in 1..=config.brood_max_stage {
            assert_eq!(colony.advance_brood(cell), Ok(Some(stage)));
        }
        assert_eq!(colony.advance_brood(cell), Ok(Some(0)));
        assert_eq!(colony.population().len(), 1);
    }

    #[test]
    fn test_activate_cell_emits_once() {
        let mut colony = Colony::found(
            ColonyConfig::default(),
            Box::new(FirstPick),
            Locomotion::External,
        )
        .unwrap();
        let inactive = colony
            .comb()
            .cells()
            .iter()
            .find(|c| !c.is_active())
            .map(|c| c.id)
            .unwrap();

        assert_eq!(colony.activate_cell(inactive), Ok(true));
        assert_eq!(colony.activate_cell(inactive), Ok(false));
        let activations = colony
            .tick(0.0)
            .into_iter()
            .filter(|e| matches!(e, ColonyEvent::CellActivated { cell, .. } if *cell == inactive))
            .count();
        assert_eq!(activations, 1);
    }
}
