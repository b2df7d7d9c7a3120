//! Brood growth: digestion timers, stage advances and hatching
//!
//! A larva passing its final stage wraps back to an empty stage-0 cell and
//! raises exactly one spawn request. Hatchlings are workers or foragers by a
//! weighted coin flip.

use tracing::info;

use crate::core::config::ColonyConfig;
use crate::core::random::RandomSource;
use crate::core::types::{AgentId, CellId, Role, Vec2};
use crate::hive::comb::Comb;
use crate::simulation::population::Population;
use crate::simulation::tick::ColonyEvent;
use crate::world::field::Field;

/// Newborn workers appear this far from their cell's origin
pub(crate) const HATCH_OFFSET: Vec2 = Vec2 { x: 30.0, y: 30.0 };

/// Run every brood timer. Returns the cells that hatched.
pub fn run_brood_timers(
    comb: &mut Comb,
    dt_ms: f32,
    config: &ColonyConfig,
    events: &mut Vec<ColonyEvent>,
) -> Vec<CellId> {
    let mut hatched = Vec::new();
    for (cell, advance) in comb.tick_brood(dt_ms, config.brood_max_stage) {
        events.push(ColonyEvent::BroodStageAdvanced {
            cell,
            stage: advance.stage,
        });
        if advance.hatched {
            events.push(ColonyEvent::AgentSpawnRequested { origin: cell });
            hatched.push(cell);
        }
    }
    hatched
}

/// Create the agent a hatched cell asked for
pub fn spawn_hatchling(
    population: &mut Population,
    comb: &Comb,
    field: &Field,
    config: &ColonyConfig,
    random: &mut dyn RandomSource,
    origin: CellId,
    events: &mut Vec<ColonyEvent>,
) -> AgentId {
    let role = if random.unit() < config.worker_spawn_share {
        Role::Worker
    } else {
        Role::Forager
    };

    let position = match role {
        Role::Worker => comb
            .cell(origin)
            .map(|c| c.position + HATCH_OFFSET)
            .unwrap_or_else(|| field.base()),
        Role::Forager => field.base(),
    };

    let agent = population.spawn(role, position, config);
    info!(agent = ?agent, ?role, cell = ?origin, "bee hatched");
    events.push(ColonyEvent::AgentSpawned {
        agent,
        role,
        origin: Some(origin),
    });
    agent
}
