//! Task selection for idle workers
//!
//! Selection is a pure function of the worker, a census of the colony and the
//! configuration, so identical states always yield identical tasks. The
//! census is retaken for every idle worker because the claims made by earlier
//! workers in the same tick change what is available.

use crate::core::config::ColonyConfig;
use crate::core::types::{CellKind, Role};
use crate::entity::agent::Agent;
use crate::entity::tasks::Task;
use crate::hive::comb::Comb;
use crate::simulation::population::Population;

/// Colony state the scheduler decides on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    /// An active, unclaimed honey cell holds honey
    pub honey_available: bool,
    /// Brood cells waiting to be fed
    pub awaiting_brood: usize,
    /// Workers currently carrying honey
    pub honey_carriers: usize,
    /// Some active, unclaimed nectar or water cell is non-empty
    pub raw_stock: bool,
}

impl Census {
    pub fn take(comb: &Comb, population: &Population) -> Self {
        Self {
            honey_available: !comb.available(CellKind::Honey).is_empty(),
            awaiting_brood: comb.awaiting_brood().len(),
            honey_carriers: population
                .iter()
                .filter(|a| a.role() == Role::Worker && a.carried.honey > 0)
                .count(),
            raw_stock: !comb.available(CellKind::Nectar).is_empty()
                || !comb.available(CellKind::Water).is_empty(),
        }
    }
}

/// Pick the next task for an idle worker, in priority order
pub fn choose_task(agent: &Agent, census: &Census, config: &ColonyConfig) -> Task {
    // Hunger comes first
    if agent.energy <= config.hunger_line() && census.honey_available {
        return Task::Eat;
    }

    // Feed larvae unless enough honey is already on its way to them
    if census.awaiting_brood > 0
        && census.honey_available
        && (census.honey_carriers < census.awaiting_brood || agent.carried.honey > 0)
    {
        return Task::FeedLarvae;
    }

    if census.raw_stock {
        return Task::MakeHoney;
    }

    Task::Idle
}
