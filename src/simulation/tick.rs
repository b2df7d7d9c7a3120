//! Tick system - advances the colony one step
//!
//! Each tick runs, in order:
//! energy decay and reaping -> brood timers -> autopilot arrivals and
//! deposits -> worker timers -> field upkeep -> foraging -> task scheduling
//! -> spawning.
//!
//! The tick is infallible. Conflicts and stale targets are recovered where
//! they happen and show up as events.

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::core::types::{AgentId, CellId, CellKind, Resource, Role, SourceId, StepToken, Vec2};
use crate::entity::tasks::Task;
use crate::simulation::action_select::{choose_task, Census};
use crate::simulation::brood_growth;
use crate::simulation::colony::Colony;
use crate::simulation::foraging::{self, ForageContext};
use crate::simulation::locomotion::Locomotion;
use crate::simulation::task_execute::{self, TaskContext};
use crate::world::field::FieldChange;

/// Events produced during a tick, in the order they happened
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum ColonyEvent {
    /// The presentation layer (or autopilot) should move `agent` to `target`
    /// and answer with an arrival carrying `token`
    TravelRequested {
        agent: AgentId,
        token: StepToken,
        target: Vec2,
    },
    BroodStageAdvanced {
        cell: CellId,
        stage: u8,
    },
    /// A larva hatched; the colony spawns the new agent in the same tick
    AgentSpawnRequested {
        origin: CellId,
    },
    ResourceDeposited {
        cell: CellId,
        resource: Resource,
        amount: u32,
    },
    ResourceWithdrawn {
        cell: CellId,
        resource: Resource,
        amount: u32,
    },
    /// A forager entered the hive; the deposit sequence should start
    AgentReturnedToBase {
        agent: AgentId,
    },
    TaskAssigned {
        agent: AgentId,
        task: Task,
    },
    TaskCompleted {
        agent: AgentId,
        task: Task,
    },
    TaskAbandoned {
        agent: AgentId,
        task: Task,
        reason: String,
    },
    BroodFed {
        cell: CellId,
        honey: u32,
    },
    AgentSpawned {
        agent: AgentId,
        role: Role,
        /// Hatching cell; `None` for agents placed when the colony was founded
        origin: Option<CellId>,
    },
    AgentExpired {
        agent: AgentId,
        role: Role,
    },
    SourceSpawned {
        source: SourceId,
        position: Vec2,
    },
    SourceClaimed {
        source: SourceId,
        agent: AgentId,
    },
    NectarGathered {
        agent: AgentId,
        source: SourceId,
        nectar: u32,
        water: u32,
    },
    SourceConsumed {
        source: SourceId,
        agent: AgentId,
    },
    SourceExpired {
        source: SourceId,
    },
    /// A forager let go of a flower it could not collect from
    ForagerReleased {
        agent: AgentId,
        source: SourceId,
    },
    CellActivated {
        cell: CellId,
        kind: CellKind,
    },
}

/// Run a single colony tick of `dt_ms` milliseconds
pub fn run_colony_tick(colony: &mut Colony, dt_ms: f32) -> Vec<ColonyEvent> {
    let dt_ms = dt_ms.max(0.0);
    colony.current_tick += 1;
    colony.elapsed_ms += f64::from(dt_ms);

    // Signals delivered since the last tick come first
    let mut events = std::mem::take(&mut colony.pending);

    reap_exhausted(colony, dt_ms, &mut events);
    let hatched = brood_growth::run_brood_timers(&mut colony.comb, dt_ms, &colony.config, &mut events);
    run_autopilot(colony, dt_ms, &mut events);
    run_worker_timers(colony, dt_ms, &mut events);
    tend_field(colony, dt_ms, &mut events);
    run_foragers(colony, dt_ms, &mut events);
    schedule_workers(colony, &mut events);

    for origin in hatched {
        colony.hatch(origin, &mut events);
    }

    colony
        .locomotion
        .observe(&events, &colony.population, &colony.config);

    trace!(tick = colony.current_tick, events = events.len(), "tick complete");
    events
}

/// Drain energy and remove agents that ran out, releasing everything they held
fn reap_exhausted(colony: &mut Colony, dt_ms: f32, events: &mut Vec<ColonyEvent>) {
    let seconds = dt_ms / 1000.0;
    let mut expired = Vec::new();

    for agent in colony.population.iter_mut() {
        let decay = colony.config.energy_decay(agent.role()) * seconds;
        if agent.drain(decay) {
            expired.push(agent.id);
        }
    }

    for id in expired {
        let Some(mut agent) = colony.population.remove(id) else {
            continue;
        };
        let role = agent.role();
        // Maturation is committed work: the honey lands even without the worker
        if let Some(batch) = task_execute::detach_maturation(&mut colony.comb, &mut agent) {
            debug!(
                agent = ?id,
                cell = ?batch.cell,
                batch = batch.batch,
                "maturing honey left to the keeper"
            );
            colony.maturing.push(batch);
        }
        let (cells, source) = agent.surrender_claims();
        colony.comb.release_all(cells);
        if let Some(claim) = source {
            colony.field.release(claim);
        }

        info!(agent = ?id, ?role, "agent expired");
        events.push(ColonyEvent::AgentExpired { agent: id, role });
    }
}

fn run_autopilot(colony: &mut Colony, dt_ms: f32, events: &mut Vec<ColonyEvent>) {
    let due = match &mut colony.locomotion {
        Locomotion::Autopilot(pilot) => pilot.advance(dt_ms),
        Locomotion::External => return,
    };

    for (agent, token) in due.arrivals {
        if let Err(err) = colony.route_arrival(agent, token, events) {
            debug!(?agent, %err, "arrival dropped");
        }
    }
    for agent in due.deposits {
        if let Err(err) = colony.route_deposit(agent, events) {
            debug!(?agent, %err, "deposit dropped");
        }
    }
}

fn run_worker_timers(colony: &mut Colony, dt_ms: f32, events: &mut Vec<ColonyEvent>) {
    let Colony {
        comb,
        config,
        random,
        population,
        maturing,
        ..
    } = colony;

    let mut ctx = TaskContext {
        comb,
        config,
        random: random.as_mut(),
        events,
    };
    for agent in population.iter_mut() {
        task_execute::advance_timers(&mut ctx, agent, dt_ms);
    }
    task_execute::advance_batches(&mut ctx, maturing, dt_ms);
}

fn tend_field(colony: &mut Colony, dt_ms: f32, events: &mut Vec<ColonyEvent>) {
    let changes = colony
        .field
        .tick(dt_ms, &colony.config.field, colony.random.as_mut());

    for change in changes {
        match change {
            FieldChange::Spawned { source, position } => {
                trace!(?source, "flower bloomed");
                events.push(ColonyEvent::SourceSpawned { source, position });
            }
            FieldChange::Expired { source } => {
                trace!(?source, "flower withered");
                events.push(ColonyEvent::SourceExpired { source });
            }
        }
    }
}

fn run_foragers(colony: &mut Colony, dt_ms: f32, events: &mut Vec<ColonyEvent>) {
    let Colony {
        comb,
        field,
        config,
        random,
        population,
        ..
    } = colony;

    let mut ctx = ForageContext {
        field,
        comb,
        config,
        random: random.as_mut(),
        events,
    };
    for agent in population.iter_mut().filter(|a| a.role() == Role::Forager) {
        foraging::step_forager(&mut ctx, agent, dt_ms);
    }
}

/// Give every idle worker a task, in registry order
fn schedule_workers(colony: &mut Colony, events: &mut Vec<ColonyEvent>) {
    let Colony {
        comb,
        config,
        random,
        population,
        ..
    } = colony;

    let idle: Vec<AgentId> = population
        .iter()
        .filter(|a| a.role() == Role::Worker && a.is_idle() && !a.is_expired())
        .map(|a| a.id)
        .collect();

    for id in idle {
        // Earlier workers' claims change what is available
        let census = Census::take(comb, population);
        let Some(agent) = population.get_mut(id) else {
            continue;
        };

        let task = choose_task(agent, &census, config);
        if task == Task::Idle {
            continue;
        }

        let mut ctx = TaskContext {
            comb: &mut *comb,
            config: &*config,
            random: random.as_mut(),
            events: &mut *events,
        };
        task_execute::begin_task(&mut ctx, agent, task);
    }
}

impl ColonyEvent {
    /// Variant name, as used for the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            ColonyEvent::TravelRequested { .. } => "TravelRequested",
            ColonyEvent::BroodStageAdvanced { .. } => "BroodStageAdvanced",
            ColonyEvent::AgentSpawnRequested { .. } => "AgentSpawnRequested",
            ColonyEvent::ResourceDeposited { .. } => "ResourceDeposited",
            ColonyEvent::ResourceWithdrawn { .. } => "ResourceWithdrawn",
            ColonyEvent::AgentReturnedToBase { .. } => "AgentReturnedToBase",
            ColonyEvent::TaskAssigned { .. } => "TaskAssigned",
            ColonyEvent::TaskCompleted { .. } => "TaskCompleted",
            ColonyEvent::TaskAbandoned { .. } => "TaskAbandoned",
            ColonyEvent::BroodFed { .. } => "BroodFed",
            ColonyEvent::AgentSpawned { .. } => "AgentSpawned",
            ColonyEvent::AgentExpired { .. } => "AgentExpired",
            ColonyEvent::SourceSpawned { .. } => "SourceSpawned",
            ColonyEvent::SourceClaimed { .. } => "SourceClaimed",
            ColonyEvent::NectarGathered { .. } => "NectarGathered",
            ColonyEvent::SourceConsumed { .. } => "SourceConsumed",
            ColonyEvent::SourceExpired { .. } => "SourceExpired",
            ColonyEvent::ForagerReleased { .. } => "ForagerReleased",
            ColonyEvent::CellActivated { .. } => "CellActivated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ColonyConfig;
    use crate::core::random::FirstPick;

    #[test]
    fn test_events_serialize_with_tag() {
        let event = ColonyEvent::BroodFed {
            cell: CellId(4),
            honey: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.kind());
        assert_eq!(json["honey"], 2);
    }

    #[test]
    fn test_tick_counts_and_clock() {
        let mut colony =
            Colony::new(ColonyConfig::default(), Box::new(FirstPick), Locomotion::External).unwrap();
        colony.tick(16.0);
        colony.tick(-5.0);
        assert_eq!(colony.current_tick(), 2);
        assert!((colony.elapsed_ms() - 16.0).abs() < 1e-9, "negative deltas count as zero");
    }

    #[test]
    fn test_starved_worker_is_reaped() {
        let mut colony =
            Colony::new(ColonyConfig::default(), Box::new(FirstPick), Locomotion::External).unwrap();
        let id = colony.place(Role::Worker, Vec2::default());
        if let Some(agent) = colony.population_mut().get_mut(id) {
            agent.energy = 0.05;
        }

        let events = colony.tick(1000.0);
        assert!(events.contains(&ColonyEvent::AgentExpired {
            agent: id,
            role: Role::Worker
        }));
        assert!(colony.population().is_empty());
    }
}
