//! Agents: worker and forager bees
//!
//! An agent carries energy and a small load, and a role payload holding its
//! in-flight work. The activity shown to the outside is derived from that
//! payload, so an agent is always in exactly one activity.

use serde::{Deserialize, Serialize};

use crate::core::config::CarryLimits;
use crate::core::types::{AgentId, CellId, Resource, Role, SourceId, StepToken, Vec2};
use crate::entity::tasks::{Stage, Task, Transaction};
use crate::hive::claim::Claim;

/// What an agent is doing, as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    Idle,
    Traveling,
    Transacting,
    Eating,
}

/// Resources currently carried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carried {
    pub nectar: u32,
    pub water: u32,
    pub honey: u32,
}

impl Carried {
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Nectar => self.nectar,
            Resource::Water => self.water,
            Resource::Honey => self.honey,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Nectar => &mut self.nectar,
            Resource::Water => &mut self.water,
            Resource::Honey => &mut self.honey,
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkerState {
    pub transaction: Option<Transaction>,
}

/// Forager state machine: Wandering -> Pursuing -> Collecting -> Returning -> AtBase
#[derive(Debug)]
pub enum ForagePhase {
    Wandering { turn_in_ms: f32 },
    Pursuing { claim: Claim<SourceId>, token: StepToken },
    Collecting { claim: Claim<SourceId>, remaining_ms: f32 },
    Returning { token: StepToken },
    /// Inside the hive, waiting for the deposit sequence to finish
    AtBase,
}

#[derive(Debug)]
pub struct ForagerState {
    pub phase: ForagePhase,
    /// Wandering velocity in units per second
    pub velocity: Vec2,
    pub visible: bool,
}

#[derive(Debug)]
pub enum RoleState {
    Worker(WorkerState),
    Forager(ForagerState),
}

#[derive(Debug)]
pub struct Agent {
    pub id: AgentId,
    pub role_state: RoleState,
    pub energy: f32,
    pub max_energy: f32,
    pub carried: Carried,
    pub position: Vec2,
    /// Set while a travel request is outstanding
    pub destination: Option<Vec2>,
    journey: u32,
}

impl Agent {
    pub fn new_worker(id: AgentId, position: Vec2, max_energy: f32) -> Self {
        Self::with_role(id, RoleState::Worker(WorkerState::default()), position, max_energy)
    }

    pub fn new_forager(id: AgentId, position: Vec2, max_energy: f32) -> Self {
        let state = ForagerState {
            phase: ForagePhase::Wandering { turn_in_ms: 0.0 },
            velocity: Vec2::default(),
            visible: true,
        };
        Self::with_role(id, RoleState::Forager(state), position, max_energy)
    }

    fn with_role(id: AgentId, role_state: RoleState, position: Vec2, max_energy: f32) -> Self {
        Self {
            id,
            role_state,
            energy: max_energy,
            max_energy,
            carried: Carried::default(),
            position,
            destination: None,
            journey: 0,
        }
    }

    pub fn role(&self) -> Role {
        match self.role_state {
            RoleState::Worker(_) => Role::Worker,
            RoleState::Forager(_) => Role::Forager,
        }
    }

    pub fn activity(&self) -> Activity {
        match &self.role_state {
            RoleState::Worker(worker) => match &worker.transaction {
                None => Activity::Idle,
                Some(tx) if tx.task == Task::Eat => Activity::Eating,
                Some(tx) => match tx.stage {
                    Stage::EnRoute { .. } => Activity::Traveling,
                    Stage::Maturing { .. } => Activity::Transacting,
                },
            },
            RoleState::Forager(forager) => match forager.phase {
                ForagePhase::Wandering { .. } => Activity::Idle,
                ForagePhase::Pursuing { .. } | ForagePhase::Returning { .. } => Activity::Traveling,
                ForagePhase::Collecting { .. } | ForagePhase::AtBase => Activity::Transacting,
            },
        }
    }

    pub fn is_idle(&self) -> bool {
        self.activity() == Activity::Idle
    }

    pub fn worker(&self) -> Option<&WorkerState> {
        match &self.role_state {
            RoleState::Worker(worker) => Some(worker),
            RoleState::Forager(_) => None,
        }
    }

    pub fn worker_mut(&mut self) -> Option<&mut WorkerState> {
        match &mut self.role_state {
            RoleState::Worker(worker) => Some(worker),
            RoleState::Forager(_) => None,
        }
    }

    pub fn forager(&self) -> Option<&ForagerState> {
        match &self.role_state {
            RoleState::Forager(forager) => Some(forager),
            RoleState::Worker(_) => None,
        }
    }

    pub fn forager_mut(&mut self) -> Option<&mut ForagerState> {
        match &mut self.role_state {
            RoleState::Forager(forager) => Some(forager),
            RoleState::Worker(_) => None,
        }
    }

    /// The task in progress, if this is a busy worker
    pub fn current_task(&self) -> Option<Task> {
        self.worker()
            .and_then(|w| w.transaction.as_ref())
            .map(|tx| tx.task)
    }

    /// Lose energy, never below zero. Returns true if the agent is now expired.
    pub fn drain(&mut self, amount: f32) -> bool {
        self.energy = (self.energy - amount).max(0.0);
        self.is_expired()
    }

    pub fn restore(&mut self, amount: f32) {
        self.energy = (self.energy + amount).min(self.max_energy);
    }

    pub fn is_expired(&self) -> bool {
        self.energy <= 0.0
    }

    /// Pick up to `amount` of a resource; returns what fit under the limits
    pub fn load(&mut self, resource: Resource, amount: u32, limits: &CarryLimits) -> u32 {
        let limit = limits.of(resource);
        let slot = self.carried.slot(resource);
        let taken = amount.min(limit.saturating_sub(*slot));
        *slot += taken;
        taken
    }

    /// Empty one resource slot, returning what was carried
    pub fn unload(&mut self, resource: Resource) -> u32 {
        std::mem::take(self.carried.slot(resource))
    }

    /// Mint the token for a new travel request
    pub fn next_token(&mut self) -> StepToken {
        self.journey = self.journey.wrapping_add(1);
        StepToken(self.journey)
    }

    /// Strip every claim from a dying agent and stop its work
    pub fn surrender_claims(&mut self) -> (Vec<Claim<CellId>>, Option<Claim<SourceId>>) {
        self.destination = None;
        match &mut self.role_state {
            RoleState::Worker(worker) => {
                let cells = worker
                    .transaction
                    .take()
                    .map(Transaction::into_claims)
                    .unwrap_or_default();
                (cells, None)
            }
            RoleState::Forager(forager) => {
                let phase = std::mem::replace(&mut forager.phase, ForagePhase::AtBase);
                let source = match phase {
                    ForagePhase::Pursuing { claim, .. } | ForagePhase::Collecting { claim, .. } => {
                        Some(claim)
                    }
                    _ => None,
                };
                (Vec::new(), source)
            }
        }
    }
}
