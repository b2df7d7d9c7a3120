//! Worker tasks and the transactions that carry them out
//!
//! A task is what the scheduler decides; an errand is the concrete step the
//! worker is on; a transaction ties them to the claims held while the step
//! runs. Transactions own their claims, so dropping a worker's transaction
//! without handing the claims back is impossible to do by accident.

use serde::{Deserialize, Serialize};

use crate::core::types::{CellId, Resource, StepToken};
use crate::hive::claim::Claim;

/// Tasks in scheduler priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    Eat,
    FeedLarvae,
    MakeHoney,
    Idle,
}

/// The step a worker is currently carrying out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Errand {
    /// Eat from a honey cell
    Eat { honey: CellId },
    /// Gather nectar or water for honey making
    Collect { cell: CellId, resource: Resource },
    /// Let carried nectar and water mature into honey in this cell
    StoreHoney { cell: CellId },
    /// Pick up honey for a larva; the brood cell is held so nobody else feeds it
    FetchHoney { honey: CellId, brood: CellId },
    /// Deliver carried honey to a larva
    FeedBrood { brood: CellId },
}

impl Errand {
    /// The cell the worker travels to
    pub fn destination(&self) -> CellId {
        match *self {
            Errand::Eat { honey } => honey,
            Errand::Collect { cell, .. } => cell,
            Errand::StoreHoney { cell } => cell,
            Errand::FetchHoney { honey, .. } => honey,
            Errand::FeedBrood { brood } => brood,
        }
    }
}

/// Where in its errand a transaction is suspended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Stage {
    /// Waiting for the arrival carrying this token
    EnRoute { token: StepToken },
    /// Waiting for honey to mature
    Maturing { remaining_ms: f32 },
}

/// A worker's in-flight task
#[derive(Debug)]
pub struct Transaction {
    pub task: Task,
    pub errand: Errand,
    pub stage: Stage,
    claims: Vec<Claim<CellId>>,
}

impl Transaction {
    pub fn new(task: Task, errand: Errand, token: StepToken, claims: Vec<Claim<CellId>>) -> Self {
        Self {
            task,
            errand,
            stage: Stage::EnRoute { token },
            claims,
        }
    }

    pub fn awaits(&self, token: StepToken) -> bool {
        matches!(self.stage, Stage::EnRoute { token: t } if t == token)
    }

    pub fn is_en_route(&self) -> bool {
        matches!(self.stage, Stage::EnRoute { .. })
    }

    /// The claim held on `cell`, if any
    pub fn claim_on(&self, cell: CellId) -> Option<&Claim<CellId>> {
        self.claims.iter().find(|c| c.target() == cell)
    }

    pub fn held_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.claims.iter().map(|c| c.target())
    }

    /// Give up every claim, for handing back to the comb
    pub fn into_claims(self) -> Vec<Claim<CellId>> {
        self.claims
    }
}
