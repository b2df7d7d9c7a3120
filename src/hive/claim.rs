//! Exclusive claims on cells and flower sources
//!
//! A claim is the only way to mutate a cell. Claims are neither `Clone` nor
//! `Copy`, so a holder cannot duplicate one, and the only way to drop the
//! lock is to hand the claim back to the owner that issued it.

use serde::{Deserialize, Serialize};

use crate::core::types::AgentId;

/// Who holds a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Claimant {
    Agent(AgentId),
    /// The player acting on the hive directly
    Keeper,
}

#[must_use = "a claim must be handed back to release its lock"]
#[derive(Debug, PartialEq, Eq)]
pub struct Claim<K> {
    target: K,
    holder: Claimant,
}

impl<K: Copy> Claim<K> {
    pub(crate) fn new(target: K, holder: Claimant) -> Self {
        Self { target, holder }
    }

    pub fn target(&self) -> K {
        self.target
    }

    pub fn holder(&self) -> Claimant {
        self.holder
    }
}
