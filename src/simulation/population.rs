//! Population registry
//!
//! Agents live in a Vec kept in creation order, which is the order every
//! per-tick pass walks them in. An id index makes signal lookups cheap.

use ahash::AHashMap;

use crate::core::config::ColonyConfig;
use crate::core::types::{AgentId, Role, Vec2};
use crate::entity::agent::Agent;

#[derive(Debug, Default)]
pub struct Population {
    agents: Vec<Agent>,
    index: AHashMap<AgentId, usize>,
    next_id: u32,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an agent with full energy and a fresh id
    pub fn spawn(&mut self, role: Role, position: Vec2, config: &ColonyConfig) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;

        let agent = match role {
            Role::Worker => Agent::new_worker(id, position, config.max_energy),
            Role::Forager => Agent::new_forager(id, position, config.max_energy),
        };
        self.index.insert(id, self.agents.len());
        self.agents.push(agent);
        id
    }

    /// Remove an agent, keeping the order of the rest
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let idx = self.index.remove(&id)?;
        let agent = self.agents.remove(idx);
        for slot in self.index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(agent)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).and_then(|&idx| self.agents.get(idx))
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let idx = *self.index.get(&id)?;
        self.agents.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> + '_ {
        self.agents.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn count(&self, role: Role) -> usize {
        self.agents.iter().filter(|a| a.role() == role).count()
    }

    /// Ids of agents in `role`, in registry order
    pub fn ids_of(&self, role: Role) -> Vec<AgentId> {
        self.agents
            .iter()
            .filter(|a| a.role() == role)
            .map(|a| a.id)
            .collect()
    }
}
