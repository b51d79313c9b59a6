//! The agent registry.

use std::collections::BTreeMap;

use wh_core::AgentId;

use crate::agent::Agent;
use crate::error::{AgentError, AgentResult};

/// All agents, keyed by id.
///
/// A `BTreeMap` rather than a hash map: the execute and recover phases
/// iterate agents in ascending id order, and determinism there is part of
/// the protocol (ties in priority break by smaller id).
#[derive(Default)]
pub struct AgentStore {
    inner: BTreeMap<AgentId, Agent>,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, agent: Agent) -> AgentResult<()> {
        if self.inner.contains_key(&agent.id) {
            return Err(AgentError::DuplicateAgent(agent.id));
        }
        self.inner.insert(agent.id, agent);
        Ok(())
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.inner.contains_key(&id)
    }

    pub fn get(&self, id: AgentId) -> AgentResult<&Agent> {
        self.inner.get(&id).ok_or(AgentError::AgentNotFound(id))
    }

    pub fn get_mut(&mut self, id: AgentId) -> AgentResult<&mut Agent> {
        self.inner.get_mut(&id).ok_or(AgentError::AgentNotFound(id))
    }

    /// All ids in ascending order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.inner.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.inner.values()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Ids of agents with no active task, ascending.
    pub fn idle_ids(&self) -> Vec<AgentId> {
        self.inner
            .values()
            .filter(|a| a.is_idle() && !a.deactivated && !a.blocked)
            .map(|a| a.id)
            .collect()
    }

    /// Ids of blocked agents, ascending — the recover phase works through
    /// these.
    pub fn blocked_ids(&self) -> Vec<AgentId> {
        self.inner
            .values()
            .filter(|a| a.blocked)
            .map(|a| a.id)
            .collect()
    }
}
