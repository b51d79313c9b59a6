//! Charging stations.
//!
//! Stations are off the dispatch critical path (battery never drives
//! decisions) but follow the same binding discipline as racks, minus the
//! allocation step.

use wh_core::{AgentId, CellPos, Pose, StationId};

use crate::error::{EntityError, EntityResult};

/// A recharge endpoint.
#[derive(Clone, Debug)]
pub struct Station {
    pub id: StationId,
    pub pos: CellPos,
    bound_to: Option<AgentId>,
}

impl Station {
    pub fn new(id: StationId, pos: CellPos) -> Self {
        Self { id, pos, bound_to: None }
    }

    pub fn bound_to(&self) -> Option<AgentId> {
        self.bound_to
    }

    #[inline]
    pub fn is_coincident(&self, pose: Pose) -> bool {
        pose.pos == self.pos
    }

    pub fn can_bind(&self, _agent: AgentId, pose: Pose) -> bool {
        self.is_coincident(pose) && self.bound_to.is_none()
    }

    pub fn bind(&mut self, agent: AgentId) -> EntityResult<()> {
        if let Some(holder) = self.bound_to {
            return Err(EntityError::AlreadyBound(holder));
        }
        self.bound_to = Some(agent);
        Ok(())
    }

    pub fn can_unbind(&self, pose: Pose) -> bool {
        self.bound_to.is_some() && self.is_coincident(pose)
    }

    pub fn unbind(&mut self) -> EntityResult<()> {
        if self.bound_to.is_none() {
            return Err(EntityError::NotBound);
        }
        self.bound_to = None;
        Ok(())
    }
}
