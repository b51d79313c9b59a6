//! A single map cell.

use std::collections::BTreeMap;

use wh_core::{AgentId, FacilityId, Tick};

// ── CellKind ──────────────────────────────────────────────────────────────────

/// What statically occupies a cell.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum CellKind {
    #[default]
    Empty,
    Obstacle,
    Rack,
    Gate,
    Station,
}

impl CellKind {
    /// `true` for the three facility-hosting kinds.
    #[inline]
    pub fn is_facility(self) -> bool {
        matches!(self, CellKind::Rack | CellKind::Gate | CellKind::Station)
    }
}

// ── Cell ──────────────────────────────────────────────────────────────────────

/// One cell of the warehouse map.
///
/// Holds ids, never references: `agent` and `facility` are resolved through
/// the warehouse registries.  The `timeline` maps future ticks to the agent
/// scheduled to occupy the cell then; it is advisory — conflicts are resolved
/// live at execution time, the timeline only steers planning.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    pub kind: CellKind,
    pub facility: Option<FacilityId>,
    agent: Option<AgentId>,
    locked: bool,
    timeline: BTreeMap<Tick, AgentId>,
}

impl Cell {
    // ── Agent occupancy ───────────────────────────────────────────────────

    #[inline]
    pub fn agent(&self) -> Option<AgentId> {
        self.agent
    }

    /// Place `agent` on this cell.  The caller maintains the ≤1-agent
    /// invariant by clearing the agent's previous cell first.
    #[inline]
    pub fn set_agent(&mut self, agent: AgentId) {
        debug_assert!(self.agent.is_none() || self.agent == Some(agent));
        self.agent = Some(agent);
    }

    /// Remove and return the occupying agent, if any.
    #[inline]
    pub fn take_agent(&mut self) -> Option<AgentId> {
        self.agent.take()
    }

    // ── Lock flag ─────────────────────────────────────────────────────────

    #[inline]
    pub fn lock(&mut self) {
        self.locked = true;
    }

    #[inline]
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Untraversable: an obstacle, or locked by a deactivated agent.
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.kind == CellKind::Obstacle || self.locked
    }

    /// No agent, no facility, no obstacle.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kind == CellKind::Empty && self.agent.is_none()
    }

    // ── Timeline ──────────────────────────────────────────────────────────

    /// Record that `agent` plans to occupy this cell at `tick`.
    ///
    /// Last writer wins; the schedule is advisory.
    pub fn schedule(&mut self, tick: Tick, agent: AgentId) {
        self.timeline.insert(tick, agent);
    }

    /// The agent scheduled for `tick`, if any.
    pub fn scheduled(&self, tick: Tick) -> Option<AgentId> {
        self.timeline.get(&tick).copied()
    }

    /// Drop every reservation made by `agent` (plan discarded).
    pub fn clear_schedule_of(&mut self, agent: AgentId) {
        self.timeline.retain(|_, a| *a != agent);
    }

    /// Drop reservations at ticks before `now` (already in the past).
    pub fn prune_schedule(&mut self, now: Tick) {
        self.timeline = self.timeline.split_off(&now);
    }
}
