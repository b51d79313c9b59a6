//! Plans and plan goals.

use wh_core::{Action, CellPos, Pose};

// ── BindPolicy ────────────────────────────────────────────────────────────────

/// Where an agent must stand for a bind against the goal facility to
/// succeed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BindPolicy {
    /// On the facility's cell (racks, gates, stations).
    Coincident,
    /// On the facility's cell or any 4-neighbor of it.
    Adjacent,
}

// ── PlanGoal ──────────────────────────────────────────────────────────────────

/// A planning target: the goal facility's cell plus its bind policy.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PlanGoal {
    pub pos: CellPos,
    pub policy: BindPolicy,
}

impl PlanGoal {
    pub fn coincident(pos: CellPos) -> Self {
        Self { pos, policy: BindPolicy::Coincident }
    }

    pub fn adjacent(pos: CellPos) -> Self {
        Self { pos, policy: BindPolicy::Adjacent }
    }

    /// `true` if an agent at `pos` satisfies this goal.
    #[inline]
    pub fn is_satisfied_at(&self, pos: CellPos) -> bool {
        match self.policy {
            BindPolicy::Coincident => pos == self.pos,
            BindPolicy::Adjacent   => pos == self.pos || pos.manhattan(self.pos) == 1,
        }
    }
}

// ── Plan ──────────────────────────────────────────────────────────────────────

/// A finite stack of primitive actions, consumed top-first.
///
/// Internally the top of the stack is the *end* of the vector so that
/// [`pop`](Self::pop) is O(1).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    actions: Vec<Action>,
}

impl Plan {
    /// Build a plan from actions in execution order (first action first).
    pub fn from_sequence(mut seq: Vec<Action>) -> Self {
        seq.reverse();
        Self { actions: seq }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The next action to execute, without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<Action> {
        self.actions.last().copied()
    }

    /// Consume and return the next action.
    #[inline]
    pub fn pop(&mut self) -> Option<Action> {
        self.actions.pop()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate remaining actions in execution order.
    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.actions.iter().rev().copied()
    }

    /// The poses this plan will visit from `start`, one per action, in
    /// execution order.  Used to pre-book cell timelines.
    pub fn poses_from(&self, start: Pose) -> Vec<Pose> {
        let mut out = Vec::with_capacity(self.len());
        let mut pose = start;
        for action in self.iter() {
            pose = pose.next(action);
            out.push(pose);
        }
        out
    }
}
