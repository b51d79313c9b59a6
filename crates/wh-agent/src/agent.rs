//! Per-agent runtime state.

use wh_core::{Action, AgentId, CellPos, FacilityId, Pose, TaskId, Tick};
use wh_plan::Plan;

/// Priority of an agent with no active task.  Kept one below `u32::MAX` so
/// a hypothetical lowest-priority task still sorts ahead of idle agents.
pub const IDLE_PRIORITY: u32 = u32::MAX - 1;

/// Pose-changing actions between one-percent battery drops.  The battery is
/// observed and logged only; nothing in the core reads it back.
const ACTIONS_PER_BATTERY_PCT: u32 = 32;

/// One mobile robot.
///
/// Everything here is runtime state; the immutable identity (id, load
/// capacity, initial pose) comes from the START configuration.
#[derive(Clone, Debug)]
pub struct Agent {
    pub id: AgentId,
    pub pose: Pose,
    /// Maximum weight the agent can carry (rack container + stored items).
    pub capacity: u32,
    /// `true` while a rack is bound to this agent.
    pub loaded: bool,
    pub battery_pct: u8,

    /// Set by `block`; cleared by `recover`.  Blocked agents skip the
    /// execute phase.
    pub blocked: bool,
    /// Set by a CONTROL deactivate.  Deactivated agents never recover and
    /// their cell stays locked.
    pub deactivated: bool,
    /// The cell locked at deactivation time, to unlock on re-activation.
    pub locked_cell: Option<CellPos>,

    pub last_action: Action,
    pub last_action_tick: Option<Tick>,
    /// Tick at which this agent last took part in a slide, to break cycles.
    pub slide_tick: Option<Tick>,

    pub plan: Plan,
    /// The facility the current plan leads to.
    pub target: Option<FacilityId>,
    pub task: Option<TaskId>,
    /// Derived from the active task; [`IDLE_PRIORITY`] when idle.
    pub priority: u32,

    pose_actions: u32,
}

impl Agent {
    pub fn new(id: AgentId, pose: Pose, capacity: u32) -> Self {
        Self {
            id,
            pose,
            capacity,
            loaded: false,
            battery_pct: 100,
            blocked: false,
            deactivated: false,
            locked_cell: None,
            last_action: Action::Nothing,
            last_action_tick: None,
            slide_tick: None,
            plan: Plan::empty(),
            target: None,
            task: None,
            priority: IDLE_PRIORITY,
            pose_actions: 0,
        }
    }

    /// `true` once the agent has performed its action for tick `now`.
    #[inline]
    pub fn has_moved(&self, now: Tick) -> bool {
        self.last_action_tick.is_some_and(|t| t >= now)
    }

    /// `true` if the agent already took part in a slide this tick.
    #[inline]
    pub fn is_sliding(&self, now: Tick) -> bool {
        self.slide_tick.is_some_and(|t| t >= now)
    }

    pub fn is_idle(&self) -> bool {
        self.task.is_none()
    }

    /// Record `action` as this tick's action.
    ///
    /// Returns `Some(new_level)` when the battery percentage just changed,
    /// for the controller to log.
    pub fn mark_action(&mut self, action: Action, now: Tick) -> Option<u8> {
        self.last_action = action;
        self.last_action_tick = Some(now);

        if action.changes_pose() && self.battery_pct > 0 {
            self.pose_actions += 1;
            if self.pose_actions.is_multiple_of(ACTIONS_PER_BATTERY_PCT) {
                self.battery_pct -= 1;
                return Some(self.battery_pct);
            }
        }
        None
    }
}
