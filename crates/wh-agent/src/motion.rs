//! The motion engine: planned movement, cooperative sliding, and the
//! block/recover protocol.
//!
//! All functions operate on ids against the shared [`AgentStore`] and
//! [`Grid`] carried in a [`MotionCtx`]; nothing here holds references across
//! ticks.  Recursion (slide chains, block chains) is bounded by per-tick
//! marks and by the undo walk touching each agent at most once.

use wh_core::{Action, AgentId, Direction, FacilityId, Pose, Tick};
use wh_grid::Grid;
use wh_plan::{Plan, PlanError, PlanGoal, Planner};

use crate::agent::Agent;
use crate::error::AgentResult;
use crate::recorder::ActionRecorder;
use crate::store::AgentStore;

// ── MotionCtx ─────────────────────────────────────────────────────────────────

/// The mutable world slice a motion call operates on.
pub struct MotionCtx<'a> {
    pub agents: &'a mut AgentStore,
    pub grid: &'a mut Grid,
    pub recorder: &'a mut ActionRecorder,
    pub now: Tick,
}

// ── ReachStatus ───────────────────────────────────────────────────────────────

/// Outcome of one [`MotionEngine::reach`] attempt.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ReachStatus {
    /// The agent performed an action this tick.
    Acted,
    /// No progress this tick (conflict, yield, or already at the goal while
    /// the bind precondition is held by someone else); retry next tick.
    Waiting,
    /// The planner found no path — the caller should treat this as a
    /// domain failure and cancel the task.
    Unreachable,
}

// ── MotionEngine ──────────────────────────────────────────────────────────────

/// Wraps a [`Planner`] and drives all agent movement against the grid.
pub struct MotionEngine<P: Planner> {
    planner: P,
}

impl<P: Planner> MotionEngine<P> {
    pub fn new(planner: P) -> Self {
        Self { planner }
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    // ── reach ─────────────────────────────────────────────────────────────

    /// Advance `id` one action toward `target`.
    ///
    /// Ensures a plan exists and leads to `target` (replanning when the
    /// target changed or the plan was dropped), then executes the top
    /// action: in-place actions apply directly, a `Move` goes through
    /// next-cell resolution.
    pub fn reach(
        &self,
        ctx: &mut MotionCtx<'_>,
        id: AgentId,
        target: FacilityId,
        goal: PlanGoal,
    ) -> AgentResult<ReachStatus> {
        let agent = ctx.agents.get(id)?;
        if agent.target != Some(target) || agent.plan.is_empty() {
            let pose = agent.pose;
            let plan = match self.planner.plan(ctx.grid, pose, goal) {
                Ok(p) => p,
                Err(PlanError::Unreachable { .. } | PlanError::StartOutOfBounds(_)) => {
                    Self::drop_plan(ctx, id)?;
                    return Ok(ReachStatus::Unreachable);
                }
            };

            // Advisory booking: the k-th action is expected to land at
            // now + k (the first one executes this very tick).
            ctx.grid.clear_schedule_of(id);
            for (k, p) in plan.poses_from(pose).iter().enumerate() {
                if let Some(cell) = ctx.grid.cell_mut(p.pos) {
                    cell.schedule(ctx.now + k as u64, id);
                }
            }

            let agent = ctx.agents.get_mut(id)?;
            agent.plan = plan;
            agent.target = Some(target);
        }

        match ctx.agents.get(id)?.plan.peek() {
            None => Ok(ReachStatus::Waiting),
            Some(a @ (Action::RotateRight | Action::RotateLeft | Action::Retreat)) => {
                self.apply_in_place(ctx, id, a)?;
                Ok(ReachStatus::Acted)
            }
            Some(Action::Move) => self.try_move(ctx, id),
            Some(other) => {
                debug_assert!(false, "non-kinematic action {other} in a plan");
                Self::drop_plan(ctx, id)?;
                Ok(ReachStatus::Waiting)
            }
        }
    }

    /// Record a non-kinematic action (load, offload, bind, unbind, stop)
    /// as `id`'s action for this tick.
    pub fn perform(&self, ctx: &mut MotionCtx<'_>, id: AgentId, action: Action) -> AgentResult<()> {
        debug_assert!(!action.changes_pose());
        let agent = ctx.agents.get_mut(id)?;
        let battery = agent.mark_action(action, ctx.now);
        ctx.recorder.record(id, action, battery);
        Ok(())
    }

    /// Discard `id`'s plan and its timeline reservations.
    pub fn drop_plan(ctx: &mut MotionCtx<'_>, id: AgentId) -> AgentResult<()> {
        let agent = ctx.agents.get_mut(id)?;
        agent.plan = Plan::empty();
        agent.target = None;
        ctx.grid.clear_schedule_of(id);
        Ok(())
    }

    // ── Movement ──────────────────────────────────────────────────────────

    /// Pop and apply an in-place pose change from the plan.
    fn apply_in_place(&self, ctx: &mut MotionCtx<'_>, id: AgentId, action: Action) -> AgentResult<()> {
        let agent = ctx.agents.get_mut(id)?;
        debug_assert_eq!(agent.plan.peek(), Some(action));
        agent.plan.pop();
        agent.pose = agent.pose.next(action);
        let battery = agent.mark_action(action, ctx.now);
        ctx.recorder.record(id, action, battery);
        Ok(())
    }

    /// Next-cell resolution for a planned `Move`.
    fn try_move(&self, ctx: &mut MotionCtx<'_>, id: AgentId) -> AgentResult<ReachStatus> {
        let (pos, dir, priority) = {
            let a = ctx.agents.get(id)?;
            (a.pose.pos, a.pose.dir, a.priority)
        };
        let next = pos.step(dir);

        if ctx.grid.is_blocked(next) {
            Self::drop_plan(ctx, id)?;
            return Ok(ReachStatus::Waiting);
        }

        match ctx.grid.agent_at(next) {
            None => {
                self.commit_planned_move(ctx, id)?;
                Ok(ReachStatus::Acted)
            }
            Some(b) if b == id => {
                // A stale reservation pointing at ourselves: recover by replanning.
                debug_assert!(false, "agent {id} found itself in its next cell");
                Self::drop_plan(ctx, id)?;
                Ok(ReachStatus::Waiting)
            }
            Some(b) => {
                let slid = self.slide(ctx, b, priority)?;
                if slid && ctx.grid.agent_at(next).is_none() {
                    self.commit_planned_move(ctx, id)?;
                    Ok(ReachStatus::Acted)
                } else {
                    Self::drop_plan(ctx, id)?;
                    Ok(ReachStatus::Waiting)
                }
            }
        }
    }

    /// Commit the plan's `Move`: shuffle grid occupancy, update the pose,
    /// consume the plan step.
    fn commit_planned_move(&self, ctx: &mut MotionCtx<'_>, id: AgentId) -> AgentResult<()> {
        let pose = ctx.agents.get(id)?.pose;
        let to = pose.next(Action::Move);
        ctx.grid.relocate_agent(id, pose.pos, to.pos);

        let agent = ctx.agents.get_mut(id)?;
        debug_assert_eq!(agent.plan.peek(), Some(Action::Move));
        agent.plan.pop();
        agent.pose = to;
        let battery = agent.mark_action(Action::Move, ctx.now);
        ctx.recorder.record(id, Action::Move, battery);
        Ok(())
    }

    // ── Slide ─────────────────────────────────────────────────────────────

    /// Ask `b` to vacate its cell for an agent with priority
    /// `caller_priority`.
    ///
    /// Returns `Ok(true)` when the slide "succeeded" — either `b` acted
    /// (moved or began turning) or `b` outranks the caller and the caller
    /// must yield.  The caller decides whether its target cell actually
    /// became free.
    fn slide(&self, ctx: &mut MotionCtx<'_>, b: AgentId, caller_priority: u32) -> AgentResult<bool> {
        let (blocked, deactivated, moved, sliding, b_priority, b_pos) = {
            let a = ctx.agents.get(b)?;
            (
                a.blocked,
                a.deactivated,
                a.has_moved(ctx.now),
                a.is_sliding(ctx.now),
                a.priority,
                a.pose.pos,
            )
        };
        if blocked || deactivated || moved || sliding {
            return Ok(false);
        }
        // Same or higher precedence (smaller value ranks higher): b stays,
        // the caller yields.
        if b_priority <= caller_priority {
            return Ok(true);
        }

        // Mark before recursing so slide chains cannot revisit b.
        ctx.agents.get_mut(b)?.slide_tick = Some(ctx.now);

        for d in Self::slide_candidates(ctx.agents.get(b)?) {
            let target = b_pos.step(d);
            let Some(cell) = ctx.grid.cell(target) else {
                continue; // out of bounds
            };
            if cell.facility.is_some() || cell.is_blocked() {
                continue;
            }
            match cell.agent() {
                None => {
                    self.slide_into(ctx, b, d)?;
                    return Ok(true);
                }
                Some(c) => {
                    if c == b {
                        continue;
                    }
                    if self.slide(ctx, c, caller_priority)?
                        && ctx.grid.agent_at(target).is_none()
                    {
                        self.slide_into(ctx, b, d)?;
                        return Ok(true);
                    }
                    // c stayed: abandon this candidate direction.
                }
            }
        }
        Ok(false)
    }

    /// Candidate directions for a slide of `b`: its own planned direction
    /// first, then right of it, left of it, and its reverse.
    fn slide_candidates(b: &Agent) -> [Direction; 4] {
        let planned = match b.plan.peek() {
            Some(Action::Move)        => b.pose.dir,
            Some(Action::RotateRight) => b.pose.dir.rotate_right(),
            Some(Action::RotateLeft)  => b.pose.dir.rotate_left(),
            Some(Action::Retreat)     => b.pose.dir.reverse(),
            _                         => b.pose.dir,
        };
        [planned, planned.rotate_right(), planned.rotate_left(), planned.reverse()]
    }

    /// Move `b` toward `d`: step into the cell when already facing `d`,
    /// otherwise spend this tick turning toward it.
    ///
    /// A step or turn that matches `b`'s own plan consumes the plan step;
    /// anything else invalidates the plan, which is dropped for replanning.
    fn slide_into(&self, ctx: &mut MotionCtx<'_>, b: AgentId, d: Direction) -> AgentResult<()> {
        let (pose, peek) = {
            let a = ctx.agents.get(b)?;
            (a.pose, a.plan.peek())
        };

        let action = if pose.dir == d {
            Action::Move
        } else if d == pose.dir.rotate_right() {
            Action::RotateRight
        } else if d == pose.dir.rotate_left() {
            Action::RotateLeft
        } else {
            Action::Retreat
        };

        if action == Action::Move {
            let to = pose.pos.step(d);
            ctx.grid.relocate_agent(b, pose.pos, to);
        }

        let on_plan = peek == Some(action);
        let agent = ctx.agents.get_mut(b)?;
        agent.pose = pose.next(action);
        if on_plan {
            agent.plan.pop();
        }
        let battery = agent.mark_action(action, ctx.now);
        ctx.recorder.record(b, action, battery);
        if !on_plan {
            Self::drop_plan(ctx, b)?;
        }
        Ok(())
    }

    // ── Block / recover ───────────────────────────────────────────────────

    /// Undo `id`'s last (unacknowledged) action and mark it blocked.
    ///
    /// Idempotent.  Undoing a `Move` vacates the entered cell and puts the
    /// agent back; whoever meanwhile occupied the previous cell is blocked
    /// recursively first.
    pub fn block(&self, ctx: &mut MotionCtx<'_>, id: AgentId) -> AgentResult<()> {
        if ctx.agents.get(id)?.blocked {
            return Ok(());
        }
        ctx.agents.get_mut(id)?.blocked = true;
        Self::drop_plan(ctx, id)?;

        let (pose, last) = {
            let a = ctx.agents.get(id)?;
            (a.pose, a.last_action)
        };
        match last {
            Action::RotateRight | Action::RotateLeft | Action::Retreat => {
                ctx.agents.get_mut(id)?.pose = pose.previous(last);
            }
            Action::Move => {
                let prev = pose.previous(Action::Move);
                if let Some(cell) = ctx.grid.cell_mut(pose.pos) {
                    if cell.agent() == Some(id) {
                        cell.take_agent();
                    }
                }
                if let Some(other) = ctx.grid.agent_at(prev.pos) {
                    if other != id {
                        self.block(ctx, other)?;
                    }
                }
                if let Some(cell) = ctx.grid.cell_mut(prev.pos) {
                    cell.set_agent(id);
                }
                ctx.agents.get_mut(id)?.pose = prev;
            }
            _ => {} // no geometric undo
        }
        Ok(())
    }

    /// Replay `id`'s undone action forward, or fall back to a retreat.
    ///
    /// Returns `Ok(true)` if the agent recovered (and acted) this tick.
    /// Deactivated agents never recover.
    pub fn recover(&self, ctx: &mut MotionCtx<'_>, id: AgentId) -> AgentResult<bool> {
        let (blocked, deactivated, pose, last) = {
            let a = ctx.agents.get(id)?;
            (a.blocked, a.deactivated, a.pose, a.last_action)
        };
        if !blocked || deactivated {
            return Ok(false);
        }

        match last {
            Action::RotateRight | Action::RotateLeft | Action::Retreat => {
                let agent = ctx.agents.get_mut(id)?;
                agent.pose = pose.next(last);
                agent.blocked = false;
                let battery = agent.mark_action(last, ctx.now);
                ctx.recorder.record(id, last, battery);
                Ok(true)
            }
            Action::Move => {
                let fwd = pose.pos.step(pose.dir);
                let fwd_free =
                    !ctx.grid.is_blocked(fwd) && ctx.grid.agent_at(fwd).is_none();
                if fwd_free {
                    ctx.grid.relocate_agent(id, pose.pos, fwd);
                    let agent = ctx.agents.get_mut(id)?;
                    agent.pose = Pose { pos: fwd, dir: pose.dir };
                    agent.blocked = false;
                    let battery = agent.mark_action(Action::Move, ctx.now);
                    ctx.recorder.record(id, Action::Move, battery);
                    Ok(true)
                } else if !ctx.grid.cell(pose.pos).is_some_and(|c| c.is_locked()) {
                    // Forward is taken: give up on the move and back out.
                    let agent = ctx.agents.get_mut(id)?;
                    agent.pose = pose.next(Action::Retreat);
                    agent.blocked = false;
                    let battery = agent.mark_action(Action::Retreat, ctx.now);
                    ctx.recorder.record(id, Action::Retreat, battery);
                    Ok(true)
                } else {
                    Ok(false) // pinned on a locked cell
                }
            }
            _ => {
                ctx.agents.get_mut(id)?.blocked = false;
                Ok(true)
            }
        }
    }

    /// Deactivate `id`: lock its current cell, then block it (undoing any
    /// unacknowledged action).
    pub fn deactivate(&self, ctx: &mut MotionCtx<'_>, id: AgentId) -> AgentResult<()> {
        let agent = ctx.agents.get(id)?;
        if agent.deactivated {
            return Ok(());
        }
        let pos = agent.pose.pos;
        {
            let agent = ctx.agents.get_mut(id)?;
            agent.deactivated = true;
            agent.locked_cell = Some(pos);
        }
        if let Some(cell) = ctx.grid.cell_mut(pos) {
            cell.lock();
        }
        self.block(ctx, id)
    }

    /// Re-activate `id`: unlock its deactivation cell.  The agent stays
    /// blocked; the next tick's recover phase replays its action.
    pub fn activate(&self, ctx: &mut MotionCtx<'_>, id: AgentId) -> AgentResult<()> {
        let agent = ctx.agents.get(id)?;
        if !agent.deactivated {
            return Ok(());
        }
        let locked = agent.locked_cell;
        {
            let agent = ctx.agents.get_mut(id)?;
            agent.deactivated = false;
            agent.locked_cell = None;
        }
        if let Some(pos) = locked {
            if let Some(cell) = ctx.grid.cell_mut(pos) {
                cell.unlock();
            }
        }
        Ok(())
    }
}
