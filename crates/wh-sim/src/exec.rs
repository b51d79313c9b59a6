//! The execute phase: driving one agent through its task's step deque.

use tracing::{info, warn};

use wh_agent::{MotionCtx, ReachStatus, IDLE_PRIORITY};
use wh_core::{Action, AgentId, FacilityId, GateId, OrderId, TaskId, Tick};
use wh_order::{OrderKind, Task, TaskStep};
use wh_plan::{PlanGoal, Planner};
use wh_proto::LogMsg;

use crate::error::{SimError, SimResult};
use crate::warehouse::Warehouse;

impl<P: Planner> Warehouse<P> {
    pub(crate) fn task(&self, id: TaskId) -> SimResult<&Task> {
        self.tasks.get(id).ok_or(SimError::TaskNotFound(id))
    }

    fn task_mut(&mut self, id: TaskId) -> SimResult<&mut Task> {
        self.tasks.get_mut(id).ok_or(SimError::TaskNotFound(id))
    }

    /// Execute one agent's action for this tick by advancing its task.
    pub(crate) fn execute_agent(&mut self, id: AgentId, now: Tick) -> SimResult<()> {
        let Some(task_id) = self.agents.get(id)?.task else {
            return Ok(());
        };
        // SELECT_GATE resolution is free; everything else costs the tick.
        loop {
            let step = match self.tasks.get(task_id) {
                None => return Ok(()),
                Some(task) => task.peek_step().cloned(),
            };
            match step {
                None => {
                    self.terminate_task(task_id)?;
                    return Ok(());
                }
                Some(TaskStep::SelectGate) => {
                    self.resolve_select_gate(task_id, id)?;
                }
                Some(TaskStep::Bind(facility)) => {
                    return self.execute_bind(task_id, id, facility, now);
                }
                Some(TaskStep::Unbind(facility)) => {
                    return self.execute_unbind(task_id, id, facility, now);
                }
            }
        }
    }

    // ── SELECT_GATE ───────────────────────────────────────────────────────

    /// Expand the front `SelectGate` into `Bind(gate)` for the nearest gate
    /// with queued orders (by plan distance from the agent's current pose,
    /// ties by gate id).  A placeholder with nothing queued is dropped.
    fn resolve_select_gate(&mut self, task_id: TaskId, agent_id: AgentId) -> SimResult<()> {
        let candidates = self.task(task_id)?.pending_gates();
        if candidates.is_empty() {
            self.task_mut(task_id)?.pop_step();
            return Ok(());
        }

        let pose = self.agents.get(agent_id)?.pose;
        let mut best: Option<(usize, GateId)> = None;
        for gate_id in candidates {
            let pos = self.gates.get(gate_id)?.pos;
            let distance = self
                .motion
                .planner()
                .distance(&self.grid, pose, PlanGoal::coincident(pos))
                .unwrap_or(usize::MAX);
            if best.is_none_or(|b| (distance, gate_id) < b) {
                best = Some((distance, gate_id));
            }
        }
        if let Some((_, gate_id)) = best {
            self.task_mut(task_id)?.resolve_select_gate(gate_id);
        }
        Ok(())
    }

    // ── Bind steps ────────────────────────────────────────────────────────

    fn execute_bind(
        &mut self,
        task_id: TaskId,
        agent_id: AgentId,
        facility: FacilityId,
        now: Tick,
    ) -> SimResult<()> {
        let pose = self.agents.get(agent_id)?.pose;
        match facility {
            FacilityId::Rack(rack_id) => {
                if self.racks.get(rack_id)?.can_bind(agent_id, pose) {
                    self.task_mut(task_id)?.pop_step();
                    self.racks.get_mut(rack_id)?.bind(agent_id)?;
                    self.agents.get_mut(agent_id)?.loaded = true;
                    self.perform(agent_id, Action::Bind, now)
                } else {
                    self.reach_facility(task_id, agent_id, facility, now)
                }
            }
            FacilityId::Gate(gate_id) => {
                let has_order = self.task(task_id)?.has_orders_at(gate_id);
                if !has_order {
                    // Stale bind (orders were cancelled under it): discard.
                    self.task_mut(task_id)?.pop_step();
                    return Ok(());
                }
                if self.gates.get(gate_id)?.can_bind(agent_id, pose) {
                    self.task_mut(task_id)?.pop_step();
                    self.gates.get_mut(gate_id)?.bind(agent_id)?;
                    self.perform(agent_id, Action::Bind, now)?;
                    self.complete_active_order(task_id, gate_id, now)
                } else {
                    self.reach_facility(task_id, agent_id, facility, now)
                }
            }
            FacilityId::Station(station_id) => {
                if self.stations.get(station_id)?.can_bind(agent_id, pose) {
                    self.task_mut(task_id)?.pop_step();
                    self.stations.get_mut(station_id)?.bind(agent_id)?;
                    self.perform(agent_id, Action::Bind, now)
                } else {
                    self.reach_facility(task_id, agent_id, facility, now)
                }
            }
        }
    }

    fn execute_unbind(
        &mut self,
        task_id: TaskId,
        agent_id: AgentId,
        facility: FacilityId,
        now: Tick,
    ) -> SimResult<()> {
        let pose = self.agents.get(agent_id)?.pose;
        match facility {
            FacilityId::Rack(rack_id) => {
                if self.racks.get(rack_id)?.can_unbind(pose) {
                    self.task_mut(task_id)?.pop_step();
                    self.racks.get_mut(rack_id)?.unbind()?;
                    self.agents.get_mut(agent_id)?.loaded = false;
                    self.perform(agent_id, Action::Unbind, now)?;
                    if self.task(task_id)?.is_done() {
                        self.terminate_task(task_id)?;
                    }
                    Ok(())
                } else {
                    // Carry the rack back to its home cell first.
                    self.reach_facility(task_id, agent_id, facility, now)
                }
            }
            FacilityId::Gate(gate_id) => {
                if self.gates.get(gate_id)?.can_unbind(pose) {
                    self.task_mut(task_id)?.pop_step();
                    self.gates.get_mut(gate_id)?.unbind()?;
                    self.perform(agent_id, Action::Unbind, now)
                } else {
                    self.reach_facility(task_id, agent_id, facility, now)
                }
            }
            FacilityId::Station(station_id) => {
                if self.stations.get(station_id)?.can_unbind(pose) {
                    self.task_mut(task_id)?.pop_step();
                    self.stations.get_mut(station_id)?.unbind()?;
                    self.perform(agent_id, Action::Unbind, now)
                } else {
                    self.reach_facility(task_id, agent_id, facility, now)
                }
            }
        }
    }

    // ── Gate delivery ─────────────────────────────────────────────────────

    /// The agent just bound the gate: hand over (or receive) one queued
    /// order's share and queue the next gate visit or the gate unbind.
    fn complete_active_order(
        &mut self,
        task_id: TaskId,
        gate_id: GateId,
        _now: Tick,
    ) -> SimResult<()> {
        let Some(order_id) = self.task_mut(task_id)?.pop_gate_order(gate_id) else {
            self.task_mut(task_id)?
                .push_next_step(TaskStep::Unbind(FacilityId::Gate(gate_id)));
            return Ok(());
        };
        let rack_id = self.task(task_id)?.rack;
        let share = self
            .task(task_id)?
            .planned_share(order_id)
            .cloned()
            .unwrap_or_default();
        let kind = self
            .orders
            .get(order_id)
            .ok_or(SimError::OrderNotFound(order_id))?
            .kind;

        for (&item, &qty) in &share {
            match kind {
                OrderKind::Collect => {
                    self.racks.get_mut(rack_id)?.deliver_outgoing(item, qty);
                    self.items.deliver_out(item, qty)?;
                }
                OrderKind::Refill => {
                    let weight = self.items.get(item)?.unit_weight * qty;
                    self.racks.get_mut(rack_id)?.deliver_incoming(item, qty, weight);
                    self.items.deliver_in(item, qty)?;
                }
            }
        }

        let fulfilled = self
            .orders
            .get_mut(order_id)
            .ok_or(SimError::OrderNotFound(order_id))?
            .on_task_complete(&share);
        if fulfilled {
            info!(order = %order_id, "order fulfilled");
            self.logs.push(LogMsg::order_fulfilled(order_id.0));
            self.fulfilled_total += 1;
        }

        let next = if self.task(task_id)?.has_orders_at(gate_id) {
            TaskStep::Bind(FacilityId::Gate(gate_id))
        } else {
            TaskStep::Unbind(FacilityId::Gate(gate_id))
        };
        self.task_mut(task_id)?.push_next_step(next);
        Ok(())
    }

    // ── Task teardown ─────────────────────────────────────────────────────

    /// Normal completion: the step deque ran dry.
    fn terminate_task(&mut self, task_id: TaskId) -> SimResult<()> {
        let Some(task) = self.tasks.remove(task_id) else {
            return Ok(());
        };
        self.racks.get_mut(task.rack)?.deallocate();
        {
            let agent = self.agents.get_mut(task.agent)?;
            agent.task = None;
            agent.priority = IDLE_PRIORITY;
            agent.target = None;
        }
        info!(task = %task_id, agent = %task.agent, "task completed");
        self.logs
            .push(LogMsg::task_completed(task_id.0, task.agent.0, task.rack.0));
        Ok(())
    }

    /// Abnormal teardown (domain-invariant violation, e.g. an unreachable
    /// goal): roll back undelivered claims, return orders to the dispatch
    /// pool, block the agent, and tell the observer to halt it.
    pub(crate) fn cancel_task(&mut self, task_id: TaskId, now: Tick) -> SimResult<()> {
        let Some(task) = self.tasks.remove(task_id) else {
            return Ok(());
        };
        let agent_id = task.agent;
        let rack_id = task.rack;
        warn!(task = %task_id, agent = %agent_id, "task cancelled");

        for (order_id, share) in task.undelivered() {
            let kind = self.orders.get(order_id).map(|o| o.kind);
            if kind == Some(OrderKind::Collect) {
                let rack = self.racks.get_mut(rack_id)?;
                for (&item, &qty) in &share {
                    rack.unreserve_outgoing(item, qty);
                }
            }
            if let Some(order) = self.orders.get_mut(order_id) {
                order.on_task_cancelled(&share);
            }
            self.requeue_order(order_id);
        }

        {
            let rack = self.racks.get_mut(rack_id)?;
            if rack.bound_to() == Some(agent_id) {
                rack.unbind()?;
            }
            rack.deallocate();
        }
        {
            let agent = self.agents.get_mut(agent_id)?;
            agent.task = None;
            agent.priority = IDLE_PRIORITY;
            agent.loaded = false;
        }

        let mut ctx = MotionCtx {
            agents: &mut self.agents,
            grid: &mut self.grid,
            recorder: &mut self.recorder,
            now,
        };
        self.motion.block(&mut ctx, agent_id)?;
        // Pseudo-action for the observer: halt this agent.  Recorded
        // directly so the agent's last action stays replayable by recover.
        self.recorder.record(agent_id, Action::Stop, None);
        Ok(())
    }

    fn requeue_order(&mut self, order_id: OrderId) {
        if !self.pending_orders.contains(&order_id) {
            self.pending_orders.push_back(order_id);
        }
    }

    // ── Motion helpers ────────────────────────────────────────────────────

    fn perform(&mut self, agent_id: AgentId, action: Action, now: Tick) -> SimResult<()> {
        let mut ctx = MotionCtx {
            agents: &mut self.agents,
            grid: &mut self.grid,
            recorder: &mut self.recorder,
            now,
        };
        self.motion.perform(&mut ctx, agent_id, action)?;
        Ok(())
    }

    /// One `reach` step toward `facility`; an unreachable goal cancels the
    /// task.
    fn reach_facility(
        &mut self,
        task_id: TaskId,
        agent_id: AgentId,
        facility: FacilityId,
        now: Tick,
    ) -> SimResult<()> {
        let goal = self.facility_goal(facility)?;
        let mut ctx = MotionCtx {
            agents: &mut self.agents,
            grid: &mut self.grid,
            recorder: &mut self.recorder,
            now,
        };
        match self.motion.reach(&mut ctx, agent_id, facility, goal)? {
            ReachStatus::Acted | ReachStatus::Waiting => Ok(()),
            ReachStatus::Unreachable => {
                warn!(agent = %agent_id, %facility, "goal unreachable");
                self.cancel_task(task_id, now)
            }
        }
    }

    fn facility_goal(&self, facility: FacilityId) -> SimResult<PlanGoal> {
        let pos = match facility {
            FacilityId::Rack(id) => self.racks.get(id)?.pos,
            FacilityId::Gate(id) => self.gates.get(id)?.pos,
            FacilityId::Station(id) => self.stations.get(id)?.pos,
        };
        Ok(PlanGoal::coincident(pos))
    }
}
