//! The warehouse controller: owned state, command handlers, and the tick
//! scheduler.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use wh_agent::{ActionRecorder, Agent, AgentStore, MotionCtx, MotionEngine};
use wh_core::{AgentId, CellPos, Direction, FacilityId, GateId, ItemId, OrderId, Pose, RackId,
              StationId, Tick};
use wh_entity::{Gate, GateStore, Item, ItemStore, Rack, RackStore, Station, StationStore};
use wh_grid::{Grid, GridBuilder};
use wh_order::{ItemMultiset, Order, OrderError, OrderStore, TaskStore};
use wh_plan::{BfsPlanner, Planner};
use wh_proto::config::object_types;
use wh_proto::msg::stat_keys;
use wh_proto::{
    ActionMsg, ControlKind, ControlMsg, LogMsg, OrderKindCode, OrderMsg, ProtoError, ProtoResult,
    StartMsg, StatMsg, UpdateMsg, WarehouseConfig,
};

use crate::error::SimResult;

// ── State & outcomes ──────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum WarehouseState {
    #[default]
    Idle,
    Running,
    Paused,
}

/// What a [`Warehouse::run_tick`] call did.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TickOutcome {
    /// The tick ran and time advanced.
    Advanced,
    /// Nothing ran: not RUNNING, or the previous UPDATE is unacknowledged.
    Idle,
}

/// Outcome plus the batched UPDATE (when the tick produced events).
/// The acknowledgement gate is already armed when `update` is `Some`; the
/// caller must deliver it.
#[derive(Debug)]
pub struct TickResult {
    pub outcome: TickOutcome,
    pub update: Option<UpdateMsg>,
}

// ── Warehouse ─────────────────────────────────────────────────────────────────

/// Owns every registry and drives the tick loop.
///
/// All cross-entity references are ids resolved through the registries —
/// cells point at agents and facilities by id, tasks couple agents and
/// racks by id.  Mutation happens on exactly one thread.
pub struct Warehouse<P: Planner = BfsPlanner> {
    pub(crate) state: WarehouseState,
    pub(crate) time: Tick,

    pub(crate) grid: Grid,
    pub(crate) items: ItemStore,
    pub(crate) racks: RackStore,
    pub(crate) gates: GateStore,
    pub(crate) stations: StationStore,
    pub(crate) agents: AgentStore,
    pub(crate) orders: OrderStore,
    pub(crate) tasks: TaskStore,
    pub(crate) pending_orders: VecDeque<OrderId>,

    pub(crate) motion: MotionEngine<P>,
    pub(crate) recorder: ActionRecorder,
    pub(crate) logs: Vec<LogMsg>,
    pub(crate) fulfilled_total: u64,
    ack_armed: bool,
}

impl Warehouse<BfsPlanner> {
    pub fn new() -> Self {
        Self::with_planner(BfsPlanner)
    }
}

impl Default for Warehouse<BfsPlanner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Planner> Warehouse<P> {
    pub fn with_planner(planner: P) -> Self {
        Self {
            state: WarehouseState::Idle,
            time: Tick::ZERO,
            grid: GridBuilder::new(0, 0).build(),
            items: ItemStore::new(),
            racks: RackStore::new(),
            gates: GateStore::new(),
            stations: StationStore::new(),
            agents: AgentStore::new(),
            orders: OrderStore::new(),
            tasks: TaskStore::new(),
            pending_orders: VecDeque::new(),
            motion: MotionEngine::new(planner),
            recorder: ActionRecorder::new(),
            logs: Vec::new(),
            fulfilled_total: 0,
            ack_armed: false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> WarehouseState {
        self.state
    }

    pub fn time(&self) -> Tick {
        self.time
    }

    pub fn ack_gate_armed(&self) -> bool {
        self.ack_armed
    }

    /// `true` when `run_tick` would actually run a tick.
    pub fn can_tick(&self) -> bool {
        self.state == WarehouseState::Running && !self.ack_armed
    }

    /// `true` when ticking cannot produce any event: no pending work, no
    /// active tasks, no blocked agents.  The executor blocks on the command
    /// queue instead of spinning through empty ticks.
    pub fn is_quiescent(&self) -> bool {
        self.pending_orders.is_empty()
            && self.agents.iter().all(|a| a.task.is_none() && !a.blocked)
    }

    // ── Command handlers ──────────────────────────────────────────────────

    /// START: validate and build the world, then begin running.
    pub fn handle_start(&mut self, msg: &StartMsg) -> ProtoResult<()> {
        if self.state != WarehouseState::Idle {
            return Err(ProtoError::Unexpected("START during an active session".into()));
        }
        msg.state.validate()?;
        self.build(&msg.state)?;
        self.state = WarehouseState::Running;
        info!(
            agents = self.agents.len(),
            racks = self.racks.len(),
            gates = self.gates.len(),
            "session started"
        );
        Ok(())
    }

    /// STOP: drop the whole session; everything is rebuilt on the next
    /// START.
    pub fn handle_stop(&mut self) {
        info!(time = %self.time, "session stopped");
        self.state = WarehouseState::Idle;
        self.time = Tick::ZERO;
        self.grid = GridBuilder::new(0, 0).build();
        self.items = ItemStore::new();
        self.racks = RackStore::new();
        self.gates = GateStore::new();
        self.stations = StationStore::new();
        self.agents = AgentStore::new();
        self.orders = OrderStore::new();
        self.tasks = TaskStore::new();
        self.pending_orders.clear();
        self.recorder.drain();
        self.logs.clear();
        self.fulfilled_total = 0;
        self.ack_armed = false;
    }

    pub fn handle_pause(&mut self) -> ProtoResult<()> {
        if self.state != WarehouseState::Running {
            return Err(ProtoError::Unexpected("PAUSE while not running".into()));
        }
        self.state = WarehouseState::Paused;
        Ok(())
    }

    pub fn handle_resume(&mut self) -> ProtoResult<()> {
        if self.state != WarehouseState::Paused {
            return Err(ProtoError::Unexpected("RESUME while not paused".into()));
        }
        self.state = WarehouseState::Running;
        Ok(())
    }

    /// ORDER: decode, check feasibility, reserve, and enqueue.
    pub fn handle_order(&mut self, msg: &OrderMsg) -> ProtoResult<()> {
        if self.state != WarehouseState::Running {
            return Err(ProtoError::Unexpected("ORDER while not running".into()));
        }

        let mut demand = ItemMultiset::default();
        for entry in &msg.items {
            *demand.entry(ItemId(entry.id)).or_insert(0) += entry.quantity;
        }

        let order = match msg.kind_code() {
            Some(OrderKindCode::Collect) => {
                Order::collect(OrderId(msg.id), GateId(msg.gate_id), demand)
            }
            Some(OrderKindCode::Refill) => {
                let rack = msg.rack_id.ok_or_else(|| ProtoError::InvalidArgs {
                    reason: "refill order names no rack".into(),
                    id: Some(msg.id),
                })?;
                Order::refill(OrderId(msg.id), GateId(msg.gate_id), RackId(rack), demand)
            }
            None => {
                return Err(ProtoError::InvalidArgs {
                    reason: "unknown order type".into(),
                    id: Some(msg.id),
                })
            }
        };

        let id = self
            .orders
            .admit(order, &mut self.items, &mut self.racks, &self.gates)
            .map_err(order_error_to_proto)?;
        self.pending_orders.push_back(id);
        debug!(order = %id, "order admitted");
        Ok(())
    }

    /// CONTROL: activate or deactivate one agent.
    pub fn handle_control(&mut self, msg: &ControlMsg) -> ProtoResult<()> {
        if self.state != WarehouseState::Running {
            return Err(ProtoError::Unexpected("CONTROL while not running".into()));
        }
        let id = AgentId(msg.id);
        if !self.agents.contains(id) {
            return Err(ProtoError::InvalidArgs {
                reason: "unknown agent".into(),
                id: Some(msg.id),
            });
        }
        let now = self.time;
        let mut ctx = MotionCtx {
            agents: &mut self.agents,
            grid: &mut self.grid,
            recorder: &mut self.recorder,
            now,
        };
        let result = match msg.kind_code() {
            Some(ControlKind::Deactivate) => self.motion.deactivate(&mut ctx, id),
            Some(ControlKind::Activate) => self.motion.activate(&mut ctx, id),
            None => {
                return Err(ProtoError::InvalidArgs {
                    reason: "unknown control type".into(),
                    id: Some(msg.id),
                })
            }
        };
        result.map_err(|e| ProtoError::Server(e.to_string()))
    }

    /// ACK_UPDATE: release the tick gate.  A duplicate ACK is an error.
    pub fn handle_ack_update(&mut self) -> ProtoResult<()> {
        if !self.ack_armed {
            return Err(ProtoError::Unexpected(
                "ACK_UPDATE with no update awaiting acknowledgement".into(),
            ));
        }
        self.ack_armed = false;
        Ok(())
    }

    /// Fatal-path transition (§ error design): keep the registries but drop
    /// every plan, release bound facilities, and idle the session.
    pub fn fail_to_idle(&mut self) {
        warn!(time = %self.time, "fatal error: idling session");
        for id in self.agents.ids() {
            let mut ctx = MotionCtx {
                agents: &mut self.agents,
                grid: &mut self.grid,
                recorder: &mut self.recorder,
                now: self.time,
            };
            let _ = MotionEngine::<P>::drop_plan(&mut ctx, id);
        }
        for rack_id in self.racks.sorted_ids() {
            if let Ok(rack) = self.racks.get_mut(rack_id) {
                if let Some(agent) = rack.bound_to() {
                    let _ = rack.unbind();
                    if let Ok(a) = self.agents.get_mut(agent) {
                        a.loaded = false;
                    }
                }
            }
        }
        for gate_id in self.gates.sorted_ids() {
            if let Ok(gate) = self.gates.get_mut(gate_id) {
                if gate.bound_to().is_some() {
                    let _ = gate.unbind();
                }
            }
        }
        for station_id in self.stations.sorted_ids() {
            if let Ok(station) = self.stations.get_mut(station_id) {
                if station.bound_to().is_some() {
                    let _ = station.unbind();
                }
            }
        }
        self.state = WarehouseState::Idle;
        self.ack_armed = false;
    }

    // ── Tick scheduler ────────────────────────────────────────────────────

    /// Run one tick of the scheduler.
    ///
    /// Returns the batched UPDATE when the tick produced at least one
    /// event; the acknowledgement gate is armed in that case and the next
    /// tick is skipped until [`handle_ack_update`](Self::handle_ack_update).
    pub fn run_tick(&mut self) -> SimResult<TickResult> {
        if !self.can_tick() {
            return Ok(TickResult { outcome: TickOutcome::Idle, update: None });
        }
        let now = self.time + 1;

        // ── Recover phase ─────────────────────────────────────────────────
        for id in self.agents.blocked_ids() {
            let mut ctx = MotionCtx {
                agents: &mut self.agents,
                grid: &mut self.grid,
                recorder: &mut self.recorder,
                now,
            };
            if self.motion.recover(&mut ctx, id)? {
                debug!(agent = %id, "recovered");
            }
        }

        // ── Dispatch phase ────────────────────────────────────────────────
        self.dispatch(now)?;

        // ── Execute phase ─────────────────────────────────────────────────
        //
        // Ascending (priority, id); ids tie-break identical priorities.
        let mut active: Vec<(u32, AgentId)> = self
            .agents
            .iter()
            .filter(|a| a.task.is_some() && !a.blocked && !a.deactivated)
            .map(|a| (a.priority, a.id))
            .collect();
        active.sort_unstable();

        for (_, id) in active {
            let agent = self.agents.get(id)?;
            // Skip agents that already acted (slid or recovered), were
            // blocked mid-phase, or whose task got cancelled mid-phase.
            if agent.has_moved(now) || agent.blocked || agent.task.is_none() {
                continue;
            }
            self.execute_agent(id, now)?;
        }

        // ── Advance & batch ───────────────────────────────────────────────
        self.time = now;
        let update = self.build_update();
        if update.is_some() {
            self.ack_armed = true;
        }
        Ok(TickResult { outcome: TickOutcome::Advanced, update })
    }

    /// Convert the tick's records and logs into one UPDATE, or `None` for
    /// an event-free tick.
    fn build_update(&mut self) -> Option<UpdateMsg> {
        let records = self.recorder.drain();
        let mut logs = std::mem::take(&mut self.logs);
        let mut actions = Vec::with_capacity(records.len());
        for record in records {
            if let Some(code) = record.action.wire_code() {
                actions.push(ActionMsg { kind: code, id: record.agent.0 });
            }
            if let Some(level) = record.battery {
                logs.push(LogMsg::battery_updated(record.agent.0, level));
            }
        }
        if actions.is_empty() && logs.is_empty() {
            return None;
        }
        let statistics = vec![
            StatMsg { key: stat_keys::ORDERS_FULFILLED, value: self.fulfilled_total },
            StatMsg { key: stat_keys::ACTIVE_TASKS, value: self.tasks.len() as u64 },
        ];
        Some(UpdateMsg { timestep: self.time.0, actions, logs, statistics })
    }

    // ── World construction ────────────────────────────────────────────────

    /// Build grid and registries from a validated configuration.
    fn build(&mut self, config: &WarehouseConfig) -> ProtoResult<()> {
        let mut items = ItemStore::new();
        for ic in &config.items {
            items.insert(Item::new(ItemId(ic.id), ic.weight));
        }

        let mut builder = GridBuilder::new(config.map.height, config.map.width);
        let mut agents = AgentStore::new();
        let mut racks = RackStore::new();
        let mut gates = GateStore::new();
        let mut stations = StationStore::new();
        let mut agent_cells: Vec<(AgentId, CellPos)> = Vec::new();

        for (r, row) in config.map.grid.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let pos = CellPos::new(r as i32, c as i32);
                for obj in &cell.objects {
                    let place = |what: &str| ProtoError::InvalidArgs {
                        reason: format!("cannot place {what} at ({r}, {c})"),
                        id: obj.id,
                    };
                    match obj.kind {
                        object_types::OBSTACLE => {
                            builder.place_obstacle(pos).map_err(|_| place("obstacle"))?;
                        }
                        object_types::GATE => {
                            let id = GateId(required_id(obj)?);
                            builder
                                .place_facility(pos, FacilityId::Gate(id))
                                .map_err(|_| place("gate"))?;
                            gates.insert(Gate::new(id, pos));
                        }
                        object_types::STATION => {
                            let id = StationId(required_id(obj)?);
                            builder
                                .place_facility(pos, FacilityId::Station(id))
                                .map_err(|_| place("station"))?;
                            stations.insert(Station::new(id, pos));
                        }
                        object_types::RACK => {
                            let id = RackId(required_id(obj)?);
                            builder
                                .place_facility(pos, FacilityId::Rack(id))
                                .map_err(|_| place("rack"))?;
                            let mut rack = Rack::new(
                                id,
                                pos,
                                obj.capacity.unwrap_or(0),
                                obj.weight.unwrap_or(0),
                            );
                            for entry in obj.items.as_deref().unwrap_or_default() {
                                rack.store(ItemId(entry.id), entry.quantity);
                                items
                                    .deliver_in(ItemId(entry.id), entry.quantity)
                                    .map_err(|e| ProtoError::InvalidArgs {
                                        reason: e.to_string(),
                                        id: Some(entry.id),
                                    })?;
                            }
                            racks.insert(rack);
                        }
                        object_types::AGENT => {
                            let id = AgentId(required_id(obj)?);
                            let dir = obj
                                .direction
                                .and_then(Direction::from_index)
                                .ok_or_else(|| place("agent"))?;
                            let agent =
                                Agent::new(id, Pose { pos, dir }, obj.load_cap.unwrap_or(0));
                            agents
                                .insert(agent)
                                .map_err(|e| ProtoError::InvalidArgs {
                                    reason: e.to_string(),
                                    id: obj.id,
                                })?;
                            agent_cells.push((id, pos));
                        }
                        _ => return Err(place("object of unknown type")),
                    }
                }
            }
        }

        let mut grid = builder.build();
        for (id, pos) in agent_cells {
            if let Some(cell) = grid.cell_mut(pos) {
                cell.set_agent(id);
            }
        }

        self.grid = grid;
        self.items = items;
        self.racks = racks;
        self.gates = gates;
        self.stations = stations;
        self.agents = agents;
        self.orders = OrderStore::new();
        self.tasks = TaskStore::new();
        self.pending_orders.clear();
        self.recorder.drain();
        self.logs.clear();
        self.fulfilled_total = 0;
        self.ack_armed = false;
        self.time = Tick::ZERO;
        Ok(())
    }
}

fn required_id(obj: &wh_proto::ObjectConfig) -> ProtoResult<u32> {
    obj.id.ok_or_else(|| ProtoError::InvalidArgs {
        reason: "object missing id".into(),
        id: None,
    })
}

/// Map an admission failure onto the wire taxonomy.
fn order_error_to_proto(err: OrderError) -> ProtoError {
    let reason = err.to_string();
    match err {
        OrderError::InfeasibleCollect { order, short } => ProtoError::InfeasibleCollect {
            order: order.0,
            short: short.into_iter().map(|i| i.0).collect(),
        },
        OrderError::InfeasibleRefill { order, rack, excess } => {
            ProtoError::InfeasibleRefill { order: order.0, rack: rack.0, excess }
        }
        OrderError::DuplicateOrder(id) => ProtoError::InvalidArgs {
            reason: "duplicate order id".into(),
            id: Some(id.0),
        },
        OrderError::UnknownItem { order, .. }
        | OrderError::UnknownGate { order, .. }
        | OrderError::UnknownRack { order, .. }
        | OrderError::MissingRack(order)
        | OrderError::EmptyOrder(order) => ProtoError::InvalidArgs {
            reason,
            id: Some(order.0),
        },
        OrderError::Entity(e) => ProtoError::Server(e.to_string()),
    }
}
