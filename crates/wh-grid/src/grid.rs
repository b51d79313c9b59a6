//! The warehouse grid and its builder.

use wh_core::{AgentId, CellPos, FacilityId, Tick};

use crate::cell::{Cell, CellKind};
use crate::error::{GridError, GridResult};

// ── Grid ──────────────────────────────────────────────────────────────────────

/// A fixed `height × width` map of [`Cell`]s in row-major order.
///
/// Built once from the START configuration via [`GridBuilder`]; the layout
/// (kinds and facilities) never changes afterwards.  Agent occupancy, lock
/// flags, and timelines are the mutable parts.
pub struct Grid {
    height: u32,
    width: u32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// `true` if `pos` addresses a cell on the map.
    #[inline]
    pub fn in_bounds(&self, pos: CellPos) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && (pos.row as u32) < self.height
            && (pos.col as u32) < self.width
    }

    #[inline]
    fn index(&self, pos: CellPos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.row as usize * self.width as usize + pos.col as usize)
    }

    /// The cell at `pos`, or `None` when out of bounds.
    #[inline]
    pub fn cell(&self, pos: CellPos) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    #[inline]
    pub fn cell_mut(&mut self, pos: CellPos) -> Option<&mut Cell> {
        self.index(pos).map(move |i| &mut self.cells[i])
    }

    /// Untraversable at `pos`: out of bounds, an obstacle, or locked.
    #[inline]
    pub fn is_blocked(&self, pos: CellPos) -> bool {
        self.cell(pos).is_none_or(Cell::is_blocked)
    }

    /// The agent occupying `pos`, if any.
    #[inline]
    pub fn agent_at(&self, pos: CellPos) -> Option<AgentId> {
        self.cell(pos).and_then(Cell::agent)
    }

    /// The facility hosted at `pos`, if any.
    #[inline]
    pub fn facility_at(&self, pos: CellPos) -> Option<FacilityId> {
        self.cell(pos).and_then(|c| c.facility)
    }

    /// Move an agent's occupancy from `from` to `to`.
    ///
    /// The caller has already verified `to` is free; this only shuffles the
    /// two cells' agent slots.
    pub fn relocate_agent(&mut self, agent: AgentId, from: CellPos, to: CellPos) {
        if let Some(cell) = self.cell_mut(from) {
            if cell.agent() == Some(agent) {
                cell.take_agent();
            }
        }
        if let Some(cell) = self.cell_mut(to) {
            cell.set_agent(agent);
        }
    }

    /// Drop `agent`'s reservations from every cell timeline.
    pub fn clear_schedule_of(&mut self, agent: AgentId) {
        for cell in &mut self.cells {
            cell.clear_schedule_of(agent);
        }
    }

    /// Drop reservations older than `now` from every cell timeline.
    pub fn prune_schedules(&mut self, now: Tick) {
        for cell in &mut self.cells {
            cell.prune_schedule(now);
        }
    }

    /// Iterator over all cell positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = CellPos> + '_ {
        let width = self.width as i32;
        (0..self.height as i32)
            .flat_map(move |row| (0..width).map(move |col| CellPos::new(row, col)))
    }
}

// ── GridBuilder ───────────────────────────────────────────────────────────────

/// Construct a [`Grid`] incrementally, then call [`build`](Self::build).
///
/// Placement rejects out-of-bounds positions and cells that already hold an
/// obstacle or facility.  Agents are *not* placed here — the warehouse puts
/// them on their cells after the registries exist.
pub struct GridBuilder {
    grid: Grid,
}

impl GridBuilder {
    pub fn new(height: u32, width: u32) -> Self {
        let cells = vec![Cell::default(); height as usize * width as usize];
        Self {
            grid: Grid { height, width, cells },
        }
    }

    fn claim(&mut self, pos: CellPos) -> GridResult<&mut Cell> {
        let (height, width) = (self.grid.height, self.grid.width);
        let cell = self
            .grid
            .cell_mut(pos)
            .ok_or(GridError::OutOfBounds { row: pos.row, col: pos.col, height, width })?;
        if cell.kind != CellKind::Empty {
            return Err(GridError::CellOccupied { row: pos.row, col: pos.col });
        }
        Ok(cell)
    }

    pub fn place_obstacle(&mut self, pos: CellPos) -> GridResult<()> {
        self.claim(pos)?.kind = CellKind::Obstacle;
        Ok(())
    }

    pub fn place_facility(&mut self, pos: CellPos, facility: FacilityId) -> GridResult<()> {
        let cell = self.claim(pos)?;
        cell.kind = match facility {
            FacilityId::Rack(_)    => CellKind::Rack,
            FacilityId::Gate(_)    => CellKind::Gate,
            FacilityId::Station(_) => CellKind::Station,
        };
        cell.facility = Some(facility);
        Ok(())
    }

    pub fn build(self) -> Grid {
        self.grid
    }
}
