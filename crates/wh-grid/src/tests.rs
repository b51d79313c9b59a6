//! Unit tests for wh-grid.

#[cfg(test)]
mod helpers {
    use wh_core::{CellPos, FacilityId, GateId, RackId};

    use crate::{Grid, GridBuilder};

    /// 3×4 map:
    ///
    /// ```text
    /// . # . .
    /// . R . G
    /// . . . .
    /// ```
    pub fn small_grid() -> Grid {
        let mut b = GridBuilder::new(3, 4);
        b.place_obstacle(CellPos::new(0, 1)).unwrap();
        b.place_facility(CellPos::new(1, 1), FacilityId::Rack(RackId(0))).unwrap();
        b.place_facility(CellPos::new(1, 3), FacilityId::Gate(GateId(0))).unwrap();
        b.build()
    }
}

#[cfg(test)]
mod builder {
    use wh_core::{CellPos, FacilityId, RackId};

    use crate::{CellKind, GridBuilder, GridError};

    #[test]
    fn places_kinds() {
        let g = super::helpers::small_grid();
        assert_eq!(g.cell(CellPos::new(0, 1)).unwrap().kind, CellKind::Obstacle);
        assert_eq!(g.cell(CellPos::new(1, 1)).unwrap().kind, CellKind::Rack);
        assert_eq!(g.cell(CellPos::new(1, 3)).unwrap().kind, CellKind::Gate);
        assert_eq!(g.cell(CellPos::new(2, 2)).unwrap().kind, CellKind::Empty);
        assert_eq!(
            g.facility_at(CellPos::new(1, 1)),
            Some(FacilityId::Rack(RackId(0)))
        );
    }

    #[test]
    fn rejects_out_of_bounds() {
        let mut b = GridBuilder::new(2, 2);
        let err = b.place_obstacle(CellPos::new(2, 0)).unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { .. }));
        let err = b.place_obstacle(CellPos::new(0, -1)).unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { .. }));
    }

    #[test]
    fn rejects_double_placement() {
        let mut b = GridBuilder::new(2, 2);
        b.place_obstacle(CellPos::new(0, 0)).unwrap();
        let err = b
            .place_facility(CellPos::new(0, 0), FacilityId::Rack(RackId(1)))
            .unwrap_err();
        assert!(matches!(err, GridError::CellOccupied { .. }));
    }
}

#[cfg(test)]
mod occupancy {
    use wh_core::{AgentId, CellPos};

    #[test]
    fn relocate_moves_the_id() {
        let mut g = super::helpers::small_grid();
        let a = AgentId(0);
        let from = CellPos::new(2, 0);
        let to = CellPos::new(2, 1);

        g.cell_mut(from).unwrap().set_agent(a);
        assert_eq!(g.agent_at(from), Some(a));

        g.relocate_agent(a, from, to);
        assert_eq!(g.agent_at(from), None);
        assert_eq!(g.agent_at(to), Some(a));
    }

    #[test]
    fn blocked_covers_obstacle_lock_and_oob() {
        let mut g = super::helpers::small_grid();
        assert!(g.is_blocked(CellPos::new(0, 1))); // obstacle
        assert!(g.is_blocked(CellPos::new(-1, 0))); // out of bounds
        assert!(!g.is_blocked(CellPos::new(2, 2)));

        g.cell_mut(CellPos::new(2, 2)).unwrap().lock();
        assert!(g.is_blocked(CellPos::new(2, 2)));
        g.cell_mut(CellPos::new(2, 2)).unwrap().unlock();
        assert!(!g.is_blocked(CellPos::new(2, 2)));
    }

    #[test]
    fn facility_cells_are_not_empty() {
        let g = super::helpers::small_grid();
        assert!(!g.cell(CellPos::new(1, 1)).unwrap().is_empty());
        assert!(g.cell(CellPos::new(2, 2)).unwrap().is_empty());
    }
}

#[cfg(test)]
mod timeline {
    use wh_core::{AgentId, CellPos, Tick};

    #[test]
    fn schedule_and_clear_per_agent() {
        let mut g = super::helpers::small_grid();
        let pos = CellPos::new(2, 2);
        let (a, b) = (AgentId(0), AgentId(1));

        g.cell_mut(pos).unwrap().schedule(Tick(3), a);
        g.cell_mut(pos).unwrap().schedule(Tick(5), b);
        assert_eq!(g.cell(pos).unwrap().scheduled(Tick(3)), Some(a));
        assert_eq!(g.cell(pos).unwrap().scheduled(Tick(4)), None);

        g.clear_schedule_of(a);
        assert_eq!(g.cell(pos).unwrap().scheduled(Tick(3)), None);
        assert_eq!(g.cell(pos).unwrap().scheduled(Tick(5)), Some(b));
    }

    #[test]
    fn prune_drops_past_entries() {
        let mut g = super::helpers::small_grid();
        let pos = CellPos::new(2, 0);
        let a = AgentId(7);

        g.cell_mut(pos).unwrap().schedule(Tick(1), a);
        g.cell_mut(pos).unwrap().schedule(Tick(9), a);
        g.prune_schedules(Tick(5));
        assert_eq!(g.cell(pos).unwrap().scheduled(Tick(1)), None);
        assert_eq!(g.cell(pos).unwrap().scheduled(Tick(9)), Some(a));
    }
}
