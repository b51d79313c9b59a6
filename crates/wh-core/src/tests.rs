//! Unit tests for wh-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, FacilityId, OrderId, RackId, TaskId};

    #[test]
    fn ordering() {
        assert!(AgentId(0) < AgentId(1));
        assert!(TaskId(100) > TaskId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(AgentId::INVALID.0, u32::MAX);
        assert_eq!(OrderId::INVALID.0, u32::MAX);
        assert_eq!(AgentId::default(), AgentId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(AgentId(7).to_string(), "AgentId(7)");
        assert_eq!(FacilityId::Rack(RackId(3)).to_string(), "RackId(3)");
    }
}

#[cfg(test)]
mod direction {
    use crate::Direction;

    #[test]
    fn wire_indices() {
        assert_eq!(Direction::from_index(0), Some(Direction::North));
        assert_eq!(Direction::from_index(3), Some(Direction::West));
        assert_eq!(Direction::from_index(4), None);
    }

    #[test]
    fn quarter_turns_compose() {
        for dir in Direction::ALL {
            assert_eq!(dir.rotate_right().rotate_left(), dir);
            assert_eq!(dir.rotate_right().rotate_right(), dir.reverse());
            assert_eq!(dir.reverse().reverse(), dir);
        }
    }

    #[test]
    fn deltas_are_unit_steps() {
        for dir in Direction::ALL {
            let (dr, dc) = dir.delta();
            assert_eq!(dr.abs() + dc.abs(), 1);
            let (rr, rc) = dir.reverse().delta();
            assert_eq!((rr, rc), (-dr, -dc));
        }
    }
}

#[cfg(test)]
mod pose {
    use crate::{Action, CellPos, Direction, Pose};

    #[test]
    fn manhattan() {
        assert_eq!(CellPos::new(0, 0).manhattan(CellPos::new(2, 3)), 5);
        assert_eq!(CellPos::new(-1, 4).manhattan(CellPos::new(1, 4)), 2);
    }

    #[test]
    fn move_advances_along_heading() {
        let p = Pose::new(2, 2, Direction::East);
        assert_eq!(p.next(Action::Move), Pose::new(2, 3, Direction::East));
        let p = Pose::new(2, 2, Direction::North);
        assert_eq!(p.next(Action::Move), Pose::new(1, 2, Direction::North));
    }

    #[test]
    fn retreat_flips_heading_in_place() {
        let p = Pose::new(5, 5, Direction::South);
        let q = p.next(Action::Retreat);
        assert_eq!(q.pos, p.pos);
        assert_eq!(q.dir, Direction::North);
    }

    #[test]
    fn next_previous_roundtrip() {
        let p = Pose::new(3, 4, Direction::West);
        for action in [
            Action::Move,
            Action::RotateRight,
            Action::RotateLeft,
            Action::Retreat,
            Action::Load,
            Action::Bind,
            Action::Nothing,
        ] {
            assert_eq!(p.next(action).previous(action), p, "action {action}");
        }
    }

    #[test]
    fn non_kinematic_actions_are_identity() {
        let p = Pose::new(0, 0, Direction::East);
        assert_eq!(p.next(Action::Load), p);
        assert_eq!(p.next(Action::Offload), p);
        assert_eq!(p.next(Action::Bind), p);
        assert_eq!(p.next(Action::Unbind), p);
    }
}

#[cfg(test)]
mod action {
    use crate::Action;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(Action::Stop.wire_code(), Some(0));
        assert_eq!(Action::Move.wire_code(), Some(1));
        assert_eq!(Action::RotateRight.wire_code(), Some(2));
        assert_eq!(Action::RotateLeft.wire_code(), Some(3));
        assert_eq!(Action::Retreat.wire_code(), Some(4));
        assert_eq!(Action::Load.wire_code(), Some(5));
        assert_eq!(Action::Offload.wire_code(), Some(6));
        assert_eq!(Action::Bind.wire_code(), Some(7));
        assert_eq!(Action::Unbind.wire_code(), Some(8));
        assert_eq!(Action::Nothing.wire_code(), None);
    }

    #[test]
    fn pose_changing_classification() {
        assert!(Action::Move.changes_pose());
        assert!(Action::Retreat.changes_pose());
        assert!(Action::RotateLeft.is_rotation());
        assert!(!Action::Bind.changes_pose());
        assert!(!Action::Move.is_rotation());
    }
}

#[cfg(test)]
mod tick {
    use crate::Tick;

    #[test]
    fn arithmetic() {
        let t = Tick(10);
        assert_eq!(t + 5, Tick(15));
        assert_eq!(t.offset(3), Tick(13));
        assert_eq!(Tick(15) - Tick(10), 5u64);
        assert_eq!(Tick::ZERO.to_string(), "T0");
    }
}
