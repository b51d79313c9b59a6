//! Planning trait and default breadth-first implementation.

use std::collections::VecDeque;

use wh_core::{Action, Pose};
use wh_grid::Grid;

use crate::error::{PlanError, PlanResult};
use crate::plan::{Plan, PlanGoal};

// ── Planner trait ─────────────────────────────────────────────────────────────

/// Pluggable planning engine.
///
/// Obstacles and currently-locked cells are impassable; cells holding other
/// agents are traversable — agent conflicts are resolved live at execution
/// time, not at planning time.
pub trait Planner {
    /// Compute a plan from `start` to `goal`, or fail if unreachable.
    ///
    /// The returned plan's final pose satisfies the goal's bind policy, so
    /// a subsequent bind against the goal facility can succeed.
    fn plan(&self, grid: &Grid, start: Pose, goal: PlanGoal) -> PlanResult<Plan>;

    /// Plan length in actions, or `None` if unreachable.  Used by the
    /// dispatcher for distance tie-breaking and nearest-gate selection.
    fn distance(&self, grid: &Grid, start: Pose, goal: PlanGoal) -> Option<usize> {
        self.plan(grid, start, goal).ok().map(|p| p.len())
    }
}

// ── BfsPlanner ────────────────────────────────────────────────────────────────

/// Breadth-first search over the pose space `(row, col, heading)`.
///
/// All four kinematic actions have unit cost, so BFS yields a minimum
/// action-count plan.  Neighbor expansion order is fixed
/// (`Move`, `RotateRight`, `RotateLeft`, `Retreat`) which makes tie-breaking
/// deterministic.
pub struct BfsPlanner;

/// Actions expanded from every search state, in tie-breaking order.
const EXPANSION: [Action; 4] =
    [Action::Move, Action::RotateRight, Action::RotateLeft, Action::Retreat];

impl Planner for BfsPlanner {
    fn plan(&self, grid: &Grid, start: Pose, goal: PlanGoal) -> PlanResult<Plan> {
        if !grid.in_bounds(start.pos) {
            return Err(PlanError::StartOutOfBounds(start.pos));
        }
        if goal.is_satisfied_at(start.pos) {
            return Ok(Plan::empty());
        }

        let width = grid.width() as usize;
        let states = grid.height() as usize * width * 4;

        // prev[s] = (predecessor state, action that reached s).
        // usize::MAX marks unvisited; the start state points at itself.
        let mut prev: Vec<(usize, Action)> = vec![(usize::MAX, Action::Nothing); states];

        let index = |pose: Pose| -> usize {
            (pose.pos.row as usize * width + pose.pos.col as usize) * 4 + pose.dir as usize
        };

        let start_idx = index(start);
        prev[start_idx] = (start_idx, Action::Nothing);

        let mut queue: VecDeque<Pose> = VecDeque::new();
        queue.push_back(start);

        while let Some(pose) = queue.pop_front() {
            for action in EXPANSION {
                let next = pose.next(action);
                if action == Action::Move && grid.is_blocked(next.pos) {
                    continue;
                }
                let next_idx = index(next);
                if prev[next_idx].0 != usize::MAX {
                    continue;
                }
                prev[next_idx] = (index(pose), action);

                if goal.is_satisfied_at(next.pos) {
                    return Ok(reconstruct(&prev, start_idx, next_idx));
                }
                queue.push_back(next);
            }
        }

        Err(PlanError::Unreachable { from: start.pos, to: goal.pos })
    }
}

/// Walk the predecessor chain from `goal_idx` back to `start_idx`.
fn reconstruct(prev: &[(usize, Action)], start_idx: usize, goal_idx: usize) -> Plan {
    let mut seq = Vec::new();
    let mut cur = goal_idx;
    while cur != start_idx {
        let (parent, action) = prev[cur];
        seq.push(action);
        cur = parent;
    }
    seq.reverse();
    Plan::from_sequence(seq)
}
