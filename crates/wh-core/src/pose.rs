//! Grid positions, headings, and pose/action arithmetic.
//!
//! # Coordinate system
//!
//! Cells are addressed `(row, col)` with row 0 at the top.  `North`
//! decreases the row, `South` increases it; `East` increases the column,
//! `West` decreases it.  Coordinates are `i32` so that pose arithmetic can
//! step one cell outside the map and let the grid's bounds check reject the
//! result, instead of wrapping an unsigned subtraction.

use std::fmt;

use crate::Action;

// ── Direction ─────────────────────────────────────────────────────────────────

/// One of the four cardinal headings, indexed 0..3 on the wire.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Direction {
    North = 0,
    East  = 1,
    South = 2,
    West  = 3,
}

impl Direction {
    /// All headings in wire-code order.
    pub const ALL: [Direction; 4] =
        [Direction::North, Direction::East, Direction::South, Direction::West];

    /// Decode a wire index (0..3).
    pub fn from_index(i: u8) -> Option<Direction> {
        Self::ALL.get(i as usize).copied()
    }

    /// Heading after a clockwise quarter turn.
    #[inline]
    pub fn rotate_right(self) -> Direction {
        Self::ALL[(self as usize + 1) % 4]
    }

    /// Heading after a counter-clockwise quarter turn.
    #[inline]
    pub fn rotate_left(self) -> Direction {
        Self::ALL[(self as usize + 3) % 4]
    }

    /// The opposite heading.
    #[inline]
    pub fn reverse(self) -> Direction {
        Self::ALL[(self as usize + 2) % 4]
    }

    /// Unit `(d_row, d_col)` step for this heading.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::East  => (0, 1),
            Direction::South => (1, 0),
            Direction::West  => (0, -1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East  => "east",
            Direction::South => "south",
            Direction::West  => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── CellPos ───────────────────────────────────────────────────────────────────

/// A `(row, col)` cell address.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct CellPos {
    pub row: i32,
    pub col: i32,
}

impl CellPos {
    #[inline]
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The neighboring cell one step in `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> CellPos {
        let (dr, dc) = dir.delta();
        CellPos { row: self.row + dr, col: self.col + dc }
    }

    /// Manhattan (L1) distance — a lower bound on plan length, used for
    /// cheap pre-filtering before a full planner query.
    #[inline]
    pub fn manhattan(self, other: CellPos) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The four 4-connected neighbors in heading order (N, E, S, W).
    pub fn neighbors(self) -> [CellPos; 4] {
        [
            self.step(Direction::North),
            self.step(Direction::East),
            self.step(Direction::South),
            self.step(Direction::West),
        ]
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ── Pose ──────────────────────────────────────────────────────────────────────

/// An agent's full kinematic state: cell plus heading.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Pose {
    pub pos: CellPos,
    pub dir: Direction,
}

impl Pose {
    #[inline]
    pub fn new(row: i32, col: i32, dir: Direction) -> Self {
        Self { pos: CellPos::new(row, col), dir }
    }

    /// The pose after applying `action`.
    ///
    /// `Move` advances one cell along the current heading; `Retreat` flips
    /// the heading in place (no translation); the rotations turn in place.
    /// All other actions leave the pose unchanged.
    pub fn next(self, action: Action) -> Pose {
        match action {
            Action::Move        => Pose { pos: self.pos.step(self.dir), dir: self.dir },
            Action::RotateRight => Pose { pos: self.pos, dir: self.dir.rotate_right() },
            Action::RotateLeft  => Pose { pos: self.pos, dir: self.dir.rotate_left() },
            Action::Retreat     => Pose { pos: self.pos, dir: self.dir.reverse() },
            _                   => self,
        }
    }

    /// The pose *before* `action` was applied — the inverse of [`next`].
    ///
    /// Used by the block protocol to undo an unacknowledged action.
    ///
    /// [`next`]: Self::next
    pub fn previous(self, action: Action) -> Pose {
        match action {
            Action::Move        => Pose { pos: self.pos.step(self.dir.reverse()), dir: self.dir },
            Action::RotateRight => Pose { pos: self.pos, dir: self.dir.rotate_left() },
            Action::RotateLeft  => Pose { pos: self.pos, dir: self.dir.rotate_right() },
            Action::Retreat     => Pose { pos: self.pos, dir: self.dir.reverse() },
            _                   => self,
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pos, self.dir)
    }
}
