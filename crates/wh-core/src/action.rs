//! The primitive agent actions and their stable wire codes.
//!
//! Every agent performs at most one action per tick.  The wire codes are
//! part of the external protocol and must never be renumbered.

use std::fmt;

/// A primitive agent action.
///
/// `Nothing` is internal — it marks "no action this tick" and is never
/// emitted on the wire.  `Stop` is emitted by the controller when a running
/// task is cancelled mid-tick; agents never plan it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[repr(u8)]
pub enum Action {
    Stop        = 0,
    Move        = 1,
    RotateRight = 2,
    RotateLeft  = 3,
    /// Reverse heading in one tick without rotating.
    Retreat     = 4,
    Load        = 5,
    Offload     = 6,
    Bind        = 7,
    Unbind      = 8,
    #[default]
    Nothing     = 9,
}

impl Action {
    /// Stable protocol code, or `None` for [`Action::Nothing`] which never
    /// appears in an UPDATE.
    #[inline]
    pub fn wire_code(self) -> Option<u8> {
        match self {
            Action::Nothing => None,
            other           => Some(other as u8),
        }
    }

    /// `true` for the two quarter-turn actions.
    #[inline]
    pub fn is_rotation(self) -> bool {
        matches!(self, Action::RotateRight | Action::RotateLeft)
    }

    /// `true` if applying this action changes the agent's pose
    /// (translation or heading).
    #[inline]
    pub fn changes_pose(self) -> bool {
        matches!(
            self,
            Action::Move | Action::RotateRight | Action::RotateLeft | Action::Retreat
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Stop        => "stop",
            Action::Move        => "move",
            Action::RotateRight => "rotate_right",
            Action::RotateLeft  => "rotate_left",
            Action::Retreat     => "retreat",
            Action::Load        => "load",
            Action::Offload     => "offload",
            Action::Bind        => "bind",
            Action::Unbind      => "unbind",
            Action::Nothing     => "nothing",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
