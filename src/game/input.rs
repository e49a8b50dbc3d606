//! Player Input
//!
//! The last input snapshot a client sent, packed into one flags byte. Input is
//! level-triggered: a held key stays held until the client sends a new frame.

use serde::{Deserialize, Serialize};

/// Held-key state for a single player.
///
/// Screen-aligned: `forward` moves towards -Y, `strafe_left` towards -X.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputFrame {
    /// Packed key bits, see the `FLAG_*` constants
    pub flags: u8,
}

impl InputFrame {
    /// Size in bytes
    pub const SIZE: usize = 1;

    /// Move towards -Y
    pub const FLAG_FORWARD: u8 = 0x01;
    /// Move towards +Y
    pub const FLAG_BACK: u8 = 0x02;
    /// Move towards -X
    pub const FLAG_STRAFE_LEFT: u8 = 0x04;
    /// Move towards +X
    pub const FLAG_STRAFE_RIGHT: u8 = 0x08;
    /// Rotate counter-clockwise
    pub const FLAG_TURN_LEFT: u8 = 0x10;
    /// Rotate clockwise
    pub const FLAG_TURN_RIGHT: u8 = 0x20;
    /// Fire held
    pub const FLAG_FIRE: u8 = 0x40;

    const KNOWN_FLAGS: u8 = 0x7F;

    /// Create an empty frame (nothing held).
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Build from raw bits; unknown bits are discarded.
    pub const fn from_flags(flags: u8) -> Self {
        Self {
            flags: flags & Self::KNOWN_FLAGS,
        }
    }

    /// Builder: return a copy with `flag` set.
    pub const fn with(self, flag: u8) -> Self {
        Self::from_flags(self.flags | flag)
    }

    /// Set or clear a flag.
    #[inline]
    pub fn set(&mut self, flag: u8, pressed: bool) {
        if pressed {
            self.flags |= flag & Self::KNOWN_FLAGS;
        } else {
            self.flags &= !flag;
        }
    }

    #[inline]
    fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Forward held.
    #[inline]
    pub fn forward(&self) -> bool {
        self.has(Self::FLAG_FORWARD)
    }

    /// Back held.
    #[inline]
    pub fn back(&self) -> bool {
        self.has(Self::FLAG_BACK)
    }

    /// Strafe left held.
    #[inline]
    pub fn strafe_left(&self) -> bool {
        self.has(Self::FLAG_STRAFE_LEFT)
    }

    /// Strafe right held.
    #[inline]
    pub fn strafe_right(&self) -> bool {
        self.has(Self::FLAG_STRAFE_RIGHT)
    }

    /// Turn left held.
    #[inline]
    pub fn turn_left(&self) -> bool {
        self.has(Self::FLAG_TURN_LEFT)
    }

    /// Turn right held.
    #[inline]
    pub fn turn_right(&self) -> bool {
        self.has(Self::FLAG_TURN_RIGHT)
    }

    /// Fire held.
    #[inline]
    pub fn fire(&self) -> bool {
        self.has(Self::FLAG_FIRE)
    }

    /// True if no key is held.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.flags == 0
    }
}
