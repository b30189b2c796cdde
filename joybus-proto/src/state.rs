//! Canonical controller state as reported on the Joybus wire.

use core::ops::{BitAnd, BitOr, BitOrAssign};

/// Button bitfield of a controller response.
///
/// The low byte is the first status byte, the high byte the second one,
/// so the bit positions match the report byte-for-byte.
///
/// # Example
///
/// ```
/// use joybus_proto::ControllerButtons;
///
/// let buttons = ControllerButtons::A | ControllerButtons::START;
/// assert!(buttons.contains(ControllerButtons::A));
/// assert!(!buttons.contains(ControllerButtons::B));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerButtons(pub u16);

impl ControllerButtons {
    pub const A: Self = Self(1 << 0);
    pub const B: Self = Self(1 << 1);
    pub const X: Self = Self(1 << 2);
    pub const Y: Self = Self(1 << 3);
    pub const START: Self = Self(1 << 4);
    pub const DPAD_LEFT: Self = Self(1 << 8);
    pub const DPAD_RIGHT: Self = Self(1 << 9);
    pub const DPAD_DOWN: Self = Self(1 << 10);
    pub const DPAD_UP: Self = Self(1 << 11);
    pub const Z: Self = Self(1 << 12);
    pub const R: Self = Self(1 << 13);
    pub const L: Self = Self(1 << 14);

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Every bit that carries a button. The remaining bits are padding
    /// in the report (bit 15 is always set by the controller).
    pub const MASK: Self = Self(0x7f1f);

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: ControllerButtons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Check if no button is pressed, ignoring padding bits.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & Self::MASK.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl BitOr for ControllerButtons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ControllerButtons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ControllerButtons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

/// One decoded controller response.
///
/// Field order is the order of the bytes on the wire, and it is also the
/// order of the fields in the HID report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerState {
    pub buttons_0: u8,
    pub buttons_1: u8,
    /// Main stick, raw 0-255 with the centre near 128.
    pub stick_x: u8,
    pub stick_y: u8,
    /// C stick, same range as the main stick.
    pub c_stick_x: u8,
    pub c_stick_y: u8,
    /// Analog shoulder travel, 0-255.
    pub l_analog: u8,
    pub r_analog: u8,
}

impl ControllerState {
    /// Size of the response in bytes.
    pub const SIZE: usize = 8;

    /// All-zero state.
    #[must_use]
    pub const fn neutral() -> Self {
        Self::from_bytes([0; Self::SIZE])
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            buttons_0: bytes[0],
            buttons_1: bytes[1],
            stick_x: bytes[2],
            stick_y: bytes[3],
            c_stick_x: bytes[4],
            c_stick_y: bytes[5],
            l_analog: bytes[6],
            r_analog: bytes[7],
        }
    }

    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::SIZE] {
        [
            self.buttons_0,
            self.buttons_1,
            self.stick_x,
            self.stick_y,
            self.c_stick_x,
            self.c_stick_y,
            self.l_analog,
            self.r_analog,
        ]
    }

    /// Both button bytes as one bitfield.
    #[inline]
    #[must_use]
    pub const fn buttons(&self) -> ControllerButtons {
        ControllerButtons(u16::from_le_bytes([self.buttons_0, self.buttons_1]))
    }
}
