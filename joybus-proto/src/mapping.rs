//! Axis remapping from controller conventions to HID conventions.
//!
//! The controller reports sticks as unsigned bytes centred near 128 with Y
//! growing upwards. The report declares signed sticks with Y growing
//! downwards, so each axis gets a fixed byte-wide affine transform.

use crate::state::ControllerState;

/// Byte-wide transform applied to one axis. All arithmetic wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisTransform {
    /// Pass the value through.
    Identity,
    /// `value + offset`.
    Offset(u8),
    /// `origin - value`.
    Mirror(u8),
}

impl AxisTransform {
    #[inline]
    #[must_use]
    pub const fn apply(self, value: u8) -> u8 {
        match self {
            Self::Identity => value,
            Self::Offset(offset) => value.wrapping_add(offset),
            Self::Mirror(origin) => origin.wrapping_sub(value),
        }
    }
}

/// Per-axis transforms. Buttons always pass through unchanged.
///
/// Customize this at compile-time by creating your own const.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMapping {
    pub stick_x: AxisTransform,
    pub stick_y: AxisTransform,
    pub c_stick_x: AxisTransform,
    pub c_stick_y: AxisTransform,
    pub l_analog: AxisTransform,
    pub r_analog: AxisTransform,
}

/// Mapping matching the report descriptor's logical ranges.
///
/// - X axes: `+127`
/// - Y axes: `127 - value` (flips up/down)
/// - Shoulders: unchanged, 0-255
pub const DEFAULT_MAPPING: AxisMapping = AxisMapping {
    stick_x: AxisTransform::Offset(127),
    stick_y: AxisTransform::Mirror(127),
    c_stick_x: AxisTransform::Offset(127),
    c_stick_y: AxisTransform::Mirror(127),
    l_analog: AxisTransform::Identity,
    r_analog: AxisTransform::Identity,
};

impl AxisMapping {
    /// Apply the transforms, returning the remapped state.
    #[must_use]
    pub const fn apply(&self, state: &ControllerState) -> ControllerState {
        ControllerState {
            buttons_0: state.buttons_0,
            buttons_1: state.buttons_1,
            stick_x: self.stick_x.apply(state.stick_x),
            stick_y: self.stick_y.apply(state.stick_y),
            c_stick_x: self.c_stick_x.apply(state.c_stick_x),
            c_stick_y: self.c_stick_y.apply(state.c_stick_y),
            l_analog: self.l_analog.apply(state.l_analog),
            r_analog: self.r_analog.apply(state.r_analog),
        }
    }
}

impl Default for AxisMapping {
    fn default() -> Self {
        DEFAULT_MAPPING
    }
}
