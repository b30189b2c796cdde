//! Joypad report and the interrupt IN report engine.

use joybus_proto::{AxisMapping, ControllerState, DEFAULT_MAPPING};

use crate::config::{IDLE_FRAME_DIVIDER, REPORT_ENDPOINT};
use crate::device::DeviceContext;
use crate::port::{EndpointPort, EndpointStatus};

/// The 8-byte HID input report, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JoypadReport {
    /// Buttons 1-5 in bits 0-4.
    pub buttons_0: u8,
    /// Buttons 6-12 in bits 0-6.
    pub buttons_1: u8,
    pub x: i8,
    pub y: i8,
    pub z: i8,
    pub rx: i8,
    pub ry: u8,
    pub rz: u8,
}

impl JoypadReport {
    pub const SIZE: usize = 8;

    pub const fn to_bytes(&self) -> [u8; Self::SIZE] {
        [
            self.buttons_0,
            self.buttons_1,
            self.x as u8,
            self.y as u8,
            self.z as u8,
            self.rx as u8,
            self.ry,
            self.rz,
        ]
    }

    /// Build a report from a decoded controller record.
    ///
    /// Main stick goes to X/Y, C-stick to Z/Rx, analog triggers to Ry/Rz.
    pub const fn from_state(state: &ControllerState, mapping: &AxisMapping) -> Self {
        let mapped = mapping.apply(state);
        Self {
            buttons_0: mapped.buttons_0,
            buttons_1: mapped.buttons_1,
            x: mapped.stick_x as i8,
            y: mapped.stick_y as i8,
            z: mapped.c_stick_x as i8,
            rx: mapped.c_stick_y as i8,
            ry: mapped.l_analog,
            rz: mapped.r_analog,
        }
    }
}

impl From<&ControllerState> for JoypadReport {
    fn from(state: &ControllerState) -> Self {
        Self::from_state(state, &DEFAULT_MAPPING)
    }
}

/// Failures of the explicit report send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// The host has not selected a configuration.
    NotConfigured,
    /// The report bank stayed busy for the whole timeout window.
    Timeout,
}

impl<P: EndpointPort> DeviceContext<P> {
    /// Start-of-frame tick: resend the current report when the idle period expires.
    pub(crate) fn start_of_frame(&mut self) {
        let settings = &mut self.settings;
        if !settings.is_configured() || settings.idle_rate == 0 {
            return;
        }

        settings.frame_divider = settings.frame_divider.wrapping_add(1);
        if settings.frame_divider % IDLE_FRAME_DIVIDER != 0 {
            return;
        }
        settings.idle_counter = settings.idle_counter.saturating_add(1);
        if settings.idle_counter < settings.idle_rate {
            return;
        }
        settings.idle_counter = 0;

        self.port.select(REPORT_ENDPOINT);
        if self.port.status().contains(EndpointStatus::WRITE_ALLOWED) {
            self.write_report();
        }
    }

    /// Fill the selected report bank and hand it to the host.
    pub(crate) fn write_report(&mut self) {
        let bytes = self.report.to_bytes();
        self.port.write_bytes(&bytes);
        self.port.acknowledge(EndpointStatus::REPORT_BANK_RELEASE);
    }
}
