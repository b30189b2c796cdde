//! Register-level seam between the USB engine and the controller hardware.
//!
//! The engine talks to a banked-FIFO device controller: one endpoint is
//! selected at a time, its status flags are read and acknowledged, and
//! packet data moves a byte at a time through the selected endpoint's FIFO.
//! [`EndpointPort`] captures exactly that surface so the control and report
//! engines run unchanged on silicon or against a simulated port in tests.

use core::ops::{BitAnd, BitOr, BitOrAssign};

use crate::endpoints::EndpointConfig;

/// Per-endpoint interrupt and status flags of the selected endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointStatus(u8);

impl EndpointStatus {
    pub const NONE: Self = Self(0);
    /// Bank handover: clearing it hands the current bank to the hardware.
    pub const FIFO_CONTROL: Self = Self(1 << 7);
    pub const NAK_IN: Self = Self(1 << 6);
    /// The selected IN endpoint has room for another packet.
    pub const WRITE_ALLOWED: Self = Self(1 << 5);
    pub const NAK_OUT: Self = Self(1 << 4);
    /// A setup packet is waiting in the control FIFO.
    pub const SETUP_RECEIVED: Self = Self(1 << 3);
    /// OUT data (or a status-stage handshake) arrived.
    pub const OUT_RECEIVED: Self = Self(1 << 2);
    pub const STALLED: Self = Self(1 << 1);
    /// The IN bank is free; clearing it on the control endpoint sends the bank.
    pub const TX_READY: Self = Self(1 << 0);

    /// Flags released together when a filled report bank is handed to the host.
    pub const REPORT_BANK_RELEASE: Self = Self(
        Self::FIFO_CONTROL.0 | Self::NAK_IN.0 | Self::OUT_RECEIVED.0 | Self::TX_READY.0,
    );

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for EndpointStatus {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EndpointStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EndpointStatus {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Device-level events latched by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceEvents(u8);

impl DeviceEvents {
    pub const NONE: Self = Self(0);
    pub const END_OF_RESET: Self = Self(1 << 3);
    pub const START_OF_FRAME: Self = Self(1 << 2);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for DeviceEvents {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Banked-FIFO USB device controller.
///
/// All FIFO and status operations act on the endpoint chosen by the last
/// [`select`](Self::select). Implementations are only ever driven from
/// inside a critical section, so they need no locking of their own.
pub trait EndpointPort {
    /// Read and clear the latched device-level events.
    fn take_device_events(&mut self) -> DeviceEvents;

    /// Make `endpoint` the target of subsequent endpoint operations.
    fn select(&mut self, endpoint: u8);

    /// Current status flags of the selected endpoint.
    fn status(&mut self) -> EndpointStatus;

    /// Clear `flags` on the selected endpoint in a single write.
    ///
    /// Clearing [`EndpointStatus::TX_READY`] on the control endpoint sends
    /// the bytes written since the last send. Clearing
    /// [`EndpointStatus::FIFO_CONTROL`] on any other endpoint releases its bank.
    fn acknowledge(&mut self, flags: EndpointStatus);

    /// Pop one byte from the selected endpoint's OUT/setup FIFO.
    fn read_byte(&mut self) -> u8;

    /// Push one byte into the selected endpoint's IN FIFO.
    fn write_byte(&mut self, byte: u8);

    /// Answer the selected endpoint's next transaction with STALL.
    fn stall(&mut self);

    /// Apply `config` to the selected endpoint and enable it.
    fn configure(&mut self, config: &EndpointConfig);

    /// Disable the selected endpoint.
    fn disable(&mut self);

    /// Reset the FIFO and data toggle of `endpoint`.
    fn reset_endpoint(&mut self, endpoint: u8);

    /// Raise an endpoint interrupt when the selected endpoint receives a setup packet.
    fn enable_setup_interrupt(&mut self);

    /// Latch the bus address assigned by the host.
    fn set_address(&mut self, address: u8);

    /// Current 11-bit USB frame number.
    fn frame_number(&mut self) -> u16;

    /// Push a run of bytes into the selected endpoint's IN FIFO.
    fn write_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.write_byte(byte);
        }
    }

    /// Spin until any of `flags` is set on the selected endpoint.
    fn wait_for(&mut self, flags: EndpointStatus) -> EndpointStatus {
        loop {
            let status = self.status();
            if status.intersects(flags) {
                return status;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_bank_release_flags() {
        let release = EndpointStatus::REPORT_BANK_RELEASE;
        assert!(release.contains(EndpointStatus::FIFO_CONTROL));
        assert!(release.contains(EndpointStatus::TX_READY));
        assert!(!release.intersects(EndpointStatus::WRITE_ALLOWED));
        assert!(!release.intersects(EndpointStatus::SETUP_RECEIVED));
        assert!(!release.intersects(EndpointStatus::STALLED | EndpointStatus::NAK_OUT));
    }

    #[test]
    fn status_insert_remove() {
        let mut status = EndpointStatus::NONE;
        status.insert(EndpointStatus::TX_READY | EndpointStatus::OUT_RECEIVED);
        assert!(status.contains(EndpointStatus::TX_READY));
        status.remove(EndpointStatus::TX_READY);
        assert!(!status.contains(EndpointStatus::TX_READY));
        assert!(status.intersects(EndpointStatus::TX_READY | EndpointStatus::OUT_RECEIVED));
    }
}
