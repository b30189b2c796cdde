//! Controller sampler trait and error types.

use joybus_proto::RAW_CAPTURE_LEN;

/// Error type for input operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// The capture did not start with the sync marker; the controller
    /// is missing or was not ready.
    NoSync {
        /// First captured byte.
        leading: u8,
    },
}

/// Bit-level access to the controller bus.
///
/// Implementations drive the single-wire line and sample the response at
/// four samples per bit. Both calls block for the duration of the bus
/// transaction (a few hundred microseconds) and may mask interrupts while
/// they run.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait BusSampler {
    /// Send the identify command to (re)arm the controller.
    fn probe(&mut self);

    /// Send the status poll and fill `capture` with the sampled response.
    ///
    /// Without a controller the capture holds idle-line samples, which fail
    /// the sync check.
    fn poll(&mut self, capture: &mut [u8; RAW_CAPTURE_LEN]);
}
