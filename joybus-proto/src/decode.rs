//! Majority-vote decoding of oversampled Joybus captures.
//!
//! The sampler reads the data line four times per bit period and packs the
//! samples MSB first, so one raw byte holds two encoded bits: the high
//! nibble is the earlier bit, the low nibble the later one. A bit is
//! recovered by counting the high samples in its nibble.
//!
//! ```text
//! bit 0:  low 3/4, high 1/4  ->  0001  (1 sample high)
//! bit 1:  low 1/4, high 3/4  ->  0111  (3 samples high)
//! ```
//!
//! Four raw bytes therefore decode into one byte of controller state.

use crate::state::ControllerState;

/// Raw bytes consumed per decoded byte.
pub const RAW_BYTES_PER_BYTE: usize = 4;

/// A nibble decodes to 1 only when more than this many samples are high.
pub const BIT_THRESHOLD: u32 = 2;

/// Leading raw byte of a capture that started on a bit boundary.
///
/// Two in-phase `0` bits (`0001 0001`). Every response starts with zero
/// bits, so any other value means nobody answered or the capture slipped.
pub const SYNC_BYTE: u8 = 0x11;

/// Size of a full raw capture of one controller response.
pub const RAW_CAPTURE_LEN: usize = ControllerState::SIZE * RAW_BYTES_PER_BYTE;

/// Errors from the buffer-level decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The raw buffer is not exactly four times the destination size.
    LengthMismatch { raw: usize, decoded: usize },
}

/// Capture did not start with [`SYNC_BYTE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncError {
    /// The byte found where the sync marker was expected.
    pub leading: u8,
}

/// Vote one nibble (low four bits of `nibble`) down to a single bit.
///
/// Exactly [`BIT_THRESHOLD`] high samples is a tie and decodes to `false`.
#[inline]
#[must_use]
pub const fn decode_nibble(nibble: u8) -> bool {
    (nibble & 0x0f).count_ones() > BIT_THRESHOLD
}

/// Decode one raw byte into its two bits, earlier bit in bit 1.
#[inline]
#[must_use]
pub const fn decode_raw_byte(raw: u8) -> u8 {
    ((decode_nibble(raw >> 4) as u8) << 1) | decode_nibble(raw) as u8
}

/// Decode `raw` into `out`, four raw bytes per output byte.
///
/// The first raw byte of each group supplies the two most significant bits.
pub fn decode_into(raw: &[u8], out: &mut [u8]) -> Result<(), DecodeError> {
    if raw.len() != out.len() * RAW_BYTES_PER_BYTE {
        return Err(DecodeError::LengthMismatch {
            raw: raw.len(),
            decoded: out.len(),
        });
    }

    decode_groups(raw, out);
    Ok(())
}

fn decode_groups(raw: &[u8], out: &mut [u8]) {
    for (group, byte) in raw.chunks_exact(RAW_BYTES_PER_BYTE).zip(out.iter_mut()) {
        *byte = group
            .iter()
            .fold(0u8, |acc, &sample| (acc << 2) | decode_raw_byte(sample));
    }
}

/// Buffer the sampler fills with one controller response.
///
/// Its contents are only meaningful for the poll cycle that filled it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawCapture(pub [u8; RAW_CAPTURE_LEN]);

impl RawCapture {
    #[must_use]
    pub const fn new() -> Self {
        Self([0; RAW_CAPTURE_LEN])
    }

    /// Destination handed to the sampler.
    #[inline]
    pub fn as_mut_bytes(&mut self) -> &mut [u8; RAW_CAPTURE_LEN] {
        &mut self.0
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; RAW_CAPTURE_LEN] {
        &self.0
    }

    /// First captured byte.
    #[inline]
    #[must_use]
    pub const fn leading(&self) -> u8 {
        self.0[0]
    }

    /// Check that the capture begins with the sync marker.
    #[inline]
    pub const fn check_sync(&self) -> Result<(), SyncError> {
        if self.leading() == SYNC_BYTE {
            Ok(())
        } else {
            Err(SyncError {
                leading: self.leading(),
            })
        }
    }

    /// Decode the whole capture.
    ///
    /// Does not look at the sync marker; callers check it first.
    #[must_use]
    pub fn decode(&self) -> ControllerState {
        let mut bytes = [0u8; ControllerState::SIZE];
        decode_groups(&self.0, &mut bytes);
        ControllerState::from_bytes(bytes)
    }
}

impl Default for RawCapture {
    fn default() -> Self {
        Self::new()
    }
}
