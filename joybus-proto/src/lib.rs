//! Joybus controller capture decoding and axis mapping.
//!
//! The single-wire controller bus answers a poll with an 8-byte status
//! record. The sampler captures it four samples per bit; this crate turns
//! that capture back into a [`ControllerState`] and remaps its axes into the
//! conventions of the HID report.
//!
//! - [`decode`]: sync check and majority-vote decoding ([`RawCapture`])
//! - [`state`]: the decoded record ([`ControllerState`], [`ControllerButtons`])
//! - [`mapping`]: per-axis transforms ([`AxisMapping`], [`DEFAULT_MAPPING`])
//!
//! # Example
//!
//! ```
//! use joybus_proto::{RawCapture, DEFAULT_MAPPING, SYNC_BYTE};
//!
//! let mut capture = RawCapture::new();
//! capture.as_mut_bytes().fill(SYNC_BYTE);
//! assert!(capture.check_sync().is_ok());
//!
//! let state = DEFAULT_MAPPING.apply(&capture.decode());
//! assert_eq!(state.stick_y, 127);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod decode;
pub mod mapping;
pub mod state;

pub use decode::{
    decode_into, decode_nibble, decode_raw_byte, DecodeError, RawCapture, SyncError,
    BIT_THRESHOLD, RAW_BYTES_PER_BYTE, RAW_CAPTURE_LEN, SYNC_BYTE,
};
pub use mapping::{AxisMapping, AxisTransform, DEFAULT_MAPPING};
pub use state::{ControllerButtons, ControllerState};
