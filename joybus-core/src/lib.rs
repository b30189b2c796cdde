//! Platform-agnostic USB HID joypad engine and controller bridge.
//!
//! This crate holds everything between the controller wire and the USB
//! controller registers that does not depend on a particular chip. It runs
//! in embedded `no_std` firmware and on host for testing.
//!
//! # Overview
//!
//! - [`port`]: register-level seam to a banked-FIFO USB controller ([`EndpointPort`])
//! - [`device`]: shared device record and interrupt entry points ([`UsbDevice`])
//! - [`control`]: control endpoint requests ([`ControlRequest`])
//! - [`report`]: the 8-byte report and idle resends ([`JoypadReport`])
//! - [`descriptors`]: descriptor blobs and lookup ([`find_descriptor`])
//! - [`endpoints`]: endpoint configuration table
//! - [`input`]: controller sampler trait ([`BusSampler`])
//! - [`output`]: report sink trait and USB sink ([`OutputSink`], [`UsbHidOutput`])
//! - [`bridge`]: the poll-decode-send loop ([`JoypadBridge`])
//! - [`config`]: identity and timing constants
//!
//! # Concurrency
//!
//! [`UsbDevice`] is meant to live in a `static`. Interrupt handlers and the
//! main loop reach it only through `critical_section::with`, so the
//! platform must provide a `critical-section` implementation.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt (embedded)
//! - **`log`**: Log through the log crate (host)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod bridge;
pub mod config;
pub mod control;
pub mod descriptors;
pub mod device;
pub mod endpoints;
pub mod input;
pub mod output;
pub mod port;
pub mod report;
pub mod request;

#[cfg(test)]
mod sim;

pub use bridge::{BridgeError, JoypadBridge};
pub use control::{ControlError, ControlRequest, DataStage};
pub use descriptors::find_descriptor;
pub use device::{DeviceState, HostSettings, UsbDevice};
pub use endpoints::{EndpointConfig, EndpointDirection, EndpointType};
pub use input::{BusSampler, InputError};
pub use output::{OutputError, OutputSink, UsbHidOutput};
pub use port::{DeviceEvents, EndpointPort, EndpointStatus};
pub use report::{JoypadReport, SendError};
pub use request::UsbRequest;

// Re-export the decoding crate for convenience
pub use joybus_proto;
