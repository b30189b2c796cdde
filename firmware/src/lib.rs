//! Joybus controller to USB HID joypad adapter for RP2040.
//!
//! The USB side runs the register-level engine from `joybus-core` on the
//! RP2040 controller; the controller side bit-bangs the Joybus line.

#![no_std]

// Re-export core types for convenience
pub use joybus_core::{
    BridgeError, BusSampler, DeviceState, InputError, JoypadBridge, JoypadReport, OutputError,
    OutputSink, UsbHidOutput,
};

pub mod joybus;
pub mod usb;

pub use joybus::JoybusSampler;
pub use usb::{Rp2040Port, USB_DEVICE};
