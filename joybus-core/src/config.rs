//! Build-time device configuration.
//!
//! Identity strings, endpoint numbers and timing constants shared by the
//! USB engine and the bridge loop. Everything here is `const` so the
//! descriptor tables can be assembled at compile time.

/// pid.codes test vendor ID.
pub const USB_VID: u16 = 0x1209;
/// Test product ID under the pid.codes vendor.
pub const USB_PID: u16 = 0x0001;
/// Device release number, BCD.
pub const DEVICE_RELEASE: u16 = 0x0100;

pub const MANUFACTURER: &str = "Joybus Adapter";
pub const PRODUCT: &str = "Joybus USB Joypad";

/// Largest control transfer bank, also `bMaxPacketSize0`.
pub const CONTROL_BANK_SIZE: usize = 32;

/// Interrupt IN endpoint carrying joypad reports.
pub const REPORT_ENDPOINT: u8 = 3;
/// Report endpoint buffer size in bytes.
pub const REPORT_ENDPOINT_SIZE: u16 = 8;
/// Host polling interval for the report endpoint, in frames.
pub const REPORT_INTERVAL: u8 = 1;

/// Number of hardware endpoints covered by the endpoint table, control included.
pub const ENDPOINT_COUNT: u8 = 5;

/// Maximum bus current, in 2 mA units.
pub const MAX_POWER: u8 = 50;

/// Idle rate applied at bus reset, in 4 ms units (500 ms).
pub const DEFAULT_IDLE_RATE: u8 = 125;
/// Start-of-frame events per idle tick.
pub const IDLE_FRAME_DIVIDER: u8 = 4;

/// Frames the explicit send path waits for a free bank.
pub const SEND_TIMEOUT_FRAMES: u16 = 50;
/// USB frame numbers are 11 bits wide.
pub const FRAME_NUMBER_MASK: u16 = 0x07ff;

/// Main loop pause before every controller poll.
pub const POLL_INTERVAL_MS: u32 = 8;
/// Extra pause before re-probing after a capture without sync.
pub const REPROBE_DELAY_MS: u32 = 12;
