//! Endpoint configuration table.

use crate::config::{CONTROL_BANK_SIZE, ENDPOINT_COUNT, REPORT_ENDPOINT, REPORT_ENDPOINT_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointDirection {
    Out,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BankCount {
    Single,
    Double,
}

/// Hardware setup for one endpoint number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointConfig {
    pub enabled: bool,
    pub kind: EndpointType,
    pub direction: EndpointDirection,
    /// Buffer size in bytes.
    pub size: u16,
    pub banks: BankCount,
    /// Reserve endpoint memory when configuring.
    pub allocate: bool,
}

impl EndpointConfig {
    pub const DISABLED: Self = Self {
        enabled: false,
        kind: EndpointType::Control,
        direction: EndpointDirection::Out,
        size: 8,
        banks: BankCount::Single,
        allocate: false,
    };
}

/// Endpoint 0, configured on every bus reset.
pub const CONTROL_ENDPOINT: EndpointConfig = EndpointConfig {
    enabled: true,
    kind: EndpointType::Control,
    direction: EndpointDirection::Out,
    size: CONTROL_BANK_SIZE as u16,
    banks: BankCount::Single,
    allocate: true,
};

/// Interrupt IN endpoint carrying joypad reports.
pub const REPORT_IN_ENDPOINT: EndpointConfig = EndpointConfig {
    enabled: true,
    kind: EndpointType::Interrupt,
    direction: EndpointDirection::In,
    size: REPORT_ENDPOINT_SIZE,
    banks: BankCount::Single,
    allocate: true,
};

/// Configuration per endpoint number. Entries 1.. are applied on SET_CONFIGURATION.
pub static ENDPOINT_TABLE: [EndpointConfig; ENDPOINT_COUNT as usize] = {
    let mut table = [EndpointConfig::DISABLED; ENDPOINT_COUNT as usize];
    table[0] = CONTROL_ENDPOINT;
    table[REPORT_ENDPOINT as usize] = REPORT_IN_ENDPOINT;
    table
};

/// Table entry for `endpoint`, if it is within the table.
pub fn endpoint_config(endpoint: u8) -> Option<&'static EndpointConfig> {
    ENDPOINT_TABLE.get(endpoint as usize)
}
