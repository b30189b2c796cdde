//! Static descriptor blobs and the GET_DESCRIPTOR lookup table.
//!
//! Every blob is assembled at compile time from [`crate::config`]. The
//! HID report descriptor is written out by hand; its layout must match
//! [`JoypadReport`](crate::report::JoypadReport) byte for byte.

use crate::config::{
    CONTROL_BANK_SIZE, DEVICE_RELEASE, MANUFACTURER, MAX_POWER, PRODUCT, REPORT_ENDPOINT,
    REPORT_ENDPOINT_SIZE, REPORT_INTERVAL, USB_PID, USB_VID,
};
use crate::request::descriptor_type;

/// US English.
pub const LANGUAGE_ID: u16 = 0x0409;

pub const MANUFACTURER_STRING_INDEX: u8 = 1;
pub const PRODUCT_STRING_INDEX: u8 = 2;

/// HID report descriptor: one gamepad application collection.
///
/// 12 one-bit buttons with padding, four signed 8-bit axes and two
/// unsigned 8-bit triggers, 8 bytes per report.
pub const REPORT_DESCRIPTOR: [u8; 83] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    0xA1, 0x00, //   Collection (Physical)
    // Byte 0: buttons 1-5, 3 bits padding
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (1)
    0x29, 0x05, //     Usage Maximum (5)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x05, //     Report Count (5)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x75, 0x03, //     Report Size (3)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x03, //     Input (Constant)
    // Byte 1: buttons 6-12, 1 bit padding
    0x19, 0x06, //     Usage Minimum (6)
    0x29, 0x0C, //     Usage Maximum (12)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x07, //     Report Count (7)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x03, //     Input (Constant)
    // Bytes 2-5: X, Y, Z, Rx (signed)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x32, //     Usage (Z)
    0x09, 0x33, //     Usage (Rx)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x04, //     Report Count (4)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    // Bytes 6-7: Ry, Rz (unsigned)
    0x09, 0x34, //     Usage (Ry)
    0x09, 0x35, //     Usage (Rz)
    0x15, 0x00, //     Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //           End Collection
    0xC0, //         End Collection
];

pub const DEVICE_DESCRIPTOR: [u8; 18] = {
    let vid = USB_VID.to_le_bytes();
    let pid = USB_PID.to_le_bytes();
    let release = DEVICE_RELEASE.to_le_bytes();
    [
        18,
        descriptor_type::DEVICE,
        0x00, 0x02, // bcdUSB 2.00
        0x00, // class defined per interface
        0x00,
        0x00,
        CONTROL_BANK_SIZE as u8,
        vid[0], vid[1],
        pid[0], pid[1],
        release[0], release[1],
        MANUFACTURER_STRING_INDEX,
        PRODUCT_STRING_INDEX,
        0, // no serial number
        1, // one configuration
    ]
};

const CONFIGURATION_HEADER_LEN: usize = 9;
const INTERFACE_LEN: usize = 9;
const HID_LEN: usize = 9;
const ENDPOINT_LEN: usize = 7;
const CONFIGURATION_TOTAL_LEN: usize =
    CONFIGURATION_HEADER_LEN + INTERFACE_LEN + HID_LEN + ENDPOINT_LEN;

pub const HID_DESCRIPTOR: [u8; HID_LEN] = {
    let report_len = (REPORT_DESCRIPTOR.len() as u16).to_le_bytes();
    [
        HID_LEN as u8,
        descriptor_type::HID,
        0x01, 0x01, // bcdHID 1.01
        0x00, // not localized
        1,    // one class descriptor
        descriptor_type::HID_REPORT,
        report_len[0], report_len[1],
    ]
};

/// Configuration, interface, HID and endpoint descriptors as one bundle.
pub const CONFIGURATION_DESCRIPTOR: [u8; CONFIGURATION_TOTAL_LEN] = {
    let total = (CONFIGURATION_TOTAL_LEN as u16).to_le_bytes();
    let header = [
        CONFIGURATION_HEADER_LEN as u8,
        descriptor_type::CONFIGURATION,
        total[0], total[1],
        1,    // one interface
        1,    // bConfigurationValue
        0,    // no string
        0x80, // bus powered
        MAX_POWER,
    ];
    let interface = [
        INTERFACE_LEN as u8,
        descriptor_type::INTERFACE,
        0, // interface number
        0, // alternate setting
        1, // one endpoint
        0x03, // HID
        0x00, // no subclass
        0x00, // no boot protocol
        0,
    ];
    let endpoint = [
        ENDPOINT_LEN as u8,
        descriptor_type::ENDPOINT,
        0x80 | REPORT_ENDPOINT,
        0x03, // interrupt
        REPORT_ENDPOINT_SIZE as u8, 0x00,
        REPORT_INTERVAL,
    ];

    let parts: [&[u8]; 4] = [&header, &interface, &HID_DESCRIPTOR, &endpoint];
    let mut out = [0u8; CONFIGURATION_TOTAL_LEN];
    let mut at = 0;
    let mut p = 0;
    while p < parts.len() {
        let part = parts[p];
        let mut i = 0;
        while i < part.len() {
            out[at] = part[i];
            at += 1;
            i += 1;
        }
        p += 1;
    }
    out
};

/// Build a string descriptor from ASCII text. `N` must be `2 + 2 * text.len()`.
const fn string_descriptor<const N: usize>(text: &str) -> [u8; N] {
    let bytes = text.as_bytes();
    assert!(N == 2 + 2 * bytes.len());
    assert!(N <= 255);
    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = descriptor_type::STRING;
    let mut i = 0;
    while i < bytes.len() {
        out[2 + 2 * i] = bytes[i];
        i += 1;
    }
    out
}

pub const LANGUAGE_DESCRIPTOR: [u8; 4] = {
    let lang = LANGUAGE_ID.to_le_bytes();
    [4, descriptor_type::STRING, lang[0], lang[1]]
};

pub const MANUFACTURER_DESCRIPTOR: [u8; 2 + 2 * MANUFACTURER.len()] =
    string_descriptor(MANUFACTURER);

pub const PRODUCT_DESCRIPTOR: [u8; 2 + 2 * PRODUCT.len()] = string_descriptor(PRODUCT);

/// One GET_DESCRIPTOR answer, keyed by the request's `wValue` and `wIndex`.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorEntry {
    pub value: u16,
    pub index: u16,
    pub data: &'static [u8],
}

const fn selector(kind: u8, index: u8) -> u16 {
    (kind as u16) << 8 | index as u16
}

pub static DESCRIPTOR_TABLE: [DescriptorEntry; 7] = [
    DescriptorEntry {
        value: selector(descriptor_type::DEVICE, 0),
        index: 0,
        data: &DEVICE_DESCRIPTOR,
    },
    DescriptorEntry {
        value: selector(descriptor_type::CONFIGURATION, 0),
        index: 0,
        data: &CONFIGURATION_DESCRIPTOR,
    },
    DescriptorEntry {
        value: selector(descriptor_type::HID, 0),
        index: 0,
        data: &HID_DESCRIPTOR,
    },
    DescriptorEntry {
        value: selector(descriptor_type::HID_REPORT, 0),
        index: 0,
        data: &REPORT_DESCRIPTOR,
    },
    DescriptorEntry {
        value: selector(descriptor_type::STRING, 0),
        index: 0,
        data: &LANGUAGE_DESCRIPTOR,
    },
    DescriptorEntry {
        value: selector(descriptor_type::STRING, MANUFACTURER_STRING_INDEX),
        index: LANGUAGE_ID,
        data: &MANUFACTURER_DESCRIPTOR,
    },
    DescriptorEntry {
        value: selector(descriptor_type::STRING, PRODUCT_STRING_INDEX),
        index: LANGUAGE_ID,
        data: &PRODUCT_DESCRIPTOR,
    },
];

/// Find the descriptor answering a GET_DESCRIPTOR with this `wValue`/`wIndex`.
pub fn find_descriptor(value: u16, index: u16) -> Option<&'static [u8]> {
    DESCRIPTOR_TABLE
        .iter()
        .find(|entry| entry.value == value && entry.index == index)
        .map(|entry| entry.data)
}
