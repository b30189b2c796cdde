//! Output sink trait and the USB HID sink.

use core::future::Future;

use crate::device::UsbDevice;
use crate::port::EndpointPort;
use crate::report::{JoypadReport, SendError};

/// Error type for output operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputError {
    /// Device not ready (USB not enumerated).
    NotConfigured,
    /// The host did not collect the previous report in time.
    Timeout,
}

impl From<SendError> for OutputError {
    fn from(e: SendError) -> Self {
        match e {
            SendError::NotConfigured => Self::NotConfigured,
            SendError::Timeout => Self::Timeout,
        }
    }
}

/// Async trait for joypad report sinks.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait OutputSink {
    /// Send a report to the output.
    ///
    /// May block until the previous report has been collected.
    fn send(&mut self, report: &JoypadReport) -> impl Future<Output = Result<(), OutputError>>;

    /// Check if the output is ready to accept data.
    fn is_ready(&self) -> bool;
}

/// USB HID output backed by a shared [`UsbDevice`].
///
/// Each send replaces the device's current report and pushes it to the
/// host straight away.
pub struct UsbHidOutput<'d, P> {
    device: &'d UsbDevice<P>,
}

impl<'d, P> UsbHidOutput<'d, P> {
    pub fn new(device: &'d UsbDevice<P>) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &'d UsbDevice<P> {
        self.device
    }
}

impl<P: EndpointPort> OutputSink for UsbHidOutput<'_, P> {
    async fn send(&mut self, report: &JoypadReport) -> Result<(), OutputError> {
        self.device.publish(*report);
        self.device.send_report().map_err(OutputError::from)
    }

    fn is_ready(&self) -> bool {
        self.device.is_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::tests::block_on;
    use crate::config::REPORT_ENDPOINT;
    use crate::request::UsbRequest;
    use crate::sim::SimPort;

    #[test]
    fn usb_output_requires_configuration() {
        let device = UsbDevice::new(SimPort::new());
        let mut output = UsbHidOutput::new(&device);
        assert!(!output.is_ready());

        let report = JoypadReport {
            x: 5,
            ..JoypadReport::default()
        };
        let result = block_on(output.send(&report));
        assert_eq!(result, Err(OutputError::NotConfigured));
        // still stored for the first GET_REPORT
        assert_eq!(device.report(), report);
    }

    #[test]
    fn usb_output_sends_to_report_endpoint() {
        let device = UsbDevice::new(SimPort::new());
        device.with_port(SimPort::bus_reset);
        device.on_device_event();
        device.with_port(|port| {
            port.setup(UsbRequest {
                request_type: 0x00,
                request: 0x09,
                value: 1,
                index: 0,
                length: 0,
            })
        });
        device.on_endpoint_event().unwrap();

        let mut output = UsbHidOutput::new(&device);
        assert!(output.is_ready());
        let report = JoypadReport {
            buttons_1: 0x04,
            rz: 99,
            ..JoypadReport::default()
        };
        assert_eq!(block_on(output.send(&report)), Ok(()));
        device.with_port(|port| {
            assert_eq!(port.endpoints[REPORT_ENDPOINT as usize].banks[0], report.to_bytes());
        });
    }

    #[test]
    fn send_errors_convert() {
        assert_eq!(OutputError::from(SendError::Timeout), OutputError::Timeout);
        assert_eq!(
            OutputError::from(SendError::NotConfigured),
            OutputError::NotConfigured
        );
    }
}
