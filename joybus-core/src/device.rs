//! The shared device record and its entry points.
//!
//! [`UsbDevice`] owns the port, the host-negotiated settings and the current
//! report behind a critical-section mutex. The two interrupt handlers call
//! [`UsbDevice::on_device_event`] and [`UsbDevice::on_endpoint_event`]; the
//! main loop calls [`UsbDevice::publish`] and [`UsbDevice::send_report`].
//! Every access runs with interrupts masked, so the report can never be
//! observed half-written.
//!
//! ```ignore
//! static USB: UsbDevice<Rp2040Port> = UsbDevice::new(Rp2040Port::new());
//!
//! #[interrupt]
//! fn USBCTRL_IRQ() {
//!     USB.on_device_event();
//!     if let Err(e) = USB.on_endpoint_event() {
//!         halt(e);
//!     }
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;

use crate::config::{DEFAULT_IDLE_RATE, FRAME_NUMBER_MASK, REPORT_ENDPOINT, SEND_TIMEOUT_FRAMES};
use crate::control::ControlError;
use crate::endpoints::CONTROL_ENDPOINT;
use crate::port::{DeviceEvents, EndpointPort, EndpointStatus};
use crate::report::{JoypadReport, SendError};

/// Enumeration progress as seen by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// No bus reset seen yet.
    Detached,
    /// Reset, answering on address 0.
    Default,
    Addressed,
    /// A non-zero configuration is selected; reports flow.
    Configured,
}

/// Settings negotiated with the host, cleared on every bus reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostSettings {
    /// Selected configuration; 0 means unconfigured.
    pub configuration: u8,
    /// Idle period in 4 ms units; 0 disables idle resends.
    pub idle_rate: u8,
    /// Elapsed 4 ms ticks since the last report.
    pub idle_counter: u8,
    /// Start-of-frame events since the last idle tick.
    pub frame_divider: u8,
}

impl HostSettings {
    pub const fn new() -> Self {
        Self {
            configuration: 0,
            idle_rate: DEFAULT_IDLE_RATE,
            idle_counter: 0,
            frame_divider: 0,
        }
    }

    pub const fn is_configured(&self) -> bool {
        self.configuration != 0
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct DeviceContext<P> {
    pub(crate) port: P,
    pub(crate) state: DeviceState,
    pub(crate) settings: HostSettings,
    pub(crate) report: JoypadReport,
}

impl<P: EndpointPort> DeviceContext<P> {
    fn handle_device_events(&mut self) {
        let events = self.port.take_device_events();
        if events.contains(DeviceEvents::END_OF_RESET) {
            self.bus_reset();
        }
        if events.contains(DeviceEvents::START_OF_FRAME) {
            self.start_of_frame();
        }
    }

    fn bus_reset(&mut self) {
        self.port.select(0);
        self.port.configure(&CONTROL_ENDPOINT);
        self.port.enable_setup_interrupt();
        self.settings = HostSettings::new();
        self.state = DeviceState::Default;
        debug!("bus reset");
    }
}

/// USB HID joypad shared between interrupt handlers and the main loop.
pub struct UsbDevice<P> {
    inner: Mutex<RefCell<DeviceContext<P>>>,
}

impl<P> UsbDevice<P> {
    pub const fn new(port: P) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(DeviceContext {
                port,
                state: DeviceState::Detached,
                settings: HostSettings::new(),
                report: JoypadReport {
                    buttons_0: 0,
                    buttons_1: 0,
                    x: 0,
                    y: 0,
                    z: 0,
                    rx: 0,
                    ry: 0,
                    rz: 0,
                },
            })),
        }
    }

    fn lock<R>(&self, f: impl FnOnce(&mut DeviceContext<P>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    pub fn state(&self) -> DeviceState {
        self.lock(|ctx| ctx.state)
    }

    pub fn is_configured(&self) -> bool {
        self.lock(|ctx| ctx.settings.is_configured())
    }

    pub fn settings(&self) -> HostSettings {
        self.lock(|ctx| ctx.settings)
    }

    /// The report the next transmission will carry.
    pub fn report(&self) -> JoypadReport {
        self.lock(|ctx| ctx.report)
    }

    /// Run `f` on the port with interrupts masked, e.g. for controller bring-up.
    pub fn with_port<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        self.lock(|ctx| f(&mut ctx.port))
    }
}

impl<P: EndpointPort> UsbDevice<P> {
    /// General device interrupt: bus reset and start-of-frame.
    pub fn on_device_event(&self) {
        self.lock(DeviceContext::handle_device_events);
    }

    /// Endpoint interrupt: answer a pending setup packet.
    pub fn on_endpoint_event(&self) -> Result<(), ControlError> {
        self.lock(DeviceContext::handle_control)
    }

    /// Replace the current report. It goes out on the next idle resend,
    /// GET_REPORT or [`send_report`](Self::send_report).
    pub fn publish(&self, report: JoypadReport) {
        self.lock(|ctx| ctx.report = report);
    }

    /// Push the current report to the host now.
    ///
    /// Waits up to [`SEND_TIMEOUT_FRAMES`] frames for a free bank,
    /// releasing the lock between polls so USB interrupts keep running.
    pub fn send_report(&self) -> Result<(), SendError> {
        let start = self.lock(|ctx| {
            if !ctx.settings.is_configured() {
                return Err(SendError::NotConfigured);
            }
            Ok(ctx.port.frame_number())
        })?;

        loop {
            let sent = self.lock(|ctx| {
                ctx.port.select(REPORT_ENDPOINT);
                if !ctx.port.status().contains(EndpointStatus::WRITE_ALLOWED) {
                    return false;
                }
                ctx.write_report();
                ctx.settings.idle_counter = 0;
                true
            });
            if sent {
                return Ok(());
            }

            self.lock(|ctx| {
                if !ctx.settings.is_configured() {
                    return Err(SendError::NotConfigured);
                }
                let elapsed = ctx.port.frame_number().wrapping_sub(start) & FRAME_NUMBER_MASK;
                if elapsed >= SEND_TIMEOUT_FRAMES {
                    return Err(SendError::Timeout);
                }
                Ok(())
            })?;
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::request::UsbRequest;
    use crate::sim::{Op, SimPort};

    fn configured() -> UsbDevice<SimPort> {
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
        device
    }

    fn report_status_reads(port: &SimPort) -> usize {
        port.ops
            .iter()
            .filter(|op| matches!(op, Op::Status(ep, _) if *ep == REPORT_ENDPOINT))
            .count()
    }

    #[test]
    fn starts_detached() {
        let device = UsbDevice::new(SimPort::new());
        assert_eq!(device.state(), DeviceState::Detached);
        assert!(!device.is_configured());
        assert_eq!(device.settings(), HostSettings::new());
    }

    #[test]
    fn bus_reset_configures_control_endpoint() {
        let device = UsbDevice::new(SimPort::new());
        device.with_port(SimPort::bus_reset);
        device.on_device_event();

        assert_eq!(device.state(), DeviceState::Default);
        device.with_port(|port| {
            assert_eq!(port.endpoints[0].config, Some(CONTROL_ENDPOINT));
            assert!(port.endpoints[0].setup_interrupt);
            assert_eq!(port.selected, 0);
        });
    }

    #[test]
    fn bus_reset_clears_host_settings() {
        let device = configured();
        device.with_port(|port| {
            port.setup(UsbRequest {
                request_type: 0x21,
                request: 0x0a,
                value: 0x0500,
                index: 0,
                length: 0,
            })
        });
        device.on_endpoint_event().unwrap();
        assert_eq!(device.settings().idle_rate, 5);

        device.with_port(SimPort::bus_reset);
        device.on_device_event();
        assert!(!device.is_configured());
        assert_eq!(device.settings().idle_rate, DEFAULT_IDLE_RATE);
        assert_eq!(device.state(), DeviceState::Default);
    }

    #[test]
    fn send_before_configuration() {
        let device = UsbDevice::new(SimPort::new());
        assert_eq!(device.send_report(), Err(SendError::NotConfigured));
        device.with_port(|port| assert_eq!(report_status_reads(port), 0));
    }

    #[test]
    fn send_after_deconfiguration() {
        let device = configured();
        device.with_port(|port| {
            port.setup(UsbRequest {
                request_type: 0x00,
                request: 0x09,
                value: 0,
                index: 0,
                length: 0,
            })
        });
        device.on_endpoint_event().unwrap();

        assert_eq!(device.send_report(), Err(SendError::NotConfigured));
        device.with_port(|port| {
            assert_eq!(report_status_reads(port), 0);
            assert!(port.endpoints[REPORT_ENDPOINT as usize].banks.is_empty());
        });
    }

    #[test]
    fn send_writes_report_and_resets_idle() {
        let device = configured();
        let report = JoypadReport {
            buttons_0: 1,
            y: -3,
            ..JoypadReport::default()
        };
        device.publish(report);
        for _ in 0..8 {
            device.with_port(SimPort::start_of_frame);
            device.on_device_event();
        }
        assert_eq!(device.settings().idle_counter, 2);

        assert_eq!(device.send_report(), Ok(()));
        assert_eq!(device.settings().idle_counter, 0);
        device.with_port(|port| {
            let banks = &port.endpoints[REPORT_ENDPOINT as usize].banks;
            assert_eq!(banks.len(), 1);
            assert_eq!(banks[0], report.to_bytes());
        });
    }

    #[test]
    fn send_times_out_after_fifty_frames() {
        let device = configured();
        device.with_port(|port| port.host_busy = true);
        assert_eq!(device.send_report(), Err(SendError::Timeout));
        device.with_port(|port| {
            assert_eq!(report_status_reads(port), SEND_TIMEOUT_FRAMES as usize);
            assert!(port.endpoints[REPORT_ENDPOINT as usize].banks.is_empty());
        });
    }

    #[test]
    fn send_timeout_survives_frame_wrap() {
        let device = configured();
        device.with_port(|port| {
            port.host_busy = true;
            port.frame = FRAME_NUMBER_MASK - 8;
        });
        assert_eq!(device.send_report(), Err(SendError::Timeout));
        device.with_port(|port| {
            assert_eq!(report_status_reads(port), SEND_TIMEOUT_FRAMES as usize);
        });
    }

    #[test]
    fn send_succeeds_once_bank_frees() {
        let device = configured();
        device.with_port(|port| {
            port.host_busy = true;
            port.free_after_status_reads = Some(10);
        });
        assert_eq!(device.send_report(), Ok(()));
        device.with_port(|port| {
            assert_eq!(port.endpoints[REPORT_ENDPOINT as usize].banks.len(), 1);
        });
    }
}
