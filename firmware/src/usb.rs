//! RP2040 USB controller as a banked-FIFO [`EndpointPort`].
//!
//! The RP2040 controller keeps endpoint buffers in a dual-port RAM and
//! hands them over through per-buffer `AVAILABLE`/`FULL` bits. This port
//! maps the engine's flag model onto that:
//!
//! - `SETUP_RECEIVED` is `SIE_STATUS.SETUP_REC`; the 8 setup bytes are read
//!   from the start of DPRAM.
//! - `TX_READY`/`WRITE_ALLOWED` mean the IN buffer is not armed.
//! - `OUT_RECEIVED` on endpoint 0 means the host's OUT handshake filled the
//!   OUT buffer armed at setup time.
//! - Acknowledging `TX_READY` on endpoint 0, or `FIFO_CONTROL` elsewhere,
//!   arms the IN buffer with the bytes written so far.

use core::sync::atomic::{compiler_fence, Ordering};

use defmt::{error, info};
use embassy_rp::interrupt::typelevel::{Binding, Handler, Interrupt, USBCTRL_IRQ};
use embassy_rp::pac;
use embassy_rp::pac::usb_dpram::vals::EpControlEndpointType;
use embassy_rp::peripherals::USB;
use embassy_rp::Peri;
use joybus_core::{
    ControlError, DeviceEvents, EndpointConfig, EndpointDirection, EndpointPort, EndpointStatus,
    EndpointType, UsbDevice,
};

/// The device shared by the USB interrupt and the main loop.
pub static USB_DEVICE: UsbDevice<Rp2040Port> = UsbDevice::new(Rp2040Port::new());

const ENDPOINTS: usize = 16;
const SETUP_PACKET_OFFSET: usize = 0x000;
const EP0_BUFFER_OFFSET: usize = 0x100;
const EPX_BUFFER_BASE: usize = 0x180;
const EPX_BUFFER_SIZE: usize = 64;

fn dpram() -> *mut u8 {
    pac::USB_DPRAM.as_ptr() as *mut u8
}

/// Buffer offset for `endpoint` within DPRAM.
const fn buffer_offset(endpoint: u8) -> usize {
    if endpoint == 0 {
        EP0_BUFFER_OFFSET
    } else {
        EPX_BUFFER_BASE + (endpoint as usize - 1) * EPX_BUFFER_SIZE
    }
}

const fn endpoint_type(kind: EndpointType) -> EpControlEndpointType {
    match kind {
        EndpointType::Control => EpControlEndpointType::CONTROL,
        EndpointType::Isochronous => EpControlEndpointType::ISOCHRONOUS,
        EndpointType::Bulk => EpControlEndpointType::BULK,
        EndpointType::Interrupt => EpControlEndpointType::INTERRUPT,
    }
}

pub struct Rp2040Port {
    selected: u8,
    /// Read position within the setup packet.
    setup_cursor: usize,
    /// Bytes written into the selected endpoint's IN buffer.
    tx_len: usize,
    /// Next data PID per IN endpoint, `true` for DATA1.
    in_pid: [bool; ENDPOINTS],
    /// IN endpoints with an enabled configuration.
    enabled: u16,
    /// Last frame number seen at start-of-frame.
    frame: u16,
}

impl Rp2040Port {
    pub const fn new() -> Self {
        Self {
            selected: 0,
            setup_cursor: 0,
            tx_len: 0,
            in_pid: [false; ENDPOINTS],
            enabled: 0,
            frame: 0,
        }
    }

    fn in_buffer_free(&self, endpoint: u8) -> bool {
        !pac::USB_DPRAM
            .ep_in_buffer_control(endpoint as usize)
            .read()
            .available(0)
    }

    /// Hand the bytes written so far to the controller.
    fn arm_in_buffer(&mut self, endpoint: u8) {
        let index = endpoint as usize;
        let pid = self.in_pid[index];
        let len = self.tx_len as u16;
        compiler_fence(Ordering::SeqCst);
        pac::USB_DPRAM.ep_in_buffer_control(index).write(|w| {
            w.set_pid(0, pid);
            w.set_length(0, len);
            w.set_full(0, true);
            w.set_last(0, true);
        });
        // AVAILABLE must be set a few cycles after the rest of the buffer control.
        cortex_m::asm::delay(12);
        pac::USB_DPRAM.ep_in_buffer_control(index).write(|w| {
            w.set_pid(0, pid);
            w.set_length(0, len);
            w.set_full(0, true);
            w.set_last(0, true);
            w.set_available(0, true);
        });
        self.in_pid[index] = !pid;
        self.tx_len = 0;
    }

    /// Accept the host's OUT handshake for the current control transfer.
    fn arm_control_out(&mut self) {
        pac::USB_DPRAM.ep_out_buffer_control(0).write(|w| {
            w.set_pid(0, true);
            w.set_length(0, EPX_BUFFER_SIZE as u16);
        });
        cortex_m::asm::delay(12);
        pac::USB_DPRAM.ep_out_buffer_control(0).write(|w| {
            w.set_pid(0, true);
            w.set_length(0, EPX_BUFFER_SIZE as u16);
            w.set_available(0, true);
        });
    }
}

impl Default for Rp2040Port {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointPort for Rp2040Port {
    fn take_device_events(&mut self) -> DeviceEvents {
        let regs = pac::USB;
        let ints = regs.ints().read();
        let mut events = DeviceEvents::NONE;

        if ints.bus_reset() {
            regs.sie_status().write(|w| w.set_bus_reset(true));
            regs.addr_endp().write(|w| w.set_address(0));
            self.enabled = 0;
            events.insert(DeviceEvents::END_OF_RESET);
        }
        if ints.dev_sof() {
            // Reading SOF_RD clears the interrupt.
            self.frame = regs.sof_rd().read().count();
            events.insert(DeviceEvents::START_OF_FRAME);
        }
        events
    }

    fn select(&mut self, endpoint: u8) {
        if endpoint != self.selected {
            self.tx_len = 0;
        }
        self.selected = endpoint;
    }

    fn status(&mut self) -> EndpointStatus {
        let endpoint = self.selected;
        let mut status = EndpointStatus::NONE;

        if endpoint == 0 {
            if pac::USB.sie_status().read().setup_rec() {
                status.insert(EndpointStatus::SETUP_RECEIVED);
            }
            if pac::USB_DPRAM.ep_out_buffer_control(0).read().full(0) {
                status.insert(EndpointStatus::OUT_RECEIVED);
            }
            if self.in_buffer_free(0) {
                status.insert(EndpointStatus::TX_READY);
            }
        } else if self.enabled & (1 << endpoint) != 0 && self.in_buffer_free(endpoint) {
            status.insert(EndpointStatus::WRITE_ALLOWED | EndpointStatus::TX_READY);
        }
        status
    }

    fn acknowledge(&mut self, flags: EndpointStatus) {
        let endpoint = self.selected;

        if endpoint != 0 {
            if flags.contains(EndpointStatus::FIFO_CONTROL) {
                self.arm_in_buffer(endpoint);
            }
            return;
        }

        if flags.contains(EndpointStatus::SETUP_RECEIVED) {
            pac::USB.sie_status().write(|w| w.set_setup_rec(true));
            pac::USB_DPRAM.ep_in_buffer_control(0).write(|_| {});
            self.setup_cursor = 0;
            self.tx_len = 0;
            // Data and status stages after SETUP start with DATA1.
            self.in_pid[0] = true;
            self.arm_control_out();
        } else if flags.contains(EndpointStatus::TX_READY) {
            self.arm_in_buffer(0);
        } else if flags.contains(EndpointStatus::OUT_RECEIVED) {
            pac::USB_DPRAM.ep_out_buffer_control(0).write(|_| {});
        }
    }

    fn read_byte(&mut self) -> u8 {
        let offset = SETUP_PACKET_OFFSET + self.setup_cursor;
        self.setup_cursor += 1;
        // SAFETY: offset stays inside the 8-byte setup packet area of DPRAM.
        unsafe { dpram().add(offset).read_volatile() }
    }

    fn write_byte(&mut self, byte: u8) {
        if self.tx_len >= EPX_BUFFER_SIZE {
            return;
        }
        let offset = buffer_offset(self.selected) + self.tx_len;
        // SAFETY: offset is inside the selected endpoint's 64-byte buffer.
        unsafe { dpram().add(offset).write_volatile(byte) };
        self.tx_len += 1;
    }

    fn stall(&mut self) {
        let endpoint = self.selected as usize;
        if endpoint == 0 {
            pac::USB.ep_stall_arm().write(|w| {
                w.set_ep0_in(true);
                w.set_ep0_out(true);
            });
            pac::USB_DPRAM.ep_out_buffer_control(0).write(|w| w.set_stall(true));
        }
        pac::USB_DPRAM
            .ep_in_buffer_control(endpoint)
            .write(|w| w.set_stall(true));
    }

    fn configure(&mut self, config: &EndpointConfig) {
        let endpoint = self.selected;
        if endpoint == 0 {
            // Endpoint 0 has fixed buffers and no control register.
            pac::USB_DPRAM.ep_in_buffer_control(0).write(|_| {});
            pac::USB_DPRAM.ep_out_buffer_control(0).write(|_| {});
            self.in_pid[0] = false;
            return;
        }

        let index = endpoint as usize - 1;
        let offset = buffer_offset(endpoint) as u16;
        let kind = endpoint_type(config.kind);
        let control = match config.direction {
            EndpointDirection::In => pac::USB_DPRAM.ep_in_control(index),
            EndpointDirection::Out => pac::USB_DPRAM.ep_out_control(index),
        };
        control.write(|w| {
            w.set_enable(config.enabled);
            w.set_endpoint_type(kind);
            w.set_buffer_address(offset);
        });
        if config.enabled && config.direction == EndpointDirection::In {
            self.enabled |= 1 << endpoint;
        }
    }

    fn disable(&mut self) {
        let endpoint = self.selected;
        if endpoint == 0 {
            return;
        }
        let index = endpoint as usize - 1;
        pac::USB_DPRAM.ep_in_control(index).write(|_| {});
        pac::USB_DPRAM.ep_out_control(index).write(|_| {});
        self.enabled &= !(1 << endpoint);
    }

    /// Clears the buffer (and with it any stall) and restarts at DATA0.
    fn reset_endpoint(&mut self, endpoint: u8) {
        let index = endpoint as usize;
        pac::USB_DPRAM.ep_in_buffer_control(index).write(|_| {});
        pac::USB_DPRAM.ep_out_buffer_control(index).write(|_| {});
        self.in_pid[index] = false;
        if endpoint == self.selected {
            self.tx_len = 0;
        }
    }

    fn enable_setup_interrupt(&mut self) {
        pac::USB.inte().modify(|w| w.set_setup_req(true));
    }

    fn set_address(&mut self, address: u8) {
        pac::USB.addr_endp().write(|w| w.set_address(address));
    }

    fn frame_number(&mut self) -> u16 {
        self.frame
    }
}

/// USB interrupt handler: device events first, then the control endpoint.
pub struct InterruptHandler;

impl Handler<USBCTRL_IRQ> for InterruptHandler {
    unsafe fn on_interrupt() {
        USB_DEVICE.on_device_event();
        if let Err(e) = USB_DEVICE.on_endpoint_event() {
            halt(e);
        }
    }
}

/// An unanswerable control request leaves the host out of step; stop here.
fn halt(e: ControlError) -> ! {
    error!("fatal: {:?}", e);
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

/// Bring up the USB controller in device mode and connect to the bus.
pub fn start(
    _usb: Peri<'static, USB>,
    _irq: impl Binding<USBCTRL_IRQ, InterruptHandler>,
) {
    let regs = pac::USB;

    // Start from a clean register block and endpoint table.
    // SAFETY: the controller is disabled and owned through `_usb`.
    unsafe {
        let words = regs.as_ptr() as *mut u32;
        for i in 0..0x9c / 4 {
            words.add(i).write_volatile(0);
        }
        let words = pac::USB_DPRAM.as_ptr() as *mut u32;
        for i in 0..0x100 / 4 {
            words.add(i).write_volatile(0);
        }
    }

    regs.usb_muxing().write(|w| {
        w.set_to_phy(true);
        w.set_softcon(true);
    });
    regs.usb_pwr().write(|w| {
        w.set_vbus_detect(true);
        w.set_vbus_detect_override_en(true);
    });
    regs.main_ctrl().write(|w| w.set_controller_en(true));
    regs.sie_ctrl().write(|w| w.set_ep0_int_1buf(true));
    regs.inte().write(|w| {
        w.set_bus_reset(true);
        w.set_setup_req(true);
        w.set_dev_sof(true);
    });

    USBCTRL_IRQ::unpend();
    // SAFETY: the handler only touches `USB_DEVICE` through its critical section.
    unsafe { USBCTRL_IRQ::enable() };

    regs.sie_ctrl().modify(|w| w.set_pullup_en(true));
    info!("USB pull-up enabled, waiting for host");
}
