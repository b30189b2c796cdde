//! Simulated banked-FIFO controller used by the unit tests.
//!
//! Behaves like a host that answers instantly: the control IN bank frees
//! right after it is sent, interrupt IN banks are collected immediately
//! unless `host_busy` is set, and the frame counter advances on every read.

extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use crate::config::{ENDPOINT_COUNT, FRAME_NUMBER_MASK};
use crate::endpoints::{EndpointConfig, EndpointDirection, EndpointType};
use crate::port::{DeviceEvents, EndpointPort, EndpointStatus};
use crate::request::UsbRequest;

/// Port operations in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Status(u8, EndpointStatus),
    Acknowledge(u8, EndpointStatus),
    Stall(u8),
    Configure(u8, EndpointConfig),
    Disable(u8),
    ResetEndpoint(u8),
    SetAddress(u8),
}

#[derive(Debug, Default)]
pub(crate) struct SimEndpoint {
    pub status: EndpointStatus,
    pub config: Option<EndpointConfig>,
    pub stalled: bool,
    pub setup_interrupt: bool,
    /// Setup/OUT bytes waiting to be read.
    pub rx: VecDeque<u8>,
    /// IN bytes written since the last bank handover.
    pub pending: Vec<u8>,
    /// IN banks handed to the host.
    pub banks: Vec<Vec<u8>>,
}

impl SimEndpoint {
    fn is_interrupt_in(&self) -> bool {
        matches!(
            self.config,
            Some(EndpointConfig {
                kind: EndpointType::Interrupt,
                direction: EndpointDirection::In,
                ..
            })
        )
    }
}

pub(crate) struct SimPort {
    pub selected: u8,
    pub endpoints: [SimEndpoint; ENDPOINT_COUNT as usize],
    pub events: DeviceEvents,
    pub address: Option<u8>,
    pub frame: u16,
    /// The host is not collecting interrupt IN banks.
    pub host_busy: bool,
    /// Clear `host_busy` after this many interrupt IN status reads.
    pub free_after_status_reads: Option<usize>,
    /// The host answers the n-th control IN bank with an OUT handshake.
    pub abort_after_banks: Option<usize>,
    pub ops: Vec<Op>,
}

impl SimPort {
    pub fn new() -> Self {
        Self {
            selected: 0,
            endpoints: Default::default(),
            events: DeviceEvents::NONE,
            address: None,
            frame: 0,
            host_busy: false,
            free_after_status_reads: None,
            abort_after_banks: None,
            ops: Vec::new(),
        }
    }

    pub fn bus_reset(&mut self) {
        self.events.insert(DeviceEvents::END_OF_RESET);
    }

    pub fn start_of_frame(&mut self) {
        self.events.insert(DeviceEvents::START_OF_FRAME);
    }

    /// Deliver a setup packet to the control endpoint.
    pub fn setup(&mut self, req: UsbRequest) {
        let ep = &mut self.endpoints[0];
        ep.rx = req.to_bytes().into_iter().collect();
        ep.status = EndpointStatus::SETUP_RECEIVED;
        ep.stalled = false;
        ep.pending.clear();
        ep.banks.clear();
    }

    fn current(&mut self) -> &mut SimEndpoint {
        &mut self.endpoints[self.selected as usize]
    }
}

impl EndpointPort for SimPort {
    fn take_device_events(&mut self) -> DeviceEvents {
        core::mem::take(&mut self.events)
    }

    fn select(&mut self, endpoint: u8) {
        self.selected = endpoint;
    }

    fn status(&mut self) -> EndpointStatus {
        let selected = self.selected;
        if self.endpoints[selected as usize].is_interrupt_in() {
            if let Some(remaining) = self.free_after_status_reads.as_mut() {
                if *remaining == 0 {
                    self.host_busy = false;
                } else {
                    *remaining -= 1;
                }
            }
            let host_busy = self.host_busy;
            let ep = self.current();
            if host_busy {
                ep.status.remove(EndpointStatus::WRITE_ALLOWED);
            } else {
                ep.status.insert(EndpointStatus::WRITE_ALLOWED);
            }
        }
        let status = self.current().status;
        self.ops.push(Op::Status(selected, status));
        status
    }

    fn acknowledge(&mut self, flags: EndpointStatus) {
        let selected = self.selected;
        let abort_after = self.abort_after_banks;
        self.ops.push(Op::Acknowledge(selected, flags));
        let ep = self.current();

        if selected != 0 {
            ep.status.remove(flags);
            if flags.contains(EndpointStatus::FIFO_CONTROL) {
                let bank = core::mem::take(&mut ep.pending);
                ep.banks.push(bank);
            }
            return;
        }

        let sends_bank = flags.contains(EndpointStatus::TX_READY)
            && !flags.contains(EndpointStatus::SETUP_RECEIVED)
            && ep.status.contains(EndpointStatus::TX_READY);
        ep.status.remove(flags);

        if flags.contains(EndpointStatus::SETUP_RECEIVED) {
            ep.status.insert(EndpointStatus::TX_READY);
        } else if sends_bank {
            let bank = core::mem::take(&mut ep.pending);
            ep.banks.push(bank);
            if abort_after == Some(ep.banks.len()) {
                ep.status.insert(EndpointStatus::OUT_RECEIVED);
            } else {
                ep.status.insert(EndpointStatus::TX_READY);
            }
        }
    }

    fn read_byte(&mut self) -> u8 {
        self.current().rx.pop_front().unwrap_or(0)
    }

    fn write_byte(&mut self, byte: u8) {
        self.current().pending.push(byte);
    }

    fn stall(&mut self) {
        let selected = self.selected;
        self.ops.push(Op::Stall(selected));
        self.current().stalled = true;
    }

    fn configure(&mut self, config: &EndpointConfig) {
        let selected = self.selected;
        self.ops.push(Op::Configure(selected, *config));
        self.current().config = Some(*config);
    }

    fn disable(&mut self) {
        let selected = self.selected;
        self.ops.push(Op::Disable(selected));
        self.current().config = None;
    }

    fn reset_endpoint(&mut self, endpoint: u8) {
        self.ops.push(Op::ResetEndpoint(endpoint));
        self.endpoints[endpoint as usize].pending.clear();
    }

    fn enable_setup_interrupt(&mut self) {
        self.current().setup_interrupt = true;
    }

    fn set_address(&mut self, address: u8) {
        self.ops.push(Op::SetAddress(address));
        self.address = Some(address);
    }

    fn frame_number(&mut self) -> u16 {
        let frame = self.frame;
        self.frame = (frame + 1) & FRAME_NUMBER_MASK;
        frame
    }
}
