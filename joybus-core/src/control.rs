//! Control endpoint engine.
//!
//! Runs from the endpoint interrupt. Each setup packet is read from the
//! control FIFO, acknowledged, routed on (direction, type, recipient,
//! request code) and answered in place. Data stages stream through the
//! 32-byte control bank and stop early if the host aborts with an OUT
//! handshake.

use core::cmp::min;

use crate::config::{CONTROL_BANK_SIZE, ENDPOINT_COUNT};
use crate::descriptors::find_descriptor;
use crate::device::{DeviceContext, DeviceState};
use crate::endpoints::endpoint_config;
use crate::port::{EndpointPort, EndpointStatus};
use crate::request::{
    feature, hid, standard, Direction, Recipient, RequestKind, UsbRequest,
};

/// Errors surfaced by the control engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// No handler matches the setup packet.
    UnhandledRequest(UsbRequest),
}

/// Requests the engine answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlRequest {
    SetAddress,
    SetConfiguration,
    ClearFeature,
    SetIdle,
    GetDescriptor,
    GetReport,
}

impl ControlRequest {
    /// Route a setup packet to its handler.
    pub fn route(req: &UsbRequest) -> Option<Self> {
        use Direction::{DeviceToHost, HostToDevice};
        use Recipient::{Device, Interface};
        use RequestKind::{Class, Standard};

        match (req.direction(), req.kind(), req.recipient(), req.request) {
            (HostToDevice, Standard, Device, standard::SET_ADDRESS) => Some(Self::SetAddress),
            (HostToDevice, Standard, Device, standard::SET_CONFIGURATION) => {
                Some(Self::SetConfiguration)
            }
            // GET_REPORT shares its code with CLEAR_FEATURE
            (DeviceToHost, Class, Interface, hid::GET_REPORT) => Some(Self::GetReport),
            (_, Standard | Class, _, standard::CLEAR_FEATURE) => Some(Self::ClearFeature),
            (HostToDevice, Class, Interface, hid::SET_IDLE) => Some(Self::SetIdle),
            (DeviceToHost, Standard, Device | Interface, standard::GET_DESCRIPTOR) => {
                Some(Self::GetDescriptor)
            }
            _ => None,
        }
    }
}

/// How an IN data stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataStage {
    Completed,
    /// The host sent OUT before all data was delivered.
    HostAborted,
}

impl<P: EndpointPort> DeviceContext<P> {
    /// Handle a pending setup packet on the control endpoint, if any.
    pub(crate) fn handle_control(&mut self) -> Result<(), ControlError> {
        self.port.select(0);
        if !self.port.status().contains(EndpointStatus::SETUP_RECEIVED) {
            return Ok(());
        }

        let mut raw = [0u8; UsbRequest::SIZE];
        for byte in raw.iter_mut() {
            *byte = self.port.read_byte();
        }
        let req = UsbRequest::from_bytes(raw);
        self.port.acknowledge(
            EndpointStatus::SETUP_RECEIVED | EndpointStatus::OUT_RECEIVED | EndpointStatus::TX_READY,
        );

        let Some(handler) = ControlRequest::route(&req) else {
            error!(
                "unhandled request: type={:#x} request={:#x} value={:#x} index={:#x} length={}",
                req.request_type,
                req.request,
                req.value,
                req.index,
                req.length
            );
            return Err(ControlError::UnhandledRequest(req));
        };
        trace!("setup {:?} value={:#x} index={:#x}", handler, req.value, req.index);

        match handler {
            ControlRequest::SetAddress => self.set_address(&req),
            ControlRequest::SetConfiguration => self.set_configuration(&req),
            ControlRequest::ClearFeature => self.clear_feature(&req),
            ControlRequest::SetIdle => self.set_idle(&req),
            ControlRequest::GetDescriptor => self.get_descriptor(&req),
            ControlRequest::GetReport => self.get_report(),
        }
        Ok(())
    }

    fn set_address(&mut self, req: &UsbRequest) {
        let address = (req.value & 0x7f) as u8;
        // The new address only applies once the status stage has gone out.
        self.port.acknowledge(EndpointStatus::TX_READY);
        self.port.wait_for(EndpointStatus::TX_READY);
        self.port.set_address(address);
        self.state = if address == 0 {
            DeviceState::Default
        } else {
            DeviceState::Addressed
        };
        debug!("address {}", address);
    }

    fn set_configuration(&mut self, req: &UsbRequest) {
        self.settings.configuration = req.value as u8;
        self.port.acknowledge(EndpointStatus::TX_READY);

        for endpoint in 1..ENDPOINT_COUNT {
            self.port.select(endpoint);
            match endpoint_config(endpoint) {
                Some(config) if config.enabled => self.port.configure(config),
                _ => self.port.disable(),
            }
            self.port.reset_endpoint(endpoint);
        }
        self.port.select(0);

        self.state = if self.settings.is_configured() {
            DeviceState::Configured
        } else {
            DeviceState::Addressed
        };
        debug!("configuration {}", self.settings.configuration);
    }

    fn clear_feature(&mut self, req: &UsbRequest) {
        let endpoint = (req.index & 0x7f) as u8;
        let halt_on_endpoint = req.recipient() == Recipient::Endpoint
            && req.value == feature::ENDPOINT_HALT
            && (1..ENDPOINT_COUNT).contains(&endpoint);

        if !halt_on_endpoint {
            warn!(
                "CLEAR_FEATURE rejected: type={:#x} value={:#x} index={:#x}",
                req.request_type,
                req.value,
                req.index
            );
            self.port.stall();
            return;
        }

        self.port.acknowledge(EndpointStatus::TX_READY);
        self.port.select(endpoint);
        self.port.stall();
        self.port.reset_endpoint(endpoint);
        self.port.select(0);
    }

    fn set_idle(&mut self, req: &UsbRequest) {
        self.settings.idle_rate = (req.value >> 8) as u8;
        self.settings.idle_counter = 0;
        self.settings.frame_divider = 0;
        self.port.acknowledge(EndpointStatus::TX_READY);
        debug!("idle rate {}", self.settings.idle_rate);
    }

    fn get_descriptor(&mut self, req: &UsbRequest) {
        let Some(data) = find_descriptor(req.value, req.index) else {
            warn!("no descriptor for value={:#x} index={:#x}", req.value, req.index);
            self.port.stall();
            return;
        };
        let requested = req.length as usize;
        let len = min(min(requested, 255), data.len());
        let stage = self.write_control(&data[..len], requested);
        trace!("descriptor {:#x}: {} bytes, {:?}", req.value, len, stage);
    }

    fn get_report(&mut self) {
        self.port.wait_for(EndpointStatus::TX_READY);
        let report = self.report.to_bytes();
        self.port.write_bytes(&report);
        self.port.acknowledge(EndpointStatus::TX_READY);
    }

    /// Stream `data` through the control bank.
    ///
    /// A transfer shorter than `requested` that ends on a bank boundary is
    /// closed with a zero-length bank. An empty transfer sends a single
    /// zero-length bank as its status stage.
    fn write_control(&mut self, data: &[u8], requested: usize) -> DataStage {
        for chunk in data.chunks(CONTROL_BANK_SIZE) {
            if !self.next_bank_free() {
                return DataStage::HostAborted;
            }
            self.port.write_bytes(chunk);
            self.port.acknowledge(EndpointStatus::TX_READY);
        }

        let short_on_boundary = data.len() < requested && data.len() % CONTROL_BANK_SIZE == 0;
        if data.is_empty() || short_on_boundary {
            if !self.next_bank_free() {
                return DataStage::HostAborted;
            }
            self.port.acknowledge(EndpointStatus::TX_READY);
        }
        DataStage::Completed
    }

    /// Wait for the IN bank; `false` if the host aborted instead.
    fn next_bank_free(&mut self) -> bool {
        let status = self
            .port
            .wait_for(EndpointStatus::TX_READY | EndpointStatus::OUT_RECEIVED);
        !status.contains(EndpointStatus::OUT_RECEIVED)
    }
}
