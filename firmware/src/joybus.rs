//! Bit-banged Joybus sampler on a single GPIO.
//!
//! The line idles high through an external pull-up and is only ever driven
//! low, so the pin switches between input (released) and output-low.
//! Every bit lasts 4 µs: a `0` is 3 µs low then 1 µs high, a `1` is 1 µs low
//! then 3 µs high. The controller's answer is sampled once per microsecond
//! from its first falling edge, which yields four samples per bit.

use embassy_rp::gpio::{Flex, Pull};
use joybus_core::BusSampler;
use joybus_proto::RAW_CAPTURE_LEN;

/// clk_sys after `embassy_rp::init` with the default config.
const CYCLES_PER_US: u32 = 125;
/// Cycles spent per sample on reading the pin and shifting.
const SAMPLE_OVERHEAD_CYCLES: u32 = 14;
/// How long to wait for the controller to start answering.
const RESPONSE_TIMEOUT_US: u32 = 120;
/// Identify response (3 bytes) plus its stop bit.
const IDENTIFY_RESPONSE_US: u32 = 100;

const COMMAND_IDENTIFY: [u8; 1] = [0x00];
/// Status poll, rumble off.
const COMMAND_POLL: [u8; 3] = [0x40, 0x03, 0x00];

#[inline(always)]
fn delay_us(us: u32) {
    cortex_m::asm::delay(us * CYCLES_PER_US);
}

pub struct JoybusSampler<'d> {
    line: Flex<'d>,
}

impl<'d> JoybusSampler<'d> {
    pub fn new(mut line: Flex<'d>) -> Self {
        line.set_pull(Pull::None);
        line.set_low();
        line.set_as_input();
        Self { line }
    }

    #[inline(always)]
    fn drive_low(&mut self) {
        self.line.set_as_output();
    }

    #[inline(always)]
    fn release(&mut self) {
        self.line.set_as_input();
    }

    fn write_bit(&mut self, one: bool) {
        let (low, high) = if one { (1, 3) } else { (3, 1) };
        self.drive_low();
        delay_us(low);
        self.release();
        delay_us(high);
    }

    fn write_command(&mut self, command: &[u8]) {
        for &byte in command {
            for bit in (0..8).rev() {
                self.write_bit(byte >> bit & 1 == 1);
            }
        }
        // stop bit
        self.drive_low();
        delay_us(1);
        self.release();
    }

    fn wait_for_response(&mut self) -> bool {
        for _ in 0..RESPONSE_TIMEOUT_US * 4 {
            if self.line.is_low() {
                return true;
            }
            cortex_m::asm::delay(CYCLES_PER_US / 4);
        }
        false
    }

    fn sample(&mut self, capture: &mut [u8; RAW_CAPTURE_LEN]) {
        for byte in capture.iter_mut() {
            let mut raw = 0u8;
            for _ in 0..8 {
                raw = raw << 1 | self.line.is_high() as u8;
                cortex_m::asm::delay(CYCLES_PER_US - SAMPLE_OVERHEAD_CYCLES);
            }
            *byte = raw;
        }
    }
}

impl BusSampler for JoybusSampler<'_> {
    fn probe(&mut self) {
        critical_section::with(|_| self.write_command(&COMMAND_IDENTIFY));
        delay_us(IDENTIFY_RESPONSE_US);
    }

    fn poll(&mut self, capture: &mut [u8; RAW_CAPTURE_LEN]) {
        critical_section::with(|_| {
            self.write_command(&COMMAND_POLL);
            if self.wait_for_response() {
                self.sample(capture);
            } else {
                // idle line
                capture.fill(0xff);
            }
        });
    }
}
