#![no_std]
#![no_main]

use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::Flex;
use embassy_time::Delay;
use joybus_gamepad::{usb, JoybusSampler, JoypadBridge, UsbHidOutput, USB_DEVICE};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => usb::InterruptHandler;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Joybus-to-USB adapter starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- USB Setup ---
    usb::start(p.USB, Irqs);
    let output = UsbHidOutput::new(&USB_DEVICE);

    // --- Controller Setup ---
    // Data line on GPIO 2 with an external 1k pull-up to 3.3 V
    let sampler = JoybusSampler::new(Flex::new(p.PIN_2));

    let mut bridge = JoypadBridge::new(sampler, output, Delay);
    info!("Polling controller every {} ms", joybus_core::config::POLL_INTERVAL_MS);
    bridge.run().await
}
