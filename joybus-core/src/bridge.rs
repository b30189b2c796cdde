//! JoypadBridge: the poll-decode-send loop.

use embedded_hal_async::delay::DelayNs;
use joybus_proto::{AxisMapping, RawCapture, DEFAULT_MAPPING};

use crate::config::{POLL_INTERVAL_MS, REPROBE_DELAY_MS};
use crate::input::{BusSampler, InputError};
use crate::output::{OutputError, OutputSink};
use crate::report::JoypadReport;

/// Polls the controller and forwards each decoded state as a joypad report.
///
/// One cycle: wait [`POLL_INTERVAL_MS`], poll, check sync, decode, remap
/// and send. A capture without sync triggers a re-probe after a further
/// [`REPROBE_DELAY_MS`] and nothing is sent for that cycle; the host keeps
/// seeing the last report through idle resends.
pub struct JoypadBridge<S, O, D> {
    sampler: S,
    output: O,
    delay: D,
    capture: RawCapture,
    mapping: AxisMapping,
}

impl<S: BusSampler, O: OutputSink, D: DelayNs> JoypadBridge<S, O, D> {
    /// Create a bridge with the default axis mapping.
    pub fn new(sampler: S, output: O, delay: D) -> Self {
        Self::with_mapping(sampler, output, delay, DEFAULT_MAPPING)
    }

    pub fn with_mapping(sampler: S, output: O, delay: D, mapping: AxisMapping) -> Self {
        Self {
            sampler,
            output,
            delay,
            capture: RawCapture::new(),
            mapping,
        }
    }

    /// Probe the controller once, then run poll cycles forever.
    pub async fn run(&mut self) -> ! {
        self.sampler.probe();
        loop {
            match self.process_one().await {
                Ok(()) => {}
                Err(BridgeError::Input(InputError::NoSync { leading })) => {
                    trace!("no sync, leading byte {:#x}", leading);
                }
                Err(BridgeError::Output(OutputError::NotConfigured)) => {}
                Err(BridgeError::Output(e)) => {
                    warn!("report not sent: {:?}", e);
                }
            }
        }
    }

    /// Run a single poll cycle.
    pub async fn process_one(&mut self) -> Result<(), BridgeError> {
        self.delay.delay_ms(POLL_INTERVAL_MS).await;
        self.sampler.poll(self.capture.as_mut_bytes());

        if let Err(e) = self.capture.check_sync() {
            self.delay.delay_ms(REPROBE_DELAY_MS).await;
            self.sampler.probe();
            return Err(BridgeError::Input(InputError::NoSync { leading: e.leading }));
        }

        let state = self.capture.decode();
        trace!(
            "buttons={:?} stick=({}, {})",
            state.buttons(),
            state.stick_x,
            state.stick_y
        );
        let report = JoypadReport::from_state(&state, &self.mapping);
        self.output.send(&report).await.map_err(BridgeError::Output)
    }

    /// The capture from the most recent poll.
    pub fn last_capture(&self) -> &RawCapture {
        &self.capture
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut S {
        &mut self.sampler
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Decompose the bridge into its sampler, output and delay.
    pub fn into_parts(self) -> (S, O, D) {
        (self.sampler, self.output, self.delay)
    }
}

/// Error type for bridge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// Error from the controller side.
    Input(InputError),
    /// Error from the output sink.
    Output(OutputError),
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;

    use super::*;
    use core::future::Future;
    use core::pin::pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use joybus_proto::{AxisTransform, RAW_CAPTURE_LEN, SYNC_BYTE};
    use std::sync::{Arc, Mutex};
    use std::vec;
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Delay(u32),
        Probe,
        Poll,
        Send(JoypadReport),
    }

    type Log = Arc<Mutex<Vec<Event>>>;

    struct MockSampler {
        captures: Vec<[u8; RAW_CAPTURE_LEN]>,
        log: Log,
    }

    impl BusSampler for MockSampler {
        fn probe(&mut self) {
            self.log.lock().unwrap().push(Event::Probe);
        }

        fn poll(&mut self, capture: &mut [u8; RAW_CAPTURE_LEN]) {
            self.log.lock().unwrap().push(Event::Poll);
            *capture = if self.captures.is_empty() {
                [0xff; RAW_CAPTURE_LEN]
            } else {
                self.captures.remove(0)
            };
        }
    }

    struct MockOutput {
        result: Result<(), OutputError>,
        log: Log,
    }

    impl OutputSink for MockOutput {
        fn send(&mut self, report: &JoypadReport) -> impl Future<Output = Result<(), OutputError>> {
            self.log.lock().unwrap().push(Event::Send(*report));
            core::future::ready(self.result)
        }

        fn is_ready(&self) -> bool {
            self.result.is_ok()
        }
    }

    struct MockDelay {
        log: Log,
    }

    impl DelayNs for MockDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.log.lock().unwrap().push(Event::Delay(ns / 1_000_000));
        }
    }

    pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
        fn noop_raw_waker() -> RawWaker {
            fn noop(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                noop_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(core::ptr::null(), &VTABLE)
        }

        // SAFETY: the vtable functions ignore the null data pointer.
        let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = pin!(f);
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => result,
            Poll::Pending => panic!("mock future returned Pending"),
        }
    }

    /// Sample `bytes` the way a clean line would look.
    fn capture_of(bytes: [u8; 8]) -> [u8; RAW_CAPTURE_LEN] {
        const ZERO: u8 = 0b0001;
        const ONE: u8 = 0b0111;
        let mut raw = [0u8; RAW_CAPTURE_LEN];
        for (i, byte) in bytes.iter().enumerate() {
            for pair in 0..4 {
                let nibble = |shift: usize| if byte >> shift & 1 == 1 { ONE } else { ZERO };
                raw[i * 4 + pair] = nibble(7 - 2 * pair) << 4 | nibble(6 - 2 * pair);
            }
        }
        raw
    }

    fn bridge(
        captures: Vec<[u8; RAW_CAPTURE_LEN]>,
        result: Result<(), OutputError>,
    ) -> (JoypadBridge<MockSampler, MockOutput, MockDelay>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let bridge = JoypadBridge::new(
            MockSampler {
                captures,
                log: log.clone(),
            },
            MockOutput {
                result,
                log: log.clone(),
            },
            MockDelay { log: log.clone() },
        );
        (bridge, log)
    }

    #[test]
    fn test_forwards_decoded_state() {
        // A + Start, D-pad up + L, sticks centred-ish, triggers
        let capture = capture_of([0x11, 0x48, 128, 128, 128, 128, 30, 200]);
        assert_eq!(capture[0], SYNC_BYTE);
        let (mut bridge, log) = bridge(vec![capture], Ok(()));

        assert_eq!(block_on(bridge.process_one()), Ok(()));

        let expected = JoypadReport {
            buttons_0: 0x11,
            buttons_1: 0x48,
            x: -1,
            y: -1,
            z: -1,
            rx: -1,
            ry: 30,
            rz: 200,
        };
        assert_eq!(
            *log.lock().unwrap(),
            vec![Event::Delay(8), Event::Poll, Event::Send(expected)]
        );
    }

    #[test]
    fn test_no_sync_reprobes_without_sending() {
        let (mut bridge, log) = bridge(vec![], Ok(()));

        assert_eq!(
            block_on(bridge.process_one()),
            Err(BridgeError::Input(InputError::NoSync { leading: 0xff }))
        );
        assert_eq!(
            *log.lock().unwrap(),
            vec![Event::Delay(8), Event::Poll, Event::Delay(12), Event::Probe]
        );
    }

    #[test]
    fn test_recovers_after_reprobe() {
        let neutral = capture_of([0, 0x80, 128, 128, 128, 128, 0, 0]);
        let (mut bridge, log) = bridge(vec![[0u8; RAW_CAPTURE_LEN], neutral], Ok(()));

        assert!(block_on(bridge.process_one()).is_err());
        assert!(block_on(bridge.process_one()).is_ok());

        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|e| **e == Event::Probe).count(), 1);
        assert!(matches!(log.last(), Some(Event::Send(_))));
    }

    #[test]
    fn test_output_error_propagates() {
        let capture = capture_of([0; 8]);
        let (mut bridge, _log) = bridge(vec![capture], Err(OutputError::Timeout));
        assert_eq!(
            block_on(bridge.process_one()),
            Err(BridgeError::Output(OutputError::Timeout))
        );
    }

    #[test]
    fn test_custom_mapping() {
        let capture = capture_of([0, 0, 10, 20, 30, 40, 50, 60]);
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let identity = AxisMapping {
            stick_x: AxisTransform::Identity,
            stick_y: AxisTransform::Identity,
            c_stick_x: AxisTransform::Identity,
            c_stick_y: AxisTransform::Identity,
            l_analog: AxisTransform::Identity,
            r_analog: AxisTransform::Identity,
        };
        let mut bridge = JoypadBridge::with_mapping(
            MockSampler {
                captures: vec![capture],
                log: log.clone(),
            },
            MockOutput {
                result: Ok(()),
                log: log.clone(),
            },
            MockDelay { log: log.clone() },
            identity,
        );

        block_on(bridge.process_one()).unwrap();
        let sent = log.lock().unwrap().last().copied();
        assert_eq!(
            sent,
            Some(Event::Send(JoypadReport {
                buttons_0: 0,
                buttons_1: 0,
                x: 10,
                y: 20,
                z: 30,
                rx: 40,
                ry: 50,
                rz: 60,
            }))
        );
        assert_eq!(bridge.last_capture().as_bytes(), &capture);
    }
}
