//! Demo Mode - Simulated controller bus for testing
//!
//! [`DemoController`] behaves like the bus as seen through an adapter: it
//! broadcasts keep-alives, LED states and display screens, and reacts to key
//! frames written to it by toggling LEDs the way the real controller does.
//! Temperatures wander slowly so a UI has something to show.

use byteorder::{ByteOrder, LittleEndian};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;

use crate::protocol::{
    encode_frame, FrameReader, FrameType, Key, ProtocolError, ReplayTransport, Transport,
};
use crate::state::{StateBit, StateSet};

/// Filter pump speed as cycled by the FILTER key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterSpeed {
    Off,
    High,
    Low,
}

/// Simulated AquaLogic controller
pub struct DemoController {
    /// Bytes waiting to be read
    outbox: VecDeque<u8>,
    /// LEDs lit, not counting the filter
    leds: StateSet,
    filter: FilterSpeed,
    heater_auto: bool,
    pool_temp: f64,
    air_temp: f64,
    salt_ppm: u32,
    /// Broadcast cycles so far
    tick: u64,
    /// Pause before each broadcast cycle
    interval: Duration,
    rng: StdRng,
}

impl Default for DemoController {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoController {
    /// Create a simulator seeded from entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a reproducible simulator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut leds = StateSet::empty();
        leds.insert(StateBit::Pool);
        Self {
            outbox: VecDeque::new(),
            leds,
            filter: FilterSpeed::High,
            heater_auto: true,
            pool_temp: 82.0,
            air_temp: 75.0,
            salt_ppm: 3200,
            tick: 0,
            interval: Duration::ZERO,
            rng,
        }
    }

    /// Sleep this long before each broadcast cycle, roughly matching bus pacing
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// LED mask the controller is broadcasting, as (on, flashing)
    pub fn led_masks(&self) -> (u32, u32) {
        let mut on = self.leds;
        let mut flashing = StateSet::empty();
        match self.filter {
            FilterSpeed::Off => {}
            FilterSpeed::High => on.insert(StateBit::Filter),
            FilterSpeed::Low => flashing.insert(StateBit::Filter),
        }
        (on.bits(), flashing.bits())
    }

    fn queue_frame(&mut self, frame_type: FrameType, data: &[u8]) {
        self.outbox.extend(encode_frame(frame_type.tag(), data));
    }

    fn queue_display(&mut self, text: &str) {
        // Display text is single-byte; everything used here is below U+0100
        let data: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
        self.queue_frame(FrameType::DisplayUpdate, &data);
    }

    /// Queue one broadcast cycle: keep-alive, LEDs and a display screen
    fn broadcast(&mut self) {
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        self.tick += 1;

        self.pool_temp = (self.pool_temp + self.rng.gen_range(-0.3..0.3)).clamp(60.0, 104.0);
        self.air_temp = (self.air_temp + self.rng.gen_range(-0.5..0.5)).clamp(30.0, 110.0);

        self.queue_frame(FrameType::KeepAlive, &[]);

        let (on, flashing) = self.led_masks();
        let mut leds = [0u8; 8];
        LittleEndian::write_u32(&mut leds[0..4], on);
        LittleEndian::write_u32(&mut leds[4..8], flashing);
        self.queue_frame(FrameType::Leds, &leds);

        let screen = match self.tick % 5 {
            0 => format!("Pool Temp {}\u{b0}F", self.pool_temp.round() as i32),
            1 => format!("Air Temp {}\u{b0}F", self.air_temp.round() as i32),
            2 => format!("Salt Level {} PPM", self.salt_ppm),
            3 => "Pool Chlorinator 50%".to_string(),
            _ => {
                if self.heater_auto {
                    "Heater1 Auto Control".to_string()
                } else {
                    "Heater1 Manual Off".to_string()
                }
            }
        };
        self.queue_display(&screen);

        if self.filter != FilterSpeed::Off {
            let (speed, watts) = match self.filter {
                FilterSpeed::Low => (0x32, [0x03, 0x50]),
                _ => (0x64, [0x15, 0x00]),
            };
            self.queue_frame(FrameType::PumpStatus, &[0x00, 0x00, speed, watts[0], watts[1]]);
        }
    }

    /// React to a key press the way the controller would
    fn press(&mut self, key: Key) {
        tracing::debug!("Demo controller: {} pressed", key);
        match key {
            Key::Filter => {
                self.filter = match self.filter {
                    FilterSpeed::Off => FilterSpeed::High,
                    FilterSpeed::High => FilterSpeed::Low,
                    FilterSpeed::Low => FilterSpeed::Off,
                };
            }
            Key::PoolSpa => {
                if self.leds.contains(StateBit::Pool) {
                    self.leds.remove(StateBit::Pool);
                    self.leds.insert(StateBit::Spa);
                } else {
                    self.leds.remove(StateBit::Spa);
                    self.leds.insert(StateBit::Pool);
                }
            }
            Key::Heater1 => self.heater_auto = !self.heater_auto,
            other => {
                if let Some(state) = StateBit::ALL
                    .into_iter()
                    .find(|s| Key::for_state(*s) == Some(other))
                {
                    if self.leds.contains(state) {
                        self.leds.remove(state);
                    } else {
                        self.leds.insert(state);
                    }
                }
            }
        }
    }
}

impl Transport for DemoController {
    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        if self.outbox.is_empty() {
            self.broadcast();
        }
        self.outbox.pop_front().ok_or(ProtocolError::Timeout)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let reader = FrameReader::new();
        let mut input = ReplayTransport::new(data.to_vec());
        while input.remaining() > 0 {
            let frame = match reader.read_frame(&mut input) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!("Demo controller ignored write: {}", e);
                    break;
                }
            };
            let code = match frame.frame_type {
                FrameType::LocalWiredKeyEvent | FrameType::RemoteWiredKeyEvent
                    if frame.data.len() >= 2 =>
                {
                    LittleEndian::read_u16(&frame.data[0..2]) as u32
                }
                FrameType::WirelessKeyEvent if frame.data.len() >= 5 => {
                    LittleEndian::read_u32(&frame.data[1..5])
                }
                _ => continue,
            };
            if let Some(key) = Key::from_code(code) {
                self.press(key);
            }
        }
        Ok(())
    }
}
