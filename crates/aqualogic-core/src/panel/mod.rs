//! Panel emulation
//!
//! A [`Panel`] sits on the bus like a keypad: it follows the controller's
//! broadcasts to maintain a [`DeviceState`], and queues key presses that are
//! transmitted right after keep-alives.
//!
//! The store, the outbound queue and pending verifications share one mutex.
//! The read loop never holds it while blocked on the transport or while
//! running the change callback, so command calls from other threads only wait
//! for the dispatch of a single frame.

mod dispatch;
pub mod display;
mod queue;

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::protocol::{
    key_event_frame, CommandError, Frame, FrameReader, FrameType, Key, ProtocolError, Transport,
    DEFAULT_RETRIES, VERIFY_DELAY,
};
use crate::state::{DeviceState, StateBit};

pub use dispatch::apply_frame;
pub use display::{parse_display, DisplayUpdate};
pub use queue::{CheckSummary, CommandQueue, PendingCommand};

/// Bus traffic seen by a panel since it was created or reset
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficCounters {
    /// Frames that passed the checksum
    pub frames_received: u64,
    /// Frames dropped for a checksum, size or framing error
    pub frames_rejected: u64,
    /// Queued frames written after a keep-alive
    pub frames_sent: u64,
}

struct Inner {
    state: DeviceState,
    queue: CommandQueue,
    counters: TrafficCounters,
}

/// Shared handle on the emulated keypad; clones refer to the same panel
#[derive(Clone)]
pub struct Panel {
    inner: Arc<Mutex<Inner>>,
    stop: Arc<AtomicBool>,
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel {
    /// Create a panel with the standard verification delay
    pub fn new() -> Self {
        Self::with_verify_delay(VERIFY_DELAY)
    }

    /// Create a panel that checks state changes `delay` after sending them
    pub fn with_verify_delay(delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: DeviceState::new(),
                queue: CommandQueue::new(delay),
                counters: TrafficCounters::default(),
            })),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget all bus state and queued commands
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state.reset();
        inner.queue.clear();
        inner.counters = TrafficCounters::default();
    }

    /// Forget what the last connection reported, ready for a new one
    ///
    /// Queued commands and pending verifications survive; they are sent and
    /// checked against whatever the new connection reports.
    pub fn reset_state(&self) {
        let mut inner = self.lock();
        inner.state.reset();
        inner.counters = TrafficCounters::default();
    }

    /// Ask [`Panel::process`] to return before it waits for the next frame
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Read and dispatch frames until the transport fails or a stop is requested
    ///
    /// `on_change` runs on this thread after every frame that changed the
    /// store. Frame-level errors are logged and skipped; transport errors end
    /// processing and are returned so the caller can reconnect.
    pub fn process<T, F>(&self, transport: &mut T, mut on_change: F) -> Result<(), ProtocolError>
    where
        T: Transport + ?Sized,
        F: FnMut(&Panel),
    {
        let reader = FrameReader::new().with_stop_flag(Arc::clone(&self.stop));
        loop {
            if self.is_stopping() {
                tracing::info!("Processing stopped");
                return Ok(());
            }

            match reader.read_frame(transport) {
                Ok(frame) => {
                    if self.handle_frame(transport, &frame)? {
                        on_change(self);
                    }
                }
                Err(ProtocolError::Stopped) => {
                    tracing::info!("Processing stopped");
                    return Ok(());
                }
                Err(ProtocolError::FrameTimeout) => {
                    tracing::info!("Frame timeout");
                }
                Err(e) if e.is_frame_error() => {
                    tracing::warn!("Discarding frame: {}", e);
                    self.lock().counters.frames_rejected += 1;
                }
                Err(e) => return Err(e),
            }

            self.run_due_checks(Instant::now());
        }
    }

    /// Dispatch one frame; returns true if the store changed
    fn handle_frame<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        frame: &Frame,
    ) -> Result<bool, ProtocolError> {
        let mut inner = self.lock();
        inner.counters.frames_received += 1;

        if frame.frame_type != FrameType::KeepAlive {
            return Ok(apply_frame(&mut inner.state, frame));
        }

        // The gap after a keep-alive is where keypads may talk
        let Some(bytes) = inner.queue.take_next(Instant::now()) else {
            return Ok(false);
        };
        drop(inner);

        transport.write(&bytes)?;
        tracing::info!("Sent: {:02x?}", bytes);
        self.lock().counters.frames_sent += 1;
        Ok(false)
    }

    /// Verify state changes whose check is due at `now`
    ///
    /// [`Panel::process`] calls this after every frame; hosts driving the
    /// panel some other way can call it themselves.
    pub fn run_due_checks(&self, now: Instant) -> CheckSummary {
        let mut inner = self.lock();
        let Inner { state, queue, .. } = &mut *inner;
        queue.run_checks(state, now)
    }

    /// Queue a key press
    pub fn send_key(&self, key: Key) {
        tracing::info!("Queueing key {}", key);
        self.lock()
            .queue
            .push(PendingCommand::key_press(key_event_frame(key)));
    }

    /// Request a state, pressing the matching key and retrying until the LEDs
    /// agree or the retry budget runs out
    ///
    /// Succeeds immediately when the state already has (or is queued to take)
    /// the requested value.
    pub fn set_state(&self, state: StateBit, enabled: bool) -> Result<(), CommandError> {
        let mut inner = self.lock();
        let current = inner.queue.resolve(&inner.state, state);
        if current == enabled {
            return Ok(());
        }

        let (key, desired_states) = match state {
            StateBit::FilterLowSpeed => {
                if !inner.state.multi_speed_pump {
                    return Err(CommandError::Unsupported(state));
                }
                // One FILTER press moves high speed to low speed. From off, the
                // retry presses it again to pass through high speed; from low
                // speed, the retry presses it again to come back up to high.
                (
                    Key::Filter,
                    vec![(state, enabled), (StateBit::Filter, true)],
                )
            }
            StateBit::HeaterAutoMode => (
                Key::Heater1,
                vec![(state, !inner.state.heater_auto_mode)],
            ),
            StateBit::Pool | StateBit::Spa => (Key::PoolSpa, vec![(state, enabled)]),
            other => match Key::for_state(other) {
                Some(key) => (key, vec![(state, enabled)]),
                None => return Err(CommandError::Unsupported(state)),
            },
        };

        tracing::info!("Queueing {} for {} = {}", key, state, enabled);
        inner.queue.push(PendingCommand::asserted(
            key_event_frame(key),
            desired_states,
            DEFAULT_RETRIES,
        ));
        Ok(())
    }

    /// Enable or disable low-speed filter control
    pub fn enable_multi_speed_pump(&self, enable: bool) {
        self.lock().state.multi_speed_pump = enable;
    }

    /// Value of a state, counting queued changes as already applied
    pub fn get_state(&self, state: StateBit) -> bool {
        let inner = self.lock();
        inner.queue.resolve(&inner.state, state)
    }

    /// All states currently on
    pub fn states(&self) -> Vec<StateBit> {
        self.lock().state.states()
    }

    /// Copy of the store
    pub fn snapshot(&self) -> DeviceState {
        self.lock().state.clone()
    }

    /// Commands waiting for a keep-alive
    pub fn queued_commands(&self) -> usize {
        self.lock().queue.len()
    }

    /// Traffic since the panel was created or last reset
    pub fn counters(&self) -> TrafficCounters {
        self.lock().counters
    }

    /// Air temperature
    pub fn air_temp(&self) -> Option<i32> {
        self.lock().state.air_temp()
    }

    /// Pool water temperature
    pub fn pool_temp(&self) -> Option<i32> {
        self.lock().state.pool_temp()
    }

    /// Spa water temperature
    pub fn spa_temp(&self) -> Option<i32> {
        self.lock().state.spa_temp()
    }

    /// Pool chlorinator output in percent
    pub fn pool_chlorinator(&self) -> Option<u8> {
        self.lock().state.pool_chlorinator()
    }

    /// Spa chlorinator output in percent
    pub fn spa_chlorinator(&self) -> Option<u8> {
        self.lock().state.spa_chlorinator()
    }

    /// Salt level, in g/L when metric and PPM otherwise
    pub fn salt_level(&self) -> Option<f64> {
        self.lock().state.salt_level()
    }

    /// Pump speed in percent
    pub fn pump_speed(&self) -> Option<u16> {
        self.lock().state.pump_speed()
    }

    /// Pump power in watts
    pub fn pump_power(&self) -> Option<u16> {
        self.lock().state.pump_power()
    }

    /// True if readings are metric
    pub fn is_metric(&self) -> bool {
        self.lock().state.is_metric()
    }

    /// True if the gas heater is under automatic control
    pub fn is_heater_enabled(&self) -> bool {
        self.lock().state.is_heater_enabled()
    }

    /// The 'Check System' message, while the CHECK SYSTEM LED is lit
    pub fn check_system_msg(&self) -> Option<String> {
        self.lock().state.check_system_msg().map(str::to_string)
    }

    /// "OK" or the 'Check System' message
    pub fn status(&self) -> String {
        self.lock().state.status().to_string()
    }

    /// Super chlorination time remaining as `HH:MM`
    pub fn super_chlorinate_time_remaining(&self) -> String {
        self.lock().state.super_chlorinate_time_remaining().to_string()
    }

    /// True while super chlorination is running
    pub fn is_super_chlorinate_enabled(&self) -> bool {
        self.get_state(StateBit::SuperChlorinate)
    }
}
