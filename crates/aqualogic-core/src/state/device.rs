//! Device state store
//!
//! Snapshot of every reading seen on the bus. A reading is `None` until the
//! frame that reports it arrives; after that it holds the last value seen.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{StateBit, StateSet};

/// Everything currently known about the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub(crate) air_temp: Option<i32>,
    pub(crate) pool_temp: Option<i32>,
    pub(crate) spa_temp: Option<i32>,
    pub(crate) pool_chlorinator: Option<u8>,
    pub(crate) spa_chlorinator: Option<u8>,
    pub(crate) salt_level: Option<f64>,
    pub(crate) check_system_msg: Option<String>,
    pub(crate) pump_speed: Option<u16>,
    pub(crate) pump_power: Option<u16>,
    pub(crate) is_metric: bool,
    pub(crate) heater_enabled: bool,
    pub(crate) heater_auto_mode: bool,
    pub(crate) super_chlorinate_remaining: String,
    pub(crate) multi_speed_pump: bool,
    /// LEDs on or flashing, plus the heater auto-mode bit
    pub(crate) states: StateSet,
    pub(crate) flashing_states: StateSet,
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            air_temp: None,
            pool_temp: None,
            spa_temp: None,
            pool_chlorinator: None,
            spa_chlorinator: None,
            salt_level: None,
            check_system_msg: None,
            pump_speed: None,
            pump_power: None,
            is_metric: false,
            heater_enabled: false,
            // The panel only announces the heater mode occasionally; assume auto
            heater_auto_mode: true,
            super_chlorinate_remaining: "00:00".to_string(),
            multi_speed_pump: true,
            states: StateSet::empty(),
            flashing_states: StateSet::empty(),
            updated_at: None,
        }
    }
}

impl DeviceState {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything learned from the bus. The multi-speed pump
    /// capability is a local setting and survives.
    pub fn reset(&mut self) {
        *self = Self {
            multi_speed_pump: self.multi_speed_pump,
            ..Self::default()
        };
    }

    /// Air temperature, in the panel's units
    pub fn air_temp(&self) -> Option<i32> {
        self.air_temp
    }

    /// Pool water temperature
    pub fn pool_temp(&self) -> Option<i32> {
        self.pool_temp
    }

    /// Spa water temperature
    pub fn spa_temp(&self) -> Option<i32> {
        self.spa_temp
    }

    /// Pool chlorinator output in percent
    pub fn pool_chlorinator(&self) -> Option<u8> {
        self.pool_chlorinator
    }

    /// Spa chlorinator output in percent
    pub fn spa_chlorinator(&self) -> Option<u8> {
        self.spa_chlorinator
    }

    /// Salt level in g/L or PPM, see [`DeviceState::is_metric`]
    pub fn salt_level(&self) -> Option<f64> {
        self.salt_level
    }

    /// Pump speed in percent. Requires a Hayward VSP pump on the bus.
    pub fn pump_speed(&self) -> Option<u16> {
        self.pump_speed
    }

    /// Pump power in watts. Requires a Hayward VSP pump on the bus.
    pub fn pump_power(&self) -> Option<u16> {
        self.pump_power
    }

    /// True if temperatures and salt level are metric
    pub fn is_metric(&self) -> bool {
        self.is_metric
    }

    /// True if the gas heater is under automatic control
    pub fn is_heater_enabled(&self) -> bool {
        self.heater_enabled
    }

    /// Heater auto-mode flag as last announced by the display
    pub fn heater_auto_mode(&self) -> bool {
        self.heater_auto_mode
    }

    /// Whether low-speed filter control is available
    pub fn multi_speed_pump(&self) -> bool {
        self.multi_speed_pump
    }

    /// Last 'Check System' text, regardless of the CHECK_SYSTEM LED
    pub fn last_check_system_msg(&self) -> Option<&str> {
        self.check_system_msg.as_deref()
    }

    /// Current 'Check System' message, only while the CHECK_SYSTEM LED is lit
    pub fn check_system_msg(&self) -> Option<&str> {
        if self.is_set(StateBit::CheckSystem) {
            self.check_system_msg.as_deref()
        } else {
            None
        }
    }

    /// "OK", or the 'Check System' message when the LED is lit
    pub fn status(&self) -> &str {
        self.check_system_msg().unwrap_or("OK")
    }

    /// Super chlorination time remaining, "00:00" when not running
    pub fn super_chlorinate_time_remaining(&self) -> &str {
        if self.is_set(StateBit::SuperChlorinate) {
            &self.super_chlorinate_remaining
        } else {
            "00:00"
        }
    }

    /// True while super chlorination is running
    pub fn is_super_chlorinate_enabled(&self) -> bool {
        self.is_set(StateBit::SuperChlorinate)
    }

    /// Confirmed value of a state, as last reported by the LEDs
    pub fn is_set(&self, state: StateBit) -> bool {
        match state {
            StateBit::FilterLowSpeed => self.flashing_states.contains(StateBit::Filter),
            _ => self.states.contains(state),
        }
    }

    /// All states currently on
    pub fn states(&self) -> Vec<StateBit> {
        let mut list: Vec<StateBit> = self.states.iter().collect();
        if self.flashing_states.contains(StateBit::Filter) {
            list.push(StateBit::FilterLowSpeed);
        }
        list
    }

    /// LED mask including flashing LEDs and the heater auto-mode bit
    pub fn state_mask(&self) -> StateSet {
        self.states
    }

    /// LEDs currently flashing
    pub fn flashing_mask(&self) -> StateSet {
        self.flashing_states
    }

    /// When a frame last changed the store
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
