//! LED state bits
//!
//! Each real bit is one LED on the controller's front panel. Two extra bits
//! are synthetic: they are derived locally and never appear on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// States reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum StateBit {
    /// Gas heater running
    Heater1 = 0,
    /// Valve 3 actuated
    Valve3 = 1,
    /// Something needs attention; see the display
    CheckSystem = 2,
    /// Pool mode
    Pool = 3,
    /// Spa mode
    Spa = 4,
    /// Filter pump running
    Filter = 5,
    /// Lights on
    Lights = 6,
    /// Auxiliary relay 1
    Aux1 = 7,
    /// Auxiliary relay 2
    Aux2 = 8,
    /// Service mode
    Service = 9,
    /// Auxiliary relay 3
    Aux3 = 10,
    /// Auxiliary relay 4
    Aux4 = 11,
    /// Auxiliary relay 5
    Aux5 = 12,
    /// Auxiliary relay 6
    Aux6 = 13,
    /// Valve 4 actuated
    Valve4 = 14,
    /// Spa spillover running
    Spillover = 15,
    /// System off
    SystemOff = 16,
    /// Auxiliary relay 7
    Aux7 = 17,
    /// Auxiliary relay 8
    Aux8 = 18,
    /// Auxiliary relay 9
    Aux9 = 19,
    /// Auxiliary relay 10
    Aux10 = 20,
    /// Auxiliary relay 11
    Aux11 = 21,
    /// Auxiliary relay 12
    Aux12 = 22,
    /// Auxiliary relay 13
    Aux13 = 23,
    /// Auxiliary relay 14
    Aux14 = 24,
    /// Super chlorination running
    SuperChlorinate = 25,
    /// Heater is under automatic control; learned from display text
    HeaterAutoMode = 30,
    /// Filter pump running at low speed; the FILTER LED flashes
    FilterLowSpeed = 31,
}

impl StateBit {
    /// Every state, in bit order
    pub const ALL: [StateBit; 28] = [
        StateBit::Heater1,
        StateBit::Valve3,
        StateBit::CheckSystem,
        StateBit::Pool,
        StateBit::Spa,
        StateBit::Filter,
        StateBit::Lights,
        StateBit::Aux1,
        StateBit::Aux2,
        StateBit::Service,
        StateBit::Aux3,
        StateBit::Aux4,
        StateBit::Aux5,
        StateBit::Aux6,
        StateBit::Valve4,
        StateBit::Spillover,
        StateBit::SystemOff,
        StateBit::Aux7,
        StateBit::Aux8,
        StateBit::Aux9,
        StateBit::Aux10,
        StateBit::Aux11,
        StateBit::Aux12,
        StateBit::Aux13,
        StateBit::Aux14,
        StateBit::SuperChlorinate,
        StateBit::HeaterAutoMode,
        StateBit::FilterLowSpeed,
    ];

    /// Bits that are computed locally and must never be taken from the wire
    pub const SYNTHETIC_MASK: u32 =
        StateBit::HeaterAutoMode.mask() | StateBit::FilterLowSpeed.mask();

    /// Bitmask of this state
    pub const fn mask(self) -> u32 {
        1 << (self as u32)
    }

    /// Whether this state is derived locally instead of read from an LED
    pub fn is_synthetic(self) -> bool {
        self.mask() & Self::SYNTHETIC_MASK != 0
    }
}

impl fmt::Display for StateBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A set of states backed by a 32-bit mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSet(u32);

impl StateSet {
    /// Empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a set from an LED mask received on the bus, dropping any bit in
    /// the synthetic range
    pub const fn from_wire(mask: u32) -> Self {
        Self(mask & !StateBit::SYNTHETIC_MASK)
    }

    /// Raw mask
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether the state's bit is set
    pub fn contains(self, state: StateBit) -> bool {
        self.0 & state.mask() != 0
    }

    /// Set the state's bit
    pub fn insert(&mut self, state: StateBit) {
        self.0 |= state.mask();
    }

    /// Clear the state's bit
    pub fn remove(&mut self, state: StateBit) {
        self.0 &= !state.mask();
    }

    /// Iterate over the named states present in the set
    pub fn iter(self) -> impl Iterator<Item = StateBit> {
        StateBit::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl std::ops::BitOr for StateSet {
    type Output = StateSet;

    fn bitor(self, rhs: StateSet) -> StateSet {
        StateSet(self.0 | rhs.0)
    }
}

impl FromIterator<StateBit> for StateSet {
    fn from_iter<I: IntoIterator<Item = StateBit>>(iter: I) -> Self {
        let mut set = StateSet::empty();
        for state in iter {
            set.insert(state);
        }
        set
    }
}
