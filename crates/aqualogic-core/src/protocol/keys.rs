//! Keypad keys
//!
//! Key codes sent by the panels on the bus. The low 16 bits are keys found on
//! wired keypads; the upper bits are only reachable through wireless key
//! events.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::StateBit;

/// Key events which can be sent to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Key {
    /// Right arrow
    Right,
    /// Menu
    Menu,
    /// Left arrow
    Left,
    /// Service
    Service,
    /// Minus
    Minus,
    /// Plus
    Plus,
    /// Toggle between pool and spa
    PoolSpa,
    /// Filter pump; cycles speeds on multi-speed pumps
    Filter,
    /// Lights
    Lights,
    /// Auxiliary 1
    Aux1,
    /// Auxiliary 2
    Aux2,
    /// Auxiliary 3
    Aux3,
    /// Auxiliary 4
    Aux4,
    /// Auxiliary 5
    Aux5,
    /// Auxiliary 6
    Aux6,
    /// Auxiliary 7
    Aux7,
    // Wireless only
    /// Valve 3
    Valve3,
    /// Valve 4
    Valve4,
    /// Heater auto/manual
    Heater1,
    /// Auxiliary 8
    Aux8,
    /// Auxiliary 9
    Aux9,
    /// Auxiliary 10
    Aux10,
    /// Auxiliary 11
    Aux11,
    /// Auxiliary 12
    Aux12,
    /// Auxiliary 13
    Aux13,
    /// Auxiliary 14
    Aux14,
}

impl Key {
    /// Every key, in code order
    pub const ALL: [Key; 26] = [
        Key::Right,
        Key::Menu,
        Key::Left,
        Key::Service,
        Key::Minus,
        Key::Plus,
        Key::PoolSpa,
        Key::Filter,
        Key::Lights,
        Key::Aux1,
        Key::Aux2,
        Key::Aux3,
        Key::Aux4,
        Key::Aux5,
        Key::Aux6,
        Key::Aux7,
        Key::Valve3,
        Key::Valve4,
        Key::Heater1,
        Key::Aux8,
        Key::Aux9,
        Key::Aux10,
        Key::Aux11,
        Key::Aux12,
        Key::Aux13,
        Key::Aux14,
    ];

    /// Bus code of the key; one bit per key
    pub fn code(self) -> u32 {
        1 << (self as u32)
    }

    /// Keys above 16 bits are only valid in wireless key events
    pub fn is_wireless(self) -> bool {
        self.code() > 0xFFFF
    }

    /// Look up a key from its bus code
    pub fn from_code(code: u32) -> Option<Key> {
        Key::ALL.iter().copied().find(|k| k.code() == code)
    }

    /// The key whose LED is the given state, if the keypad has one
    pub fn for_state(state: StateBit) -> Option<Key> {
        let key = match state {
            StateBit::Heater1 => Key::Heater1,
            StateBit::Valve3 => Key::Valve3,
            StateBit::Filter => Key::Filter,
            StateBit::Lights => Key::Lights,
            StateBit::Service => Key::Service,
            StateBit::Valve4 => Key::Valve4,
            StateBit::Aux1 => Key::Aux1,
            StateBit::Aux2 => Key::Aux2,
            StateBit::Aux3 => Key::Aux3,
            StateBit::Aux4 => Key::Aux4,
            StateBit::Aux5 => Key::Aux5,
            StateBit::Aux6 => Key::Aux6,
            StateBit::Aux7 => Key::Aux7,
            StateBit::Aux8 => Key::Aux8,
            StateBit::Aux9 => Key::Aux9,
            StateBit::Aux10 => Key::Aux10,
            StateBit::Aux11 => Key::Aux11,
            StateBit::Aux12 => Key::Aux12,
            StateBit::Aux13 => Key::Aux13,
            StateBit::Aux14 => Key::Aux14,
            _ => return None,
        };
        Some(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
