//! Display update parsing
//!
//! The controller mirrors its two-line LCD onto the bus. A handful of screens
//! carry readings worth keeping; they are recognised by their first two words.

use crate::state::DeviceState;

/// A reading recognised on the display
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayUpdate {
    /// `Pool Temp <n>°F`
    PoolTemp {
        /// Degrees in the displayed unit
        value: i32,
        /// Celsius rather than Fahrenheit
        metric: bool,
    },
    /// `Spa Temp <n>°F`
    SpaTemp {
        /// Degrees in the displayed unit
        value: i32,
        /// Celsius rather than Fahrenheit
        metric: bool,
    },
    /// `Air Temp <n>°F`
    AirTemp {
        /// Degrees in the displayed unit
        value: i32,
        /// Celsius rather than Fahrenheit
        metric: bool,
    },
    /// `Pool Chlorinator <n>%`
    PoolChlorinator(u8),
    /// `Spa Chlorinator <n>%`
    SpaChlorinator(u8),
    /// `Salt Level <f> PPM` or `g/L`
    SaltLevel {
        /// Level in the displayed unit
        value: f64,
        /// g/L rather than PPM
        metric: bool,
    },
    /// `Check System <message>` or a no-flow notice
    CheckSystem(String),
    /// `Gas Heater Auto Control` or `Manual Off`
    GasHeater(bool),
    /// `Super Chlorinate <HH°MM> remaining`
    SuperChlorinate(String),
    /// `Heater1 Auto ...` or any other Heater1 mode
    Heater1AutoMode(bool),
}

/// Decode display bytes; the panel uses a single-byte character set
pub fn decode_text(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

/// `<n><glyph><unit>`, e.g. `82°F`
fn parse_temp(token: &str) -> Option<(i32, bool)> {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 3 {
        return None;
    }
    let number: String = chars[..chars.len() - 2].iter().collect();
    let value = number.parse().ok()?;
    Some((value, chars[chars.len() - 1] == 'C'))
}

/// `<n>%`
fn parse_percent(token: &str) -> Option<u8> {
    token.strip_suffix('%')?.parse().ok()
}

/// Recognise one display line. Unknown screens and malformed readings give `None`.
pub fn parse_display(text: &str) -> Option<DisplayUpdate> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let first = *parts.first()?;
    let second = *parts.get(1)?;

    let update = match (first, second) {
        ("Pool", "Temp") => {
            let (value, metric) = parse_temp(parts.get(2)?)?;
            DisplayUpdate::PoolTemp { value, metric }
        }
        ("Spa", "Temp") => {
            let (value, metric) = parse_temp(parts.get(2)?)?;
            DisplayUpdate::SpaTemp { value, metric }
        }
        ("Air", "Temp") => {
            let (value, metric) = parse_temp(parts.get(2)?)?;
            DisplayUpdate::AirTemp { value, metric }
        }
        ("Pool", "Chlorinator") => DisplayUpdate::PoolChlorinator(parse_percent(parts.get(2)?)?),
        ("Spa", "Chlorinator") => DisplayUpdate::SpaChlorinator(parse_percent(parts.get(2)?)?),
        ("Salt", "Level") => {
            let value: f64 = parts.get(2)?.parse().ok()?;
            let metric = *parts.get(3)? == "g/L";
            DisplayUpdate::SaltLevel { value, metric }
        }
        ("Check", "System") => DisplayUpdate::CheckSystem(parts[2..].join(" ")),
        // Low flow shuts the cell off without lighting CHECK SYSTEM text
        ("Chlorinator", "Off") if parts.get(2..4) == Some(&["No", "Flow"][..]) => {
            DisplayUpdate::CheckSystem(parts[2..].join(" "))
        }
        ("Gas", "Heater") => match (*parts.get(2)?, *parts.get(3)?) {
            ("Auto", "Control") => DisplayUpdate::GasHeater(true),
            ("Manual", "Off") => DisplayUpdate::GasHeater(false),
            _ => return None,
        },
        ("Super", "Chlorinate") if parts.get(3) == Some(&"remaining") => {
            let remaining = parts[2]
                .replace(' ', "")
                .replace(['\u{ba}', '\u{b0}'], ":");
            DisplayUpdate::SuperChlorinate(remaining)
        }
        ("Heater1", mode) => DisplayUpdate::Heater1AutoMode(mode == "Auto"),
        _ => return None,
    };
    Some(update)
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

impl DisplayUpdate {
    /// Write the reading into the store, returning true if anything that
    /// warrants a notification changed
    pub fn apply(self, state: &mut DeviceState) -> bool {
        match self {
            DisplayUpdate::PoolTemp { value, metric } => {
                replace(&mut state.pool_temp, Some(value)) | replace(&mut state.is_metric, metric)
            }
            DisplayUpdate::SpaTemp { value, metric } => {
                replace(&mut state.spa_temp, Some(value)) | replace(&mut state.is_metric, metric)
            }
            DisplayUpdate::AirTemp { value, metric } => {
                replace(&mut state.air_temp, Some(value)) | replace(&mut state.is_metric, metric)
            }
            DisplayUpdate::PoolChlorinator(value) => replace(&mut state.pool_chlorinator, Some(value)),
            DisplayUpdate::SpaChlorinator(value) => replace(&mut state.spa_chlorinator, Some(value)),
            DisplayUpdate::SaltLevel { value, metric } => {
                replace(&mut state.salt_level, Some(value)) | replace(&mut state.is_metric, metric)
            }
            DisplayUpdate::CheckSystem(msg) => replace(&mut state.check_system_msg, Some(msg)),
            DisplayUpdate::GasHeater(enabled) => {
                state.heater_auto_mode = enabled;
                replace(&mut state.heater_enabled, enabled)
            }
            DisplayUpdate::SuperChlorinate(remaining) => {
                replace(&mut state.super_chlorinate_remaining, remaining)
            }
            // Surfaces through the next LED frame
            DisplayUpdate::Heater1AutoMode(auto) => {
                state.heater_auto_mode = auto;
                false
            }
        }
    }
}
