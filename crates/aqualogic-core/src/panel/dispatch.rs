//! Frame dispatch
//!
//! Turns decoded frames into store updates. Keep-alives are handled by the
//! read loop since they drive transmission rather than state.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::display::{decode_text, parse_display};
use crate::protocol::{Frame, FrameType};
use crate::state::{DeviceState, StateBit, StateSet};

/// Apply a frame to the store. Returns true if the store changed.
pub fn apply_frame(state: &mut DeviceState, frame: &Frame) -> bool {
    let data = &frame.data;
    let changed = match frame.frame_type {
        FrameType::KeepAlive => false,
        FrameType::LocalWiredKeyEvent => {
            tracing::debug!("Local wired key: {:02x?}", data);
            false
        }
        FrameType::RemoteWiredKeyEvent => {
            tracing::debug!("Remote wired key: {:02x?}", data);
            false
        }
        FrameType::WirelessKeyEvent => {
            tracing::debug!("Wireless key: {:02x?}", data);
            false
        }
        FrameType::OnOffEvent => {
            tracing::debug!("On/off event: {:02x?}", data);
            false
        }
        FrameType::Leds => apply_leds(state, data),
        FrameType::PumpSpeedRequest => apply_pump_speed(state, data),
        FrameType::PumpStatus => apply_pump_status(state, data),
        FrameType::DisplayUpdate => {
            let text = decode_text(data);
            tracing::debug!("Display update: {:?}", text);
            match parse_display(&text) {
                Some(update) => update.apply(state),
                None => false,
            }
        }
        // Not currently parsed
        FrameType::LongDisplayUpdate => false,
        FrameType::Unknown(tag) => {
            tracing::info!("Unknown frame: {:02x?} {:02x?}", tag, data);
            false
        }
    };

    if changed {
        state.touch();
    }
    changed
}

/// First 4 bytes are the LEDs that are on, the next 4 the LEDs that are flashing
fn apply_leds(state: &mut DeviceState, data: &[u8]) -> bool {
    if data.len() < 8 {
        tracing::debug!("Short LED frame: {:02x?}", data);
        return false;
    }

    let flashing = StateSet::from_wire(LittleEndian::read_u32(&data[4..8]));
    let mut states = StateSet::from_wire(LittleEndian::read_u32(&data[0..4])) | flashing;
    if state.heater_auto_mode {
        states.insert(StateBit::HeaterAutoMode);
    }

    if states != state.states || flashing != state.flashing_states {
        state.states = states;
        state.flashing_states = flashing;
        true
    } else {
        false
    }
}

fn apply_pump_speed(state: &mut DeviceState, data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    let value = BigEndian::read_u16(&data[0..2]);
    tracing::debug!("Pump speed request: {}%", value);
    if state.pump_speed == Some(value) {
        return false;
    }
    state.pump_speed = Some(value);
    true
}

/// Decode two packed BCD bytes, e.g. `[0x12, 0x34]` is 1234
fn bcd_value(hi: u8, lo: u8) -> u16 {
    ((hi >> 4) as u16) * 1000 + ((hi & 0x0f) as u16) * 100 + ((lo >> 4) as u16) * 10 + (lo & 0x0f) as u16
}

/// Status broadcast by Hayward VSP pumps
fn apply_pump_status(state: &mut DeviceState, data: &[u8]) -> bool {
    if data.len() < 5 {
        return false;
    }
    state.multi_speed_pump = true;
    let speed = data[2];
    let power = bcd_value(data[3], data[4]);
    tracing::debug!("Pump speed: {}%, power: {} watts", speed, power);
    if state.pump_power == Some(power) {
        return false;
    }
    state.pump_power = Some(power);
    true
}
