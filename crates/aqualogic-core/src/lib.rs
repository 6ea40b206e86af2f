//! # AquaLogic Core Library
//!
//! Talks to Hayward/Goldline AquaLogic and ProLogic pool controllers over
//! their RS-485 keypad bus.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Bus framing with DLE byte-stuffing and checksums
//! - Decoding of LED, display and pump frames into a device state
//! - Keypad emulation with verified, retried state changes
//! - TCP and serial transports, plus a simulated controller
//!
//! ## Example
//!
//! ```rust,ignore
//! use aqualogic_core::{panel::Panel, protocol::TcpTransport, state::StateBit};
//!
//! let panel = Panel::new();
//! let mut transport = TcpTransport::connect("192.168.1.40", 23)?;
//!
//! let commands = panel.clone();
//! std::thread::spawn(move || commands.set_state(StateBit::Lights, true));
//!
//! panel.process(&mut transport, |p| {
//!     println!("Pool: {:?} Status: {}", p.pool_temp(), p.status());
//! })?;
//! ```

pub mod config;
pub mod demo;
pub mod panel;
pub mod protocol;
pub mod session;
pub mod state;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConnectionConfig, DeviceKind};
    pub use crate::demo::DemoController;
    pub use crate::panel::{Panel, TrafficCounters};
    pub use crate::protocol::{
        CommandError, Key, ProtocolError, SerialTransport, TcpTransport, Transport,
    };
    pub use crate::session::Session;
    pub use crate::state::{DeviceState, StateBit};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
