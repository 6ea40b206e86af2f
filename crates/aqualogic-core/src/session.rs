//! Connection session
//!
//! Keeps a [`Panel`] attached to the bus: connects according to a
//! [`ConnectionConfig`], processes frames until the link drops, waits, and
//! connects again. Each connection starts from an empty store; queued
//! commands carry over to the next connection.

use std::time::{Duration, Instant};

use crate::config::{ConnectionConfig, DeviceKind};
use crate::demo::DemoController;
use crate::panel::Panel;
use crate::protocol::{ProtocolError, SerialTransport, TcpTransport, Transport};

/// Granularity of the reconnect wait, bounding how long a shutdown can go unnoticed
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// A panel plus the policy for keeping it connected
pub struct Session {
    config: ConnectionConfig,
    panel: Panel,
}

impl Session {
    /// Create a session; nothing connects until [`Session::run`]
    pub fn new(config: ConnectionConfig) -> Self {
        let panel = Panel::new();
        panel.enable_multi_speed_pump(config.multi_speed_pump);
        Self { config, panel }
    }

    /// The panel, for commands and reads from other threads
    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    /// The configuration this session connects with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open the configured transport
    pub fn connect(&self) -> Result<Box<dyn Transport>, ProtocolError> {
        tracing::info!("Connecting to {}", self.config.endpoint());
        let transport: Box<dyn Transport> = match self.config.device {
            DeviceKind::Socket => Box::new(TcpTransport::connect(&self.config.host, self.config.port)?),
            DeviceKind::Serial => Box::new(SerialTransport::open(&self.config.path)?),
            DeviceKind::Demo => {
                Box::new(DemoController::new().with_interval(Duration::from_millis(100)))
            }
        };
        Ok(transport)
    }

    /// Connect and process until [`Session::shutdown`] is called
    pub fn run<F: FnMut(&Panel)>(&self, mut on_change: F) {
        loop {
            match self.connect() {
                Ok(mut transport) => {
                    self.panel.reset_state();
                    match self.panel.process(&mut transport, &mut on_change) {
                        Ok(()) => {}
                        Err(e) => tracing::warn!(
                            "Connection to {} lost: {}",
                            self.config.endpoint(),
                            e
                        ),
                    }
                }
                Err(e) => tracing::warn!("Connection exception: {}", e),
            }

            if self.wait_for_reconnect() {
                tracing::info!("Session shut down");
                return;
            }
        }
    }

    /// Ask [`Session::run`] to return
    pub fn shutdown(&self) {
        tracing::debug!("Session shutdown requested");
        self.panel.stop();
    }

    /// Sleep out the reconnect interval; returns true if shutdown was requested
    fn wait_for_reconnect(&self) -> bool {
        let deadline = Instant::now() + self.config.reconnect_interval();
        loop {
            if self.panel.is_stopping() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(SHUTDOWN_POLL.min(deadline - now));
        }
    }
}
