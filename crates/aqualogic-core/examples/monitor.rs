//! AquaLogic Bus Monitor
//!
//! Connects to a pool controller and prints the decoded state whenever it
//! changes. Reconnects automatically when the link drops.
//!
//! Usage:
//!   cargo run --example monitor -- [OPTIONS]
//!
//! Options:
//!   --config FILE     JSON connection config (default: socket to localhost:23)
//!   --demo            Use the simulated controller
//!   --ports           List serial ports and exit
//!   --lights          Turn the lights on once connected
//!
//! Set RUST_LOG=aqualogic_core=debug to see individual frames.

use anyhow::{bail, Context, Result};
use aqualogic_core::prelude::*;
use aqualogic_core::protocol::list_ports;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = ConnectionConfig::default();
    let mut lights = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                let path = args.get(i).context("--config needs a file")?;
                config = ConnectionConfig::from_file(path)
                    .with_context(|| format!("loading {}", path))?;
            }
            "--demo" => config.device = DeviceKind::Demo,
            "--lights" => lights = true,
            "--ports" => {
                for port in list_ports() {
                    match port.product {
                        Some(product) => println!("{}  {}", port.name, product),
                        None => println!("{}", port.name),
                    }
                }
                return Ok(());
            }
            other => bail!("unknown option: {}", other),
        }
        i += 1;
    }

    let session = Session::new(config);
    if lights {
        session.panel().set_state(StateBit::Lights, true)?;
    }

    session.run(|panel| {
        let state = panel.snapshot();
        let states: Vec<String> = state.states().iter().map(|s| s.to_string()).collect();
        println!(
            "pool {:?} spa {:?} air {:?} salt {:?} pump {:?}W | {} | {}",
            state.pool_temp(),
            state.spa_temp(),
            state.air_temp(),
            state.salt_level(),
            state.pump_power(),
            state.status(),
            states.join(" ")
        );
    });
    Ok(())
}
