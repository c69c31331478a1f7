// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RFCOMM handoff daemon.
//!
//! Runs one pairing session and exits. The service manager restarts it for
//! the next cycle.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info};

use rfcomm_handoff::bluetooth::{
    AdapterVisibility, HciconfigVisibility, ProfileAdvertiser, RfcommTransport, Visibility,
    VisibilityBackend,
};
use rfcomm_handoff::cli::Cli;
use rfcomm_handoff::config::Config;
use rfcomm_handoff::{logging, SessionController};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => {
            info!("Server going down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            info!("Server going down");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting RFCOMM handoff v{}...", env!("CARGO_PKG_VERSION"));

    if let Some(eff) = cli.eff {
        if eff == 5 {
            debug!("wow!");
        }
        debug!("Diagnostic flag: {}", eff);
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Configuration loaded");

    // Wait until Bluetooth init is done
    let delay = config.bluetooth.startup_delay();
    if !delay.is_zero() {
        info!("Waiting {:?} for the Bluetooth stack", delay);
        tokio::time::sleep(delay).await;
    }

    let session = bluer::Session::new().await?;
    info!("BlueZ session created");

    let adapter = session.adapter(&config.bluetooth.adapter)?;
    info!("Using Bluetooth adapter: {}", adapter.name());

    let visibility = match config.bluetooth.visibility {
        VisibilityBackend::Hciconfig => {
            Visibility::Hciconfig(HciconfigVisibility::new(&config.bluetooth.adapter))
        }
        VisibilityBackend::Bluez => {
            if !adapter.is_powered().await? {
                info!("Powering on Bluetooth adapter...");
                adapter.set_powered(true).await?;
            }
            Visibility::Adapter(AdapterVisibility::new(adapter.clone()))
        }
    };

    info!("Handoff strategy: {}", config.handoff.name());

    let mut controller = SessionController::new(
        config.service.descriptor(),
        visibility,
        RfcommTransport::new(config.bluetooth.channel),
        ProfileAdvertiser::new(session, adapter),
        config.handoff,
    );

    controller.run().await?;
    Ok(())
}
