// This file is part of Toaster.
//
// Copyright 2024 SECO Mind Srl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Runs the simulated toaster until Ctrl-C or SIGTERM.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use toaster_device::provisioning::{DeviceRegistry, StaticRegistry};
use toaster_device::transport::console::ConsoleTransport;
use toaster_device::transport::{Connection, Transport};
use toaster_device::{Config, Device};

/// Simulated smart toaster device.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the JSON configuration file, defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the telemetry interval, in seconds.
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()?;

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(interval_secs) = cli.interval_secs {
        config.telemetry_interval_secs = interval_secs;
    }

    info!(device_id = %config.device_id, "starting toaster");

    let registry = StaticRegistry::new(&config.endpoint);
    let registration = registry
        .register(&config.device_id, &config.id_scope, &config.primary_key)
        .await?
        .assigned()
        .wrap_err("failed to register device")?;

    let connection = ConsoleTransport::new()
        .connect(
            &registration.assigned_endpoint,
            &registration.assigned_device_id,
            &config.primary_key,
        )
        .await?;

    let properties = HashMap::from([("Appliance".to_string(), config.device_id.clone())]);
    connection.set_reported_properties(&properties).await?;
    info!(appliance = %config.device_id, "sent device properties");

    let device = Device::from_config(&config, connection);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut runtime = tokio::spawn(device.run(cancel_rx));

    tokio::select! {
        res = &mut runtime => {
            // The loop only ends on its own when the transport fails.
            res??;
        }
        res = shutdown_signal() => {
            res?;

            info!("shutdown requested, cancelling the telemetry loop");

            // The receiver is alive inside the runtime, ignore the error.
            let _ = cancel_tx.send(true);

            runtime.await??;
        }
    }

    info!("toaster stopped");

    Ok(())
}

/// Completes on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() -> eyre::Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .wrap_err("failed to install Ctrl-C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("failed to install SIGTERM handler")?;
        sigterm.recv().await;

        Ok(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<eyre::Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
