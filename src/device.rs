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

//! Device runtime, drives the telemetry loop and the command dispatch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::power::ApplianceController;
use crate::telemetry::{ConnectionStatus, TelemetryGenerator};
use crate::transport::{CommandName, CommandRequest, CommandResponse, Connection};

/// The running appliance.
///
/// Owns the telemetry generator, the power controller and the established
/// connection. [`Device::run`] drives one background telemetry loop and a
/// command dispatch task until cancellation.
#[derive(Debug)]
pub struct Device<C> {
    connection: C,
    controller: Arc<ApplianceController>,
    generator: TelemetryGenerator,
    interval: Duration,
}

impl<C> Device<C>
where
    C: Connection,
{
    /// Creates a device over an established connection.
    pub fn new(
        connection: C,
        controller: Arc<ApplianceController>,
        generator: TelemetryGenerator,
        interval: Duration,
    ) -> Self {
        Self {
            connection,
            controller,
            generator,
            interval,
        }
    }

    /// Creates a device with a fresh controller and generator from the
    /// configuration.
    pub fn from_config(config: &Config, connection: C) -> Self {
        Self::new(
            connection,
            Arc::new(ApplianceController::new()),
            TelemetryGenerator::new(config.location()),
            config.telemetry_interval(),
        )
    }

    /// Power controller of the appliance.
    pub fn controller(&self) -> &Arc<ApplianceController> {
        &self.controller
    }

    /// Runs the device until `cancel` is signaled or the transport fails.
    ///
    /// A transport failure is not retried, it ends the run with the error and
    /// the caller decides the exit status.
    pub async fn run(mut self, cancel: watch::Receiver<bool>) -> Result<(), Error> {
        let commands = self.connection.commands();
        let dispatcher = tokio::spawn(dispatch_commands(
            commands,
            Arc::clone(&self.controller),
            cancel.clone(),
        ));

        let res = self.telemetry_loop(cancel).await;

        // The dispatcher follows the same cancel signal, but a transport
        // error ends the loop without one.
        dispatcher.abort();
        if let Err(err) = dispatcher.await {
            if err.is_panic() {
                std::panic::resume_unwind(err.into_panic());
            }
        }

        res
    }

    /// Emits one snapshot per tick until cancelled.
    ///
    /// Ticks never overlap, the send of a snapshot completes before the next
    /// delay starts. Cancellation is observed at the top of each cycle and
    /// during the delay, never mid-send.
    async fn telemetry_loop(&mut self, mut cancel: watch::Receiver<bool>) -> Result<(), Error> {
        loop {
            if *cancel.borrow() {
                info!("telemetry loop cancelled");

                return Ok(());
            }

            // Connectivity detection is not wired in, the status is always
            // reported as connected.
            let snapshot = self.generator.next_snapshot(ConnectionStatus::Connected);

            debug!(
                current_voltage = self.controller.current_voltage(),
                energy_consumption = snapshot.energy_consumption,
                "emitting telemetry"
            );

            self.connection.send_telemetry(&snapshot).await?;

            info!("telemetry sent");

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                res = cancel.changed() => {
                    if res.is_err() {
                        // The cancel handle is gone, nobody can stop us
                        // anymore.
                        info!("cancel handle dropped, stopping the telemetry loop");

                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Answers remote command invocations until cancelled or the command source
/// detaches.
async fn dispatch_commands(
    commands: flume::Receiver<CommandRequest>,
    controller: Arc<ApplianceController>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        let request = tokio::select! {
            res = cancel.changed() => {
                if res.is_err() || *cancel.borrow() {
                    debug!("command dispatch cancelled");

                    break;
                }

                continue;
            }
            req = commands.recv_async() => match req {
                Ok(req) => req,
                Err(_) => {
                    debug!("command source detached");

                    break;
                }
            },
        };

        let outcome = match request.name {
            CommandName::PowerOn => controller.power_on().map(drop),
            CommandName::PowerOff => controller.power_off(),
        };

        let response = match outcome {
            Ok(()) => {
                info!(command = %request.name, "executed direct method");

                CommandResponse::executed(request.name)
            }
            Err(err) => {
                warn!(command = %request.name, error = %err, "invalid call");

                CommandResponse::invalid_call()
            }
        };

        if request.responder.send(response).is_err() {
            debug!(command = %request.name, "command caller went away");
        }
    }
}
