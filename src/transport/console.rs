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

//! Local simulator transport.
//!
//! Stands in for the cloud transport when running the simulator on a
//! workstation: telemetry is logged to the console and remote commands are
//! read from stdin, one command name per line (`PowerOn` or `PowerOff`).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::telemetry::TelemetrySnapshot;
use crate::transport::{CommandRequest, Connection, Transport, TransportError};

/// Capacity of the command channel between the stdin reader and the device.
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Transport that connects a [`ConsoleConnection`].
#[derive(Debug, Clone, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    /// Creates the console transport.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    type Conn = ConsoleConnection;

    async fn connect(
        &self,
        endpoint: &str,
        device_id: &str,
        _shared_key: &str,
    ) -> Result<Self::Conn, TransportError> {
        let (commands_tx, commands_rx) = flume::bounded(COMMAND_CHANNEL_SIZE);

        // Exits on stdin EOF or when every receiver clone is dropped.
        tokio::spawn(read_commands(commands_tx));

        info!(endpoint, device_id, "device connected");

        Ok(ConsoleConnection { commands_rx })
    }
}

/// Connection that logs telemetry and sources commands from stdin.
#[derive(Debug)]
pub struct ConsoleConnection {
    commands_rx: flume::Receiver<CommandRequest>,
}

#[async_trait]
impl Connection for ConsoleConnection {
    async fn send_telemetry(&self, snapshot: &TelemetrySnapshot) -> Result<(), TransportError> {
        let payload = serde_json::to_string(snapshot)?;

        info!(%payload, "telemetry data");

        Ok(())
    }

    async fn set_reported_properties(
        &self,
        properties: &HashMap<String, String>,
    ) -> Result<(), TransportError> {
        for (name, value) in properties {
            info!(name, value, "reported property");
        }

        Ok(())
    }

    fn commands(&self) -> flume::Receiver<CommandRequest> {
        self.commands_rx.clone()
    }
}

/// Reads command names from stdin and forwards them to the device.
async fn read_commands(commands_tx: flume::Sender<CommandRequest>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed, detaching command source");

                break;
            }
            Err(err) => {
                warn!(error = %err, "couldn't read from stdin");

                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let name = match line.parse() {
            Ok(name) => name,
            Err(err) => {
                warn!(error = %err, "ignoring input line");

                continue;
            }
        };

        let (responder, response) = oneshot::channel();

        if commands_tx
            .send_async(CommandRequest { name, responder })
            .await
            .is_err()
        {
            debug!("device went away, detaching command source");

            break;
        }

        match response.await {
            Ok(response) => {
                info!(
                    command = %name,
                    status = response.status,
                    payload = %response.payload,
                    "command response"
                );
            }
            Err(_) => {
                warn!(command = %name, "command dropped without a response");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::telemetry::{ConnectionStatus, Location, TelemetryGenerator};

    #[tokio::test]
    async fn console_connection_accepts_telemetry() {
        let (_tx, commands_rx) = flume::bounded(COMMAND_CHANNEL_SIZE);
        let connection = ConsoleConnection { commands_rx };

        let mut generator = TelemetryGenerator::new(Location {
            lon: -122.1224279,
            lat: 47.6437253,
        });
        let snapshot = generator.next_snapshot(ConnectionStatus::Connected);

        connection.send_telemetry(&snapshot).await.unwrap();
    }

    #[tokio::test]
    async fn console_connection_accepts_properties() {
        let (_tx, commands_rx) = flume::bounded(COMMAND_CHANNEL_SIZE);
        let connection = ConsoleConnection { commands_rx };

        let properties =
            HashMap::from([("Appliance".to_string(), "breadToaster".to_string())]);

        connection.set_reported_properties(&properties).await.unwrap();
    }

    #[tokio::test]
    async fn commands_receiver_is_clonable() {
        let (tx, commands_rx) = flume::bounded(COMMAND_CHANNEL_SIZE);
        let connection = ConsoleConnection { commands_rx };

        let first = connection.commands();
        let second = connection.commands();

        let (responder, _response) = oneshot::channel();
        tx.send_async(CommandRequest {
            name: crate::transport::CommandName::PowerOn,
            responder,
        })
        .await
        .unwrap();

        // Either clone can receive the queued invocation.
        drop(first);
        let request = second.recv_async().await.unwrap();

        assert_eq!(request.name, crate::transport::CommandName::PowerOn);
    }
}
