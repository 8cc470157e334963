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

//! Seam to the telemetry transport.
//!
//! The cloud transport is opaque to the rest of the crate. This module defines
//! the traits a transport has to provide: sending telemetry, pushing the
//! reported properties and delivering the remote command invocations.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::oneshot;

use crate::telemetry::TelemetrySnapshot;

pub mod console;

/// Transport error.
///
/// Failures while talking to the telemetry transport. None of these are
/// retried, a failed send terminates the telemetry loop.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// Couldn't establish the connection to the assigned endpoint.
    #[error("couldn't connect to {endpoint}")]
    Connect {
        /// Endpoint assigned by the registry.
        endpoint: String,
        /// Reason why the connection failed.
        #[source]
        backtrace: std::io::Error,
    },
    /// Couldn't serialize the telemetry payload.
    #[error("couldn't serialize the telemetry payload")]
    Payload(#[from] serde_json::Error),
    /// The send of a telemetry message failed.
    #[error("couldn't send the telemetry message")]
    Send(#[source] std::io::Error),
    /// The reported properties update failed.
    #[error("couldn't update the reported properties")]
    Properties(#[source] std::io::Error),
    /// The transport closed the connection.
    #[error("disconnected from the transport")]
    Disconnected,
}

/// Name of a remote command the appliance serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    /// Turn the power on.
    PowerOn,
    /// Cut the power.
    PowerOff,
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandName::PowerOn => write!(f, "PowerOn"),
            CommandName::PowerOff => write!(f, "PowerOff"),
        }
    }
}

/// Couldn't parse a remote command name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown command {0}")]
pub struct UnknownCommandError(pub String);

impl FromStr for CommandName {
    type Err = UnknownCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PowerOn" => Ok(CommandName::PowerOn),
            "PowerOff" => Ok(CommandName::PowerOff),
            _ => Err(UnknownCommandError(s.to_string())),
        }
    }
}

/// A remote command invocation delivered by the transport.
///
/// The response travels back through the `responder`, so a slow handler never
/// blocks the transport.
#[derive(Debug)]
pub struct CommandRequest {
    /// Name of the invoked command.
    pub name: CommandName,
    /// Channel for the command response.
    pub responder: oneshot::Sender<CommandResponse>,
}

/// Response to a remote command, with an HTTP-style status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// 200 for an executed command, 400 for an invalid call.
    pub status: u16,
    /// JSON payload returned to the caller.
    pub payload: String,
}

impl CommandResponse {
    /// Acknowledges an executed command, referencing its name.
    pub fn executed(name: CommandName) -> Self {
        Self {
            status: 200,
            payload: json!({ "result": format!("Executed direct method: {name}") }).to_string(),
        }
    }

    /// Rejects a command invoked in the wrong state.
    pub fn invalid_call() -> Self {
        Self {
            status: 400,
            payload: json!({ "result": "Invalid call" }).to_string(),
        }
    }
}

/// Established connection to the telemetry transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connection: Send + Sync {
    /// Sends one telemetry snapshot.
    async fn send_telemetry(&self, snapshot: &TelemetrySnapshot) -> Result<(), TransportError>;

    /// Pushes the reported properties of the device.
    async fn set_reported_properties(
        &self,
        properties: &HashMap<String, String>,
    ) -> Result<(), TransportError>;

    /// Stream of incoming remote command invocations.
    ///
    /// The receiver is clonable, closing every clone detaches the command
    /// source.
    fn commands(&self) -> flume::Receiver<CommandRequest>;
}

/// Telemetry transport, opaque to the device runtime.
#[async_trait]
pub trait Transport {
    /// Type of the established connection.
    type Conn: Connection;

    /// Connects to the endpoint assigned by the registry.
    async fn connect(
        &self,
        endpoint: &str,
        device_id: &str,
        shared_key: &str,
    ) -> Result<Self::Conn, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn command_names_round_trip_the_wire_form() {
        assert_eq!("PowerOn".parse(), Ok(CommandName::PowerOn));
        assert_eq!("PowerOff".parse(), Ok(CommandName::PowerOff));
        assert_eq!(CommandName::PowerOn.to_string(), "PowerOn");
        assert_eq!(CommandName::PowerOff.to_string(), "PowerOff");
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = CommandName::from_str("SelfDestruct").unwrap_err();

        assert_eq!(err, UnknownCommandError("SelfDestruct".to_string()));
    }

    #[test]
    fn executed_response_references_the_command() {
        let response = CommandResponse::executed(CommandName::PowerOff);

        assert_eq!(response.status, 200);
        assert_eq!(
            response.payload,
            r#"{"result":"Executed direct method: PowerOff"}"#
        );
    }

    #[test]
    fn invalid_call_response() {
        let response = CommandResponse::invalid_call();

        assert_eq!(response.status, 400);
        assert_eq!(response.payload, r#"{"result":"Invalid call"}"#);
    }
}
