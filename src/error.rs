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

//! Error types for the toaster device.

use crate::config::ConfigError;
use crate::provisioning::ProvisioningError;
use crate::transport::TransportError;

/// Toaster device error.
///
/// Possible errors returned by the device runtime and its startup phases.
/// Every propagated failure surfaces to the operator console or the process
/// exit code, none is silently discarded.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Couldn't load the device configuration.
    #[error("couldn't load the device configuration")]
    Config(#[from] ConfigError),

    /// Couldn't provision the device with the registry.
    #[error("couldn't provision the device")]
    Provisioning(#[from] ProvisioningError),

    /// Error while talking to the telemetry transport.
    #[error("transport error")]
    Transport(#[from] TransportError),
}
