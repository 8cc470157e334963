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

//! Simulated smart toaster device.
//!
//! The device provisions itself with a [`provisioning::DeviceRegistry`],
//! connects a [`transport::Transport`], pushes its reported properties and
//! then emits one synthetic [`telemetry::TelemetrySnapshot`] per fixed
//! interval while answering the `PowerOn` and `PowerOff` remote commands.
//!
//! The cloud side is opaque: registry and transport are traits, the binary
//! wires in local simulator implementations so the toaster runs end to end on
//! a workstation.

pub mod config;
pub mod device;
pub mod error;
pub mod power;
pub mod provisioning;
pub mod telemetry;
pub mod transport;

pub use crate::config::Config;
pub use crate::device::Device;
pub use crate::error::Error;
pub use crate::power::ApplianceController;
pub use crate::telemetry::{TelemetryGenerator, TelemetrySnapshot};
