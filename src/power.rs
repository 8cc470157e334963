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

//! Power state of the appliance.
//!
//! The controller holds the only piece of mutable appliance state, the current
//! voltage reading, and gates the two remote power transitions. A voltage of
//! `0.0` means the appliance is off.

use parking_lot::Mutex;
use rand::Rng;

use crate::telemetry::VOLTAGE_OVER_TIME;

/// A power transition was invoked in the wrong state.
///
/// The distinction between "executed" and "rejected because already in that
/// state" is surfaced to the remote caller, never swallowed.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerStateError {
    /// `PowerOn` was received while a voltage reading is present.
    #[error("appliance is already powered on")]
    AlreadyOn,
    /// `PowerOff` was received while no voltage reading is present.
    #[error("appliance is already powered off")]
    AlreadyOff,
}

/// Gates the power transitions of the appliance.
///
/// Command handlers and the telemetry tick run on different tasks, so the
/// voltage is behind a mutex.
#[derive(Debug)]
pub struct ApplianceController {
    current_voltage: Mutex<f64>,
}

impl ApplianceController {
    /// Creates a controller in the off state, no reading has occurred yet.
    pub fn new() -> Self {
        Self {
            current_voltage: Mutex::new(0.0),
        }
    }

    /// Current voltage reading, `0.0` when the appliance is off.
    pub fn current_voltage(&self) -> f64 {
        *self.current_voltage.lock()
    }

    /// Whether a voltage reading is present.
    pub fn is_powered_on(&self) -> bool {
        self.current_voltage() != 0.0
    }

    /// Powers the appliance on, picking a voltage reading at random from
    /// [`VOLTAGE_OVER_TIME`].
    ///
    /// Returns the new reading, or [`PowerStateError::AlreadyOn`] if a reading
    /// is already present.
    pub fn power_on(&self) -> Result<f64, PowerStateError> {
        let mut voltage = self.current_voltage.lock();

        if *voltage != 0.0 {
            return Err(PowerStateError::AlreadyOn);
        }

        let index = rand::thread_rng().gen_range(0..VOLTAGE_OVER_TIME.len());
        *voltage = VOLTAGE_OVER_TIME[index];

        Ok(*voltage)
    }

    /// Powers the appliance off, clearing the voltage reading.
    ///
    /// Returns [`PowerStateError::AlreadyOff`] if the appliance is off.
    pub fn power_off(&self) -> Result<(), PowerStateError> {
        let mut voltage = self.current_voltage.lock();

        if *voltage == 0.0 {
            return Err(PowerStateError::AlreadyOff);
        }

        *voltage = 0.0;

        Ok(())
    }
}

impl Default for ApplianceController {
    fn default() -> Self {
        Self::new()
    }
}
