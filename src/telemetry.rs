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

//! Synthetic telemetry for the simulated appliance.
//!
//! The appliance doesn't sample real hardware, it cycles through fixed lookup
//! tables of energy and temperature readings. Each call to
//! [`TelemetryGenerator::next_snapshot`] advances two independent cursors and
//! accumulates the total energy consumption for the lifetime of the process.

use serde::Serialize;

/// Energy draw readings, in watts, for one full toasting cycle.
///
/// The two trailing zeros are the idle phase of the cycle.
pub const CONSUMPTION_OVER_TIME: [i32; 8] = [700, 1000, 1000, 1000, 1000, 1000, 0, 0];

/// Appliance temperature readings matching the consumption cycle.
pub const APPLIANCE_TEMPERATURE_OVER_TIME: [i32; 8] = [70, 150, 300, 325, 325, 325, 200, 100];

/// Mains voltage samples the appliance reads over time.
///
/// A sample of `0.0` is the sentinel for "no reading taken", see
/// [`VoltageEnvelope::scan`].
pub const VOLTAGE_OVER_TIME: [f64; 14] = [
    230.0, 225.7, 229.6, 228.3, 233.5, 231.0, 226.8, 229.4, 228.7, 225.9, 231.0, 232.0, 223.6,
    232.0,
];

/// Connection status reported with each telemetry message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionStatus {
    /// Device is connected to the cloud.
    Connected,
    /// Device lost the connection.
    Disconnected,
    /// Device is in standby.
    Standby,
}

/// Fixed simulated position of the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    /// Longitude, in degrees.
    pub lon: f64,
    /// Latitude, in degrees.
    pub lat: f64,
}

/// Minimum and maximum of the voltage series, computed once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageEnvelope {
    /// Smallest non-sentinel sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
}

impl VoltageEnvelope {
    /// Scans the series once and returns its envelope.
    ///
    /// The `0.0` sentinel is excluded from the minimum, since it means the
    /// appliance was off rather than reading zero volts. It is not excluded
    /// from the maximum.
    pub fn scan(series: &[f64]) -> Self {
        let mut max = series[0];
        let mut min = series[0];

        for &sample in series {
            if sample > max {
                max = sample;
            }

            if sample < min && sample != 0.0 {
                min = sample;
            }
        }

        Self { min, max }
    }
}

/// One telemetry message, created fresh on every tick.
///
/// Serializes to the flat JSON object the cloud expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TelemetrySnapshot {
    /// Minimum voltage of the envelope.
    pub min_voltage: f64,
    /// Maximum voltage of the envelope.
    pub max_voltage: f64,
    /// Instantaneous energy draw, in watts.
    pub energy_reading: i32,
    /// Cumulative energy consumption since process start.
    pub energy_consumption: i64,
    /// Current appliance temperature.
    pub appliance_temperature: i32,
    /// Connection status at emission time.
    pub connection_status: ConnectionStatus,
    /// Simulated position of the appliance.
    pub location: Location,
}

/// Produces the infinite cyclic sequence of telemetry readings.
#[derive(Debug)]
pub struct TelemetryGenerator {
    envelope: VoltageEnvelope,
    location: Location,
    /// Cursor over [`CONSUMPTION_OVER_TIME`].
    consumption_idx: usize,
    /// Cursor over [`APPLIANCE_TEMPERATURE_OVER_TIME`].
    temperature_idx: usize,
    /// Running total, never reset within a run.
    energy_consumption: i64,
}

impl TelemetryGenerator {
    /// Creates a generator positioned at the start of both cycles.
    pub fn new(location: Location) -> Self {
        Self {
            envelope: VoltageEnvelope::scan(&VOLTAGE_OVER_TIME),
            location,
            consumption_idx: 0,
            temperature_idx: 0,
            energy_consumption: 0,
        }
    }

    /// Voltage envelope computed at construction.
    pub fn envelope(&self) -> VoltageEnvelope {
        self.envelope
    }

    /// Packages the next telemetry reading, advancing both cursors.
    pub fn next_snapshot(&mut self, status: ConnectionStatus) -> TelemetrySnapshot {
        let energy_reading = CONSUMPTION_OVER_TIME[self.consumption_idx];
        let appliance_temperature = APPLIANCE_TEMPERATURE_OVER_TIME[self.temperature_idx];

        self.energy_consumption += i64::from(energy_reading);

        self.consumption_idx = (self.consumption_idx + 1) % CONSUMPTION_OVER_TIME.len();
        self.temperature_idx = (self.temperature_idx + 1) % APPLIANCE_TEMPERATURE_OVER_TIME.len();

        TelemetrySnapshot {
            min_voltage: self.envelope.min,
            max_voltage: self.envelope.max,
            energy_reading,
            energy_consumption: self.energy_consumption,
            appliance_temperature,
            connection_status: status,
            location: self.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    const LOCATION: Location = Location {
        lon: -122.1224279,
        lat: 47.6437253,
    };

    #[test]
    fn envelope_of_the_voltage_series() {
        let envelope = VoltageEnvelope::scan(&VOLTAGE_OVER_TIME);

        assert_eq!(envelope.min, 223.6);
        assert_eq!(envelope.max, 233.5);
    }

    #[test]
    fn envelope_excludes_sentinel_from_min_only() {
        let envelope = VoltageEnvelope::scan(&[230.0, 0.0, 228.0]);

        assert_eq!(envelope.min, 228.0);
        assert_eq!(envelope.max, 230.0);

        // All sentinel readings, the max still sees them.
        let envelope = VoltageEnvelope::scan(&[12.0, 0.0]);

        assert_eq!(envelope.min, 12.0);
        assert_eq!(envelope.max, 12.0);
    }

    #[test]
    fn envelope_bounds_every_non_zero_sample() {
        let envelope = VoltageEnvelope::scan(&VOLTAGE_OVER_TIME);

        for sample in VOLTAGE_OVER_TIME.iter().filter(|&&s| s != 0.0) {
            assert!(envelope.min <= *sample);
            assert!(*sample <= envelope.max);
        }
    }

    #[test]
    fn consumption_accumulates_over_ticks() {
        let mut generator = TelemetryGenerator::new(LOCATION);

        generator.next_snapshot(ConnectionStatus::Connected);
        generator.next_snapshot(ConnectionStatus::Connected);
        let third = generator.next_snapshot(ConnectionStatus::Connected);

        assert_eq!(third.energy_consumption, 2700);
        assert_eq!(third.energy_reading, 1000);
    }

    #[test]
    fn cursors_wrap_after_a_full_cycle() {
        let mut generator = TelemetryGenerator::new(LOCATION);

        let first = generator.next_snapshot(ConnectionStatus::Connected);

        for _ in 0..CONSUMPTION_OVER_TIME.len() - 1 {
            generator.next_snapshot(ConnectionStatus::Connected);
        }

        let wrapped = generator.next_snapshot(ConnectionStatus::Connected);

        assert_eq!(wrapped.energy_reading, first.energy_reading);
        assert_eq!(wrapped.appliance_temperature, first.appliance_temperature);
    }

    #[test]
    fn consumption_total_matches_the_series_sum() {
        let mut generator = TelemetryGenerator::new(LOCATION);

        let ticks = 19;
        let mut last = 0;
        for _ in 0..ticks {
            last = generator
                .next_snapshot(ConnectionStatus::Connected)
                .energy_consumption;
        }

        let expected: i64 = (0..ticks)
            .map(|i| i64::from(CONSUMPTION_OVER_TIME[i % CONSUMPTION_OVER_TIME.len()]))
            .sum();

        assert_eq!(last, expected);
    }

    #[test]
    fn snapshot_serializes_to_the_wire_shape() {
        let mut generator = TelemetryGenerator::new(LOCATION);

        let snapshot = generator.next_snapshot(ConnectionStatus::Connected);
        let value = serde_json::to_value(&snapshot).unwrap();

        let expected = json!({
            "MinVoltage": 223.6,
            "MaxVoltage": 233.5,
            "EnergyReading": 700,
            "EnergyConsumption": 700,
            "ApplianceTemperature": 70,
            "ConnectionStatus": "Connected",
            "Location": {
                "lon": -122.1224279,
                "lat": 47.6437253,
            },
        });

        assert_eq!(value, expected);
    }
}
