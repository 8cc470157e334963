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

//! Registration of the device with the cloud registry.
//!
//! The registry is an opaque external service. The device registers once at
//! startup and must come back `Assigned`, anything else aborts the process
//! before the telemetry loop starts.

use async_trait::async_trait;
use tracing::info;

/// Provisioning error.
///
/// Fatal at startup, the process exits before entering the main loop.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ProvisioningError {
    /// The registry didn't assign the device.
    #[error("device registration was denied with status {status}")]
    Denied {
        /// Status returned by the registry.
        status: RegistrationStatus,
    },
    /// The registry couldn't be reached.
    #[error("couldn't reach the device registry")]
    Unreachable(#[source] std::io::Error),
}

/// Outcome status of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// The device was assigned to an endpoint.
    Assigned,
    /// The registration was not completed.
    Failed,
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationStatus::Assigned => write!(f, "Assigned"),
            RegistrationStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResult {
    /// Endpoint the telemetry transport should connect to.
    pub assigned_endpoint: String,
    /// Device id assigned by the registry.
    pub assigned_device_id: String,
    /// Outcome of the attempt.
    pub status: RegistrationStatus,
}

impl RegistrationResult {
    /// Errors unless the registration came back `Assigned`.
    pub fn assigned(self) -> Result<Self, ProvisioningError> {
        if self.status != RegistrationStatus::Assigned {
            return Err(ProvisioningError::Denied {
                status: self.status,
            });
        }

        Ok(self)
    }
}

/// Device registry, opaque to the rest of the crate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Registers the device identity under a group scope.
    ///
    /// Credentials are opaque, the registry decides what to do with them.
    async fn register(
        &self,
        device_identity: &str,
        id_scope: &str,
        shared_key: &str,
    ) -> Result<RegistrationResult, ProvisioningError>;
}

/// Registry simulator that always assigns a fixed endpoint.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    endpoint: String,
}

impl StaticRegistry {
    /// Creates a registry assigning devices to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl DeviceRegistry for StaticRegistry {
    async fn register(
        &self,
        device_identity: &str,
        id_scope: &str,
        _shared_key: &str,
    ) -> Result<RegistrationResult, ProvisioningError> {
        info!(device_identity, id_scope, "registering device");

        Ok(RegistrationResult {
            assigned_endpoint: self.endpoint.clone(),
            assigned_device_id: device_identity.to_string(),
            status: RegistrationStatus::Assigned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn static_registry_assigns_the_endpoint() {
        let registry = StaticRegistry::new("sim.endpoint.local");

        let result = registry
            .register("breadToaster", "scope", "key")
            .await
            .unwrap()
            .assigned()
            .unwrap();

        assert_eq!(result.assigned_endpoint, "sim.endpoint.local");
        assert_eq!(result.assigned_device_id, "breadToaster");
        assert_eq!(result.status, RegistrationStatus::Assigned);
    }

    #[test]
    fn non_assigned_registration_is_denied() {
        let result = RegistrationResult {
            assigned_endpoint: String::new(),
            assigned_device_id: String::new(),
            status: RegistrationStatus::Failed,
        };

        let err = result.assigned().unwrap_err();

        assert!(matches!(
            err,
            ProvisioningError::Denied {
                status: RegistrationStatus::Failed
            }
        ));
    }
}
