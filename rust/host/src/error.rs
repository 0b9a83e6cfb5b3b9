// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for host API calls
pub type Result<T> = std::result::Result<T, HostError>;

/// Unexpected faults raised by the host application
///
/// Expected negative outcomes (cancelled picks, declined creations, missing
/// elements) are modelled as `Ok(None)` by the host traits, never as errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Host API fault: {0}")]
    Fault(String),

    #[error("Host API unavailable: {0}")]
    Unavailable(String),

    #[error("Request handler panicked: {0}")]
    Panicked(String),
}

impl HostError {
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault(message.into())
    }
}
