// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for envelopes and the bridge.

use thiserror::Error;

/// Result type for envelope decoding
pub type Result<T> = std::result::Result<T, Error>;

/// Errors decoding a request envelope from the wire
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by [`crate::Bridge`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Rejected before any hand-off to the host thread
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The bridge was shut down or dropped before a response arrived
    #[error("Request cancelled: bridge torn down")]
    Cancelled,
}
