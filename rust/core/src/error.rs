// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for document decoding
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading a BIMJSON document
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported document type: {0:?}")]
    UnsupportedType(Option<String>),
}
