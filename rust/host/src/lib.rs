// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIMJSON Host
//!
//! Host-thread side of the importer: the [`HostExecutor`] that drains the
//! request bridge, the transactional wall import pipeline, and the traits a
//! host application implements to take part.
//!
//! ## Overview
//!
//! - [`HostApplication`] / [`HostDocument`]: the host collaborator interface
//! - [`HostExecutor`]: dispatches bridge requests on the host thread
//! - [`import_walls`]: validates segments and creates walls in one grouped operation
//! - [`memory`]: an in-memory host for tests and the command-line importer
//!
//! ## Example
//!
//! ```rust,ignore
//! use bimjson_host::{HostExecutor, memory::{InMemoryDocument, InMemoryHost}};
//!
//! let executor = HostExecutor::new(dispatcher.clone());
//! let mut host = InMemoryHost::new(InMemoryDocument::new());
//! // On every wake signal, on the host thread:
//! executor.on_activation(&mut host);
//! ```

pub mod error;
pub mod executor;
pub mod host;
pub mod import;
pub mod memory;
pub mod transform;
pub mod units;

pub use error::{HostError, Result};
pub use executor::HostExecutor;
pub use host::{HostApplication, HostDocument, WallPlacement};
pub use import::{
    build_type_mapping, import_walls, ImportOptions, MutationGroup, DEFAULT_GROUP_NAME,
    DEFAULT_MIN_LENGTH_MM,
};
pub use transform::ReferenceTransform;
pub use units::{feet_to_mm, mm_to_feet, MM_PER_FOOT};
