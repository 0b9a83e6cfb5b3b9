// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIMJSON Messaging
//!
//! Typed requests and responses exchanged between a UI caller and the host
//! application's API thread, and the [`Bridge`] that carries them.
//!
//! The host API may only be called from one thread it owns. A caller
//! submits a [`Request`] and awaits a [`PendingResponse`]; the host thread
//! is woken, takes the request, runs it and completes it by correlation id.
//!
//! ```rust,ignore
//! use bimjson_messaging::{Dispatcher, Request, RequestBody};
//!
//! let dispatcher = Dispatcher::with_wake_signal(Arc::new(move || host_event.raise()));
//! let pending = dispatcher.submit(Request::new(RequestBody::FetchSelectableData))?;
//! let response = pending.await?;
//! ```

pub mod bridge;
pub mod envelope;
pub mod error;
pub mod payloads;

pub use bridge::{Bridge, Correlated, FaultResponse, PendingResponse, WakeSignal};
pub use envelope::{
    CorrelationId, Diagnostic, DiagnosticCode, Request, RequestBody, Response, ResponsePayload,
    Severity,
};
pub use error::{BridgeError, Error, Result};
pub use payloads::{
    ElementId, ImportItemResult, ImportPlan, ImportReport, ItemStatus, LevelInfo, ReasonCode,
    ReferenceInfo, SegmentSource, SelectableData, TypeMapping, WallTypeInfo,
};

/// Bridge specialised to the importer's request and response envelopes
pub type Dispatcher = Bridge<Request, Response>;
