// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-thread executor
//!
//! The host wakes the executor on its API thread whenever the bridge signals
//! work. Each activation takes the current request, dispatches it by kind and
//! completes it through the bridge. Faults and panics are turned into
//! `EXCEPTION` responses so nothing escapes into the host's event loop.

use crate::error::{HostError, Result};
use crate::host::{HostApplication, HostDocument};
use crate::import::{import_walls, ImportOptions};
use bimjson_messaging::{
    CorrelationId, Diagnostic, DiagnosticCode, Dispatcher, ElementId, ReferenceInfo, RequestBody,
    Response, ResponsePayload, SelectableData,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Name used for picked elements the document cannot describe
const FALLBACK_REFERENCE_NAME: &str = "CAD";

/// Drains the bridge on the host thread
pub struct HostExecutor {
    bridge: Arc<Dispatcher>,
    options: ImportOptions,
}

impl HostExecutor {
    pub fn new(bridge: Arc<Dispatcher>) -> Self {
        Self::with_options(bridge, ImportOptions::default())
    }

    pub fn with_options(bridge: Arc<Dispatcher>, options: ImportOptions) -> Self {
        Self { bridge, options }
    }

    /// Handle one wake-up from the host
    ///
    /// Returns whether a request was taken. Must only be called on the host
    /// thread.
    pub fn on_activation<A: HostApplication>(&self, app: &mut A) -> bool {
        let Some(request) = self.bridge.take_current() else {
            tracing::trace!("Idle wake");
            return false;
        };
        let Some(correlation_id) = request.correlation_id else {
            tracing::warn!(kind = request.body.kind(), "Dropping request without correlation id");
            return true;
        };

        let kind = request.body.kind().to_string();
        tracing::debug!(%correlation_id, kind = %kind, "Dispatching request");

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.dispatch(app, correlation_id, request.body)
        }));

        match outcome {
            Ok(Ok(mut response)) => {
                response.correlation_id = correlation_id;
                tracing::info!(
                    %correlation_id,
                    kind = %kind,
                    success = response.success,
                    code = ?response.code(),
                    "Request handled"
                );
                self.bridge.complete(correlation_id, response);
            }
            Ok(Err(fault)) => {
                tracing::warn!(%correlation_id, kind = %kind, error = %fault, "Request faulted");
                self.bridge.fail(correlation_id, fault);
            }
            Err(panic) => {
                let fault = HostError::Panicked(panic_message(panic.as_ref()));
                tracing::error!(%correlation_id, kind = %kind, error = %fault, "Request handler panicked");
                self.bridge.fail(correlation_id, fault);
            }
        }
        true
    }

    fn dispatch<A: HostApplication>(
        &self,
        app: &mut A,
        correlation_id: CorrelationId,
        body: RequestBody,
    ) -> Result<Response> {
        if app.active_document().is_none() {
            return Ok(Response::failure(
                correlation_id,
                Diagnostic::error(DiagnosticCode::NoDocument, "No active document."),
            ));
        }

        match body {
            RequestBody::FetchSelectableData => {
                let data = match app.active_document() {
                    Some(doc) => selectable_data(&*doc)?,
                    None => SelectableData::default(),
                };
                Ok(Response::success(
                    correlation_id,
                    ResponsePayload::SelectableData(data),
                ))
            }
            RequestBody::PickReference => match app.pick_reference()? {
                Some(id) => {
                    let info = describe_reference(app.active_document(), id)?;
                    Ok(Response::success(correlation_id, ResponsePayload::Reference(info)))
                }
                None => Ok(Response::failure(
                    correlation_id,
                    Diagnostic::warning(
                        DiagnosticCode::Cancelled,
                        "Selection cancelled or invalid.",
                    ),
                )),
            },
            RequestBody::ImportSegments(None) => Ok(Response::failure(
                correlation_id,
                Diagnostic::error(DiagnosticCode::NoPayload, "Import payload is missing."),
            )),
            RequestBody::ImportSegments(Some(plan)) => {
                let doc = app
                    .active_document()
                    .ok_or_else(|| HostError::Unavailable("active document closed".to_string()))?;
                let report = import_walls(doc, &plan, &self.options)?;
                Ok(Response::success(
                    correlation_id,
                    ResponsePayload::ImportReport(report),
                ))
            }
            RequestBody::Unrecognized(kind) => Ok(Response::failure(
                correlation_id,
                Diagnostic::error(
                    DiagnosticCode::UnknownRequest,
                    format!("Unknown request type '{}'.", kind),
                ),
            )),
        }
    }
}

/// Levels sorted by elevation, wall types and reference objects
fn selectable_data<D: HostDocument + ?Sized>(doc: &D) -> Result<SelectableData> {
    let mut levels = doc.levels()?;
    levels.sort_by(|a, b| a.elevation_ft.total_cmp(&b.elevation_ft));
    Ok(SelectableData {
        levels,
        wall_types: doc.wall_types()?,
        references: doc.references()?,
    })
}

fn describe_reference<D: HostDocument>(doc: Option<&mut D>, id: ElementId) -> Result<ReferenceInfo> {
    let known = match doc {
        Some(doc) => doc.reference(id)?,
        None => None,
    };
    Ok(known.unwrap_or_else(|| ReferenceInfo {
        id,
        name: FALLBACK_REFERENCE_NAME.to_string(),
        unique_id: String::new(),
    }))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
