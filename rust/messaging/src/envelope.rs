// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request and response envelopes
//!
//! Each request kind carries its own payload type and each response carries
//! one of a closed set of payloads, so the executor and the caller match on
//! variants instead of downcasting.

use crate::bridge::{Correlated, FaultResponse};
use crate::error::{Error, Result};
use crate::payloads::{ImportPlan, ImportReport, ReferenceInfo, SelectableData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Opaque token linking a request to its single response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const FETCH_SELECTABLE_DATA: &str = "fetch-selectable-data";
const PICK_REFERENCE: &str = "pick-reference";
const IMPORT_SEGMENTS: &str = "import-segments";

/// Request kind together with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// List levels, wall types and reference objects of the active document
    FetchSelectableData,
    /// Ask the user to pick a reference object interactively
    PickReference,
    /// Import wall segments; `None` when the caller sent no payload
    ImportSegments(Option<ImportPlan>),
    /// A kind this build does not know, kept by name
    Unrecognized(String),
}

impl RequestBody {
    pub fn kind(&self) -> &str {
        match self {
            RequestBody::FetchSelectableData => FETCH_SELECTABLE_DATA,
            RequestBody::PickReference => PICK_REFERENCE,
            RequestBody::ImportSegments(_) => IMPORT_SEGMENTS,
            RequestBody::Unrecognized(kind) => kind,
        }
    }
}

/// A caller's request to the host thread
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Assigned by the bridge when left unset
    pub correlation_id: Option<CorrelationId>,
    pub body: RequestBody,
}

/// JSON shape of a request on the wire
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

impl Request {
    pub fn new(body: RequestBody) -> Self {
        Self {
            correlation_id: None,
            body,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Decode a request from `{"kind", "correlationId"?, "payload"?}`
    ///
    /// A JSON `null` envelope is rejected as an invalid argument. Unknown
    /// kinds decode to [`RequestBody::Unrecognized`] so the host can answer
    /// them with a diagnostic instead of the caller failing locally.
    pub fn from_json(json: &str) -> Result<Self> {
        let wire: Option<WireRequest> = serde_json::from_str(json)?;
        let wire = wire.ok_or_else(|| Error::InvalidArgument("request is null".to_string()))?;

        let body = match wire.kind.as_str() {
            FETCH_SELECTABLE_DATA => RequestBody::FetchSelectableData,
            PICK_REFERENCE => RequestBody::PickReference,
            IMPORT_SEGMENTS => {
                let plan = match wire.payload {
                    None | Some(Value::Null) => None,
                    Some(payload) => Some(serde_json::from_value(payload).map_err(|source| {
                        Error::InvalidPayload {
                            kind: IMPORT_SEGMENTS.to_string(),
                            source,
                        }
                    })?),
                };
                RequestBody::ImportSegments(plan)
            }
            _ => RequestBody::Unrecognized(wire.kind),
        };

        Ok(Self {
            correlation_id: wire.correlation_id,
            body,
        })
    }

    /// Encode into the wire shape accepted by [`Request::from_json`]
    pub fn to_json(&self) -> Result<String> {
        let payload = match &self.body {
            RequestBody::ImportSegments(Some(plan)) => Some(serde_json::to_value(plan)?),
            _ => None,
        };
        let wire = WireRequest {
            kind: self.body.kind().to_string(),
            correlation_id: self.correlation_id,
            payload,
        };
        Ok(serde_json::to_string(&wire)?)
    }
}

impl Correlated for Request {
    fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    fn set_correlation_id(&mut self, correlation_id: CorrelationId) {
        self.correlation_id = Some(correlation_id);
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Response-level diagnostic codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    NoDocument,
    Cancelled,
    NoPayload,
    UnknownRequest,
    Exception,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::NoDocument => "NO_DOCUMENT",
            DiagnosticCode::Cancelled => "CANCELLED",
            DiagnosticCode::NoPayload => "NO_PAYLOAD",
            DiagnosticCode::UnknownRequest => "UNKNOWN_REQUEST",
            DiagnosticCode::Exception => "EXCEPTION",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            code,
            message: message.into(),
            severity,
        }
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, message, Severity::Error)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, message, Severity::Warning)
    }
}

/// Kind-specific response payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ResponsePayload {
    SelectableData(SelectableData),
    Reference(ReferenceInfo),
    ImportReport(ImportReport),
}

/// The host thread's answer to one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub correlation_id: CorrelationId,
    pub success: bool,
    /// Present only on success
    pub payload: Option<ResponsePayload>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Response {
    pub fn success(correlation_id: CorrelationId, payload: ResponsePayload) -> Self {
        Self {
            correlation_id,
            success: true,
            payload: Some(payload),
            diagnostics: Vec::new(),
        }
    }

    pub fn failure(correlation_id: CorrelationId, diagnostic: Diagnostic) -> Self {
        Self {
            correlation_id,
            success: false,
            payload: None,
            diagnostics: vec![diagnostic],
        }
    }

    /// First diagnostic code, if any
    pub fn code(&self) -> Option<DiagnosticCode> {
        self.diagnostics.first().map(|d| d.code)
    }

    pub fn import_report(&self) -> Option<&ImportReport> {
        match &self.payload {
            Some(ResponsePayload::ImportReport(report)) => Some(report),
            _ => None,
        }
    }

    pub fn selectable_data(&self) -> Option<&SelectableData> {
        match &self.payload {
            Some(ResponsePayload::SelectableData(data)) => Some(data),
            _ => None,
        }
    }

    pub fn reference(&self) -> Option<&ReferenceInfo> {
        match &self.payload {
            Some(ResponsePayload::Reference(reference)) => Some(reference),
            _ => None,
        }
    }
}

impl FaultResponse for Response {
    fn from_fault(correlation_id: CorrelationId, fault: String) -> Self {
        Response::failure(correlation_id, Diagnostic::error(DiagnosticCode::Exception, fault))
    }
}
