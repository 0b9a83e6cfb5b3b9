// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Executor driven by a real host thread through the bridge.

use bimjson_core::{Point2D, WallSegment};
use bimjson_host::memory::{InMemoryDocument, InMemoryHost};
use bimjson_host::{HostExecutor, ReferenceTransform};
use bimjson_messaging::{
    DiagnosticCode, Dispatcher, ElementId, ImportPlan, ItemStatus, ReasonCode, Request,
    RequestBody, Response, SegmentSource, Severity, TypeMapping,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::time::timeout;

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

enum Signal {
    Wake,
    Stop,
}

/// Host thread owning the application, activated by the bridge's wake signal
struct HostThread {
    dispatcher: Arc<Dispatcher>,
    signals: mpsc::Sender<Signal>,
    handle: JoinHandle<InMemoryHost>,
}

impl HostThread {
    fn spawn(mut host: InMemoryHost) -> Self {
        let (signals, receiver) = mpsc::channel();
        let wake = Mutex::new(signals.clone());
        let dispatcher = Arc::new(Dispatcher::with_wake_signal(Arc::new(move || {
            let _ = wake.lock().unwrap().send(Signal::Wake);
        })));

        let executor = HostExecutor::new(dispatcher.clone());
        let handle = thread::spawn(move || {
            while let Ok(Signal::Wake) = receiver.recv() {
                executor.on_activation(&mut host);
            }
            host
        });

        Self {
            dispatcher,
            signals,
            handle,
        }
    }

    async fn send(&self, body: RequestBody) -> Response {
        let pending = self.dispatcher.submit(Request::new(body)).unwrap();
        let correlation_id = pending.correlation_id();
        let response = timeout(RESPONSE_TIMEOUT, pending)
            .await
            .expect("host answered in time")
            .expect("bridge still alive");
        assert_eq!(response.correlation_id, correlation_id);
        response
    }

    fn stop(self) -> InMemoryHost {
        self.signals.send(Signal::Stop).unwrap();
        self.handle.join().unwrap()
    }
}

fn document() -> InMemoryDocument {
    InMemoryDocument::new()
        .with_level(ElementId(11), "Level 2", 10.0)
        .with_level(ElementId(10), "Level 1", 0.0)
        .with_level(ElementId(9), "Basement", -9.5)
        .with_wall_type(ElementId(501), "Generic 200", 0.656)
        .with_reference(ElementId(900), "Plan.dwg", ReferenceTransform::identity())
}

fn import_plan(segments: Vec<WallSegment>) -> ImportPlan {
    ImportPlan {
        source: SegmentSource::Segments(segments),
        reference_id: "900".to_string(),
        base_level_id: "10".to_string(),
        top_level_id: "11".to_string(),
        mappings: vec![TypeMapping {
            thickness_cm: 20.0,
            wall_type_id: "501".to_string(),
        }],
    }
}

fn wall(id: &str) -> WallSegment {
    WallSegment {
        id: id.to_string(),
        thickness_cm: 20.0,
        a: Point2D::new(0.0, 0.0),
        b: Point2D::new(1000.0, 0.0),
    }
}

#[tokio::test]
async fn test_fetch_selectable_data() {
    let host = HostThread::spawn(InMemoryHost::new(document()));

    let response = host.send(RequestBody::FetchSelectableData).await;
    assert!(response.success);
    assert!(response.diagnostics.is_empty());
    let data = response.selectable_data().unwrap();

    let levels: Vec<&str> = data.levels.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(levels, vec!["Basement", "Level 1", "Level 2"]);
    assert_eq!(data.wall_types.len(), 1);
    assert_eq!(data.references[0].id, ElementId(900));

    host.stop();
}

#[tokio::test]
async fn test_no_document_for_every_kind() {
    let host = HostThread::spawn(InMemoryHost::without_document());

    for body in [
        RequestBody::FetchSelectableData,
        RequestBody::PickReference,
        RequestBody::ImportSegments(None),
        RequestBody::Unrecognized("export".to_string()),
    ] {
        let response = host.send(body).await;
        assert!(!response.success);
        assert!(response.payload.is_none());
        assert_eq!(response.code(), Some(DiagnosticCode::NoDocument));
        assert_eq!(response.diagnostics[0].severity, Severity::Error);
    }

    host.stop();
}

#[tokio::test]
async fn test_pick_reference() {
    let mut app = InMemoryHost::new(document());
    app.script_pick(ElementId(900));
    app.script_cancel();
    let host = HostThread::spawn(app);

    let picked = host.send(RequestBody::PickReference).await;
    assert!(picked.success);
    let reference = picked.reference().unwrap();
    assert_eq!(reference.id, ElementId(900));
    assert_eq!(reference.name, "Plan.dwg");

    let cancelled = host.send(RequestBody::PickReference).await;
    assert!(!cancelled.success);
    assert_eq!(cancelled.code(), Some(DiagnosticCode::Cancelled));
    assert_eq!(cancelled.diagnostics[0].severity, Severity::Warning);

    host.stop();
}

#[tokio::test]
async fn test_pick_of_undescribed_element_falls_back_to_cad() {
    let mut app = InMemoryHost::new(document());
    app.script_unfiltered_pick(ElementId(4242));
    let host = HostThread::spawn(app);

    let picked = host.send(RequestBody::PickReference).await;
    assert!(picked.success);
    let reference = picked.reference().unwrap();
    assert_eq!(reference.id, ElementId(4242));
    assert_eq!(reference.name, "CAD");
    assert!(reference.unique_id.is_empty());

    host.stop();
}

#[tokio::test]
async fn test_pick_fault_becomes_exception() {
    let mut app = InMemoryHost::new(document());
    app.script_pick_fault("selection API unavailable");
    let host = HostThread::spawn(app);

    let response = host.send(RequestBody::PickReference).await;
    assert!(!response.success);
    assert_eq!(response.code(), Some(DiagnosticCode::Exception));
    assert!(response.diagnostics[0]
        .message
        .contains("selection API unavailable"));

    host.stop();
}

#[tokio::test]
async fn test_missing_payload_and_unknown_kind() {
    let host = HostThread::spawn(InMemoryHost::new(document()));

    let no_payload = host.send(RequestBody::ImportSegments(None)).await;
    assert!(!no_payload.success);
    assert_eq!(no_payload.code(), Some(DiagnosticCode::NoPayload));

    let unknown = host
        .send(RequestBody::Unrecognized("delete-walls".to_string()))
        .await;
    assert!(!unknown.success);
    assert_eq!(unknown.code(), Some(DiagnosticCode::UnknownRequest));
    assert!(unknown.diagnostics[0].message.contains("delete-walls"));

    host.stop();
}

#[tokio::test]
async fn test_import_reports_success_with_item_failures() {
    let host = HostThread::spawn(InMemoryHost::new(document()));

    let mut unmapped = wall("unmapped");
    unmapped.thickness_cm = 33.0;
    let mut plan = import_plan(vec![wall("a"), unmapped, wall("b")]);
    plan.mappings.push(TypeMapping {
        thickness_cm: 33.0,
        wall_type_id: "no".to_string(),
    });

    let response = host.send(RequestBody::ImportSegments(Some(plan))).await;
    assert!(response.success);
    let report = response.import_report().unwrap();
    assert_eq!((report.created, report.skipped, report.failed), (2, 0, 1));
    assert_eq!(report.items[0].reason, Some(ReasonCode::MissingMapping));

    let app = host.stop();
    assert_eq!(app.document().unwrap().walls().len(), 2);
}

#[tokio::test]
async fn test_import_all_rejected_still_succeeds() {
    let host = HostThread::spawn(InMemoryHost::new(document()));

    let mut plan = import_plan(vec![wall("a"), wall("b")]);
    plan.top_level_id = "9".to_string();
    let response = host.send(RequestBody::ImportSegments(Some(plan))).await;

    assert!(response.success);
    let report = response.import_report().unwrap();
    assert_eq!((report.created, report.skipped, report.failed), (0, 0, 2));
    assert!(report
        .items
        .iter()
        .all(|item| item.status == ItemStatus::Failed && item.reason == Some(ReasonCode::TopBelowBase)));

    host.stop();
}

#[tokio::test]
async fn test_query_fault_becomes_exception() {
    let mut doc = document();
    doc.fault_queries("model is busy");
    let host = HostThread::spawn(InMemoryHost::new(doc));

    let response = host.send(RequestBody::FetchSelectableData).await;
    assert!(!response.success);
    assert!(response.payload.is_none());
    assert_eq!(response.code(), Some(DiagnosticCode::Exception));
    assert!(response.diagnostics[0].message.contains("model is busy"));

    host.stop();
}

#[tokio::test]
async fn test_panic_is_contained_and_rolled_back() {
    let mut doc = document();
    doc.panic_on_create("host crashed mid-creation");
    let host = HostThread::spawn(InMemoryHost::new(doc));

    let plan = import_plan(vec![wall("a"), wall("b")]);
    let response = host.send(RequestBody::ImportSegments(Some(plan.clone()))).await;
    assert!(!response.success);
    assert_eq!(response.code(), Some(DiagnosticCode::Exception));
    assert!(response.diagnostics[0]
        .message
        .contains("host crashed mid-creation"));

    // The host thread keeps serving after the panic
    let retry = host.send(RequestBody::ImportSegments(Some(plan))).await;
    assert!(retry.success);
    assert_eq!(retry.import_report().unwrap().created, 2);

    let app = host.stop();
    let doc = app.document().unwrap();
    assert_eq!(doc.walls().len(), 2);
    assert_eq!(doc.rollback_count(), 1);
    assert!(!doc.group_open());
}

#[tokio::test]
async fn test_import_from_wire_request() {
    let host = HostThread::spawn(InMemoryHost::new(document()));
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/models/walls.bimjson");

    let json = serde_json_request(&fixture);
    let request = Request::from_json(&json).unwrap();
    let response = host.send(request.body).await;

    assert!(response.success);
    let report = response.import_report().unwrap();
    // Only the 20 cm walls are mapped; the 50 mm partition is skipped
    assert_eq!((report.created, report.skipped, report.failed), (3, 1, 3));

    host.stop();
}

fn serde_json_request(fixture: &std::path::Path) -> String {
    json!({
        "kind": "import-segments",
        "payload": {
            "source": { "path": fixture },
            "referenceId": "900",
            "baseLevelId": "10",
            "topLevelId": "11",
            "mappings": [{ "thicknessCm": 20.0, "wallTypeId": "501" }]
        }
    })
    .to_string()
}

#[test]
fn test_idle_activation() {
    let dispatcher = Arc::new(Dispatcher::new());
    let executor = HostExecutor::new(dispatcher.clone());
    let mut app = InMemoryHost::new(document());

    assert!(!executor.on_activation(&mut app));

    let _pending = dispatcher
        .submit(Request::new(RequestBody::FetchSelectableData))
        .unwrap();
    assert!(executor.on_activation(&mut app));
    assert!(!executor.on_activation(&mut app));
    assert_eq!(dispatcher.pending_count(), 0);
}

#[tokio::test]
async fn test_document_closed_between_requests() {
    let dispatcher = Arc::new(Dispatcher::new());
    let executor = HostExecutor::new(dispatcher.clone());
    let mut app = InMemoryHost::new(document());

    let _first = dispatcher
        .submit(Request::new(RequestBody::FetchSelectableData))
        .unwrap();
    assert!(executor.on_activation(&mut app));

    let closed = app.close_document().unwrap();
    assert!(closed.walls().is_empty());

    let pending = dispatcher
        .submit(Request::new(RequestBody::FetchSelectableData))
        .unwrap();
    assert!(executor.on_activation(&mut app));
    let response = timeout(RESPONSE_TIMEOUT, pending).await.unwrap().unwrap();
    assert!(!response.success);
    assert_eq!(response.code(), Some(DiagnosticCode::NoDocument));
}
