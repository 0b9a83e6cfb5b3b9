// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall import pipeline
//!
//! An import moves through `Parsed → Validated → Committed | RolledBack`:
//!
//! 1. Segments are parsed from the plan's source.
//! 2. Batch preconditions (ids, levels, reference transform, height) are
//!    checked. A failure rejects every segment with the same reason.
//! 3. Each segment is validated on its own: too-short segments are skipped,
//!    segments with no mapped wall type fail.
//! 4. Accepted segments are created inside one grouped operation. A fault
//!    rolls the whole group back and every accepted segment is reported as
//!    failed with the fault message.

use crate::error::Result;
use crate::host::{HostDocument, WallPlacement};
use crate::transform::ReferenceTransform;
use bimjson_core::{read_segments, ThicknessKey, WallSegment};
use bimjson_messaging::{
    ElementId, ImportItemResult, ImportPlan, ImportReport, ReasonCode, SegmentSource, TypeMapping,
};
use nalgebra::Point3;
use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// Segments shorter than this are treated as drafting noise
pub const DEFAULT_MIN_LENGTH_MM: f64 = 100.0;

/// Name of the grouped operation shown in the host's undo history
pub const DEFAULT_GROUP_NAME: &str = "Create Walls";

/// Tunables for [`import_walls`]
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub min_length_mm: f64,
    pub group_name: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            min_length_mm: DEFAULT_MIN_LENGTH_MM,
            group_name: DEFAULT_GROUP_NAME.to_string(),
        }
    }
}

/// Import the plan's segments as walls into `doc`
///
/// Per-segment outcomes, batch precondition failures and rolled-back
/// creations are all reported through the returned [`ImportReport`]. `Err`
/// is returned only when a host query faults before the commit stage.
pub fn import_walls<D>(doc: &mut D, plan: &ImportPlan, options: &ImportOptions) -> Result<ImportReport>
where
    D: HostDocument + ?Sized,
{
    let segments: Cow<'_, [WallSegment]> = match &plan.source {
        SegmentSource::Path(path) => Cow::Owned(read_segments(path)),
        SegmentSource::Segments(segments) => Cow::Borrowed(segments.as_slice()),
    };
    if segments.is_empty() {
        tracing::info!("No wall segments to import");
        return Ok(ImportReport::default());
    }

    let frame = match resolve_frame(&*doc, plan)? {
        Ok(frame) => frame,
        Err((reason, message)) => {
            tracing::warn!(reason = %reason, segments = segments.len(), "{}", message);
            return Ok(reject_batch(&segments, reason, message));
        }
    };

    let mapping = build_type_mapping(&plan.mappings);

    let mut report = ImportReport::default();
    let mut accepted = Vec::new();
    for segment in segments.iter() {
        let length_mm = segment.length_mm();
        if length_mm < options.min_length_mm {
            report.record(ImportItemResult::skipped(
                &segment.id,
                ReasonCode::DegenerateLine,
                format!("Length {:.0} mm < {} mm.", length_mm, options.min_length_mm),
            ));
            continue;
        }
        match mapping.get(&segment.thickness_key()) {
            Some(&wall_type) => accepted.push((segment, wall_type)),
            None => report.record(ImportItemResult::failed(
                &segment.id,
                ReasonCode::MissingMapping,
                format!("No wall type for thickness {} cm.", segment.thickness_cm),
            )),
        }
    }

    if accepted.is_empty() {
        tracing::info!(skipped = report.skipped, failed = report.failed, "No segments accepted for creation");
        return Ok(report);
    }

    match create_batch(doc, &frame, &accepted, &options.group_name) {
        Ok(items) => report.extend(items),
        Err(fault) => {
            tracing::warn!(error = %fault, accepted = accepted.len(), "Wall creation rolled back");
            let message = fault.to_string();
            report.extend(accepted.iter().map(|(segment, _)| {
                ImportItemResult::failed(&segment.id, ReasonCode::Exception, message.clone())
            }));
        }
    }

    tracing::info!(
        created = report.created,
        skipped = report.skipped,
        failed = report.failed,
        "Wall import finished"
    );
    Ok(report)
}

/// Resolved levels, height and reference placement shared by every wall
#[derive(Debug, Clone)]
struct PlacementFrame {
    base_level: ElementId,
    top_level: ElementId,
    height: f64,
    transform: ReferenceTransform,
}

impl PlacementFrame {
    fn place<D: HostDocument + ?Sized>(
        &self,
        doc: &D,
        segment: &WallSegment,
        wall_type: ElementId,
    ) -> WallPlacement {
        let to_host = |x: f64, y: f64| {
            self.transform
                .apply(&Point3::new(doc.mm_to_internal(x), doc.mm_to_internal(y), 0.0))
        };
        WallPlacement {
            start: to_host(segment.a.x, segment.a.y),
            end: to_host(segment.b.x, segment.b.y),
            wall_type,
            base_level: self.base_level,
            top_level: self.top_level,
            height: self.height,
        }
    }
}

type Rejection = (ReasonCode, &'static str);

/// Batch preconditions, checked in order
///
/// The outer `Result` carries host faults, the inner one a rejection.
fn resolve_frame<D>(doc: &D, plan: &ImportPlan) -> Result<std::result::Result<PlacementFrame, Rejection>>
where
    D: HostDocument + ?Sized,
{
    let ids = (
        ElementId::parse(&plan.reference_id),
        ElementId::parse(&plan.base_level_id),
        ElementId::parse(&plan.top_level_id),
    );
    let (reference_id, base_id, top_id) = match ids {
        (Some(reference), Some(base), Some(top)) => (reference, base, top),
        _ => {
            return Ok(Err((
                ReasonCode::InvalidId,
                "Invalid level or reference element id.",
            )))
        }
    };

    let (base, top) = match (doc.level(base_id)?, doc.level(top_id)?) {
        (Some(base), Some(top)) => (base, top),
        _ => return Ok(Err((ReasonCode::LevelNotFound, "Base or top level not found."))),
    };

    if top.elevation_ft < base.elevation_ft {
        return Ok(Err((
            ReasonCode::TopBelowBase,
            "Top level elevation is below base level.",
        )));
    }

    let transform = match doc.reference_transform(reference_id)? {
        Some(transform) => transform,
        None => {
            return Ok(Err((
                ReasonCode::CadTransform,
                "Could not resolve the reference object transform.",
            )))
        }
    };

    let height = top.elevation_ft - base.elevation_ft;
    if height.is_nan() || height <= 0.0 {
        return Ok(Err((ReasonCode::DegenerateHeight, "Wall height must be positive.")));
    }

    Ok(Ok(PlacementFrame {
        base_level: base_id,
        top_level: top_id,
        height,
        transform,
    }))
}

/// Thickness → wall type lookup keyed the same way segments are grouped
///
/// Rows with an unparsable wall type id are dropped; a later row for the
/// same thickness replaces an earlier one.
pub fn build_type_mapping(rows: &[TypeMapping]) -> FxHashMap<ThicknessKey, ElementId> {
    let mut mapping = FxHashMap::default();
    for row in rows {
        match ElementId::parse(&row.wall_type_id) {
            Some(wall_type) => {
                mapping.insert(ThicknessKey::from_cm(row.thickness_cm), wall_type);
            }
            None => tracing::debug!(
                thickness_cm = row.thickness_cm,
                wall_type_id = %row.wall_type_id,
                "Ignoring mapping with invalid wall type id"
            ),
        }
    }
    mapping
}

fn reject_batch(segments: &[WallSegment], reason: ReasonCode, message: &str) -> ImportReport {
    let mut report = ImportReport::default();
    report.extend(
        segments
            .iter()
            .map(|segment| ImportItemResult::failed(&segment.id, reason, message)),
    );
    report
}

/// Create every accepted segment inside one grouped operation
fn create_batch<D>(
    doc: &mut D,
    frame: &PlacementFrame,
    accepted: &[(&WallSegment, ElementId)],
    group_name: &str,
) -> Result<Vec<ImportItemResult>>
where
    D: HostDocument + ?Sized,
{
    let mut group = MutationGroup::begin(doc, group_name)?;
    let mut items = Vec::with_capacity(accepted.len());

    for (segment, wall_type) in accepted {
        let placement = frame.place(&*group.document(), segment, *wall_type);
        match group.document().create_wall(&placement)? {
            Some(created_id) => items.push(ImportItemResult::created(&segment.id, created_id)),
            None => {
                tracing::debug!(segment = %segment.id, "Host declined wall creation");
                items.push(ImportItemResult::failed(
                    &segment.id,
                    ReasonCode::CreateFailed,
                    "Wall creation returned no element.",
                ));
            }
        }
    }

    group.commit()?;
    Ok(items)
}

/// Open grouped operation on a document
///
/// Dropping the guard without [`MutationGroup::commit`] rolls the group
/// back, including when unwinding from a panic.
pub struct MutationGroup<'a, D: HostDocument + ?Sized> {
    doc: &'a mut D,
    committed: bool,
}

impl<'a, D: HostDocument + ?Sized> MutationGroup<'a, D> {
    pub fn begin(doc: &'a mut D, name: &str) -> Result<Self> {
        doc.begin_group(name)?;
        Ok(Self {
            doc,
            committed: false,
        })
    }

    pub fn document(&mut self) -> &mut D {
        self.doc
    }

    /// Commit; on failure the guard still rolls back when dropped
    pub fn commit(mut self) -> Result<()> {
        self.doc.commit_group()?;
        self.committed = true;
        Ok(())
    }
}

impl<D: HostDocument + ?Sized> Drop for MutationGroup<'_, D> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(err) = self.doc.rollback_group() {
            tracing::error!(error = %err, "Failed to roll back grouped operation");
        }
    }
}
