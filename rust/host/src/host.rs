// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host collaborator interface
//!
//! The executor and the import pipeline only reach the host application
//! through these traits. Every method is called on the host thread.

use crate::error::Result;
use crate::transform::ReferenceTransform;
use crate::units;
use bimjson_messaging::{ElementId, LevelInfo, ReferenceInfo, WallTypeInfo};
use nalgebra::Point3;

/// Everything needed to create one straight wall
#[derive(Debug, Clone, PartialEq)]
pub struct WallPlacement {
    /// Start point in host coordinates
    pub start: Point3<f64>,
    /// End point in host coordinates
    pub end: Point3<f64>,
    pub wall_type: ElementId,
    pub base_level: ElementId,
    /// Level the wall top is attached to
    pub top_level: ElementId,
    /// Unconnected height in host internal units
    pub height: f64,
}

/// The running host application
pub trait HostApplication {
    type Document: HostDocument;

    /// The document the user is working in, if any
    fn active_document(&mut self) -> Option<&mut Self::Document>;

    /// Prompt the user to pick a reference object
    ///
    /// `Ok(None)` when the user cancels or picks nothing usable.
    fn pick_reference(&mut self) -> Result<Option<ElementId>>;
}

/// An open host document
pub trait HostDocument {
    fn levels(&self) -> Result<Vec<LevelInfo>>;

    fn wall_types(&self) -> Result<Vec<WallTypeInfo>>;

    fn references(&self) -> Result<Vec<ReferenceInfo>>;

    fn level(&self, id: ElementId) -> Result<Option<LevelInfo>>;

    fn reference(&self, id: ElementId) -> Result<Option<ReferenceInfo>>;

    /// Placement of a reference object; `None` if `id` is not one
    fn reference_transform(&self, id: ElementId) -> Result<Option<ReferenceTransform>>;

    /// Open a grouped operation; mutations until commit or rollback form one unit
    fn begin_group(&mut self, name: &str) -> Result<()>;

    fn commit_group(&mut self) -> Result<()>;

    /// Restore the state from before [`HostDocument::begin_group`]
    fn rollback_group(&mut self) -> Result<()>;

    /// Create a wall
    ///
    /// `Ok(None)` means the host declined the placement, which is not a fault.
    fn create_wall(&mut self, placement: &WallPlacement) -> Result<Option<ElementId>>;

    /// Convert source millimeters to host internal length units
    fn mm_to_internal(&self, mm: f64) -> f64 {
        units::mm_to_feet(mm)
    }
}
