// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kind-specific payloads and read models
//!
//! These types are serialized to/from JSON with camelCase fields so a
//! presentation layer can build requests and render responses without
//! linking the host side.

use bimjson_core::WallSegment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Host element identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub i64);

impl ElementId {
    /// Parse a decimal identifier token as sent by the presentation layer
    pub fn parse(token: &str) -> Option<Self> {
        token.trim().parse::<i64>().ok().map(Self)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Elevation datum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub id: ElementId,
    pub name: String,
    /// Elevation in host internal units (feet)
    pub elevation_ft: f64,
    pub unique_id: String,
}

/// Wall type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WallTypeInfo {
    pub id: ElementId,
    pub name: String,
    /// Nominal width in host internal units (feet)
    pub width_ft: f64,
}

/// Reference object (CAD import or linked model) whose placement anchors the import
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceInfo {
    pub id: ElementId,
    pub name: String,
    pub unique_id: String,
}

/// Everything a caller can choose from before importing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectableData {
    /// Sorted ascending by elevation
    pub levels: Vec<LevelInfo>,
    pub wall_types: Vec<WallTypeInfo>,
    pub references: Vec<ReferenceInfo>,
}

/// Where the segments of an import come from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum SegmentSource {
    /// Document on disk, parsed on the host thread
    Path(PathBuf),
    /// Segments the caller already decoded
    Segments(Vec<WallSegment>),
}

/// One row of the thickness → wall type table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeMapping {
    pub thickness_cm: f64,
    pub wall_type_id: String,
}

/// Import-segments request payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportPlan {
    pub source: SegmentSource,
    pub reference_id: String,
    pub base_level_id: String,
    pub top_level_id: String,
    #[serde(default)]
    pub mappings: Vec<TypeMapping>,
}

/// Outcome of a single segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemStatus {
    Created,
    Skipped,
    Failed,
}

/// Why a segment was not created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    InvalidId,
    LevelNotFound,
    TopBelowBase,
    CadTransform,
    DegenerateHeight,
    DegenerateLine,
    MissingMapping,
    CreateFailed,
    Exception,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::InvalidId => "INVALID_ID",
            ReasonCode::LevelNotFound => "LEVEL_NOT_FOUND",
            ReasonCode::TopBelowBase => "TOP_BELOW_BASE",
            ReasonCode::CadTransform => "CAD_TRANSFORM",
            ReasonCode::DegenerateHeight => "DEGENERATE_HEIGHT",
            ReasonCode::DegenerateLine => "DEGENERATE_LINE",
            ReasonCode::MissingMapping => "MISSING_MAPPING",
            ReasonCode::CreateFailed => "CREATE_FAILED",
            ReasonCode::Exception => "EXCEPTION",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-segment line of an [`ImportReport`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportItemResult {
    pub source_id: String,
    pub status: ItemStatus,
    /// Present unless created
    pub reason: Option<ReasonCode>,
    pub message: String,
    /// Present only when created
    pub created_id: Option<ElementId>,
}

impl ImportItemResult {
    pub fn created(source_id: impl Into<String>, created_id: ElementId) -> Self {
        Self {
            source_id: source_id.into(),
            status: ItemStatus::Created,
            reason: None,
            message: String::new(),
            created_id: Some(created_id),
        }
    }

    pub fn skipped(source_id: impl Into<String>, reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            status: ItemStatus::Skipped,
            reason: Some(reason),
            message: message.into(),
            created_id: None,
        }
    }

    pub fn failed(source_id: impl Into<String>, reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            status: ItemStatus::Failed,
            reason: Some(reason),
            message: message.into(),
            created_id: None,
        }
    }
}

/// Aggregated outcome of an import request
///
/// Counts are kept in step with `items` by [`ImportReport::record`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub items: Vec<ImportItemResult>,
}

impl ImportReport {
    pub fn record(&mut self, item: ImportItemResult) {
        match item.status {
            ItemStatus::Created => self.created += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Failed => self.failed += 1,
        }
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ImportItemResult>) {
        for item in items {
            self.record(item);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items with a given reason, in report order
    pub fn with_reason(&self, reason: ReasonCode) -> impl Iterator<Item = &ImportItemResult> {
        self.items.iter().filter(move |item| item.reason == Some(reason))
    }
}
