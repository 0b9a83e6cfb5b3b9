// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory host
//!
//! A self-contained [`HostApplication`] for tests and the command-line
//! importer. Grouped operations snapshot the created walls on begin and
//! restore the snapshot on rollback. Faults, declined creations and pick
//! results can be scripted to exercise every pipeline path.

use crate::error::{HostError, Result};
use crate::host::{HostApplication, HostDocument, WallPlacement};
use crate::transform::ReferenceTransform;
use bimjson_messaging::{ElementId, LevelInfo, ReferenceInfo, WallTypeInfo};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// First id handed out to created walls
const FIRST_WALL_ID: i64 = 100_000;

/// A wall created in an [`InMemoryDocument`]
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub id: ElementId,
    pub placement: WallPlacement,
}

#[derive(Debug, Clone)]
struct Reference {
    info: ReferenceInfo,
    transform: Option<ReferenceTransform>,
}

/// Created walls and the id counter, the part of the document a group can undo
#[derive(Debug, Clone)]
struct Snapshot {
    walls: Vec<Wall>,
    next_id: i64,
}

#[derive(Debug, Clone)]
struct OpenGroup {
    name: String,
    snapshot: Snapshot,
}

#[derive(Debug, Clone, Default)]
struct Faults {
    queries: Option<String>,
    commit: Option<String>,
    /// 1-based index of the creation call that faults, counted from arming
    create_at: Option<(usize, String)>,
    #[cfg(any(test, feature = "testing"))]
    panic_on_create: Option<String>,
    declined_types: FxHashSet<ElementId>,
}

/// A host document held entirely in memory
#[derive(Debug, Clone)]
pub struct InMemoryDocument {
    levels: Vec<LevelInfo>,
    wall_types: Vec<WallTypeInfo>,
    references: Vec<Reference>,
    walls: Vec<Wall>,
    next_id: i64,
    group: Option<OpenGroup>,
    last_group_name: Option<String>,
    commits: usize,
    rollbacks: usize,
    create_calls: usize,
    faults: Faults,
}

impl Default for InMemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self {
            levels: Vec::new(),
            wall_types: Vec::new(),
            references: Vec::new(),
            walls: Vec::new(),
            next_id: FIRST_WALL_ID,
            group: None,
            last_group_name: None,
            commits: 0,
            rollbacks: 0,
            create_calls: 0,
            faults: Faults::default(),
        }
    }

    pub fn with_level(mut self, id: ElementId, name: &str, elevation_ft: f64) -> Self {
        self.levels.push(LevelInfo {
            id,
            name: name.to_string(),
            elevation_ft,
            unique_id: format!("level-{}", id),
        });
        self
    }

    pub fn with_wall_type(mut self, id: ElementId, name: &str, width_ft: f64) -> Self {
        self.wall_types.push(WallTypeInfo {
            id,
            name: name.to_string(),
            width_ft,
        });
        self
    }

    pub fn with_reference(mut self, id: ElementId, name: &str, transform: ReferenceTransform) -> Self {
        self.push_reference(id, name, Some(transform));
        self
    }

    /// A reference object whose placement cannot be resolved
    pub fn with_unplaced_reference(mut self, id: ElementId, name: &str) -> Self {
        self.push_reference(id, name, None);
        self
    }

    fn push_reference(&mut self, id: ElementId, name: &str, transform: Option<ReferenceTransform>) {
        self.references.push(Reference {
            info: ReferenceInfo {
                id,
                name: name.to_string(),
                unique_id: format!("reference-{}", id),
            },
            transform,
        });
    }

    /// Make every query method fail with `message`
    pub fn fault_queries(&mut self, message: &str) {
        self.faults.queries = Some(message.to_string());
    }

    pub fn fail_commit(&mut self, message: &str) {
        self.faults.commit = Some(message.to_string());
    }

    /// Make the `nth` creation call from now on (1-based) fault
    pub fn fault_on_create(&mut self, nth: usize, message: &str) {
        self.faults.create_at = Some((self.create_calls + nth, message.to_string()));
    }

    /// Panic inside the next creation call
    #[cfg(any(test, feature = "testing"))]
    pub fn panic_on_create(&mut self, message: &str) {
        self.faults.panic_on_create = Some(message.to_string());
    }

    #[cfg(any(test, feature = "testing"))]
    fn trip_injected_panic(&mut self) {
        if let Some(message) = self.faults.panic_on_create.take() {
            panic!("{}", message);
        }
    }

    #[cfg(not(any(test, feature = "testing")))]
    fn trip_injected_panic(&mut self) {}

    /// Decline (without faulting) every wall of the given type
    pub fn decline_wall_type(&mut self, wall_type: ElementId) {
        self.faults.declined_types.insert(wall_type);
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn group_open(&self) -> bool {
        self.group.is_some()
    }

    pub fn last_group_name(&self) -> Option<&str> {
        self.last_group_name.as_deref()
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks
    }

    fn check_queries(&self) -> Result<()> {
        match &self.faults.queries {
            Some(message) => Err(HostError::fault(message.as_str())),
            None => Ok(()),
        }
    }
}

impl HostDocument for InMemoryDocument {
    fn levels(&self) -> Result<Vec<LevelInfo>> {
        self.check_queries()?;
        Ok(self.levels.clone())
    }

    fn wall_types(&self) -> Result<Vec<WallTypeInfo>> {
        self.check_queries()?;
        Ok(self.wall_types.clone())
    }

    fn references(&self) -> Result<Vec<ReferenceInfo>> {
        self.check_queries()?;
        Ok(self.references.iter().map(|r| r.info.clone()).collect())
    }

    fn level(&self, id: ElementId) -> Result<Option<LevelInfo>> {
        self.check_queries()?;
        Ok(self.levels.iter().find(|level| level.id == id).cloned())
    }

    fn reference(&self, id: ElementId) -> Result<Option<ReferenceInfo>> {
        self.check_queries()?;
        Ok(self
            .references
            .iter()
            .find(|r| r.info.id == id)
            .map(|r| r.info.clone()))
    }

    fn reference_transform(&self, id: ElementId) -> Result<Option<ReferenceTransform>> {
        self.check_queries()?;
        Ok(self
            .references
            .iter()
            .find(|r| r.info.id == id)
            .and_then(|r| r.transform))
    }

    fn begin_group(&mut self, name: &str) -> Result<()> {
        if let Some(open) = &self.group {
            return Err(HostError::fault(format!(
                "Grouped operation '{}' is already open",
                open.name
            )));
        }
        self.group = Some(OpenGroup {
            name: name.to_string(),
            snapshot: Snapshot {
                walls: self.walls.clone(),
                next_id: self.next_id,
            },
        });
        self.last_group_name = Some(name.to_string());
        Ok(())
    }

    fn commit_group(&mut self) -> Result<()> {
        if self.group.is_none() {
            return Err(HostError::fault("No grouped operation to commit"));
        }
        if let Some(message) = &self.faults.commit {
            return Err(HostError::fault(message.as_str()));
        }
        self.group = None;
        self.commits += 1;
        Ok(())
    }

    fn rollback_group(&mut self) -> Result<()> {
        let open = self
            .group
            .take()
            .ok_or_else(|| HostError::fault("No grouped operation to roll back"))?;
        self.walls = open.snapshot.walls;
        self.next_id = open.snapshot.next_id;
        self.rollbacks += 1;
        Ok(())
    }

    fn create_wall(&mut self, placement: &WallPlacement) -> Result<Option<ElementId>> {
        if self.group.is_none() {
            return Err(HostError::fault("Walls can only be created inside a grouped operation"));
        }
        self.create_calls += 1;

        self.trip_injected_panic();
        if let Some((at, message)) = &self.faults.create_at {
            if *at == self.create_calls {
                return Err(HostError::fault(message.as_str()));
            }
        }

        let known_type = self.wall_types.iter().any(|t| t.id == placement.wall_type);
        let known_level = self.levels.iter().any(|l| l.id == placement.base_level);
        let zero_length = placement.start == placement.end;
        if !known_type || !known_level || zero_length {
            return Ok(None);
        }
        if self.faults.declined_types.contains(&placement.wall_type) {
            return Ok(None);
        }

        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.walls.push(Wall {
            id,
            placement: placement.clone(),
        });
        Ok(Some(id))
    }
}

/// Pick outcome queued with [`InMemoryHost::script_pick`]
#[derive(Debug, Clone)]
enum ScriptedPick {
    Element(ElementId),
    /// Returned as-is, without the reference filter
    Raw(ElementId),
    Cancel,
    Fault(String),
}

/// An application with at most one open [`InMemoryDocument`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryHost {
    document: Option<InMemoryDocument>,
    picks: VecDeque<ScriptedPick>,
}

impl InMemoryHost {
    pub fn new(document: InMemoryDocument) -> Self {
        Self {
            document: Some(document),
            picks: VecDeque::new(),
        }
    }

    /// An application with no document open
    pub fn without_document() -> Self {
        Self::default()
    }

    /// Queue the element the user will pick next
    pub fn script_pick(&mut self, id: ElementId) {
        self.picks.push_back(ScriptedPick::Element(id));
    }

    /// Queue a pick that bypasses the selection filter, as when the host
    /// returns an element the document cannot describe
    pub fn script_unfiltered_pick(&mut self, id: ElementId) {
        self.picks.push_back(ScriptedPick::Raw(id));
    }

    /// Queue a cancelled pick
    pub fn script_cancel(&mut self) {
        self.picks.push_back(ScriptedPick::Cancel);
    }

    /// Queue a pick that faults
    pub fn script_pick_fault(&mut self, message: &str) {
        self.picks.push_back(ScriptedPick::Fault(message.to_string()));
    }

    pub fn document(&self) -> Option<&InMemoryDocument> {
        self.document.as_ref()
    }

    /// Close the open document, handing it back
    pub fn close_document(&mut self) -> Option<InMemoryDocument> {
        self.document.take()
    }
}

impl HostApplication for InMemoryHost {
    type Document = InMemoryDocument;

    fn active_document(&mut self) -> Option<&mut InMemoryDocument> {
        self.document.as_mut()
    }

    /// Unscripted picks behave like a cancelled prompt; picks of elements that
    /// are not reference objects are filtered out like the host's selection filter.
    fn pick_reference(&mut self) -> Result<Option<ElementId>> {
        match self.picks.pop_front() {
            Some(ScriptedPick::Element(id)) => {
                let is_reference = match &self.document {
                    Some(doc) => doc.references.iter().any(|r| r.info.id == id),
                    None => false,
                };
                Ok(is_reference.then_some(id))
            }
            Some(ScriptedPick::Raw(id)) => Ok(Some(id)),
            Some(ScriptedPick::Fault(message)) => Err(HostError::Fault(message)),
            Some(ScriptedPick::Cancel) | None => Ok(None),
        }
    }
}
