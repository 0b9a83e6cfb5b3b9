// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thickness grouping of decoded segments

use crate::types::{ThicknessGroup, ThicknessKey, WallSegment};
use std::collections::BTreeMap;

/// Count segments per thickness rounded to 0.01 cm, ascending by thickness
pub fn group_by_thickness(segments: &[WallSegment]) -> Vec<ThicknessGroup> {
    let mut counts: BTreeMap<ThicknessKey, usize> = BTreeMap::new();
    for segment in segments {
        *counts.entry(segment.thickness_key()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(key, count)| ThicknessGroup {
            thickness_cm: key.to_cm(),
            count,
        })
        .collect()
}
