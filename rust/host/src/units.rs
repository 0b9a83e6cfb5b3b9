// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Length conversion between source millimeters and host internal feet

/// Millimeters in one international foot
pub const MM_PER_FOOT: f64 = 304.8;

#[inline]
pub fn mm_to_feet(mm: f64) -> f64 {
    mm / MM_PER_FOOT
}

#[inline]
pub fn feet_to_mm(feet: f64) -> f64 {
    feet * MM_PER_FOOT
}
