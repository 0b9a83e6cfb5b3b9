// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for decoded wall features

use serde::{Deserialize, Serialize};

/// A 2D point in millimetres
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Straight wall segment decoded from a LineString feature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WallSegment {
    /// Feature id, properties id, or a generated token
    pub id: String,
    /// Wall thickness in centimetres (0 when unresolved)
    pub thickness_cm: f64,
    /// First endpoint (mm)
    pub a: Point2D,
    /// Second endpoint (mm)
    pub b: Point2D,
}

impl WallSegment {
    /// Planar length in millimetres
    pub fn length_mm(&self) -> f64 {
        self.a.distance_to(&self.b)
    }

    /// Thickness rounded to the grouping/mapping precision
    pub fn thickness_key(&self) -> ThicknessKey {
        ThicknessKey::from_cm(self.thickness_cm)
    }
}

/// Thickness rounded to 0.01 cm, stored as integer hundredths
///
/// Used both for grouping and for looking up the target wall type, so the
/// two always agree on which bucket a segment falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThicknessKey(i64);

impl ThicknessKey {
    pub fn from_cm(thickness_cm: f64) -> Self {
        if !thickness_cm.is_finite() {
            return Self(0);
        }
        Self((thickness_cm * 100.0).round() as i64)
    }

    pub fn hundredths(&self) -> i64 {
        self.0
    }

    pub fn to_cm(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Number of segments sharing one rounded thickness
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThicknessGroup {
    pub thickness_cm: f64,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_length() {
        let segment = WallSegment {
            id: "w".into(),
            thickness_cm: 20.0,
            a: Point2D::new(0.0, 0.0),
            b: Point2D::new(300.0, 400.0),
        };
        assert!((segment.length_mm() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_thickness_key_rounding() {
        assert_eq!(ThicknessKey::from_cm(10.001), ThicknessKey::from_cm(10.004));
        assert_eq!(ThicknessKey::from_cm(12.346).hundredths(), 1235);
        assert_eq!(ThicknessKey::from_cm(20.0).to_cm(), 20.0);
        assert_eq!(ThicknessKey::from_cm(f64::NAN).hundredths(), 0);
        assert!(ThicknessKey::from_cm(9.99) < ThicknessKey::from_cm(10.0));
    }
}
