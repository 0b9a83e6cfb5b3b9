// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement of a reference object in host coordinates
//!
//! Source segments are authored relative to the reference object (a CAD
//! import or linked model). Its placement is an affine 4x4 matrix in host
//! internal units, applied after the millimeter to internal conversion.

use nalgebra::{Matrix4, Point3, Vector3};

/// Affine transform from reference-local to host coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceTransform {
    matrix: Matrix4<f64>,
}

impl Default for ReferenceTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ReferenceTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wrap a matrix; `None` if it is not a finite affine transform
    pub fn from_matrix(matrix: Matrix4<f64>) -> Option<Self> {
        let affine_row = matrix[(3, 0)] == 0.0
            && matrix[(3, 1)] == 0.0
            && matrix[(3, 2)] == 0.0
            && matrix[(3, 3)] == 1.0;
        if affine_row && matrix.iter().all(|v| v.is_finite()) {
            Some(Self { matrix })
        } else {
            None
        }
    }

    pub fn from_translation(offset: Vector3<f64>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&offset),
        }
    }

    /// Rotation about the host Z axis followed by a translation
    pub fn from_plan_rotation(angle_rad: f64, offset: Vector3<f64>) -> Self {
        let rotation = Matrix4::new_rotation(Vector3::new(0.0, 0.0, angle_rad));
        Self {
            matrix: Matrix4::new_translation(&offset) * rotation,
        }
    }

    #[inline]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity() {
        let p = Point3::new(1.0, 2.0, 0.0);
        assert_eq!(ReferenceTransform::identity().apply(&p), p);
    }

    #[test]
    fn test_plan_rotation_then_offset() {
        let t = ReferenceTransform::from_plan_rotation(FRAC_PI_2, Vector3::new(10.0, 0.0, 0.0));
        let p = t.apply(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_projective_matrix() {
        let mut m = Matrix4::identity();
        m[(3, 0)] = 0.5;
        assert!(ReferenceTransform::from_matrix(m).is_none());

        let mut m = Matrix4::identity();
        m[(0, 3)] = f64::NAN;
        assert!(ReferenceTransform::from_matrix(m).is_none());

        assert!(ReferenceTransform::from_matrix(Matrix4::identity()).is_some());
    }
}
