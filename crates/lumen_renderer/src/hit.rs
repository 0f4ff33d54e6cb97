//! Hit record and the intersection trait shared by every primitive.

use lumen_core::{FaceId, MaterialId};
use lumen_math::{Ray, Vec3};

/// Hits closer than this along a ray are ignored (self-intersection guard).
pub const INTERSECT_EPSILON: f32 = 1e-3;

/// Closest intersection found so far along a ray.
///
/// A fresh hit has `t = INFINITY`; primitives only overwrite it with
/// strictly closer intersections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance along the ray
    pub t: f32,
    /// Material of the surface that was hit
    pub material: Option<MaterialId>,
    /// Geometric outward normal (unit length)
    pub normal: Vec3,
    /// Surface coordinates of the hit
    pub u: f32,
    pub v: f32,
    /// Patch index, when the hit surface is a current mesh patch
    pub face: Option<FaceId>,
}

impl Default for Hit {
    fn default() -> Self {
        Self {
            t: f32::INFINITY,
            material: None,
            normal: Vec3::ZERO,
            u: 0.0,
            v: 0.0,
            face: None,
        }
    }
}

impl Hit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if anything has been hit yet.
    pub fn is_hit(&self) -> bool {
        self.material.is_some()
    }

    /// Record a new closest intersection. Clears the patch index.
    pub fn set(&mut self, t: f32, material: MaterialId, normal: Vec3, u: f32, v: f32) {
        self.t = t;
        self.material = Some(material);
        self.normal = normal;
        self.u = u;
        self.v = v;
        self.face = None;
    }
}

/// Geometry that can be intersected by a ray.
pub trait Intersect {
    /// Test the ray against this primitive.
    ///
    /// Updates `hit` and returns true only when an intersection is found at
    /// distance >= [`INTERSECT_EPSILON`] and strictly closer than `hit.t`.
    /// Back-facing intersections are skipped unless `include_backfaces`.
    fn intersect(&self, ray: &Ray, hit: &mut Hit, include_backfaces: bool) -> bool;
}
