//! Ray intersection for planar quad patches.
//!
//! A quad is split into triangles (c0, c1, c2) and (c0, c2, c3) and each is
//! tested with Möller-Trumbore. The barycentrics are mapped back to the
//! quad's bilinear (u, v) so textures line up across the diagonal.

use lumen_core::Face;
use lumen_math::{Ray, Vec3};

use crate::hit::{Hit, Intersect, INTERSECT_EPSILON};

/// Möller-Trumbore intersection. Returns (t, weight of v1, weight of v2).
fn intersect_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction().cross(edge2);
    let a = edge1.dot(h);

    // Parallel or degenerate
    if a.abs() < 1e-8 {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin() - v0;
    let b1 = f * s.dot(h);
    if !(0.0..=1.0).contains(&b1) {
        return None;
    }

    let q = s.cross(edge1);
    let b2 = f * ray.direction().dot(q);
    if b2 < 0.0 || b1 + b2 > 1.0 {
        return None;
    }

    Some((f * edge2.dot(q), b1, b2))
}

impl Intersect for Face {
    fn intersect(&self, ray: &Ray, hit: &mut Hit, include_backfaces: bool) -> bool {
        let normal = self.normal();
        if normal == Vec3::ZERO {
            return false;
        }
        if !include_backfaces && ray.direction().dot(normal) > 0.0 {
            return false;
        }

        let [c0, c1, c2, c3] = *self.corners();
        let found = intersect_triangle(ray, c0, c1, c2)
            .map(|(t, b1, b2)| (t, b1 + b2, b2))
            .or_else(|| intersect_triangle(ray, c0, c2, c3).map(|(t, b1, b2)| (t, b1, b1 + b2)));

        match found {
            Some((t, u, v)) if t >= INTERSECT_EPSILON && t < hit.t => {
                hit.set(t, self.material(), normal, u, v);
                true
            }
            _ => false,
        }
    }
}
