//! Analytic ray-sphere intersection.

use std::f32::consts::PI;

use lumen_core::Sphere;
use lumen_math::{Ray, Vec3};

use crate::hit::{Hit, Intersect, INTERSECT_EPSILON};

/// Discriminants within this band of zero count as a tangent hit.
const TANGENT_TOLERANCE: f32 = 1e-6;

/// Roots closer to zero than this are snapped to exactly zero.
const ROOT_SNAP: f32 = 1e-6;

/// (u, v) for a point on the unit sphere centered at the origin.
fn sphere_uv(p: Vec3) -> (f32, f32) {
    // theta: angle down from +Y, phi: angle around Y from +X
    let theta = (-p.y).clamp(-1.0, 1.0).acos();
    let phi = (-p.z).atan2(p.x) + PI;
    (phi / (2.0 * PI), theta / PI)
}

impl Intersect for Sphere {
    fn intersect(&self, ray: &Ray, hit: &mut Hit, include_backfaces: bool) -> bool {
        if self.radius <= 0.0 {
            return false;
        }

        let oc = ray.origin() - self.center;
        let a = ray.direction().length_squared();
        if a <= 0.0 {
            return false;
        }
        let b = 2.0 * ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        let snap = |t: f32| if t.abs() < ROOT_SNAP { 0.0 } else { t };

        let roots = if discriminant.abs() <= TANGENT_TOLERANCE {
            let t = snap(-b / (2.0 * a));
            [t, t]
        } else if discriminant < 0.0 {
            return false;
        } else {
            let sqrtd = discriminant.sqrt();
            [
                snap((-b - sqrtd) / (2.0 * a)),
                snap((-b + sqrtd) / (2.0 * a)),
            ]
        };

        // Both roots behind the origin: sphere is behind the ray
        let Some(t) = roots.into_iter().find(|&t| t >= INTERSECT_EPSILON) else {
            return false;
        };
        if t >= hit.t {
            return false;
        }

        let normal = (ray.at(t) - self.center) / self.radius;
        if !include_backfaces && normal.dot(ray.direction()) > 0.0 {
            return false;
        }

        let (u, v) = sphere_uv(normal);
        hit.set(t, self.material, normal, u, v);
        true
    }
}
