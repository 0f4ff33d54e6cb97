//! Planar quad faces.
//!
//! A face is the unit of geometry shared by the ray tracer (as an
//! intersectable quad), the lights (every emissive face is an area light) and
//! the radiosity solver (every face is a patch).

use lumen_math::Vec3;
use rand::{Rng, RngCore};

use crate::{MaterialId, VertexId};

/// Where a face came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceSource {
    /// Part of (or equal to) the authored quad with this index.
    Quad(usize),
    /// Tessellation of the sphere primitive with this index.
    Primitive(usize),
}

/// A planar quad with cached normal, centroid and area.
///
/// Corners are stored in winding order; the normal follows the right-hand
/// rule over that order.
#[derive(Clone, Debug)]
pub struct Face {
    vertices: [VertexId; 4],
    corners: [Vec3; 4],
    material: MaterialId,
    source: FaceSource,
    normal: Vec3,
    centroid: Vec3,
    area: f32,
}

impl Face {
    pub fn new(
        vertices: [VertexId; 4],
        corners: [Vec3; 4],
        material: MaterialId,
        source: FaceSource,
    ) -> Self {
        let [a, b, c, d] = corners;
        // Cross of the diagonals stays well defined when one edge collapses
        // (sphere poles).
        let normal = (c - a).cross(d - b).normalize_or_zero();
        let area = triangle_area(a, b, c) + triangle_area(a, c, d);
        let centroid = (a + b + c + d) * 0.25;

        Self {
            vertices,
            corners,
            material,
            source,
            normal,
            centroid,
            area,
        }
    }

    #[inline]
    pub fn vertices(&self) -> [VertexId; 4] {
        self.vertices
    }

    #[inline]
    pub fn corners(&self) -> &[Vec3; 4] {
        &self.corners
    }

    #[inline]
    pub fn corner(&self, i: usize) -> Vec3 {
        self.corners[i % 4]
    }

    #[inline]
    pub fn material(&self) -> MaterialId {
        self.material
    }

    #[inline]
    pub fn source(&self) -> FaceSource {
        self.source
    }

    /// Unit normal (zero for a fully degenerate face).
    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    #[inline]
    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.area
    }

    /// Bilinear point at parametric (u, v) in [0, 1]^2.
    ///
    /// Corner 0 is (0, 0), corner 1 is (1, 0), corner 2 is (1, 1) and
    /// corner 3 is (0, 1).
    pub fn point_at(&self, u: f32, v: f32) -> Vec3 {
        let [a, b, c, d] = self.corners;
        let bottom = a.lerp(b, u);
        let top = d.lerp(c, u);
        bottom.lerp(top, v)
    }

    /// A point distributed uniformly over the face area.
    pub fn random_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        let [a, b, c, d] = self.corners;
        let first = triangle_area(a, b, c);
        if self.area <= 0.0 {
            return self.centroid;
        }

        let (p0, p1, p2) = if rng.gen::<f32>() * self.area < first {
            (a, b, c)
        } else {
            (a, c, d)
        };

        let r1 = rng.gen::<f32>().sqrt();
        let r2 = rng.gen::<f32>();
        p0 * (1.0 - r1) + p1 * (r1 * (1.0 - r2)) + p2 * (r1 * r2)
    }

    /// Same face with the winding reversed (normal flipped).
    pub fn flipped(&self) -> Self {
        let [v0, v1, v2, v3] = self.vertices;
        let [c0, c1, c2, c3] = self.corners;
        Self::new([v0, v3, v2, v1], [c0, c3, c2, c1], self.material, self.source)
    }
}

#[inline]
fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    0.5 * (b - a).cross(c - a).length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Unit square in the XZ plane facing +Y.
    fn floor_face() -> Face {
        Face::new(
            [0, 1, 2, 3],
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 0.0),
            ],
            0,
            FaceSource::Quad(0),
        )
    }

    #[test]
    fn test_face_geometry() {
        let face = floor_face();
        assert!((face.area() - 1.0).abs() < 1e-6);
        assert!((face.normal() - Vec3::Y).length() < 1e-6);
        assert_eq!(face.centroid(), Vec3::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_flipped_normal() {
        let face = floor_face().flipped();
        assert!((face.normal() + Vec3::Y).length() < 1e-6);
        assert!((face.area() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_at_corners() {
        let face = floor_face();
        assert_eq!(face.point_at(0.0, 0.0), face.corner(0));
        assert_eq!(face.point_at(1.0, 0.0), face.corner(1));
        assert_eq!(face.point_at(1.0, 1.0), face.corner(2));
        assert_eq!(face.point_at(0.0, 1.0), face.corner(3));
        assert_eq!(face.point_at(0.5, 0.5), face.centroid());
    }

    #[test]
    fn test_random_points_stay_on_face() {
        let face = floor_face();
        let mut rng = StdRng::seed_from_u64(7);
        let mut mean = Vec3::ZERO;
        for _ in 0..2000 {
            let p = face.random_point(&mut rng);
            assert!(p.y.abs() < 1e-6);
            assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.z));
            mean += p;
        }
        mean /= 2000.0;
        // Uniform sampling averages to the centroid
        assert!((mean - face.centroid()).length() < 0.05);
    }

    #[test]
    fn test_degenerate_edge_keeps_normal() {
        // Triangle encoded as a quad with a repeated corner (sphere pole)
        let face = Face::new(
            [0, 0, 1, 2],
            [Vec3::ZERO, Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)],
            0,
            FaceSource::Primitive(0),
        );
        assert!(face.normal().length() > 0.99);
        assert!((face.area() - 0.5).abs() < 1e-6);
    }
}
