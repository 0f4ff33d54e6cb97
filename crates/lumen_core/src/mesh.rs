//! Quad mesh stored as an index-based arena.
//!
//! The mesh keeps two face lists:
//!
//! - `original_quads`: the quads as authored. The ray tracer intersects these.
//! - `faces`: the current patches. These start as copies of the authored
//!   quads, get split by [`Mesh::subdivide`], and also hold the tessellated
//!   primitives added by [`Mesh::rasterize_sphere`]. The radiosity solver
//!   works on these.
//!
//! Adjacency is a plain vertex -> faces table indexed by [`VertexId`], so no
//! face holds a reference to any other face.

use std::collections::HashMap;
use std::f32::consts::PI;

use lumen_math::{Aabb, Vec3};

use crate::face::{Face, FaceSource};
use crate::scene::{SceneError, SceneResult};
use crate::{FaceId, MaterialId, VertexId};

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    faces: Vec<Face>,
    original_quads: Vec<Face>,
    vertex_faces: Vec<Vec<FaceId>>,
    revision: u64,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its id.
    pub fn add_vertex(&mut self, position: Vec3) -> VertexId {
        self.vertices.push(position);
        self.vertex_faces.push(Vec::new());
        self.vertices.len() - 1
    }

    /// Add an authored quad. It becomes both an original quad and a patch.
    pub fn add_quad(&mut self, vertices: [VertexId; 4], material: MaterialId) -> SceneResult<FaceId> {
        let corners = self.corners_of(vertices)?;
        let face = Face::new(
            vertices,
            corners,
            material,
            FaceSource::Quad(self.original_quads.len()),
        );
        self.original_quads.push(face.clone());
        Ok(self.push_face(face))
    }

    /// Tessellate a sphere into `slices` x `stacks` outward-facing patches.
    ///
    /// Pole rows are quads with a collapsed edge. Returns the new face ids.
    pub fn rasterize_sphere(
        &mut self,
        sphere_index: usize,
        center: Vec3,
        radius: f32,
        material: MaterialId,
        slices: usize,
        stacks: usize,
    ) -> Vec<FaceId> {
        let slices = slices.max(3);
        let stacks = stacks.max(2);

        let top = self.add_vertex(center + Vec3::Y * radius);
        let bottom = self.add_vertex(center - Vec3::Y * radius);
        let mut rings = Vec::with_capacity((stacks - 1) * slices);
        for i in 1..stacks {
            let theta = PI * i as f32 / stacks as f32;
            for j in 0..slices {
                let phi = 2.0 * PI * j as f32 / slices as f32;
                let dir = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                rings.push(self.add_vertex(center + dir * radius));
            }
        }

        let grid = |i: usize, j: usize| -> VertexId {
            if i == 0 {
                top
            } else if i == stacks {
                bottom
            } else {
                rings[(i - 1) * slices + j % slices]
            }
        };

        let mut ids = Vec::with_capacity(slices * stacks);
        for i in 0..stacks {
            for j in 0..slices {
                let vertices = [grid(i, j), grid(i, j + 1), grid(i + 1, j + 1), grid(i + 1, j)];
                let corners = vertices.map(|v| self.vertices[v]);
                let mut face = Face::new(vertices, corners, material, FaceSource::Primitive(sphere_index));
                if face.normal().dot(face.centroid() - center) < 0.0 {
                    face = face.flipped();
                }
                ids.push(self.push_face(face));
            }
        }

        self.revision += 1;
        ids
    }

    /// Split every patch into four, sharing edge midpoints between neighbours.
    ///
    /// Original quads are untouched. Bumps the topology revision.
    pub fn subdivide(&mut self) {
        let old_faces = std::mem::take(&mut self.faces);
        for list in &mut self.vertex_faces {
            list.clear();
        }

        let mut midpoints: HashMap<(VertexId, VertexId), VertexId> = HashMap::new();
        for face in &old_faces {
            let v = face.vertices();
            let mut mid = [0; 4];
            for (k, m) in mid.iter_mut().enumerate() {
                let (a, b) = (v[k], v[(k + 1) % 4]);
                let key = (a.min(b), a.max(b));
                *m = match midpoints.get(&key) {
                    Some(&id) => id,
                    None => {
                        let id = self.add_vertex((self.vertices[a] + self.vertices[b]) * 0.5);
                        midpoints.insert(key, id);
                        id
                    }
                };
            }
            let center = self.add_vertex(face.point_at(0.5, 0.5));

            let children = [
                [v[0], mid[0], center, mid[3]],
                [mid[0], v[1], mid[1], center],
                [center, mid[1], v[2], mid[2]],
                [mid[3], center, mid[2], v[3]],
            ];
            for vertices in children {
                let corners = vertices.map(|id| self.vertices[id]);
                self.push_face(Face::new(vertices, corners, face.material(), face.source()));
            }
        }

        self.revision += 1;
        log::debug!(
            "Subdivided {} patches into {} (revision {})",
            old_faces.len(),
            self.faces.len(),
            self.revision
        );
    }

    /// Number of current patches.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id]
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn num_original_quads(&self) -> usize {
        self.original_quads.len()
    }

    pub fn original_quad(&self, index: usize) -> &Face {
        &self.original_quads[index]
    }

    pub fn original_quads(&self) -> &[Face] {
        &self.original_quads
    }

    /// Patches produced by tessellating primitives, with their ids.
    pub fn rasterized_primitive_faces(&self) -> impl Iterator<Item = (FaceId, &Face)> {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| matches!(f.source(), FaceSource::Primitive(_)))
    }

    pub fn vertex(&self, id: VertexId) -> Vec3 {
        self.vertices[id]
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Current patches that use this vertex as a corner.
    pub fn faces_with_vertex(&self, id: VertexId) -> &[FaceId] {
        self.vertex_faces.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Topology revision; changes whenever the patch list changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().copied())
    }

    fn corners_of(&self, vertices: [VertexId; 4]) -> SceneResult<[Vec3; 4]> {
        let mut corners = [Vec3::ZERO; 4];
        for (corner, &id) in corners.iter_mut().zip(&vertices) {
            *corner = *self.vertices.get(id).ok_or(SceneError::VertexOutOfRange {
                index: id,
                count: self.vertices.len(),
            })?;
        }
        Ok(corners)
    }

    fn push_face(&mut self, face: Face) -> FaceId {
        let id = self.faces.len();
        for v in face.vertices() {
            let list = &mut self.vertex_faces[v];
            if !list.contains(&id) {
                list.push(id);
            }
        }
        self.faces.push(face);
        self.revision += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Mesh {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Vec3::new(0.0, 0.0, 1.0));
        let c = mesh.add_vertex(Vec3::new(1.0, 0.0, 1.0));
        let d = mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        mesh.add_quad([a, b, c, d], 0).unwrap();
        mesh
    }

    #[test]
    fn test_add_quad() {
        let mesh = unit_square();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_original_quads(), 1);
        assert_eq!(mesh.faces_with_vertex(0), &[0]);
    }

    #[test]
    fn test_add_quad_rejects_bad_vertex() {
        let mut mesh = unit_square();
        let err = mesh.add_quad([0, 1, 2, 99], 0).unwrap_err();
        assert!(matches!(err, SceneError::VertexOutOfRange { index: 99, .. }));
    }

    #[test]
    fn test_subdivide_preserves_area_and_shares_midpoints() {
        let mut mesh = unit_square();
        let before = mesh.revision();
        mesh.subdivide();
        assert!(mesh.revision() > before);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_original_quads(), 1);

        let total: f32 = mesh.faces().iter().map(Face::area).sum();
        assert!((total - 1.0).abs() < 1e-5);
        for face in mesh.faces() {
            assert!((face.normal() - Vec3::Y).length() < 1e-5);
        }

        // 4 corners + 4 midpoints + 1 center
        assert_eq!(mesh.num_vertices(), 9);
        // The center vertex is shared by all four children
        let center = mesh.num_vertices() - 1;
        assert_eq!(mesh.faces_with_vertex(center).len(), 4);

        mesh.subdivide();
        assert_eq!(mesh.num_faces(), 16);
        // Neighbouring faces share midpoints: 5x5 grid of vertices in use
        let used = (0..mesh.num_vertices())
            .filter(|&v| !mesh.faces_with_vertex(v).is_empty())
            .count();
        assert_eq!(used, 25);
    }

    #[test]
    fn test_rasterize_sphere_faces_outward() {
        let mut mesh = Mesh::new();
        let center = Vec3::new(1.0, 2.0, 3.0);
        let ids = mesh.rasterize_sphere(0, center, 0.5, 0, 8, 4);
        assert_eq!(ids.len(), 32);
        for (_, face) in mesh.rasterized_primitive_faces() {
            assert!(face.normal().dot(face.centroid() - center) > 0.0);
        }
        assert_eq!(mesh.rasterized_primitive_faces().count(), 32);
        assert_eq!(mesh.num_original_quads(), 0);

        let bounds = mesh.bounding_box();
        assert!((bounds.max.y - 2.5).abs() < 1e-5);
        assert!((bounds.min.y - 1.5).abs() < 1e-5);
    }
}
