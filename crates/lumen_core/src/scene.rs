//! Scene container consumed by the light-transport core.
//!
//! A scene is a quad mesh, a list of analytic sphere primitives, a material
//! table, the emissive faces ("lights"), a background color and a camera.

use lumen_math::{srgb_to_linear, Aabb, Color, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::face::Face;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::texture::TextureError;
use crate::{FaceId, MaterialId};

/// Errors that can occur while building or loading a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Material id {id} out of range ({count} materials)")]
    MaterialOutOfRange { id: MaterialId, count: usize },

    #[error("Vertex index {index} out of range ({count} vertices)")]
    VertexOutOfRange { index: usize, count: usize },

    #[error("Scene contains no geometry")]
    NoGeometry,
}

pub type SceneResult<T> = Result<T, SceneError>;

/// An analytic sphere primitive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: MaterialId,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: MaterialId) -> Self {
        Self {
            center,
            radius: radius.abs(),
            material,
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::around(self.center, self.radius)
    }
}

/// Perspective camera placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub look_from: Vec3,
    pub look_at: Vec3,
    pub vup: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            look_from: Vec3::new(0.0, 0.0, 5.0),
            look_at: Vec3::ZERO,
            vup: Vec3::Y,
            vfov: 40.0,
        }
    }
}

/// The complete scene.
#[derive(Clone, Debug)]
pub struct Scene {
    pub mesh: Mesh,
    pub spheres: Vec<Sphere>,
    pub materials: Vec<Material>,
    /// sRGB-encoded background (decode with [`Scene::background_linear`])
    pub background_color: Color,
    pub camera: CameraSettings,
    lights: Vec<usize>,
}

impl Scene {
    /// Build a scene, validating material references and collecting lights.
    pub fn new(
        mesh: Mesh,
        spheres: Vec<Sphere>,
        materials: Vec<Material>,
        background_color: Color,
        camera: CameraSettings,
    ) -> SceneResult<Self> {
        if mesh.num_faces() == 0 && spheres.is_empty() {
            return Err(SceneError::NoGeometry);
        }

        let count = materials.len();
        let check = |id: MaterialId| {
            if id < count {
                Ok(())
            } else {
                Err(SceneError::MaterialOutOfRange { id, count })
            }
        };
        for face in mesh.faces() {
            check(face.material())?;
        }
        for sphere in &spheres {
            check(sphere.material)?;
        }

        let lights = mesh
            .original_quads()
            .iter()
            .enumerate()
            .filter(|(_, f)| materials[f.material()].is_emissive())
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        log::info!(
            "Scene: {} quads, {} spheres, {} materials, {} lights",
            mesh.num_original_quads(),
            spheres.len(),
            materials.len(),
            lights.len()
        );

        Ok(Self {
            mesh,
            spheres,
            materials,
            background_color,
            camera,
            lights,
        })
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id]
    }

    /// Material of a patch.
    pub fn face_material(&self, id: FaceId) -> &Material {
        self.material(self.mesh.face(id).material())
    }

    /// Emissive authored quads, used as area lights.
    pub fn lights(&self) -> impl Iterator<Item = &Face> + '_ {
        self.lights.iter().map(|&i| self.mesh.original_quad(i))
    }

    pub fn num_lights(&self) -> usize {
        self.lights.len()
    }

    /// Sum of all light areas.
    pub fn total_light_area(&self) -> f32 {
        self.lights().map(Face::area).sum()
    }

    /// Background color decoded to linear space.
    pub fn background_linear(&self) -> Color {
        Color::new(
            srgb_to_linear(self.background_color.x),
            srgb_to_linear(self.background_color.y),
            srgb_to_linear(self.background_color.z),
        )
    }

    /// Bounds of all quads and spheres.
    pub fn bounding_box(&self) -> Aabb {
        self.spheres
            .iter()
            .fold(self.mesh.bounding_box(), |acc, s| Aabb::surrounding(&acc, &s.bounding_box()))
    }

    /// Tessellate every sphere into patches for radiosity.
    pub fn rasterize_primitives(&mut self, slices: usize, stacks: usize) {
        for (i, sphere) in self.spheres.iter().enumerate() {
            self.mesh
                .rasterize_sphere(i, sphere.center, sphere.radius, sphere.material, slices, stacks);
        }
    }

    /// Split every patch into four.
    pub fn subdivide(&mut self) {
        self.mesh.subdivide();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_and_light() -> (Mesh, Vec<Material>) {
        let mut mesh = Mesh::new();
        let v = [
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, -1.0),
        ]
        .map(|p| mesh.add_vertex(p));
        mesh.add_quad(v, 0).unwrap();

        let l = [
            Vec3::new(-0.25, 2.0, -0.25),
            Vec3::new(0.25, 2.0, -0.25),
            Vec3::new(0.25, 2.0, 0.25),
            Vec3::new(-0.25, 2.0, 0.25),
        ]
        .map(|p| mesh.add_vertex(p));
        mesh.add_quad(l, 1).unwrap();

        let materials = vec![
            Material::new("floor", Color::splat(0.5)),
            Material::light("lamp", Color::splat(10.0)),
        ];
        (mesh, materials)
    }

    #[test]
    fn test_scene_collects_lights() {
        let (mesh, materials) = floor_and_light();
        let scene = Scene::new(mesh, vec![], materials, Color::ZERO, CameraSettings::default()).unwrap();
        assert_eq!(scene.num_lights(), 1);
        assert!((scene.total_light_area() - 0.25).abs() < 1e-5);
        let light = scene.lights().next().unwrap();
        assert!((light.normal() + Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_scene_rejects_bad_material() {
        let (mesh, _) = floor_and_light();
        let err = Scene::new(mesh, vec![], vec![Material::default()], Color::ZERO, CameraSettings::default())
            .unwrap_err();
        assert!(matches!(err, SceneError::MaterialOutOfRange { id: 1, count: 1 }));
    }

    #[test]
    fn test_empty_scene_is_an_error() {
        let err = Scene::new(Mesh::new(), vec![], vec![], Color::ZERO, CameraSettings::default())
            .unwrap_err();
        assert!(matches!(err, SceneError::NoGeometry));
    }

    #[test]
    fn test_bounding_box_includes_spheres() {
        let (mesh, materials) = floor_and_light();
        let spheres = vec![Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, 0)];
        let scene = Scene::new(mesh, spheres, materials, Color::ZERO, CameraSettings::default()).unwrap();
        let bounds = scene.bounding_box();
        assert_eq!(bounds.max.z, 6.0);
        assert_eq!(bounds.min.y, -1.0);
        assert_eq!(bounds.max.y, 2.0);
    }

    #[test]
    fn test_background_is_linearized() {
        let (mesh, materials) = floor_and_light();
        let scene = Scene::new(mesh, vec![], materials, Color::splat(0.5), CameraSettings::default()).unwrap();
        let bg = scene.background_linear();
        assert!((bg.x - srgb_to_linear(0.5)).abs() < 1e-6);
        assert!(bg.x < 0.5);
    }

    #[test]
    fn test_rasterize_primitives() {
        let (mesh, materials) = floor_and_light();
        let spheres = vec![Sphere::new(Vec3::new(0.0, 0.5, 0.0), 0.5, 0)];
        let mut scene = Scene::new(mesh, spheres, materials, Color::ZERO, CameraSettings::default()).unwrap();
        scene.rasterize_primitives(6, 4);
        assert_eq!(scene.mesh.num_faces(), 2 + 24);
        assert_eq!(scene.mesh.num_original_quads(), 2);
    }
}
