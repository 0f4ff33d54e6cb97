//! JSON scene description loader.
//!
//! ```json
//! {
//!   "background": [0.1, 0.1, 0.1],
//!   "camera": { "look_from": [0, 1, 4], "look_at": [0, 1, 0], "vup": [0, 1, 0], "vfov": 40 },
//!   "materials": [
//!     { "name": "white", "diffuse": [0.7, 0.7, 0.7] },
//!     { "name": "lamp", "diffuse": [0, 0, 0], "emitted": [8, 8, 8] }
//!   ],
//!   "vertices": [[-1, 0, -1], [-1, 0, 1], [1, 0, 1], [1, 0, -1]],
//!   "quads": [{ "vertices": [0, 1, 2, 3], "material": "white" }],
//!   "spheres": [{ "center": [0, 0.5, 0], "radius": 0.5, "material": "white" }]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use lumen_math::{Color, Vec3};
use serde::Deserialize;

use crate::material::Material;
use crate::mesh::Mesh;
use crate::scene::{CameraSettings, Scene, SceneError, SceneResult, Sphere};
use crate::texture::TextureCache;
use crate::MaterialId;

#[derive(Debug, Deserialize)]
struct SceneDescription {
    #[serde(default)]
    background: Color,
    #[serde(default)]
    camera: CameraSettings,
    materials: Vec<MaterialDescription>,
    #[serde(default)]
    vertices: Vec<Vec3>,
    #[serde(default)]
    quads: Vec<QuadDescription>,
    #[serde(default)]
    spheres: Vec<SphereDescription>,
}

#[derive(Debug, Deserialize)]
struct MaterialDescription {
    name: String,
    #[serde(default = "default_diffuse")]
    diffuse: Color,
    #[serde(default)]
    reflective: Color,
    #[serde(default)]
    emitted: Color,
    #[serde(default)]
    roughness: f32,
    #[serde(default = "default_shininess")]
    shininess: f32,
    #[serde(default)]
    texture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuadDescription {
    vertices: [usize; 4],
    material: String,
}

#[derive(Debug, Deserialize)]
struct SphereDescription {
    center: Vec3,
    radius: f32,
    material: String,
}

fn default_diffuse() -> Color {
    Color::splat(0.5)
}

fn default_shininess() -> f32 {
    100.0
}

/// Load a scene from a JSON file. Texture paths resolve relative to the file.
pub fn load_scene(path: impl AsRef<Path>) -> SceneResult<Scene> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    log::info!("Loading scene {}", path.display());
    load_scene_from_str(&source, base_dir)
}

/// Load a scene from JSON text, resolving textures against `base_dir`.
pub fn load_scene_from_str(source: &str, base_dir: impl AsRef<Path>) -> SceneResult<Scene> {
    let desc: SceneDescription = serde_json::from_str(source)?;
    let mut textures = TextureCache::with_base_dir(base_dir.as_ref());

    let mut lookup: HashMap<String, MaterialId> = HashMap::new();
    let mut materials = Vec::with_capacity(desc.materials.len());
    for m in desc.materials {
        let mut material = Material::new(m.name.clone(), m.diffuse)
            .with_reflective(m.reflective)
            .with_roughness(m.roughness)
            .with_shininess(m.shininess);
        material.emitted_color = m.emitted;
        if let Some(texture) = &m.texture {
            material = material.with_texture(textures.load(texture)?);
        }
        lookup.insert(m.name, materials.len());
        materials.push(material);
    }

    let resolve = |name: &str| -> SceneResult<MaterialId> {
        lookup
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::UnknownMaterial(name.to_string()))
    };

    let mut mesh = Mesh::new();
    for v in desc.vertices {
        mesh.add_vertex(v);
    }
    for quad in &desc.quads {
        mesh.add_quad(quad.vertices, resolve(&quad.material)?)?;
    }

    let spheres = desc
        .spheres
        .iter()
        .map(|s| Ok(Sphere::new(s.center, s.radius, resolve(&s.material)?)))
        .collect::<SceneResult<Vec<_>>>()?;

    Scene::new(mesh, spheres, materials, desc.background, desc.camera)
}
