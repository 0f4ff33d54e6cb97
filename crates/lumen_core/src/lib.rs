//! Lumen Core - scene-side data for the global-illumination renderer.
//!
//! This crate provides:
//!
//! - **Materials and textures**: `Material`, `Texture`, `TextureCache`
//! - **Geometry**: `Face` (planar quad patch), `Mesh` (index-based arena with
//!   vertex adjacency), `Sphere`
//! - **Scenes**: `Scene` plus a JSON scene loader
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::load_scene;
//!
//! let mut scene = load_scene("scenes/cornell_box.json")?;
//! scene.subdivide();
//! println!("{} patches, {} lights", scene.mesh.num_faces(), scene.num_lights());
//! ```

pub mod face;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use face::{Face, FaceSource};
pub use loader::{load_scene, load_scene_from_str};
pub use material::Material;
pub use mesh::Mesh;
pub use scene::{CameraSettings, Scene, SceneError, SceneResult, Sphere};
pub use texture::{Texture, TextureCache, TextureError, TextureResult};

/// Index of a vertex in a [`Mesh`].
pub type VertexId = usize;
/// Index of a face (patch) in a [`Mesh`].
pub type FaceId = usize;
/// Index of a material in a [`Scene`].
pub type MaterialId = usize;
