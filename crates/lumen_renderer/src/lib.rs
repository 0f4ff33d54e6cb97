//! Lumen Renderer - CPU global illumination.
//!
//! Three cooperating solvers share one set of scene data:
//!
//! - [`RayTracer`]: recursive Whitted-style tracing with area-light shadows
//!   and mirror/glossy reflection
//! - [`PhotonMap`]: photon emission and k-d tree density estimation of
//!   indirect diffuse light
//! - [`Radiosity`]: progressive shooting radiosity over the scene patches
//!
//! Final images are produced by [`render`], which splits the frame into
//! buckets and renders them on a pool of worker threads.

mod bucket;
mod camera;
mod config;
mod error;
mod hit;
mod kdtree;
mod photon;
mod photon_map;
mod quad;
mod radiosity;
mod raytracer;
mod renderer;
mod sampling;
mod shading;
mod sphere;

pub use bucket::{generate_buckets, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use camera::Camera;
pub use config::{ConfigError, RenderConfig};
pub use error::{RenderError, RenderResult};
pub use hit::{Hit, Intersect, INTERSECT_EPSILON};
pub use kdtree::KdTree;
pub use photon::Photon;
pub use photon_map::{PhotonMap, PhotonMapStats};
pub use radiosity::{Radiosity, VisualizationMode};
pub use raytracer::{RayTracer, RAY_OFFSET};
pub use renderer::{
    color_to_rgba, render, render_pixel, ImageBuffer, PixelSource, RadiosityView, RenderControl,
};
pub use sampling::{
    orthonormal_basis, random_diffuse_direction, random_in_unit_cube, reflect,
    stratified_samples,
};
pub use shading::shade;

/// Re-export math types used throughout the public API
pub use lumen_math::{Color, Ray, Vec3};
