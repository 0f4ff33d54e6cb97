// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod aabb;
mod color;
mod ray;

pub use aabb::Aabb;
pub use color::{linear_to_srgb, magnitude, srgb_to_linear, Color};
pub use ray::Ray;
