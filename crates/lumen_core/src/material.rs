//! Surface material parameters.
//!
//! Materials only carry parameters. The shading math that consumes them
//! lives in the renderer.

use std::sync::Arc;

use lumen_math::{magnitude, Color};

use crate::texture::Texture;

/// Emission (or reflectance) below this magnitude is treated as zero.
pub const NEGLIGIBLE_COLOR: f32 = 0.001;

/// A material for diffuse + mirror/glossy surfaces and area lights.
#[derive(Clone, Debug)]
pub struct Material {
    /// Material name (as referenced by the scene file)
    pub name: String,

    /// Diffuse albedo (RGB, linear, 0-1). Ignored where a texture is bound.
    pub diffuse_color: Color,

    /// Mirror/specular color. Zero means no reflective bounce.
    pub reflective_color: Color,

    /// Emitted radiance. Non-zero makes every face with this material a light.
    pub emitted_color: Color,

    /// Glossy jitter scale for reflection rays (0 = perfect mirror)
    pub roughness: f32,

    /// Phong exponent for the specular lobe
    pub shininess: f32,

    /// Optional diffuse texture, sampled by surface (u, v)
    pub diffuse_texture: Option<Arc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Color::splat(0.5), // Grey default
            reflective_color: Color::ZERO,
            emitted_color: Color::ZERO,
            roughness: 0.0,
            shininess: 100.0,
            diffuse_texture: None,
        }
    }
}

impl Material {
    /// Create a new material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, diffuse_color: Color) -> Self {
        Self {
            name: name.into(),
            diffuse_color,
            ..Default::default()
        }
    }

    /// Create a pure emitter (black diffuse).
    pub fn light(name: impl Into<String>, emitted_color: Color) -> Self {
        Self {
            name: name.into(),
            diffuse_color: Color::ZERO,
            emitted_color,
            ..Default::default()
        }
    }

    pub fn with_reflective(mut self, reflective_color: Color) -> Self {
        self.reflective_color = reflective_color;
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.max(0.0);
        self
    }

    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.diffuse_texture = Some(texture);
        self
    }

    /// Diffuse albedo at surface coordinates (u, v).
    pub fn diffuse_at(&self, u: f32, v: f32) -> Color {
        match &self.diffuse_texture {
            Some(texture) => texture.sample(u, v),
            None => self.diffuse_color,
        }
    }

    /// Diffuse albedo averaged over the surface (texture mean when textured).
    pub fn average_diffuse(&self) -> Color {
        match &self.diffuse_texture {
            Some(texture) => texture.average(),
            None => self.diffuse_color,
        }
    }

    /// Check if this material uses a texture.
    pub fn has_texture(&self) -> bool {
        self.diffuse_texture.is_some()
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emitted_color.length() > NEGLIGIBLE_COLOR
    }

    /// Check if this material spawns reflection rays.
    pub fn is_reflective(&self) -> bool {
        self.reflective_color.length() > NEGLIGIBLE_COLOR
    }

    /// Probability weights used by photon Russian roulette: (reflective, diffuse).
    pub fn scatter_weights(&self) -> (f32, f32) {
        (magnitude(self.reflective_color), magnitude(self.diffuse_color))
    }
}
