//! Diffuse textures.
//!
//! Images are decoded once, converted from sRGB to linear RGB, and shared
//! between materials through a path-keyed cache.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lumen_math::{srgb_to_linear, Color};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Cannot decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Texture size {width}x{height} does not match {texels} texels")]
    BadSize {
        width: u32,
        height: u32,
        texels: usize,
    },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// Linear RGB image sampled by surface (u, v).
///
/// `v = 0` is the bottom row of the source image; both coordinates wrap.
#[derive(Clone, Debug)]
pub struct Texture {
    width: u32,
    height: u32,
    texels: Vec<Color>,
}

impl Texture {
    pub fn new(width: u32, height: u32, texels: Vec<Color>) -> TextureResult<Self> {
        if width == 0 || height == 0 || texels.len() != width as usize * height as usize {
            return Err(TextureError::BadSize {
                width,
                height,
                texels: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// 1x1 texture of a single color.
    pub fn solid_color(color: Color) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![color],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bilinear lookup between the four nearest texels.
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let (cols, rows) = (self.width as f32, self.height as f32);
        let col = u.rem_euclid(1.0) * (cols - 1.0);
        let row = (1.0 - v.rem_euclid(1.0)) * (rows - 1.0);

        let (c0, r0) = (col as u32, row as u32);
        let (c1, r1) = (
            (c0 + 1).min(self.width - 1),
            (r0 + 1).min(self.height - 1),
        );
        let (s, t) = (col - c0 as f32, row - r0 as f32);

        let upper = self.texel(c0, r0).lerp(self.texel(c1, r0), s);
        let lower = self.texel(c0, r1).lerp(self.texel(c1, r1), s);
        upper.lerp(lower, t)
    }

    /// Mean color, used where a single albedo stands in for the texture.
    pub fn average(&self) -> Color {
        let sum: Color = self.texels.iter().copied().sum();
        sum / self.texels.len().max(1) as f32
    }

    fn texel(&self, col: u32, row: u32) -> Color {
        let index = row as usize * self.width as usize + col as usize;
        self.texels.get(index).copied().unwrap_or(Color::ZERO)
    }

    fn decode(path: &Path) -> TextureResult<Self> {
        let rgb = image::open(path)
            .map_err(|source| TextureError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgb8();

        let (width, height) = rgb.dimensions();
        let texels = rgb
            .pixels()
            .map(|p| Color::from_array(p.0.map(|c| srgb_to_linear(c as f32 / 255.0))))
            .collect();
        Self::new(width, height, texels)
    }
}

/// Textures already decoded for a scene, keyed by resolved path.
#[derive(Default)]
pub struct TextureCache {
    root: Option<PathBuf>,
    loaded: HashMap<PathBuf, Arc<Texture>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative texture paths resolve against `root` (usually the scene's directory).
    pub fn with_base_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            loaded: HashMap::new(),
        }
    }

    /// Decode `path`, or hand back the shared copy if it was seen before.
    pub fn load(&mut self, path: &str) -> TextureResult<Arc<Texture>> {
        let resolved = match &self.root {
            Some(root) if Path::new(path).is_relative() => root.join(path),
            _ => PathBuf::from(path),
        };

        match self.loaded.entry(resolved) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let texture = Arc::new(Texture::decode(entry.key())?);
                let (width, height) = texture.size();
                log::debug!("Texture {} ({}x{})", entry.key().display(), width, height);
                Ok(Arc::clone(entry.insert(texture)))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_sample() {
        let tex = Texture::solid_color(Color::new(1.0, 0.5, 0.0));
        assert!((tex.sample(0.3, 0.8) - Color::new(1.0, 0.5, 0.0)).length() < 1e-5);
        assert!((tex.sample(-2.5, 7.0) - Color::new(1.0, 0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_bilinear_sample() {
        // 2x1: black on the left, white on the right
        let tex = Texture::new(2, 1, vec![Color::ZERO, Color::ONE]).unwrap();
        assert!(tex.sample(0.0, 0.5).length() < 1e-5);
        assert!((tex.sample(0.5, 0.5) - Color::splat(0.5)).length() < 1e-5);
        assert!((tex.average() - Color::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_v_runs_bottom_to_top() {
        // Row 0 (top) red, row 1 (bottom) blue
        let tex = Texture::new(1, 2, vec![Color::X, Color::Z]).unwrap();
        assert!((tex.sample(0.0, 0.0) - Color::Z).length() < 1e-5);
        assert!((tex.sample(0.0, 0.999) - Color::X).length() < 1e-2);
    }

    #[test]
    fn test_rejects_mismatched_size() {
        assert!(matches!(
            Texture::new(2, 2, vec![Color::ZERO]),
            Err(TextureError::BadSize { texels: 1, .. })
        ));
        assert!(Texture::new(0, 0, vec![]).is_err());
    }

    #[test]
    fn test_missing_file_not_cached() {
        let mut cache = TextureCache::with_base_dir("/nonexistent");
        assert!(matches!(cache.load("nope.png"), Err(TextureError::Decode { .. })));
        assert!(cache.is_empty());
    }
}
