//! Final image rendering.
//!
//! - Adaptive anti-aliasing per pixel
//! - Bucketed rendering on scoped worker threads, with finished buckets
//!   streamed to the calling thread through a channel
//! - sRGB encoding and PNG output

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use image::{ImageResult, RgbaImage};
use lumen_math::{linear_to_srgb, Color, Ray};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::bucket::{generate_buckets, Bucket, BucketResult};
use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::hit::Hit;
use crate::radiosity::{Radiosity, VisualizationMode};
use crate::raytracer::RayTracer;

/// "Diamond" of sub-pixel offsets used for the first adaptive pass.
const DIAMOND: [(f32, f32); 4] = [(0.0, -0.5), (0.5, 0.0), (0.0, 0.5), (-0.5, 0.0)];

/// Anything that can color a primary ray.
pub trait PixelSource: Sync {
    fn sample(&self, ray: &Ray, rng: &mut dyn RngCore) -> Color;

    /// Refuse to render when required inputs are missing.
    fn check_ready(&self) -> RenderResult<()> {
        Ok(())
    }
}

impl PixelSource for RayTracer<'_> {
    fn sample(&self, ray: &Ray, rng: &mut dyn RngCore) -> Color {
        let mut hit = Hit::new();
        self.trace_ray(ray, &mut hit, self.config().num_bounces, rng)
    }

    fn check_ready(&self) -> RenderResult<()> {
        if self.config().gather_indirect && self.photon_map().is_none() {
            return Err(RenderError::PhotonsNotTraced);
        }
        Ok(())
    }
}

/// Displays a radiosity solution by casting rays against the patches.
pub struct RadiosityView<'a> {
    pub tracer: RayTracer<'a>,
    pub radiosity: &'a Radiosity,
    pub mode: VisualizationMode,
    /// Blend radiance across patch corners
    pub interpolate: bool,
}

impl PixelSource for RadiosityView<'_> {
    fn sample(&self, ray: &Ray, _rng: &mut dyn RngCore) -> Color {
        let scene = self.tracer.scene();
        let mut hit = Hit::new();
        match (self.tracer.cast_patches(ray, &mut hit), hit.face) {
            (true, Some(face)) if face < self.radiosity.num_faces() => self.radiosity.color_at(
                scene,
                self.mode,
                face,
                hit.u,
                hit.v,
                self.interpolate,
            ),
            _ => scene.background_linear(),
        }
    }
}

/// Cooperative cancellation for a running render.
#[derive(Debug, Clone, Default)]
pub struct RenderControl {
    stop: Arc<AtomicBool>,
}

impl RenderControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask workers to finish their current bucket and exit.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Clear the stop flag so the control can be reused.
    pub fn reset(&self) {
        self.stop.store(false, Ordering::Relaxed);
    }
}

/// Convert a linear color to 8-bit sRGB RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let encode = |c: f32| (255.0 * linear_to_srgb(c.clamp(0.0, 1.0)) + 0.5) as u8;
    [encode(color.x), encode(color.y), encode(color.z), 255]
}

/// Render one pixel with adaptive anti-aliasing.
///
/// Four diamond samples are taken first. If any two disagree by more than
/// `antialias_variance_limit` in some channel, the pixel is re-estimated
/// from `num_antialias_samples` jittered rays instead.
pub fn render_pixel(
    camera: &Camera,
    source: &dyn PixelSource,
    x: u32,
    y: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Color {
    let (px, py) = (x as f32, y as f32);

    let mut low = Color::splat(f32::INFINITY);
    let mut high = Color::splat(f32::NEG_INFINITY);
    let mut sum = Color::ZERO;
    for (dx, dy) in DIAMOND {
        let color = source.sample(&camera.ray_through(px + dx, py + dy), rng);
        low = low.min(color);
        high = high.max(color);
        sum += color;
    }

    if (high - low).max_element() <= config.antialias_variance_limit {
        return sum / DIAMOND.len() as f32;
    }

    let samples = config.num_antialias_samples.max(1);
    let mut refined = Color::ZERO;
    for _ in 0..samples {
        let dx = rng.gen::<f32>() - 0.5;
        let dy = rng.gen::<f32>() - 0.5;
        refined += source.sample(&camera.ray_through(px + dx, py + dy), rng);
    }
    refined / samples as f32
}

/// Render every pixel of one bucket in row-major order.
fn render_bucket(
    bucket: &Bucket,
    camera: &Camera,
    source: &dyn PixelSource,
    config: &RenderConfig,
) -> Vec<Color> {
    let mut rng = StdRng::seed_from_u64(config.seed ^ bucket.index as u64);
    bucket
        .pixels()
        .map(|(x, y)| render_pixel(camera, source, x, y, config, &mut rng))
        .collect()
}

/// Linear HDR image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a finished bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        for ((x, y), color) in result.bucket.pixels().zip(&result.pixels) {
            self.set(x, y, *color);
        }
    }

    /// Convert to sRGB RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| color_to_rgba(*c)).collect()
    }

    pub fn to_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width, self.height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = image::Rgba(color_to_rgba(self.get(x, y)));
        }
        image
    }

    /// Save as an image file (format from the extension, typically PNG).
    pub fn save(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.to_image().save(path)
    }
}

/// Render the full frame on a pool of worker threads.
///
/// Workers pull buckets from a shared cursor and check `control` between
/// buckets. Finished buckets are written into the image on the calling
/// thread, which then invokes `on_bucket` (for progress display). A stopped
/// render returns the partially filled image.
pub fn render(
    camera: &Camera,
    source: &dyn PixelSource,
    config: &RenderConfig,
    control: &RenderControl,
    mut on_bucket: impl FnMut(&BucketResult),
) -> RenderResult<ImageBuffer> {
    config.validate()?;
    source.check_ready()?;
    let (width, height) = (camera.image_width, camera.image_height);
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyImage { width, height });
    }

    let buckets = generate_buckets(width, height, config.bucket_size);
    let workers = config.worker_count().min(buckets.len()).max(1);
    log::info!(
        "Rendering {}x{} in {} buckets on {} threads",
        width,
        height,
        buckets.len(),
        workers
    );

    let mut image = ImageBuffer::new(width, height);
    let cursor = Mutex::new(0_usize);
    let completed = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<BucketResult>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let (buckets, cursor, completed) = (&buckets, &cursor, &completed);
            scope.spawn(move || loop {
                if control.is_stopped() {
                    break;
                }
                let next = {
                    let Ok(mut next) = cursor.lock() else {
                        break;
                    };
                    let index = *next;
                    *next += 1;
                    index
                };
                let Some(bucket) = buckets.get(next) else {
                    break;
                };

                let pixels = render_bucket(bucket, camera, source, config);
                completed.fetch_add(1, Ordering::Relaxed);
                if tx.send(BucketResult::new(*bucket, pixels)).is_err() {
                    break;
                }
            });
        }
        // Only workers hold senders now, so the receiver ends when they do
        drop(tx);

        for result in rx {
            image.write_bucket(&result);
            on_bucket(&result);
        }
    });

    let done = completed.load(Ordering::Relaxed);
    if done < buckets.len() {
        log::info!("Render stopped after {} of {} buckets", done, buckets.len());
    } else {
        log::debug!("Render complete");
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Vec3;

    /// Solid color everywhere.
    struct Flat(Color);

    impl PixelSource for Flat {
        fn sample(&self, _ray: &Ray, _rng: &mut dyn RngCore) -> Color {
            self.0
        }
    }

    /// Left half black, right half white in camera space.
    struct Split;

    impl PixelSource for Split {
        fn sample(&self, ray: &Ray, _rng: &mut dyn RngCore) -> Color {
            if ray.direction().x < 0.0 {
                Color::ZERO
            } else {
                Color::ONE
            }
        }
    }

    fn camera(width: u32, height: u32) -> Camera {
        let mut camera = Camera::new()
            .with_resolution(width, height)
            .with_position(Vec3::ZERO, -Vec3::Z, Vec3::Y)
            .with_fov(90.0);
        camera.initialize();
        camera
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Color::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Color::ONE), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Color::splat(4.0)), [255, 255, 255, 255]);
        // Linear 0.5 is brighter than half in sRGB
        assert!(color_to_rgba(Color::splat(0.5))[0] > 180);
    }

    #[test]
    fn test_flat_pixel_skips_refinement() {
        let camera = camera(8, 8);
        let config = RenderConfig::default();
        let mut rng = StdRng::seed_from_u64(0);
        let color = render_pixel(&camera, &Flat(Color::splat(0.25)), 3, 3, &config, &mut rng);
        assert!((color - Color::splat(0.25)).length() < 1e-6);
    }

    #[test]
    fn test_edge_pixel_is_refined() {
        // Pixel straddling the split: diamond samples disagree, so the
        // jittered average lands strictly between black and white
        let camera = camera(9, 9);
        let config = RenderConfig {
            num_antialias_samples: 64,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let color = render_pixel(&camera, &Split, 4, 4, &config, &mut rng);
        assert!(color.x > 0.0 && color.x < 1.0);
    }

    #[test]
    fn test_render_fills_image_and_reports_buckets() {
        let camera = camera(40, 30);
        let config = RenderConfig {
            bucket_size: 16,
            num_threads: 3,
            ..Default::default()
        };
        let mut reported = 0;
        let image = render(
            &camera,
            &Flat(Color::new(0.1, 0.2, 0.3)),
            &config,
            &RenderControl::new(),
            |_| reported += 1,
        )
        .unwrap();

        assert_eq!(reported, generate_buckets(40, 30, 16).len());
        assert!(image
            .pixels
            .iter()
            .all(|c| (*c - Color::new(0.1, 0.2, 0.3)).length() < 1e-6));
        assert_eq!(image.to_rgba().len(), 40 * 30 * 4);
    }

    #[test]
    fn test_render_is_deterministic_across_thread_counts() {
        let camera = camera(24, 24);
        let single = RenderConfig {
            bucket_size: 8,
            num_threads: 1,
            ..Default::default()
        };
        let many = RenderConfig {
            num_threads: 4,
            ..single.clone()
        };
        let control = RenderControl::new();
        let a = render(&camera, &Split, &single, &control, |_| {}).unwrap();
        let b = render(&camera, &Split, &many, &control, |_| {}).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stopped_render_returns_early() {
        let camera = camera(32, 32);
        let config = RenderConfig {
            bucket_size: 8,
            ..Default::default()
        };
        let control = RenderControl::new();
        control.stop();

        let mut reported = 0;
        let image = render(&camera, &Flat(Color::ONE), &config, &control, |_| reported += 1).unwrap();
        assert_eq!(reported, 0);
        assert!(image.pixels.iter().all(|c| *c == Color::ZERO));

        control.reset();
        assert!(!control.is_stopped());
    }

    #[test]
    fn test_gather_without_photon_map_rejected() {
        use lumen_core::{CameraSettings, Material, Mesh, Scene};

        let mut mesh = Mesh::new();
        let v = [
            mesh.add_vertex(Vec3::new(-1.0, -1.0, -2.0)),
            mesh.add_vertex(Vec3::new(1.0, -1.0, -2.0)),
            mesh.add_vertex(Vec3::new(1.0, 1.0, -2.0)),
            mesh.add_vertex(Vec3::new(-1.0, 1.0, -2.0)),
        ];
        mesh.add_quad(v, 0).unwrap();
        let scene = Scene::new(
            mesh,
            vec![],
            vec![Material::default()],
            Color::ZERO,
            CameraSettings::default(),
        )
        .unwrap();
        let config = RenderConfig {
            gather_indirect: true,
            ..Default::default()
        };
        let tracer = RayTracer::new(&scene, &config);
        let result = render(&camera(4, 4), &tracer, &config, &RenderControl::new(), |_| {});
        assert!(matches!(result, Err(RenderError::PhotonsNotTraced)));
    }

    #[test]
    fn test_radiosity_view_colors_patches() {
        use lumen_core::{CameraSettings, Material, Mesh, Scene};

        // Emissive wall filling the view, facing the camera
        let mut mesh = Mesh::new();
        let v = [
            mesh.add_vertex(Vec3::new(-5.0, -5.0, -2.0)),
            mesh.add_vertex(Vec3::new(5.0, -5.0, -2.0)),
            mesh.add_vertex(Vec3::new(5.0, 5.0, -2.0)),
            mesh.add_vertex(Vec3::new(-5.0, 5.0, -2.0)),
        ];
        mesh.add_quad(v, 0).unwrap();
        let scene = Scene::new(
            mesh,
            vec![],
            vec![Material::light("wall", Color::new(0.5, 0.25, 0.125))],
            Color::ZERO,
            CameraSettings::default(),
        )
        .unwrap();
        assert!(scene.mesh.face(0).normal().z > 0.0);

        let config = RenderConfig::default();
        let radiosity = Radiosity::new(&scene).unwrap();
        let view = RadiosityView {
            tracer: RayTracer::new(&scene, &config),
            radiosity: &radiosity,
            mode: VisualizationMode::Radiance,
            interpolate: true,
        };
        let image = render(&camera(6, 6), &view, &config, &RenderControl::new(), |_| {}).unwrap();
        assert!(image
            .pixels
            .iter()
            .all(|c| (*c - Color::new(0.5, 0.25, 0.125)).length() < 1e-5));
    }

    #[test]
    fn test_empty_image_rejected() {
        let camera = camera(0, 10);
        let result = render(
            &camera,
            &Flat(Color::ONE),
            &RenderConfig::default(),
            &RenderControl::new(),
            |_| {},
        );
        assert!(matches!(result, Err(RenderError::EmptyImage { .. })));
    }
}
